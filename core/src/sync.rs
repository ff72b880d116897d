use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::client::{Client, Transport};
use crate::error::{Error, Result};
use crate::images::{find_images, ImagePuller};

/// Non-directory entries under `root` (or `root` itself if it is a file), lexically by file name.
///
/// Lazy and single-pass; call again to restart.
pub fn job_files(root: &Path) -> impl Iterator<Item = Result<PathBuf>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) if e.file_type().is_dir() => None,
            Ok(e) => Some(Ok(e.into_path())),
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                Some(Err(Error::Io { path, source: io::Error::from(e) }))
            }
        })
}

/// Result of syncing one file.
#[derive(Debug)]
pub struct FileOutcome {
    /// File that was visited.
    pub path: PathBuf,
    /// `Ok` once the job was accepted by the scheduler.
    pub result: Result<()>,
}

impl FileOutcome {
    /// File name for display, falling back to the full path.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Per-file outcomes of a sync, in traversal order.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// One entry per visited file.
    pub outcomes: Vec<FileOutcome>,
}

impl SyncReport {
    /// Files submitted successfully.
    pub fn synced(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Files that were skipped or rejected.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.synced()
    }
}

/// Submits every job file under a path, optionally pulling images first.
pub struct SyncPipeline<T, P> {
    client: Client<T>,
    puller: Option<P>,
}

impl<T: Transport, P: ImagePuller> SyncPipeline<T, P> {
    /// Pipeline that submits files as-is.
    pub fn new(client: Client<T>) -> Self {
        Self { client, puller: None }
    }

    /// Pull every referenced docker image with `puller` before submitting.
    pub fn with_image_pull(client: Client<T>, puller: P) -> Self {
        Self { client, puller: Some(puller) }
    }

    /// Borrow the API client.
    pub fn client(&self) -> &Client<T> {
        &self.client
    }

    /// Sync a file or directory tree.
    ///
    /// Fails only if `path` does not exist; per-file failures land in the report.
    pub async fn sync(&self, path: &Path) -> Result<SyncReport> {
        self.sync_with(path, |_| {}).await
    }

    /// Like [`sync`](Self::sync), handing each outcome to `on_outcome` as soon as its file is done.
    pub async fn sync_with<F>(&self, path: &Path, mut on_outcome: F) -> Result<SyncReport>
    where
        F: FnMut(&FileOutcome),
    {
        match fs::metadata(path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(path.to_path_buf()))
            }
            Err(source) => return Err(Error::Io { path: path.to_path_buf(), source }),
        }

        let mut report = SyncReport::default();
        for item in job_files(path) {
            let outcome = match item {
                Ok(file) => {
                    let result = self.process_file(&file).await;
                    FileOutcome { path: file, result }
                }
                Err(e) => {
                    let path = match &e {
                        Error::Io { path, .. } => path.clone(),
                        _ => PathBuf::new(),
                    };
                    FileOutcome { path, result: Err(e) }
                }
            };
            match &outcome.result {
                Ok(()) => debug!("{} is synced", outcome.name()),
                Err(e) => debug!("failed to sync {} due to {}", outcome.name(), e),
            }
            on_outcome(&outcome);
            report.outcomes.push(outcome);
        }
        if report.failed() > 0 {
            warn!("sync finished: {} synced, {} failed", report.synced(), report.failed());
        } else {
            info!("sync finished: {} synced", report.synced());
        }
        Ok(report)
    }

    /// Read one file, pull its images if enabled, then submit it.
    pub async fn process_file(&self, file: &Path) -> Result<()> {
        let raw = fs::read_to_string(file)
            .map_err(|source| Error::Io { path: file.to_path_buf(), source })?;

        if let Some(puller) = &self.puller {
            info!("syncing {}", file.display());
            let images = find_images(&raw)?;
            for image in &images {
                puller.pull(image).await?;
            }
        }

        self.client.submit_job(&raw).await
    }
}
