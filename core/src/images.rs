use std::future::Future;
use std::process::Stdio;

use tokio::process::Command;
use tracing::info;

use crate::error::{Error, Result};
use crate::job::SyncJob;

/// Config key holding a docker task's image reference.
pub const IMAGE_KEY: &str = "image";

/// Image references of every docker task in `job_json`, in group then task order.
///
/// Duplicates are kept. A non-string `image` entry is an error rather than skipped.
pub fn find_images(job_json: &str) -> Result<Vec<String>> {
    let sj = SyncJob::from_json(job_json)?;

    let mut images = Vec::new();
    for task in sj.tasks().filter(|t| t.is_docker()) {
        let Some(config) = task.config.as_ref() else { continue };
        if let Some(value) = config.get(IMAGE_KEY) {
            let image = value.as_str().ok_or_else(|| {
                Error::Decode(serde::de::Error::custom(format_args!(
                    "image of task {:?} is a {}, expected a string",
                    task.name,
                    value.type_name()
                )))
            })?;
            images.push(image.to_string());
        }
    }
    Ok(images)
}

/// Fetches a container image before its job is submitted.
pub trait ImagePuller {
    /// Pull `image`, blocking until done.
    fn pull(&self, image: &str) -> impl Future<Output = Result<()>>;
}

/// Runs `<program> pull <image>` as a subprocess. Its stdout is discarded.
#[derive(Debug, Clone)]
pub struct DockerPuller {
    program: String,
}

impl DockerPuller {
    /// Use `program` instead of `docker`.
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl ImagePuller for DockerPuller {
    async fn pull(&self, image: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(["pull", image])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| Error::ExternalTool(format!("failed to start {} due to {e}", self.program)))?;

        info!("pulling {}", image);
        let status = child
            .wait()
            .await
            .map_err(|e| Error::ExternalTool(format!("fail to pull {image} due to {e}")))?;
        if !status.success() {
            return Err(Error::ExternalTool(format!("fail to pull {image}")));
        }
        Ok(())
    }
}
