mod cli;

use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use syncer_core::cfg::{self, AppId, Config, Settings};
use syncer_core::client::{Client, HttpTransport};
use syncer_core::images::DockerPuller;
use syncer_core::{display_chain, logx};
use syncer_core::sync::SyncPipeline;
use tracing::{debug, warn};

use crate::cli::{Cli, Command};

const APP: AppId = AppId {
    qualifier: "com",
    organization: "local",
    application: env!("CARGO_PKG_NAME"),
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse_from(cli::normalize_args(std::env::args_os()));
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", display_chain(&*e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Some(cmd) = cli.cmd.as_ref() else {
        if cli.version || cli.version_ext {
            print_version(cli.version_ext);
        } else {
            Cli::command().print_help()?;
        }
        return Ok(());
    };

    // An explicit --config must load; the per-user file is best effort.
    let (file_cfg, cfg_err) = match &cli.config {
        Some(path) => (cfg::load(path)?, None),
        None => match cfg::load_or_init(&APP) {
            Ok(c) => (c, None),
            Err(e) => (Config::default(), Some(e)),
        },
    };
    logx::init(cli.log.as_deref().unwrap_or(&file_cfg.log_level));
    if let Some(e) = cfg_err {
        warn!("using default config: {e:#}");
    }

    let settings = Settings::from_env(cli.overrides(), &file_cfg)?;
    debug!("nomad={} proxy={:?}", settings.nomad_url, settings.proxy_url.as_ref().map(|u| u.as_str()));
    let client = Client::from_settings(&settings)?;

    match cmd {
        Command::Jobs => client.print_jobs(settings.pretty, &mut io::stdout().lock()).await?,
        Command::Get { id } => client.print_job(id, settings.pretty, &mut io::stdout().lock()).await?,
        Command::Add { job } => {
            let raw = read_job_arg(job)?;
            client.submit_job(&raw).await?;
            println!("job is added");
        }
        Command::Del { id } => {
            client.delete_job(id).await?;
            println!("{id} job is removed");
        }
        Command::Sync { path } => run_sync(client, &settings, path).await?,
    }
    Ok(())
}

async fn run_sync(client: Client<HttpTransport>, settings: &Settings, path: &Path) -> Result<()> {
    let pipeline = if settings.docker_pull {
        SyncPipeline::with_image_pull(client, DockerPuller::new(settings.docker_bin.clone()))
    } else {
        SyncPipeline::new(client)
    };
    pipeline
        .sync_with(path, |outcome| match &outcome.result {
            Ok(()) => println!("{} is synced", outcome.name()),
            Err(e) => eprintln!("failed to sync {} due to {}", outcome.name(), display_chain(e)),
        })
        .await?;
    Ok(())
}

/// `add` takes either a path to a job file or the JSON document itself.
fn read_job_arg(arg: &str) -> Result<String> {
    let path = Path::new(arg);
    if path.is_file() {
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
    } else {
        Ok(arg.to_string())
    }
}

fn print_version(extended: bool) {
    println!("{} version {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    if extended {
        println!("{}", env!("CARGO_PKG_DESCRIPTION"));
        println!("target: {}/{}", std::env::consts::OS, std::env::consts::ARCH);
    }
}
