use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use syncer_core::cfg::Overrides;

/// Long flags that may also be spelled with a single dash (`-pp`, `-nomad URL`).
const LONG_FLAGS: &[&str] = &[
    "help", "version", "vv", "pp", "nomad", "proxy", "docker-pull", "docker-bin", "config", "log",
];

#[derive(Parser, Debug)]
#[command(name = env!("CARGO_PKG_NAME"), about = env!("CARGO_PKG_DESCRIPTION"), disable_version_flag = true)]
pub struct Cli {
    /// Display version information
    #[arg(short = 'v', long = "version")]
    pub version: bool,
    /// Display extended version information
    #[arg(long = "vv")]
    pub version_ext: bool,
    /// Pretty print for JSON output
    #[arg(long = "pp", global = true)]
    pub pretty: bool,
    /// Nomad url (default "http://localhost:4646")
    #[arg(long, value_name = "URL", global = true)]
    pub nomad: Option<String>,
    /// Proxy url
    #[arg(long, value_name = "URL", global = true)]
    pub proxy: Option<String>,
    /// Pull Docker images before sync
    #[arg(long = "docker-pull", global = true)]
    pub docker_pull: bool,
    /// Executable used for image pulls (default "docker")
    #[arg(long = "docker-bin", value_name = "PROGRAM", global = true)]
    pub docker_bin: Option<String>,
    /// Config file to use instead of the per-user config.toml
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
    /// Log level override (info,debug,trace)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log: Option<String>,
    #[command(subcommand)]
    pub cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Retrieve jobs
    Jobs,
    /// Add a job from a JSON document or a file containing one
    Add { job: String },
    /// Get a job information
    Get { id: String },
    /// Delete a job
    Del { id: String },
    /// Sync jobs via a file or directory
    Sync { path: PathBuf },
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            nomad_url: self.nomad.clone(),
            proxy_url: self.proxy.clone(),
            docker_bin: self.docker_bin.clone(),
            pretty: self.pretty,
            docker_pull: self.docker_pull,
        }
    }
}

/// Rewrite `-name[=value]` to `--name[=value]` for known long flags, up to a bare `--`.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut out = Vec::new();
    let mut passthrough = false;
    for arg in args {
        if passthrough {
            out.push(arg);
            continue;
        }
        let rewritten = arg.to_str().and_then(|s| {
            if s == "--" {
                passthrough = true;
                return None;
            }
            let name = s.strip_prefix('-').filter(|n| !n.starts_with('-'))?;
            let key = name.split_once('=').map_or(name, |(k, _)| k);
            LONG_FLAGS.contains(&key).then(|| OsString::from(format!("-{s}")))
        });
        out.push(rewritten.unwrap_or(arg));
    }
    out
}
