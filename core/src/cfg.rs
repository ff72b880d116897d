use anyhow::{Context, Result};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Scheduler address used when nothing else is configured.
pub const DEFAULT_NOMAD_URL: &str = "http://localhost:4646";
/// Environment variable overriding the scheduler address.
pub const ENV_NOMAD_URL: &str = "NOMAD_URL";
/// Environment variable overriding the proxy address.
pub const ENV_PROXY_URL: &str = "NOMAD_SYNCER_PROXY_URL";
/// Image-pull executable used when nothing else is configured.
pub const DEFAULT_DOCKER_BIN: &str = "docker";

/// Identifier used to compute per-app configuration directories.
#[derive(Clone, Copy)]
pub struct AppId {
    /// Reverse-DNS style qualifier, e.g. `"com"`.
    pub qualifier: &'static str,
    /// Organization or vendor name, e.g. `"local"`.
    pub organization: &'static str,
    /// Application name, e.g. `"nomad-syncer"`.
    pub application: &'static str,
}

/// Application configuration persisted to `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Tracing level to use if `RUST_LOG` is not set (e.g. `"info"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Scheduler address, below `--nomad` and `NOMAD_URL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nomad_url: Option<String>,
    /// Proxy address, below `--proxy` and `NOMAD_SYNCER_PROXY_URL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    /// Image-pull executable, below `--docker-bin`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_bin: Option<String>,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for Config {
    fn default() -> Self {
        Self { log_level: default_log_level(), nomad_url: None, proxy_url: None, docker_bin: None }
    }
}

/// Return the configuration directory for this app, creating it if needed.
pub fn config_dir(app: &AppId) -> Result<PathBuf> {
    let pd = ProjectDirs::from(app.qualifier, app.organization, app.application)
        .ok_or_else(|| anyhow::anyhow!("failed to resolve ProjectDirs"))?;
    let dir = pd.config_dir().to_path_buf();
    fs::create_dir_all(&dir).with_context(|| format!("create config dir {}", dir.display()))?;
    Ok(dir)
}

/// Load `config.toml` from the app config dir or create a default one.
pub fn load_or_init(app: &AppId) -> Result<Config> {
    let path = config_dir(app)?.join("config.toml");
    if path.exists() {
        load(&path)
    } else {
        let cfg = Config::default();
        save_config(&path, &cfg)?;
        Ok(cfg)
    }
}

/// Load a specific config file; it must exist.
pub fn load(path: &Path) -> Result<Config> {
    let txt = fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    let cfg: Config = toml::from_str(&txt)
        .with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    let s = toml::to_string_pretty(cfg)?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Values given on the command line; `None` means the flag was absent.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--nomad`
    pub nomad_url: Option<String>,
    /// `--proxy`
    pub proxy_url: Option<String>,
    /// `--docker-bin`
    pub docker_bin: Option<String>,
    /// `-pp`
    pub pretty: bool,
    /// `--docker-pull`
    pub docker_pull: bool,
}

/// Immutable runtime settings, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Scheduler base URL.
    pub nomad_url: String,
    /// Proxy every request through this URL.
    pub proxy_url: Option<Url>,
    /// Indent JSON output.
    pub pretty: bool,
    /// Pull referenced images before submitting during sync.
    pub docker_pull: bool,
    /// Executable invoked as `<docker_bin> pull <image>`.
    pub docker_bin: String,
}

impl Settings {
    /// Resolve settings: flag, then environment, then config file, then default.
    ///
    /// `env` looks up an environment variable; empty values count as unset.
    pub fn resolve(
        flags: Overrides,
        env: impl Fn(&str) -> Option<String>,
        file: &Config,
    ) -> crate::Result<Self> {
        let nomad_url = first_set([flags.nomad_url, env(ENV_NOMAD_URL), file.nomad_url.clone()])
            .unwrap_or_else(|| DEFAULT_NOMAD_URL.to_string());

        let proxy_url = first_set([flags.proxy_url, env(ENV_PROXY_URL), file.proxy_url.clone()])
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    Error::InvalidArgument(format!("proxy value {raw:?} due to {e}"))
                })
            })
            .transpose()?;

        let docker_bin = first_set([flags.docker_bin, file.docker_bin.clone()])
            .unwrap_or_else(|| DEFAULT_DOCKER_BIN.to_string());

        Ok(Settings {
            nomad_url,
            proxy_url,
            pretty: flags.pretty,
            docker_pull: flags.docker_pull,
            docker_bin,
        })
    }

    /// Resolve settings against the process environment.
    pub fn from_env(flags: Overrides, file: &Config) -> crate::Result<Self> {
        Self::resolve(flags, |k| std::env::var(k).ok(), file)
    }
}

fn first_set<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates.into_iter().flatten().find(|s| !s.is_empty())
}
