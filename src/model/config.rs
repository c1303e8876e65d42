use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ServerSettings;
use crate::model::entry::ServerMetadata;

const DEFAULTS: &str = include_str!("../../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub source: SourceConfig,
    pub ui: UiConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub metadata: ServerMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Metadata,
    Server,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub metadata_path: String,
    /// Refresh when the metadata file changes on disk.
    pub watch: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    pub disclaimed: bool,
    pub tick_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub restore: bool,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config → env.
    pub fn load() -> Result<Self> {
        let user_path = directories::ProjectDirs::from("", "", "pluginmgr")
            .map(|dirs| dirs.config_dir().join("config.toml"));
        Self::load_from(user_path.as_deref())
    }

    pub fn load_from(user_path: Option<&Path>) -> Result<Self> {
        let user = match user_path {
            Some(path) if path.exists() => Some(
                fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?,
            ),
            _ => None,
        };

        let mut config = Self::from_layers(user.as_deref())?;
        config.apply_env(|key| std::env::var(key).ok());
        let expanded = expand_tilde(&config.source.metadata_path)?;
        config.source.metadata_path = absolutize(Path::new(&expanded))?
            .to_string_lossy()
            .into_owned();
        Ok(config)
    }

    /// Parses the built-in defaults with `user` deep-merged on top.
    pub fn from_layers(user: Option<&str>) -> Result<Self> {
        let mut merged: toml::Value = toml::from_str(DEFAULTS)?;
        if let Some(user) = user {
            let overlay: toml::Value = toml::from_str(user).context("invalid user config")?;
            merge(&mut merged, overlay);
        }

        Ok(merged.try_into()?)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = var("PLUGINMGR_BASE_URL") {
            self.server.base_url = base_url;
        }
        if let Some(token) = var("PLUGINMGR_TOKEN") {
            self.server.token = Some(token);
        }
    }

    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            base_url: self.server.base_url.clone(),
            token: self.server.token.clone(),
            connect_timeout: Duration::from_secs(self.server.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.server.request_timeout_secs),
        }
    }

    pub fn metadata_path(&self) -> PathBuf {
        PathBuf::from(&self.source.metadata_path)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.ui.tick_ms.max(1))
    }
}

fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn expand_tilde(path: &str) -> Result<String> {
    if !path.starts_with('~') {
        return Ok(path.to_string());
    }

    let home = directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(path.replacen('~', &home.to_string_lossy(), 1))
}

/// Absolute form of `path`, with the parent directory canonicalized when it
/// exists so watcher events compare equal.
fn absolutize(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("resolving {}", path.display()))?;
    let canonical = absolute
        .parent()
        .zip(absolute.file_name())
        .and_then(|(parent, name)| fs::canonicalize(parent).ok().map(|dir| dir.join(name)));
    Ok(canonical.unwrap_or(absolute))
}
