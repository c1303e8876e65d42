use std::fs;
use std::path::PathBuf;

use crate::api::client::ApiClient;
use crate::error::{PluginManagerError, Result};
use crate::model::entry::PluginEntry;

/// Where a refresh reads the current plugin set from.
#[async_trait::async_trait]
pub trait PluginSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<PluginEntry>>;
}

/// Plugin list derived from the host application's plugin metadata file.
///
/// Without a backend there is no lock information, so every entry is
/// reported as locked.
#[derive(Debug, Clone)]
pub struct AppMetadataSource {
    path: PathBuf,
}

impl AppMetadataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<Vec<PluginEntry>> {
        let raw = fs::read_to_string(&self.path)
            .map_err(|err| PluginManagerError::Source(format!("{}: {err}", self.path.display())))?;

        let entries: Vec<PluginEntry> = serde_json::from_str(&raw)
            .map_err(|err| PluginManagerError::Source(format!("{}: {err}", self.path.display())))?;

        Ok(entries
            .into_iter()
            .map(|entry| PluginEntry {
                locked: true,
                ..entry
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl PluginSource for AppMetadataSource {
    async fn fetch(&self) -> Result<Vec<PluginEntry>> {
        self.read()
    }
}

/// Plugin list read live from `GET lab/api/plugins`.
#[derive(Debug, Clone)]
pub struct ServerPluginSource {
    client: ApiClient,
}

impl ServerPluginSource {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl PluginSource for ServerPluginSource {
    async fn fetch(&self) -> Result<Vec<PluginEntry>> {
        self.client.list_plugins().await
    }
}
