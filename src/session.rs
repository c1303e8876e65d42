use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// State replayed into the open command when a session is restored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorationArgs {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedWidget {
    pub command: String,
    pub args: RestorationArgs,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    widgets: BTreeMap<String, SavedWidget>,
}

/// JSON file holding the saved widgets of every tracker namespace.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Option<Self> {
        directories::ProjectDirs::from("", "", "pluginmgr")
            .map(|dirs| Self::new(dirs.data_dir().join("session.json")))
    }

    pub fn load(&self) -> Result<BTreeMap<String, SavedWidget>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let file: SessionFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(file.widgets)
    }

    pub fn save(&self, key: &str, widget: SavedWidget) -> Result<()> {
        let mut widgets = self.load().unwrap_or_else(|err| {
            tracing::warn!("discarding unreadable session file: {err:#}");
            BTreeMap::new()
        });
        widgets.insert(key.to_string(), widget);
        self.write(SessionFile { widgets })
    }

    fn write(&self, file: SessionFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut out = fs::File::create(&tmp)?;
        out.write_all(serde_json::to_string_pretty(&file)?.as_bytes())?;
        out.flush()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Tracks the open plugin manager widget so it can be restored.
#[derive(Debug, Clone)]
pub struct WidgetTracker {
    namespace: String,
    store: Option<SessionStore>,
}

impl WidgetTracker {
    pub fn new(namespace: impl Into<String>, store: Option<SessionStore>) -> Self {
        Self {
            namespace: namespace.into(),
            store,
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}:{name}", self.namespace)
    }

    pub fn save(&self, name: &str, command: &str, args: RestorationArgs) {
        let Some(store) = self.store.as_ref() else {
            return;
        };

        let widget = SavedWidget {
            command: command.to_string(),
            args,
        };
        if let Err(err) = store.save(&self.key(name), widget) {
            tracing::warn!("failed to save session for {}: {err:#}", self.key(name));
        }
    }

    /// Saved widgets of this namespace, to be replayed through their commands.
    pub fn restore(&self) -> Vec<SavedWidget> {
        let Some(store) = self.store.as_ref() else {
            return Vec::new();
        };

        let prefix = format!("{}:", self.namespace);
        match store.load() {
            Ok(widgets) => widgets
                .into_iter()
                .filter(|(key, _)| key.starts_with(&prefix))
                .map(|(_, widget)| widget)
                .collect(),
            Err(err) => {
                tracing::warn!("cannot restore session: {err:#}");
                Vec::new()
            }
        }
    }
}
