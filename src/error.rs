use thiserror::Error;

/// Failures surfaced by the plugin manager.
///
/// Only [`PluginManagerError::Precondition`] escapes `enable`/`disable`; the
/// other variants are caught at the model boundary and stored as display
/// strings on the model state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginManagerError {
    #[error("Already {state}: {id}")]
    Precondition { id: String, state: &'static str },

    #[error("network error: {0}")]
    Network(String),

    #[error("cannot encode request: {0}")]
    Encode(String),

    #[error("{message}")]
    Response { status: u16, message: String },

    #[error("{0}")]
    Rejected(String),

    #[error("cannot load plugin metadata: {0}")]
    Source(String),
}

impl PluginManagerError {
    pub fn already_enabled(id: impl Into<String>) -> Self {
        Self::Precondition {
            id: id.into(),
            state: "enabled",
        }
    }

    pub fn already_disabled(id: impl Into<String>) -> Self {
        Self::Precondition {
            id: id.into(),
            state: "disabled",
        }
    }
}

pub type Result<T, E = PluginManagerError> = std::result::Result<T, E>;
