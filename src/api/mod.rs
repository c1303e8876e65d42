pub mod client;
pub mod source;

pub use client::{ActionClient, ApiClient, PLUGIN_API_PATH, ServerSettings};
pub use source::{AppMetadataSource, PluginSource, ServerPluginSource};
