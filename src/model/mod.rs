pub mod config;
pub mod entry;
pub mod mode;
pub mod plugin_list;
pub mod signal;

pub use entry::{Action, ActionReply, PluginEntry, ReplyStatus, ServerMetadata, Token};
pub use plugin_list::{ModelSnapshot, PluginListModel, PluginListOptions};
pub use signal::{Signal, Subscription};
