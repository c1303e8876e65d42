//! Terminal plugin manager for JupyterLab-compatible servers.
//!
//! [`model::PluginListModel`] owns the plugin list and talks to the server
//! through [`api::ActionClient`] and [`api::PluginSource`]; the views under
//! [`view`] render snapshots of it and the [`app::App`] loop wires both to
//! the terminal.

pub mod api;
pub mod app;
pub mod commands;
pub mod error;
pub mod logging;
pub mod model;
pub mod msg;
pub mod session;
pub mod view;

pub use error::PluginManagerError;
