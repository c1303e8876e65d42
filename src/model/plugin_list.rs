use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::api::{ActionClient, PluginSource};
use crate::error::{PluginManagerError, Result};
use crate::model::entry::{Action, ActionReply, PluginEntry, ReplyStatus, ServerMetadata};
use crate::model::signal::Signal;

/// Construction options; `query` doubles as the restorable state.
#[derive(Debug, Clone, Default)]
pub struct PluginListOptions {
    pub query: Option<String>,
    pub server_metadata: Option<ServerMetadata>,
    /// Start with the disclaimer already acknowledged.
    pub disclaimed: bool,
}

#[derive(Debug, Default)]
struct ModelState {
    query: String,
    available: Vec<PluginEntry>,
    is_loading: bool,
    available_error: Option<String>,
    action_error: Option<String>,
    pending_actions: BTreeSet<u64>,
    is_disclaimed: bool,
}

/// Immutable copy of the model state handed to views at render time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSnapshot {
    pub query: String,
    pub available: Vec<PluginEntry>,
    pub is_loading: bool,
    pub available_error: Option<String>,
    pub action_error: Option<String>,
    pub pending_actions: usize,
    pub can_modify: bool,
    pub is_disclaimed: bool,
}

impl ModelSnapshot {
    pub fn has_pending_actions(&self) -> bool {
        self.pending_actions > 0
    }

    /// Whether enable/disable controls are interactive.
    pub fn can_toggle(&self) -> bool {
        self.can_modify && self.is_disclaimed
    }
}

struct Inner {
    source: Arc<dyn PluginSource>,
    client: Arc<dyn ActionClient>,
    can_modify: bool,
    state: Mutex<ModelState>,
    state_changed: Signal,
    tracker_data_changed: Signal,
    ready: watch::Sender<bool>,
    next_action: AtomicU64,
}

/// Single source of truth for the plugin table.
///
/// Cloning is cheap and every clone observes the same state. All mutation
/// goes through the model; views take a [`ModelSnapshot`] on each
/// `state_changed` notification.
#[derive(Clone)]
pub struct PluginListModel {
    inner: Arc<Inner>,
}

impl PluginListModel {
    pub fn new(
        source: Arc<dyn PluginSource>,
        client: Arc<dyn ActionClient>,
        options: PluginListOptions,
    ) -> Self {
        let metadata = options.server_metadata.unwrap_or_default();
        let (ready, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                source,
                client,
                can_modify: metadata.can_modify,
                state: Mutex::new(ModelState {
                    query: options.query.unwrap_or_default(),
                    is_disclaimed: options.disclaimed,
                    ..ModelState::default()
                }),
                state_changed: Signal::new(),
                tracker_data_changed: Signal::new(),
                ready,
                next_action: AtomicU64::new(0),
            }),
        }
    }

    pub fn state_changed(&self) -> &Signal {
        &self.inner.state_changed
    }

    /// Fires when the restorable state (the query) changes.
    pub fn tracker_data_changed(&self) -> &Signal {
        &self.inner.tracker_data_changed
    }

    pub fn can_modify(&self) -> bool {
        self.inner.can_modify
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        self.with_state(|state| ModelSnapshot {
            query: state.query.clone(),
            available: state.available.clone(),
            is_loading: state.is_loading,
            available_error: state.available_error.clone(),
            action_error: state.action_error.clone(),
            pending_actions: state.pending_actions.len(),
            can_modify: self.inner.can_modify,
            is_disclaimed: state.is_disclaimed,
        })
    }

    pub fn available(&self) -> Vec<PluginEntry> {
        self.with_state(|state| state.available.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.with_state(|state| state.is_loading)
    }

    pub fn available_error(&self) -> Option<String> {
        self.with_state(|state| state.available_error.clone())
    }

    pub fn action_error(&self) -> Option<String> {
        self.with_state(|state| state.action_error.clone())
    }

    pub fn has_pending_actions(&self) -> bool {
        self.pending_action_count() > 0
    }

    pub fn pending_action_count(&self) -> usize {
        self.with_state(|state| state.pending_actions.len())
    }

    pub fn is_disclaimed(&self) -> bool {
        self.with_state(|state| state.is_disclaimed)
    }

    pub fn query(&self) -> String {
        self.with_state(|state| state.query.clone())
    }

    /// Updating the query emits `state_changed` and then
    /// `tracker_data_changed`. Setting the current value does nothing.
    pub fn set_query(&self, value: impl Into<String>) {
        let value = value.into();
        let changed = self.with_state(|state| {
            if state.query == value {
                return false;
            }
            state.query = value;
            true
        });

        if changed {
            self.inner.state_changed.emit();
            self.inner.tracker_data_changed.emit();
        }
    }

    pub fn acknowledge_disclaimer(&self) {
        if !self.is_disclaimed() {
            self.update(|state| state.is_disclaimed = true);
        }
    }

    pub fn dismiss_action_error(&self) {
        if self.action_error().is_some() {
            self.update(|state| state.action_error = None);
        }
    }

    /// Resolves once the first refresh has settled, successful or not.
    pub async fn ready(&self) {
        let mut rx = self.inner.ready.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Reloads the plugin list from the source.
    ///
    /// Overlapping calls are not serialized; whichever settles last decides
    /// the visible state.
    pub async fn refresh(&self) {
        self.update(|state| {
            state.available_error = None;
            state.is_loading = true;
        });

        let result = self.inner.source.fetch().await;

        self.update(|state| {
            match result {
                Ok(entries) => {
                    tracing::debug!("loaded {} plugins", entries.len());
                    state.available = entries;
                    state.available_error = None;
                }
                Err(err) => {
                    tracing::warn!("failed to refresh plugin list: {err}");
                    state.available_error = Some(err.to_string());
                }
            }
            state.is_loading = false;
        });

        self.inner.ready.send_replace(true);
    }

    pub async fn enable(&self, entry: &PluginEntry) -> Result<()> {
        if entry.enabled {
            return Err(PluginManagerError::already_enabled(&entry.id));
        }
        self.apply(Action::Enable, entry).await;
        Ok(())
    }

    pub async fn disable(&self, entry: &PluginEntry) -> Result<()> {
        if !entry.enabled {
            return Err(PluginManagerError::already_disabled(&entry.id));
        }
        self.apply(Action::Disable, entry).await;
        Ok(())
    }

    pub async fn toggle(&self, entry: &PluginEntry) -> Result<()> {
        if entry.enabled {
            self.disable(entry).await
        } else {
            self.enable(entry).await
        }
    }

    /// Sends one action request for `entry`.
    ///
    /// The action counts as pending from the moment this returns until the
    /// returned future settles or is dropped. `action_error` is cleared on
    /// success and set to the failure text otherwise.
    pub fn perform_action(
        &self,
        action: Action,
        entry: &PluginEntry,
    ) -> impl Future<Output = Result<ActionReply>> + Send + 'static {
        let pending = PendingAction::register(self.clone());
        let model = self.clone();
        let plugin_id = entry.id.clone();

        async move {
            let _pending = pending;
            let result = model
                .inner
                .client
                .perform(action, &plugin_id)
                .await
                .and_then(check_reply);

            model.update(|state| {
                state.action_error = match &result {
                    Ok(_) => None,
                    Err(err) => Some(err.to_string()),
                };
            });

            result
        }
    }

    async fn apply(&self, action: Action, entry: &PluginEntry) {
        if let Err(err) = self.perform_action(action, entry).await {
            tracing::warn!("{action} {} failed: {err}", entry.id);
        }
        self.refresh().await;
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ModelState) -> R) -> R {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    fn update(&self, f: impl FnOnce(&mut ModelState)) {
        self.with_state(f);
        self.inner.state_changed.emit();
    }
}

impl std::fmt::Debug for PluginListModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginListModel")
            .field("can_modify", &self.inner.can_modify)
            .field("state", &self.snapshot())
            .finish()
    }
}

fn check_reply(reply: ActionReply) -> Result<ActionReply> {
    match reply.status {
        Some(ReplyStatus::Error) => Err(PluginManagerError::Rejected(
            reply.message.unwrap_or_else(|| "error".to_string()),
        )),
        Some(ReplyStatus::Warning) => {
            tracing::warn!(
                "plugin action warning: {}",
                reply.message.as_deref().unwrap_or_default()
            );
            Ok(reply)
        }
        _ => Ok(reply),
    }
}

/// Registration of one in-flight action; removed on drop.
struct PendingAction {
    model: PluginListModel,
    id: u64,
}

impl PendingAction {
    fn register(model: PluginListModel) -> Self {
        let id = model.inner.next_action.fetch_add(1, Ordering::Relaxed);
        model.update(|state| {
            state.pending_actions.insert(id);
        });
        Self { model, id }
    }
}

impl Drop for PendingAction {
    fn drop(&mut self) {
        let id = self.id;
        self.model.update(|state| {
            state.pending_actions.remove(&id);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_reply_is_not_a_failure() {
        let reply = ActionReply {
            status: Some(ReplyStatus::Warning),
            message: Some("restart required".to_string()),
        };
        assert_eq!(check_reply(reply.clone()), Ok(reply));
    }

    #[test]
    fn error_reply_carries_server_message() {
        let reply = ActionReply {
            status: Some(ReplyStatus::Error),
            message: Some("locked".to_string()),
        };
        assert_eq!(
            check_reply(reply),
            Err(PluginManagerError::Rejected("locked".to_string()))
        );
    }

    #[test]
    fn absent_status_is_accepted() {
        assert_eq!(
            check_reply(ActionReply::default()),
            Ok(ActionReply::default())
        );
    }

    #[test]
    fn snapshot_gates_toggling_on_metadata_and_disclaimer() {
        let snapshot = ModelSnapshot {
            can_modify: true,
            is_disclaimed: false,
            ..ModelSnapshot::default()
        };
        assert!(!snapshot.can_toggle());

        let snapshot = ModelSnapshot {
            is_disclaimed: true,
            ..snapshot
        };
        assert!(snapshot.can_toggle());
    }
}
