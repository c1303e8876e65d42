#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pluginmgr::PluginManagerError;
use pluginmgr::api::{ActionClient, PluginSource};
use pluginmgr::model::{Action, ActionReply, PluginEntry};
use tokio::sync::oneshot;

pub type FetchResult = Result<Vec<PluginEntry>, PluginManagerError>;

pub fn entry(id: &str, extension: &str, enabled: bool) -> PluginEntry {
    PluginEntry {
        id: id.to_string(),
        description: format!("{id} description"),
        extension: extension.to_string(),
        auto_start: true,
        enabled,
        locked: false,
        requires: Vec::new(),
        optional: Vec::new(),
        provides: None,
    }
}

pub fn sample_entries() -> Vec<PluginEntry> {
    vec![entry("pkg:a", "pkg", false), entry("pkg:b", "pkg", true)]
}

/// Source returning a fixed result and counting calls.
#[derive(Default)]
pub struct StaticSource {
    result: Mutex<Option<FetchResult>>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn ok(entries: Vec<PluginEntry>) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Some(Ok(entries))),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Some(Err(PluginManagerError::Source(message.to_string())))),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set(&self, result: FetchResult) {
        *self.result.lock().unwrap() = Some(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PluginSource for StaticSource {
    async fn fetch(&self) -> FetchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.lock().unwrap().clone().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Source whose calls block until the test releases them, one gate per call.
#[derive(Default)]
pub struct GatedSource {
    gates: Mutex<VecDeque<oneshot::Receiver<FetchResult>>>,
    calls: AtomicUsize,
}

impl GatedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gate(&self) -> oneshot::Sender<FetchResult> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push_back(rx);
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PluginSource for GatedSource {
    async fn fetch(&self) -> FetchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().pop_front();
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(PluginManagerError::Network("gate dropped".to_string()))),
            None => Ok(Vec::new()),
        }
    }
}

/// Action client recording every request and replying with a fixed result.
pub struct RecordingClient {
    reply: Mutex<Result<ActionReply, PluginManagerError>>,
    pub requests: Mutex<Vec<(Action, String)>>,
}

impl RecordingClient {
    pub fn replying(reply: Result<ActionReply, PluginManagerError>) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(reply),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn ok() -> Arc<Self> {
        Self::replying(Ok(ActionReply {
            status: Some(pluginmgr::model::ReplyStatus::Ok),
            message: None,
        }))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ActionClient for RecordingClient {
    async fn perform(&self, action: Action, plugin_id: &str) -> Result<ActionReply, PluginManagerError> {
        self.requests
            .lock()
            .unwrap()
            .push((action, plugin_id.to_string()));
        self.reply.lock().unwrap().clone()
    }
}

/// Action client that waits for the test to release the reply.
pub struct GatedClient {
    gate: Mutex<Option<oneshot::Receiver<ActionReply>>>,
}

impl GatedClient {
    pub fn new() -> (Arc<Self>, oneshot::Sender<ActionReply>) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(Self {
                gate: Mutex::new(Some(rx)),
            }),
            tx,
        )
    }
}

#[async_trait::async_trait]
impl ActionClient for GatedClient {
    async fn perform(&self, _action: Action, _plugin_id: &str) -> Result<ActionReply, PluginManagerError> {
        let gate = self.gate.lock().unwrap().take();
        match gate {
            Some(rx) => rx
                .await
                .map_err(|_| PluginManagerError::Network("gate dropped".to_string())),
            None => Ok(ActionReply::default()),
        }
    }
}
