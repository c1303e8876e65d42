mod common;

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pluginmgr::app::{App, Backend, TRACKER_NAMESPACE};
use pluginmgr::commands;
use pluginmgr::logging;
use pluginmgr::model::{Action, ActionReply, ReplyStatus};
use pluginmgr::model::config::AppConfig;
use pluginmgr::msg::Msg;
use pluginmgr::session::{SessionStore, WidgetTracker};
use pluginmgr::view::ToggleBlocked;
use pretty_assertions::assert_eq;
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;

use common::{RecordingClient, StaticSource, sample_entries};

const MODIFIABLE: &str = r#"
[server.metadata]
can_modify = true

[ui]
disclaimed = true
"#;

struct Harness {
    app: App,
    rx: mpsc::Receiver<Msg>,
    source: Arc<StaticSource>,
    client: Arc<RecordingClient>,
}

impl Harness {
    fn new(config: &str, store: Option<SessionStore>) -> Self {
        Self::with_client(config, store, RecordingClient::ok())
    }

    fn with_client(config: &str, store: Option<SessionStore>, client: Arc<RecordingClient>) -> Self {
        logging::initialize_for_tests();
        let config = AppConfig::from_layers(Some(config)).expect("config parses");
        let source = StaticSource::ok(sample_entries());
        let backend = Backend {
            source: source.clone(),
            client: client.clone(),
        };
        let (tx, rx) = mpsc::channel();
        let tracker = WidgetTracker::new(TRACKER_NAMESPACE, store);
        let app = App::new(
            config,
            backend,
            tracker,
            tokio::runtime::Handle::current(),
            tx,
        );

        Self {
            app,
            rx,
            source,
            client,
        }
    }

    fn key(&mut self, code: KeyCode) {
        self.app
            .update(Msg::Key(KeyEvent::new(code, KeyModifiers::NONE)))
            .expect("update");
    }

    fn type_text(&mut self, text: &str) {
        for ch in text.chars() {
            self.key(KeyCode::Char(ch));
        }
    }

    fn drain(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            self.app.update(msg).expect("update");
        }
    }

    async fn open(&mut self) {
        self.app
            .update(Msg::Command(commands::OPEN.to_string()))
            .expect("update");
        let model = self.app.plugins_view().expect("view open").model().clone();
        model.ready().await;
        self.drain();
    }

    fn render(&mut self) -> String {
        let mut terminal = Terminal::new(TestBackend::new(110, 30)).expect("terminal");
        terminal.draw(|frame| self.app.view(frame)).expect("draw");
        buffer_text(terminal.backend().buffer())
    }
}

fn buffer_text(buffer: &Buffer) -> String {
    let area = buffer.area;
    (area.top()..area.bottom())
        .map(|y| {
            (area.left()..area.right())
                .map(|x| buffer[(x, y)].symbol())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn open_command_loads_and_renders_plugins() {
    let mut h = Harness::new(MODIFIABLE, None);
    assert!(h.render().contains("Type :open"));

    h.open().await;

    assert_eq!(h.source.calls(), 1);
    let screen = h.render();
    assert!(screen.contains("Plugin Manager"));
    assert!(screen.contains("pkg:a"));
    assert!(screen.contains("pkg:b"));

    // reopening reveals the same view instead of building a second one
    h.open().await;
    assert_eq!(h.source.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn filter_keys_narrow_the_table() {
    let mut h = Harness::new(MODIFIABLE, None);
    h.open().await;

    h.key(KeyCode::Char('/'));
    h.type_text("b");
    h.key(KeyCode::Enter);
    h.drain();

    let view = h.app.plugins_view().expect("view open");
    let snapshot = view.model().snapshot();
    assert_eq!(snapshot.query, "b");
    let ids: Vec<&str> = view.rows(&snapshot).iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["pkg:b"]);

    let screen = h.render();
    assert!(screen.contains("/b"));
    assert!(!screen.contains("pkg:a"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn toggle_is_blocked_when_server_forbids_changes() {
    let mut h = Harness::new("", None);
    h.open().await;

    h.key(KeyCode::Char(' '));

    assert_eq!(
        h.app.notifications.back().map(String::as_str),
        Some(ToggleBlocked::NotPermitted.message())
    );
    assert_eq!(h.client.calls(), 0);
    assert!(h.render().contains("Disabling plugins"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn toggle_requires_acknowledged_disclaimer() {
    let mut h = Harness::new("[server.metadata]\ncan_modify = true\n", None);
    h.open().await;

    h.key(KeyCode::Enter);
    assert_eq!(
        h.app.notifications.back().map(String::as_str),
        Some(ToggleBlocked::NotDisclaimed.message())
    );

    h.key(KeyCode::Char('D'));
    h.key(KeyCode::Enter);

    let client = h.client.clone();
    wait_until(|| client.calls() == 1).await;
    assert_eq!(
        *client.requests.lock().unwrap(),
        vec![(Action::Enable, "pkg:a".to_string())]
    );

    let source = h.source.clone();
    wait_until(|| source.calls() == 2).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn rejected_action_shows_error_above_the_list() {
    let client = RecordingClient::replying(Ok(ActionReply {
        status: Some(ReplyStatus::Error),
        message: Some("locked".to_string()),
    }));
    let mut h = Harness::with_client(MODIFIABLE, None, client);
    h.open().await;

    h.key(KeyCode::Enter);

    let source = h.source.clone();
    wait_until(|| source.calls() == 2).await;
    let model = h.app.plugins_view().expect("view open").model().clone();
    wait_until(|| !model.is_loading()).await;
    assert_eq!(model.action_error().as_deref(), Some("locked"));

    let screen = h.render();
    assert!(screen.contains("Error when performing an action."));
    assert!(screen.contains("Reason given:"));
    assert!(screen.contains("locked"));
    assert!(screen.contains("pkg:a"));
    assert!(screen.contains("pkg:b"));
    assert!(screen.contains("Plugins (2/2)"));

    h.key(KeyCode::Char('x'));
    assert!(!h.render().contains("Error when performing an action."));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn palette_lists_commands_with_captions() {
    let mut h = Harness::new(MODIFIABLE, None);

    h.key(KeyCode::Char(':'));
    let screen = h.render();
    assert!(screen.contains("Advanced Plugin Manager"));
    assert!(screen.contains("Enable or disable individual plugins"));
    assert!(screen.contains("Refresh plugins list"));

    h.type_text("refresh");
    let screen = h.render();
    assert!(screen.contains("Refresh plugins list"));
    assert!(!screen.contains("Enable or disable individual plugins"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn refresh_before_open_is_reported() {
    let mut h = Harness::new(MODIFIABLE, None);

    h.app.execute(commands::REFRESH, None);

    assert_eq!(
        h.app.notifications.back().map(String::as_str),
        Some("plugin manager is not open")
    );
    assert_eq!(h.source.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn refresh_command_reloads_open_view() {
    let mut h = Harness::new(MODIFIABLE, None);
    h.open().await;

    h.app
        .update(Msg::Command("Refresh Plugin List".to_string()))
        .expect("update");

    let source = h.source.clone();
    wait_until(|| source.calls() == 2).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn saved_query_is_restored_into_a_new_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path().join("session.json"));

    let mut first = Harness::new(MODIFIABLE, Some(store.clone()));
    assert!(!first.app.restore());
    first.open().await;
    first.key(KeyCode::Char('/'));
    first.type_text("toc");
    first.drain();

    let mut second = Harness::new(MODIFIABLE, Some(store));
    assert!(second.app.restore());

    let model = second
        .app
        .plugins_view()
        .expect("restored view")
        .model()
        .clone();
    assert_eq!(model.query(), "toc");
    model.ready().await;
    assert_eq!(second.source.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn restore_is_skipped_when_disabled() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path().join("session.json"));

    let mut first = Harness::new(MODIFIABLE, Some(store.clone()));
    first.open().await;

    let config = format!("{MODIFIABLE}\n[session]\nrestore = false\n");
    let mut second = Harness::new(&config, Some(store));
    assert!(!second.app.restore());
    assert!(second.app.plugins_view().is_none());
}
