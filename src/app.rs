use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

use crate::api::{ActionClient, ApiClient, AppMetadataSource, PluginSource, ServerPluginSource};
use crate::commands::{self, CommandRegistry};
use crate::model::config::{AppConfig, SourceKind};
use crate::model::mode::Mode;
use crate::model::{PluginListModel, PluginListOptions, Subscription};
use crate::msg::Msg;
use crate::session::{RestorationArgs, WidgetTracker};
use crate::view::{PluginsView, text_cursor_x};

pub const TRACKER_NAMESPACE: &str = "plugin-manager";
pub const WIDGET_NAME: &str = "plugins";

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const METADATA_DEBOUNCE: Duration = Duration::from_millis(200);
const MAX_NOTIFICATIONS: usize = 8;

/// Where refreshes read from and where actions are sent.
#[derive(Clone)]
pub struct Backend {
    pub source: Arc<dyn PluginSource>,
    pub client: Arc<dyn ActionClient>,
}

impl Backend {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = ApiClient::new(config.server_settings())?;
        let source: Arc<dyn PluginSource> = match config.source.kind {
            SourceKind::Metadata => Arc::new(AppMetadataSource::new(config.metadata_path())),
            SourceKind::Server => Arc::new(ServerPluginSource::new(client.clone())),
        };

        Ok(Self {
            source,
            client: Arc::new(client),
        })
    }
}

pub struct App {
    pub mode: Mode,
    pub config: AppConfig,
    backend: Backend,
    registry: CommandRegistry,
    tracker: WidgetTracker,
    runtime: tokio::runtime::Handle,
    pub event_tx: mpsc::Sender<Msg>,
    plugins: Option<PluginsView>,
    subscriptions: Vec<Subscription>,
    command_input: String,
    palette_selected: usize,
    pub notifications: VecDeque<String>,
    pub should_quit: bool,
    refresh_due: Option<Instant>,
    tick: usize,
}

impl App {
    pub fn new(
        config: AppConfig,
        backend: Backend,
        tracker: WidgetTracker,
        runtime: tokio::runtime::Handle,
        event_tx: mpsc::Sender<Msg>,
    ) -> Self {
        Self {
            mode: Mode::Normal,
            config,
            backend,
            registry: CommandRegistry::default(),
            tracker,
            runtime,
            event_tx,
            plugins: None,
            subscriptions: Vec::new(),
            command_input: String::new(),
            palette_selected: 0,
            notifications: VecDeque::new(),
            should_quit: false,
            refresh_due: None,
            tick: 0,
        }
    }

    /// Replays the widgets saved by the tracker. Returns whether any was
    /// restored.
    pub fn restore(&mut self) -> bool {
        if !self.config.session.restore {
            return false;
        }

        let mut restored = false;
        for saved in self.tracker.restore() {
            if saved.command == commands::OPEN {
                self.execute(commands::OPEN, Some(saved.args));
                restored = true;
            } else {
                tracing::debug!("skipping saved widget for {}", saved.command);
            }
        }
        restored
    }

    pub fn plugins_view(&self) -> Option<&PluginsView> {
        self.plugins.as_ref()
    }

    pub fn plugins_view_mut(&mut self) -> Option<&mut PluginsView> {
        self.plugins.as_mut()
    }

    // ── MVU: Update ──────────────────────────────────────────────

    pub fn update(&mut self, msg: Msg) -> Result<()> {
        match msg {
            Msg::Key(key) => self.handle_key(key),
            Msg::Mouse(mouse) => {
                if let Some(view) = self.plugins.as_mut() {
                    view.handle_mouse(mouse, Instant::now());
                }
            }
            Msg::Resize(_, _) | Msg::ModelChanged => {}
            Msg::TrackerDataChanged => self.save_session(),
            Msg::Command(input) => self.run_palette_input(&input),
            Msg::MetadataChanged(path) => {
                if self.config.source.watch && path == self.config.metadata_path() {
                    self.refresh_due = Some(Instant::now() + METADATA_DEBOUNCE);
                }
            }
            Msg::Tick => self.handle_tick(),
            Msg::Quit => self.should_quit = true,
        }
        Ok(())
    }

    /// Runs a registered command by id.
    pub fn execute(&mut self, command_id: &str, args: Option<RestorationArgs>) {
        match command_id {
            commands::OPEN => self.open(args),
            commands::REFRESH => self.refresh(),
            other => self.push_notification(format!("unknown command: {other}")),
        }
    }

    fn open(&mut self, args: Option<RestorationArgs>) {
        if self.plugins.is_some() {
            tracing::debug!("plugin manager already open");
            return;
        }

        let args = args.unwrap_or_default();
        let model = PluginListModel::new(
            self.backend.source.clone(),
            self.backend.client.clone(),
            PluginListOptions {
                query: Some(args.query.clone()),
                server_metadata: Some(self.config.server.metadata),
                disclaimed: self.config.ui.disclaimed,
            },
        );

        let tx = self.event_tx.clone();
        self.subscriptions.push(model.state_changed().connect(move || {
            let _ = tx.send(Msg::ModelChanged);
        }));
        let tx = self.event_tx.clone();
        self.subscriptions
            .push(model.tracker_data_changed().connect(move || {
                let _ = tx.send(Msg::TrackerDataChanged);
            }));

        self.tracker.save(WIDGET_NAME, commands::OPEN, args);

        let initial = model.clone();
        self.runtime.spawn(async move {
            initial.refresh().await;
        });

        tracing::info!("plugin manager opened");
        self.plugins = Some(PluginsView::new(model));
    }

    fn refresh(&mut self) {
        let Some(view) = self.plugins.as_ref() else {
            self.push_notification("plugin manager is not open".to_string());
            return;
        };

        let model = view.model().clone();
        self.runtime.spawn(async move {
            model.refresh().await;
            if let Some(err) = model.available_error() {
                tracing::error!("Failed to refresh the available plugins list:\n{err}");
            }
        });
    }

    fn toggle_selected(&mut self) {
        let Some(view) = self.plugins.as_ref() else {
            return;
        };

        match view.toggle_target() {
            Ok(entry) => {
                let model = view.model().clone();
                self.runtime.spawn(async move {
                    if let Err(err) = model.toggle(&entry).await {
                        tracing::warn!("toggle rejected: {err}");
                    }
                });
            }
            Err(blocked) => self.push_notification(blocked.message().to_string()),
        }
    }

    fn save_session(&self) {
        if let Some(view) = self.plugins.as_ref() {
            let args = RestorationArgs {
                query: view.model().query(),
            };
            self.tracker.save(WIDGET_NAME, commands::OPEN, args);
        }
    }

    fn handle_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);

        if self.refresh_due.is_some_and(|due| Instant::now() >= due) {
            self.refresh_due = None;
            if self.plugins.is_some() {
                tracing::info!("plugin metadata changed, refreshing");
                self.refresh();
            }
        }
    }

    fn push_notification(&mut self, message: String) {
        self.notifications.push_back(message);
        while self.notifications.len() > MAX_NOTIFICATIONS {
            self.notifications.pop_front();
        }
    }

    fn run_palette_input(&mut self, input: &str) {
        let input = input.trim();
        if input.is_empty() {
            return;
        }

        match self.registry.find(input) {
            Some(command) => {
                let id = command.id;
                self.execute(id, None);
            }
            None => self.push_notification(format!("unknown command: {input}")),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.mode {
            Mode::Normal => self.handle_key_normal(key),
            Mode::Filter => self.handle_key_filter(key),
            Mode::Command => self.handle_key_command(key),
        }
    }

    fn handle_key_normal(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char(':') => {
                self.mode = Mode::Command;
                self.command_input.clear();
                self.palette_selected = 0;
            }
            KeyCode::Char('/') if self.plugins.is_some() => self.mode = Mode::Filter,
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected(),
            KeyCode::Char('D') => {
                if let Some(view) = self.plugins.as_ref() {
                    view.model().acknowledge_disclaimer();
                }
            }
            KeyCode::Char('x') => {
                if let Some(view) = self.plugins.as_ref() {
                    view.model().dismiss_action_error();
                }
            }
            KeyCode::Char('s') => {
                if let Some(view) = self.plugins.as_mut() {
                    view.sort_mut().next_column();
                }
            }
            KeyCode::Char('S') => {
                if let Some(view) = self.plugins.as_mut() {
                    let column = view.sort().column;
                    view.sort_mut().select(column);
                }
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::PageUp => self.move_selection(-10),
            KeyCode::Char('g') | KeyCode::Home => self.move_selection(isize::MIN / 2),
            KeyCode::Char('G') | KeyCode::End => self.move_selection(isize::MAX / 2),
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: isize) {
        if let Some(view) = self.plugins.as_mut() {
            view.move_selection(delta);
        }
    }

    fn handle_key_filter(&mut self, key: KeyEvent) {
        let Some(view) = self.plugins.as_ref() else {
            self.mode = Mode::Normal;
            return;
        };
        let model = view.model();

        match key.code {
            KeyCode::Esc | KeyCode::Enter => self.mode = Mode::Normal,
            KeyCode::Backspace => {
                let mut query = model.query();
                query.pop();
                model.set_query(query);
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                model.set_query(String::new());
            }
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                let mut query = model.query();
                query.push(ch);
                model.set_query(query);
            }
            _ => {}
        }
    }

    fn handle_key_command(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.command_input.clear();
            }
            KeyCode::Enter => {
                let matches = self.registry.matching(&self.command_input);
                let command = match self.registry.find(&self.command_input) {
                    Some(exact) => Some(exact.id),
                    None => matches.get(self.palette_selected).map(|command| command.id),
                };
                let input = self.command_input.trim().to_string();

                self.mode = Mode::Normal;
                self.command_input.clear();

                match command {
                    Some(id) => {
                        let _ = self.event_tx.send(Msg::Command(id.to_string()));
                    }
                    None if !input.is_empty() => {
                        self.push_notification(format!("unknown command: {input}"));
                    }
                    None => {}
                }
            }
            KeyCode::Up => self.palette_selected = self.palette_selected.saturating_sub(1),
            KeyCode::Down => {
                let count = self.registry.matching(&self.command_input).len();
                if self.palette_selected + 1 < count {
                    self.palette_selected += 1;
                }
            }
            KeyCode::Backspace => {
                self.command_input.pop();
                self.palette_selected = 0;
            }
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.command_input.push(ch);
                self.palette_selected = 0;
            }
            _ => {}
        }
    }

    // ── MVU: View ────────────────────────────────────────────────

    pub fn view(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // body
                Constraint::Length(1), // status bar
            ])
            .split(frame.area());

        let spinner = SPINNER[self.tick % SPINNER.len()];
        let filter_focused = self.mode == Mode::Filter;
        match self.plugins.as_mut() {
            Some(view) => view.render(frame, chunks[0], filter_focused, spinner),
            None => render_welcome(frame, chunks[0]),
        }

        self.render_status_bar(frame, chunks[1]);

        if self.mode == Mode::Command {
            self.render_command_overlay(frame);
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mode_style = match self.mode {
            Mode::Normal => Style::default()
                .fg(Color::Black)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            Mode::Filter => Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            Mode::Command => Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        };

        let mode_span = Span::styled(format!(" {} ", self.mode.label()), mode_style);

        let mut info = match self.plugins.as_ref() {
            Some(view) => {
                let snapshot = view.model().snapshot();
                let sort = view.sort();
                format!(
                    " {}/{} plugins | sort: {}{}",
                    view.rows(&snapshot).len(),
                    snapshot.available.len(),
                    sort.column.label(),
                    sort.indicator(sort.column),
                )
            }
            None => " no plugin manager open".to_string(),
        };

        if let Some(note) = self.notifications.back() {
            info.push_str(&format!(" | {note}"));
        }

        let bar = Line::from(vec![
            mode_span,
            Span::styled(
                format!("{info} "),
                Style::default().fg(Color::Gray).bg(Color::DarkGray),
            ),
        ]);
        let status = Paragraph::new(bar).style(Style::default().bg(Color::DarkGray));
        frame.render_widget(status, area);
    }

    fn render_command_overlay(&self, frame: &mut Frame) {
        let area = centered_rect(60, 40, frame.area());
        frame.render_widget(Clear, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(1)])
            .split(area);

        let prompt = Paragraph::new(format!(":{}", self.command_input)).block(
            Block::default()
                .title(" Command ")
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::Rgb(15, 15, 24))),
        );
        frame.render_widget(prompt, chunks[0]);

        let items: Vec<ListItem> = self
            .registry
            .matching(&self.command_input)
            .into_iter()
            .map(|command| {
                ListItem::new(vec![
                    Line::from(vec![
                        Span::raw(command.label),
                        Span::styled(
                            format!("  {}", command.id),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ]),
                    Line::from(Span::styled(
                        format!("  {}", command.caption),
                        Style::default().fg(Color::Gray),
                    )),
                ])
            })
            .collect();

        let mut state = ListState::default().with_selected(Some(self.palette_selected));
        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!(" {} ", commands::CATEGORY))
                    .borders(Borders::ALL)
                    .style(Style::default().bg(Color::Rgb(15, 15, 24))),
            )
            .highlight_style(Style::default().fg(Color::Black).bg(Color::Magenta));
        frame.render_stateful_widget(list, chunks[1], &mut state);

        frame.set_cursor_position((
            text_cursor_x(chunks[0].x, &self.command_input),
            chunks[0].y + 1,
        ));
    }
}

fn render_welcome(frame: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(Span::styled(
            "pluginmgr",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from("Type :open to show the plugin manager, q to quit."),
    ];
    frame.render_widget(
        Paragraph::new(text).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
