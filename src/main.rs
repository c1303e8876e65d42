use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use pluginmgr::app::{App, Backend, TRACKER_NAMESPACE};
use pluginmgr::commands;
use pluginmgr::logging;
use pluginmgr::model::config::{AppConfig, SourceKind};
use pluginmgr::msg::Msg;
use pluginmgr::session::{SessionStore, WidgetTracker};

fn main() -> Result<()> {
    let _log_guard = logging::init_file_logging(&logging::log_dir())?;

    tracing::info!("pluginmgr starting");

    let config = AppConfig::load()?;

    // Model work runs cooperatively on a single worker.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("pluginmgr-model")
        .enable_all()
        .build()?;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, config, runtime.handle().clone());

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    runtime.shutdown_timeout(Duration::from_millis(500));

    if let Err(e) = result {
        tracing::error!("pluginmgr error: {e:?}");
        eprintln!("pluginmgr error: {e:?}");
    }

    Ok(())
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: AppConfig,
    runtime: tokio::runtime::Handle,
) -> Result<()> {
    let (tx, rx) = mpsc::channel::<Msg>();
    let tick = config.tick_interval();
    let watch_path = (config.source.kind == SourceKind::Metadata && config.source.watch)
        .then(|| config.metadata_path());

    let backend = Backend::from_config(&config)?;
    let tracker = WidgetTracker::new(TRACKER_NAMESPACE, SessionStore::default_location());
    let mut app = App::new(config, backend, tracker, runtime, tx.clone());

    if !app.restore() {
        app.execute(commands::OPEN, None);
    }

    // Terminal events become Msg values
    let tx_input = tx.clone();
    thread::spawn(move || {
        loop {
            if let Ok(event) = event::read() {
                let msg = match event {
                    Event::Key(k) => Msg::Key(k),
                    Event::Mouse(m) => Msg::Mouse(m),
                    Event::Resize(w, h) => Msg::Resize(w, h),
                    _ => continue,
                };
                if tx_input.send(msg).is_err() {
                    break;
                }
            }
        }
    });

    // Ticks drive the spinner and debounced refreshes
    let tx_tick = tx.clone();
    thread::spawn(move || {
        loop {
            thread::sleep(tick);
            if tx_tick.send(Msg::Tick).is_err() {
                break;
            }
        }
    });

    if let Some(path) = watch_path {
        spawn_metadata_watcher(path, tx.clone());
    }

    // ── Main event loop ──
    loop {
        terminal.draw(|f| app.view(f))?;

        // Batch-drain all pending messages
        let first = rx.recv()?;
        app.update(first)?;

        while let Ok(msg) = rx.try_recv() {
            app.update(msg)?;
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn spawn_metadata_watcher(metadata_path: PathBuf, tx: mpsc::Sender<Msg>) {
    let Some(dir) = metadata_path.parent().map(PathBuf::from) else {
        return;
    };

    thread::spawn(move || {
        let tx_watch = tx.clone();
        let target = metadata_path.clone();
        let mut watcher: RecommendedWatcher =
            match notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) && event.paths.iter().any(|path| path == &target)
                    {
                        let _ = tx_watch.send(Msg::MetadataChanged(target.clone()));
                    }
                }
                Err(err) => {
                    tracing::warn!("metadata watcher error: {err}");
                }
            }) {
                Ok(w) => w,
                Err(err) => {
                    tracing::warn!("failed to initialize metadata watcher: {err}");
                    return;
                }
            };

        // Watch the directory so editors that replace the file are still seen.
        if let Err(err) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
            tracing::warn!("failed to watch {}: {err}", dir.display());
            return;
        }

        loop {
            thread::park();
        }
    });
}
