use crossterm::event::{KeyEvent, MouseEvent};
use std::path::PathBuf;

/// All possible messages that drive state transitions.
#[derive(Debug)]
pub enum Msg {
    // -- Input events (raw)
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),

    // -- Model notifications
    ModelChanged,
    TrackerDataChanged,

    // -- Palette
    Command(String),

    // -- File watching
    MetadataChanged(PathBuf),

    // -- System
    Tick,
    Quit,
}
