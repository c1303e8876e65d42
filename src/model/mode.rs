/// Application interaction modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Table navigation and toggling.
    #[default]
    Normal,
    /// Editing the filter box.
    Filter,
    /// Command palette (`:` prefix).
    Command,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Filter => "FILTER",
            Mode::Command => "COMMAND",
        }
    }
}
