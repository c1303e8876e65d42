use std::cmp::Ordering;

use crate::model::PluginEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Plugin,
    Description,
    Autostart,
    Requires,
    Provides,
    Enabled,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Plugin,
        Column::Description,
        Column::Autostart,
        Column::Requires,
        Column::Provides,
        Column::Enabled,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Column::Plugin => "Plugin",
            Column::Description => "Description",
            Column::Autostart => "Autostart?",
            Column::Requires => "Depends on",
            Column::Provides => "Provides",
            Column::Enabled => "Enabled",
        }
    }

    /// Hidden columns are still sortable; their content shows in the detail pane.
    pub fn is_hidden(self) -> bool {
        matches!(self, Column::Description | Column::Requires)
    }

    pub fn visible() -> impl Iterator<Item = Column> {
        Self::ALL.into_iter().filter(|column| !column.is_hidden())
    }

    pub fn compare(self, a: &PluginEntry, b: &PluginEntry) -> Ordering {
        match self {
            Column::Plugin => compare_text(&a.id, &b.id),
            Column::Description => compare_text(&a.description, &b.description),
            Column::Autostart => a.auto_start.cmp(&b.auto_start),
            Column::Requires => a.requires.len().cmp(&b.requires.len()),
            Column::Provides => compare_text(a.provides_name(), b.provides_name()),
            Column::Enabled => a.enabled.cmp(&b.enabled),
        }
    }

    pub fn cell(self, entry: &PluginEntry) -> String {
        match self {
            Column::Plugin => entry.id.clone(),
            Column::Description => entry.description.clone(),
            Column::Autostart => {
                let label = if entry.auto_start { "Yes" } else { "No" };
                label.to_string()
            }
            Column::Requires => entry
                .requires
                .iter()
                .map(|token| token.name())
                .collect::<Vec<_>>()
                .join("\n"),
            Column::Provides => entry
                .provides
                .as_ref()
                .map(|token| token.name().to_string())
                .unwrap_or_else(|| "-".to_string()),
            Column::Enabled => {
                let mark = if entry.enabled { "[x]" } else { "[ ]" };
                if entry.locked {
                    format!("{mark} locked")
                } else {
                    mark.to_string()
                }
            }
        }
    }
}

/// Locale-like ordering: case-folded first, raw bytes as tie-breaker.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Currently selected sort column; nothing else about sorting is remembered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: Column,
    pub ascending: bool,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            column: Column::Plugin,
            ascending: true,
        }
    }
}

impl SortState {
    /// Selecting the current column flips direction; another column starts ascending.
    pub fn select(&mut self, column: Column) {
        if self.column == column {
            self.ascending = !self.ascending;
        } else {
            self.column = column;
            self.ascending = true;
        }
    }

    pub fn next_column(&mut self) {
        let index = Column::ALL
            .iter()
            .position(|column| *column == self.column)
            .unwrap_or_default();
        self.column = Column::ALL[(index + 1) % Column::ALL.len()];
        self.ascending = true;
    }

    pub fn indicator(&self, column: Column) -> &'static str {
        match (self.column == column, self.ascending) {
            (false, _) => "",
            (true, true) => " ▲",
            (true, false) => " ▼",
        }
    }

    pub fn apply<'a>(&self, mut rows: Vec<&'a PluginEntry>) -> Vec<&'a PluginEntry> {
        rows.sort_by(|a, b| {
            let ordering = self.column.compare(a, b);
            if self.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
        rows
    }
}
