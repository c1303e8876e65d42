pub mod filter;
pub mod header;
pub mod list;
pub mod resize;
pub mod table;

use std::time::Instant;

use crossterm::event::MouseEvent;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, TableState};

use crate::model::{ModelSnapshot, PluginEntry, PluginListModel};
use filter::filter_entries;
use resize::ResizeHandle;
use table::SortState;

/// Why a toggle request was not forwarded to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleBlocked {
    NotPermitted,
    NotDisclaimed,
    NoSelection,
}

impl ToggleBlocked {
    pub fn message(self) -> &'static str {
        match self {
            ToggleBlocked::NotPermitted => "this server does not allow modifying plugins",
            ToggleBlocked::NotDisclaimed => "acknowledge the disclaimer first (D)",
            ToggleBlocked::NoSelection => "no plugin selected",
        }
    }
}

/// The plugin manager panel: header, disclaimer, table and detail pane.
///
/// Holds a handle on the model but no copy of its data; every render and
/// every query re-derives rows from a fresh snapshot.
#[derive(Debug)]
pub struct PluginsView {
    model: PluginListModel,
    sort: SortState,
    table_state: TableState,
    resize: ResizeHandle,
    body_area: Rect,
}

impl PluginsView {
    pub fn new(model: PluginListModel) -> Self {
        Self {
            model,
            sort: SortState::default(),
            table_state: TableState::default().with_selected(Some(0)),
            resize: ResizeHandle::default(),
            body_area: Rect::default(),
        }
    }

    pub fn model(&self) -> &PluginListModel {
        &self.model
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    pub fn sort_mut(&mut self) -> &mut SortState {
        &mut self.sort
    }

    pub fn rows<'a>(&self, snapshot: &'a ModelSnapshot) -> Vec<&'a PluginEntry> {
        self.sort
            .apply(filter_entries(&snapshot.available, &snapshot.query))
    }

    pub fn selected_index(&self) -> usize {
        self.table_state.selected().unwrap_or_default()
    }

    pub fn selected_entry(&self, snapshot: &ModelSnapshot) -> Option<PluginEntry> {
        self.rows(snapshot)
            .get(self.selected_index())
            .map(|entry| (*entry).clone())
    }

    pub fn move_selection(&mut self, delta: isize) {
        let snapshot = self.model.snapshot();
        let len = self.rows(&snapshot).len();
        if len == 0 {
            self.table_state.select(Some(0));
            return;
        }

        let max = len.saturating_sub(1) as isize;
        let next = (self.selected_index() as isize + delta).clamp(0, max);
        self.table_state.select(Some(next as usize));
    }

    /// The selected entry, if the user may toggle it right now.
    pub fn toggle_target(&self) -> Result<PluginEntry, ToggleBlocked> {
        let snapshot = self.model.snapshot();
        if !snapshot.can_modify {
            return Err(ToggleBlocked::NotPermitted);
        }
        if !snapshot.is_disclaimed {
            return Err(ToggleBlocked::NotDisclaimed);
        }
        self.selected_entry(&snapshot)
            .ok_or(ToggleBlocked::NoSelection)
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) -> bool {
        self.resize.handle_mouse(mouse, self.body_area, now)
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, filter_focused: bool, spinner: &str) {
        let snapshot = self.model.snapshot();
        let disclaimer_height = if snapshot.is_disclaimed {
            0
        } else {
            header::DISCLAIMER_HEIGHT
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(header::header_height(&snapshot)),
                Constraint::Length(disclaimer_height),
                Constraint::Min(1),
            ])
            .split(area);

        header::render_header(frame, chunks[0], &snapshot, filter_focused, spinner);
        if !snapshot.is_disclaimed {
            header::render_disclaimer(frame, chunks[1], snapshot.can_modify);
        }

        self.body_area = chunks[2];
        let panes = self.resize.layout(chunks[2]);

        let rows = self.rows(&snapshot);
        if self.selected_index() >= rows.len() {
            self.table_state
                .select(Some(rows.len().saturating_sub(1)));
        }
        list::render_available_list(
            frame,
            panes.table,
            &snapshot,
            &rows,
            self.sort,
            &mut self.table_state,
        );

        let handle_style = if self.resize.is_dragging() {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        frame.render_widget(
            Block::default()
                .borders(Borders::LEFT)
                .border_style(handle_style),
            panes.handle,
        );

        let selected = if snapshot.available_error.is_none() && !snapshot.is_loading {
            rows.get(self.selected_index()).copied()
        } else {
            None
        };
        list::render_detail(frame, panes.detail, selected);
    }
}

/// Cursor column after `text` typed into a bordered box starting at `box_x`.
pub fn text_cursor_x(box_x: u16, text: &str) -> u16 {
    let typed = u16::try_from(text.chars().count()).unwrap_or(u16::MAX);
    box_x.saturating_add(2).saturating_add(typed)
}

#[cfg(test)]
pub(crate) fn buffer_text(buffer: &ratatui::buffer::Buffer) -> String {
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
