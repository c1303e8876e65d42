use std::time::{Duration, Instant};

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

pub const MIN_PANE_WIDTH: u16 = 20;
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);
const DEFAULT_TABLE_PERCENT: u32 = 65;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleEvent {
    DoubleClick,
    MouseDown,
    MouseMove { column: u16 },
    MouseUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneLayout {
    pub table: Rect,
    pub handle: Rect,
    pub detail: Rect,
}

/// Drag handle between the plugin table and the detail pane.
///
/// A mouse-down on the handle switches to a custom table width, dragging
/// moves it, and a double click goes back to the default split.
#[derive(Debug, Default)]
pub struct ResizeHandle {
    is_active: bool,
    is_dragging: bool,
    width: Option<u16>,
    last_down: Option<Instant>,
}

impl ResizeHandle {
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    pub fn width(&self) -> Option<u16> {
        self.width
    }

    pub fn handle_event(&mut self, event: HandleEvent, area: Rect) {
        match event {
            HandleEvent::DoubleClick => {
                self.width = None;
                self.is_active = false;
                self.is_dragging = false;
            }
            HandleEvent::MouseDown => {
                self.is_dragging = true;
                if !self.is_active {
                    self.is_active = true;
                }
            }
            HandleEvent::MouseMove { column } => {
                if !self.is_active || !self.is_dragging {
                    return;
                }
                self.width = Some(column.saturating_sub(area.x));
            }
            HandleEvent::MouseUp => self.is_dragging = false,
        }
    }

    /// Translates a terminal mouse event; returns whether it was consumed.
    pub fn handle_mouse(&mut self, mouse: MouseEvent, area: Rect, now: Instant) -> bool {
        let layout = self.layout(area);
        let on_handle = mouse.column == layout.handle.x
            && mouse.row >= area.y
            && mouse.row < area.y + area.height;

        let event = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if on_handle => {
                match self.last_down.take() {
                    Some(previous) if now.duration_since(previous) <= DOUBLE_CLICK_WINDOW => {
                        HandleEvent::DoubleClick
                    }
                    _ => {
                        self.last_down = Some(now);
                        HandleEvent::MouseDown
                    }
                }
            }
            MouseEventKind::Drag(MouseButton::Left) if self.is_dragging => HandleEvent::MouseMove {
                column: mouse.column,
            },
            MouseEventKind::Up(MouseButton::Left) if self.is_dragging => HandleEvent::MouseUp,
            _ => return false,
        };

        self.handle_event(event, area);
        true
    }

    pub fn layout(&self, area: Rect) -> PaneLayout {
        let max = area.width.saturating_sub(MIN_PANE_WIDTH + 1);
        let min = MIN_PANE_WIDTH.min(max);
        let requested = match self.width {
            Some(width) if self.is_active => width,
            _ => (u32::from(area.width) * DEFAULT_TABLE_PERCENT / 100) as u16,
        };
        let table_width = requested.clamp(min, max);

        let table = Rect {
            width: table_width,
            ..area
        };
        let handle = Rect {
            x: area.x + table_width,
            width: 1.min(area.width.saturating_sub(table_width)),
            ..area
        };
        let detail = Rect {
            x: handle.x + handle.width,
            width: area.width.saturating_sub(table_width + handle.width),
            ..area
        };

        PaneLayout {
            table,
            handle,
            detail,
        }
    }
}
