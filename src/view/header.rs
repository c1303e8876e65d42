use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::model::ModelSnapshot;
use crate::view::text_cursor_x;

pub const TITLE: &str = "Plugin Manager";
const FILTER_HEIGHT: u16 = 3;
const ACTION_ERROR_HEIGHT: u16 = 5;
pub const DISCLAIMER_HEIGHT: u16 = 6;

pub const DISCLAIMER_TEXT: &str = "Disabling plugins can break features that depend on them, \
    and core plugins may leave the application unusable until re-enabled from the server. \
    Only change plugins you understand.";

pub fn header_height(snapshot: &ModelSnapshot) -> u16 {
    if snapshot.action_error.is_some() {
        FILTER_HEIGHT + ACTION_ERROR_HEIGHT
    } else {
        FILTER_HEIGHT
    }
}

/// Title, filter box, pending indicator and the action error block.
pub fn render_header(
    frame: &mut Frame,
    area: Rect,
    snapshot: &ModelSnapshot,
    filter_focused: bool,
    spinner: &str,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(FILTER_HEIGHT), Constraint::Min(0)])
        .split(area);

    let pending = if snapshot.has_pending_actions() {
        format!(" {spinner} {} pending ", snapshot.pending_actions)
    } else {
        String::new()
    };

    let border_style = if filter_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let filter_line = if snapshot.query.is_empty() && !filter_focused {
        Line::from(Span::styled("Filter", Style::default().fg(Color::DarkGray)))
    } else {
        Line::from(vec![
            Span::styled("/", Style::default().fg(Color::DarkGray)),
            Span::raw(snapshot.query.clone()),
        ])
    };

    let filter = Paragraph::new(filter_line).block(
        Block::default()
            .title(Span::styled(
                format!(" {TITLE} "),
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ))
            .title(Line::from(Span::styled(pending, Style::default().fg(Color::Yellow))).right_aligned())
            .borders(Borders::ALL)
            .border_style(border_style),
    );
    frame.render_widget(filter, chunks[0]);

    if filter_focused {
        frame.set_cursor_position((
            text_cursor_x(chunks[0].x, &snapshot.query),
            chunks[0].y + 1,
        ));
    }

    if let Some(error) = snapshot.action_error.as_deref() {
        let lines = vec![
            Line::from("Error when performing an action."),
            Line::from("Reason given:"),
            Line::from(Span::styled(
                error.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ];
        let block = Paragraph::new(lines)
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(" Error (x to dismiss) ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            );
        frame.render_widget(block, chunks[1]);
    }
}

/// Acknowledgement panel shown until the user accepts the disclaimer.
pub fn render_disclaimer(frame: &mut Frame, area: Rect, can_modify: bool) {
    let mut lines = vec![Line::from(DISCLAIMER_TEXT)];
    if can_modify {
        lines.push(Line::from(Span::styled(
            "Press D to acknowledge and enable the toggles.",
            Style::default().fg(Color::Yellow),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "This server does not allow modifying plugins.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let panel = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(" Disclaimer ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(panel, area);
}
