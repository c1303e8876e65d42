use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};

use crate::model::{ModelSnapshot, PluginEntry, Token};
use crate::view::table::{Column, SortState};

pub const LOADING_TEXT: &str = "Updating plugin list…";
pub const EMPTY_TEXT: &str = "No entries";

pub fn available_error_text(message: &str) -> String {
    if message.is_empty() {
        "Error querying installed extensions.".to_string()
    } else {
        format!("Error querying installed extensions: {message}")
    }
}

/// Renders the plugin table, or the error/loading panel that replaces it.
pub fn render_available_list(
    frame: &mut Frame,
    area: Rect,
    snapshot: &ModelSnapshot,
    rows: &[&PluginEntry],
    sort: SortState,
    state: &mut TableState,
) {
    let block = Block::default()
        .title(format!(" Plugins ({}/{}) ", rows.len(), snapshot.available.len()))
        .borders(Borders::ALL);

    if let Some(error) = snapshot.available_error.as_deref() {
        let panel = Paragraph::new(available_error_text(error))
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(panel, area);
        return;
    }

    if snapshot.is_loading {
        let panel = Paragraph::new(LOADING_TEXT)
            .style(Style::default().fg(Color::Yellow))
            .block(block);
        frame.render_widget(panel, area);
        return;
    }

    if rows.is_empty() {
        let panel = Paragraph::new(EMPTY_TEXT)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(panel, area);
        return;
    }

    let columns: Vec<Column> = Column::visible().collect();
    let header = Row::new(
        columns
            .iter()
            .map(|column| Cell::from(format!("{}{}", column.label(), sort.indicator(*column)))),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let toggle_style = if snapshot.can_toggle() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let body = rows.iter().map(|entry| {
        Row::new(columns.iter().map(|column| {
            let cell = Cell::from(column.cell(entry));
            if *column == Column::Enabled {
                cell.style(toggle_style)
            } else {
                cell
            }
        }))
    });

    let widths = columns.iter().map(|column| match column {
        Column::Plugin => Constraint::Fill(3),
        Column::Autostart => Constraint::Length(11),
        Column::Enabled => Constraint::Length(12),
        _ => Constraint::Fill(2),
    });

    let table = Table::new(body, widths)
        .header(header)
        .block(block)
        .row_highlight_style(
            Style::default()
                .bg(Color::Rgb(40, 40, 60))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, state);
}

/// Details of the selected entry, including the columns hidden from the table.
pub fn render_detail(frame: &mut Frame, area: Rect, entry: Option<&PluginEntry>) {
    let block = Block::default().title(" Details ").borders(Borders::ALL);

    let Some(entry) = entry else {
        frame.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    let label = Style::default().fg(Color::Magenta);
    let mut lines = vec![
        Line::from(Span::styled(
            entry.id.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("Extension: ", label),
            Span::raw(entry.extension.clone()),
        ]),
        Line::from(vec![
            Span::styled("Autostart: ", label),
            Span::raw(Column::Autostart.cell(entry)),
        ]),
        Line::from(vec![
            Span::styled("Enabled:   ", label),
            Span::raw(if entry.enabled { "yes" } else { "no" }),
            Span::raw(if entry.locked { " (locked)" } else { "" }),
        ]),
        Line::from(vec![
            Span::styled("Provides:  ", label),
            Span::raw(Column::Provides.cell(entry)),
        ]),
        Line::default(),
    ];

    if !entry.description.is_empty() {
        lines.push(Line::from(entry.description.clone()));
        lines.push(Line::default());
    }

    push_tokens(&mut lines, "Depends on", &entry.requires, label);
    push_tokens(&mut lines, "Optional", &entry.optional, label);

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(block);
    frame.render_widget(detail, area);
}

fn push_tokens(lines: &mut Vec<Line<'static>>, title: &str, tokens: &[Token], style: Style) {
    if tokens.is_empty() {
        return;
    }

    lines.push(Line::from(Span::styled(format!("{title}:"), style)));
    lines.extend(
        tokens
            .iter()
            .map(|token| Line::from(format!("  {}", token.name()))),
    );
}
