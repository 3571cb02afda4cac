//! Detail overlay rendering.
//!
//! Displays a modal overlay for the top of the detail stack: a flow, a
//! trace with its spans, or a single span.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use super::projection::{detail_panel, DetailTable};
use crate::app::{App, Detail};

/// Minimum width required for the detail overlay to render properly.
const MIN_OVERLAY_WIDTH: u16 = 50;
/// Minimum height required for the detail overlay to render properly.
const MIN_OVERLAY_HEIGHT: u16 = 16;

/// Centered overlay covering most of `area`, capped at 110x50.
fn overlay_rect(area: Rect) -> Rect {
    // Percentages in u32 so wide terminals cannot overflow u16
    let width = (u32::from(area.width) * 95 / 100) as u16;
    let height = (u32::from(area.height) * 90 / 100) as u16;
    let width = width.clamp(MIN_OVERLAY_WIDTH, 110);
    let height = height.clamp(MIN_OVERLAY_HEIGHT, 50);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}

/// Render the current detail level as a modal overlay.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    if area.width < MIN_OVERLAY_WIDTH || area.height < MIN_OVERLAY_HEIGHT {
        return;
    }

    let Some(&detail) = app.detail_stack.last() else {
        return;
    };
    let Some(panel) = detail_panel(&app.store, detail) else {
        return;
    };

    let overlay_area = overlay_rect(area);
    frame.render_widget(Clear, overlay_area);

    let field_height = panel.fields.len() as u16 + 3;
    let constraints = if panel.table.is_some() {
        [
            Constraint::Length(field_height),
            Constraint::Min(4),
            Constraint::Length(1),
        ]
    } else {
        [
            Constraint::Min(field_height),
            Constraint::Length(0),
            Constraint::Length(1),
        ]
    };
    let chunks = Layout::vertical(constraints).split(overlay_area);

    // ===== FIELDS =====
    let class_style = app.theme.class_style(panel.class);
    let label_width = panel.fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let mut lines = vec![Line::from(vec![
        Span::styled(format!(" {} ", panel.class.symbol()), class_style),
        Span::styled(panel.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
    ])];
    lines.push(Line::from(""));
    lines.extend(panel.fields.iter().map(|(label, value)| {
        let value_style = if *label == "Status" || *label == "Error" {
            class_style
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::styled(
                format!(" {:<width$}  ", label, width = label_width),
                Style::default().add_modifier(Modifier::DIM),
            ),
            Span::styled(value.clone(), value_style),
        ])
    }));

    let block = Block::default()
        .title(format!(" {} Detail ", detail.label()))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        chunks[0],
    );

    // ===== TABLE =====
    if let Some(table) = &panel.table {
        let selected = (detail == Detail::Trace).then_some(app.span_index);
        render_table(frame, app, table, selected, chunks[1]);
    }

    // ===== FOOTER =====
    let footer = Paragraph::new(Line::from(vec![Span::styled(
        format!(" {} ", panel.hint),
        Style::default().add_modifier(Modifier::DIM),
    )]));
    frame.render_widget(footer, chunks[2]);
}

fn render_table(
    frame: &mut Frame,
    app: &App,
    table: &DetailTable,
    selected: Option<usize>,
    area: Rect,
) {
    let block = Block::default()
        .title(format!(" {} ", table.title))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    if table.rows.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "  None recorded",
            Style::default().add_modifier(Modifier::DIM),
        )))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(table.header.iter().map(|h| Cell::from(*h)))
        .height(1)
        .style(app.theme.header);

    let rows: Vec<Row> = table
        .rows
        .iter()
        .zip(&table.classes)
        .map(|(cells, class)| {
            let style = app.theme.class_style(*class);
            Row::new(cells.iter().map(|c| Cell::from(c.clone()))).style(style)
        })
        .collect();

    // Last column holds durations; the first is an index or a name
    let widths: Vec<Constraint> = (0..table.header.len())
        .map(|i| match i {
            0 if table.header[0] == "#" => Constraint::Length(4),
            i if i + 1 == table.header.len() => Constraint::Length(10),
            _ => Constraint::Fill(1),
        })
        .collect();

    let widget = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(app.theme.selected);

    let mut state = TableState::default();
    state.select(selected);
    frame.render_stateful_widget(widget, area, &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_is_centered_and_capped() {
        let rect = overlay_rect(Rect::new(0, 0, 100, 40));
        assert_eq!(rect, Rect::new(2, 2, 95, 36));

        let rect = overlay_rect(Rect::new(0, 0, 200, 80));
        assert_eq!((rect.width, rect.height), (110, 50));
        assert_eq!((rect.x, rect.y), (45, 15));
    }

    #[test]
    fn test_overlay_on_very_wide_terminal() {
        let rect = overlay_rect(Rect::new(0, 0, 1000, 1000));
        assert_eq!(rect, Rect::new(445, 475, 110, 50));
    }
}
