//! Flows view rendering.
//!
//! Agent and monitor timelines side by side, most recent first.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use super::projection::{flow_timeline, TimelineItem};
use super::theme::Theme;
use crate::app::App;
use crate::data::Pipeline;

/// Render the flows view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let panes = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    for (pipeline, pane) in Pipeline::ALL.into_iter().zip(panes.iter()) {
        let items = flow_timeline(app.store.flows(pipeline));
        let focused = app.focus == pipeline;
        let title = format!(" {} flows ({}) ", pipeline.label(), items.len());
        render_timeline(
            frame,
            &app.theme,
            *pane,
            &title,
            &items,
            focused.then_some(app.selected_index),
        );
    }
}

/// Paint a timeline as a table. `selected` is `None` for unfocused panes.
pub(super) fn render_timeline(
    frame: &mut Frame,
    theme: &Theme,
    area: Rect,
    title: &str,
    items: &[TimelineItem],
    selected: Option<usize>,
) {
    let border = if selected.is_some() {
        theme.highlight
    } else {
        theme.border
    };
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(border));

    if items.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Nothing loaded",
                Style::default().add_modifier(Modifier::DIM),
            )),
        ])
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from(""),
        Cell::from("Time"),
        Cell::from("Name"),
        Cell::from("Duration"),
    ])
    .height(1)
    .style(theme.header);

    let rows: Vec<Row> = items
        .iter()
        .map(|item| {
            let class_style = theme.class_style(item.class);
            let title = if item.linked {
                format!("{} ↗", item.title)
            } else {
                item.title.clone()
            };
            Row::new(vec![
                Cell::from(item.class.symbol()).style(class_style),
                Cell::from(item.time.clone()),
                Cell::from(vec![
                    Line::from(title),
                    Line::from(Span::styled(
                        item.subtitle.clone(),
                        Style::default().add_modifier(Modifier::DIM),
                    )),
                ]),
                Cell::from(item.duration.clone()).style(class_style),
            ])
            .height(2)
        })
        .collect();

    let widths = [
        Constraint::Length(2),
        Constraint::Length(9),
        Constraint::Fill(1),
        Constraint::Length(9),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(theme.selected);

    let mut state = TableState::default();
    state.select(selected);
    frame.render_stateful_widget(table, area, &mut state);
}
