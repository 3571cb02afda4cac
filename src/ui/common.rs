//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and help overlay.

use chrono::Utc;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, View};
use crate::data::format::{format_interval, format_time_ago};
use crate::source::Origin;

/// Render the header bar.
///
/// Displays: status indicator, data origin, and the aggregate metrics.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let status_style = app.theme.load_style(app.status);
    let metrics = &app.metrics;

    let origin = match app.origin {
        Some(Origin::Synthetic) => Span::styled(
            "synthetic",
            Style::default().fg(app.theme.warning).add_modifier(Modifier::BOLD),
        ),
        Some(Origin::Live) => Span::styled("live", Style::default().fg(app.theme.neutral)),
        None => Span::styled("-", Style::default().add_modifier(Modifier::DIM)),
    };

    let line = Line::from(vec![
        Span::styled(" ● ", status_style),
        Span::styled("FLOWWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(app.status.label(), status_style),
        Span::raw(" │ "),
        origin,
        Span::raw(" │ "),
        Span::styled(
            metrics.total_flows.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" flows in {} pipelines │ avg ", metrics.active_pipelines)),
        Span::styled(
            metrics.avg_duration_label(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" │ ok "),
        Span::styled(
            metrics.success_rate_label(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" │ "),
        Span::styled(
            metrics.total_traces.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" traces"),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = vec![Line::from(" 1:Flows "), Line::from(" 2:Traces ")];

    let selected = match app.view {
        View::Flows => 0,
        View::Traces => 1,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Shows: breadcrumb trail, time since last update, refresh state, controls.
/// Temporary status messages take the whole bar while they last.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let updated = app
        .store
        .last_updated()
        .map(|t| format!("Updated {}", format_time_ago(t, Utc::now())))
        .unwrap_or_else(|| "No data yet".to_string());

    let refresh = if app.scheduler.is_enabled() {
        format!("auto {}", format_interval(app.scheduler.interval()))
    } else {
        "auto off".to_string()
    };

    let controls = match (app.view, app.detail_stack.is_empty()) {
        (_, false) => "Enter:drill Esc:back ?:help q:quit",
        (View::Flows, true) => "←→:pane Enter:detail r:refresh a:auto i:interval ?:help q:quit",
        (View::Traces, true) => "f:filter Enter:detail r:refresh a:auto ?:help q:quit",
    };

    let status = format!(
        " {} | {} | {} | {}",
        app.breadcrumb(),
        updated,
        refresh,
        controls
    );

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Views"),
        Line::from("  1 / 2 / Tab  Flows / Traces"),
        Line::from("  ←/→ h/l      Switch flow pane"),
        Line::from("  ↑/↓ j/k      Navigate list"),
        Line::from("  PgUp/PgDn    Jump 10 items"),
        Line::from(""),
        section(" Detail"),
        Line::from("  Enter        Open / drill down"),
        Line::from("  t            Open linked trace"),
        Line::from("  Esc          Go back"),
        Line::from(""),
        section(" Refresh"),
        Line::from("  r            Refresh now"),
        Line::from("  a            Toggle auto-refresh"),
        Line::from("  i            Cycle interval"),
        Line::from("  f            Cycle trace filter"),
        Line::from(""),
        section(" General"),
        Line::from("  c            Clear"),
        Line::from("  e            Export to JSON"),
        Line::from("  q            Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let help_height = (help_text.len() as u16 + 2).min(area.height.saturating_sub(2));
    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 42u16.min(area.width.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}

/// Shown instead of the UI when the terminal is below the minimum size.
pub fn render_too_small(frame: &mut Frame, area: Rect) {
    let msg = format!(
        "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
        area.width,
        area.height,
        super::MIN_WIDTH,
        super::MIN_HEIGHT
    );
    let paragraph = Paragraph::new(msg)
        .alignment(Alignment::Center)
        .style(Style::default().fg(ratatui::style::Color::Yellow));
    let y = (area.height / 2).saturating_sub(2);
    let centered = Rect::new(0, y, area.width, 5.min(area.height));
    frame.render_widget(paragraph, centered);
}
