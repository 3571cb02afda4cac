//! Traces view rendering.

use ratatui::{layout::Rect, Frame};

use super::flows::render_timeline;
use super::projection::{trace_list_title, trace_timeline};
use crate::app::App;

/// Render the trace list with the active filter in the title.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let items = trace_timeline(app.store.traces());
    let title = trace_list_title(
        items.len(),
        app.filter_label(),
        app.trace_limit,
        app.traces_enabled,
    );
    render_timeline(
        frame,
        &app.theme,
        area,
        &title,
        &items,
        Some(app.selected_index),
    );
}
