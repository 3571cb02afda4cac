//! Terminal UI rendering.
//!
//! [`projection`] derives render models from the store without touching the
//! terminal; the remaining modules paint those models with ratatui.

pub mod common;
pub mod detail;
pub mod flows;
pub mod projection;
pub mod theme;
pub mod traces;

pub use projection::{DetailPanel, StatusClass, TimelineItem};
pub use theme::Theme;

use ratatui::{
    layout::{Constraint, Layout},
    Frame,
};

use crate::app::{App, View};

/// Minimum terminal size for usable display.
pub const MIN_WIDTH: u16 = 60;
pub const MIN_HEIGHT: u16 = 12;

/// Draw the whole screen.
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        common::render_too_small(frame, area);
        return;
    }

    let chunks = Layout::vertical([
        Constraint::Length(1), // Header bar
        Constraint::Length(1), // Tabs
        Constraint::Min(8),    // Content
        Constraint::Length(1), // Status bar
    ])
    .split(area);

    common::render_header(frame, app, chunks[0]);
    common::render_tabs(frame, app, chunks[1]);

    match app.view {
        View::Flows => flows::render(frame, app, chunks[2]),
        View::Traces => traces::render(frame, app, chunks[2]),
    }

    common::render_status_bar(frame, app, chunks[3]);

    if !app.detail_stack.is_empty() {
        detail::render_overlay(frame, app, area);
    }

    if app.show_help {
        common::render_help(frame, app, area);
    }
}
