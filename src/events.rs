use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::app::{App, Detail, View};

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        // View switching
        KeyCode::Tab | KeyCode::BackTab => app.next_view(),
        KeyCode::Char('1') => app.set_view(View::Flows),
        KeyCode::Char('2') => app.set_view(View::Traces),

        // Navigation
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Right | KeyCode::Char('l') => {
            app.switch_focus()
        }
        KeyCode::PageUp => app.select_prev_n(10),
        KeyCode::PageDown => app.select_next_n(10),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),

        // Detail stack
        KeyCode::Enter => app.enter_detail(),
        KeyCode::Char('t') => {
            if app.detail_stack.last() == Some(&Detail::Flow) {
                app.open_linked_trace();
            }
        }
        KeyCode::Esc | KeyCode::Backspace => app.go_back(),

        // Refresh controls
        KeyCode::Char('r') => app.reload(),
        KeyCode::Char('a') => app.toggle_auto_refresh(),
        KeyCode::Char('i') => app.cycle_refresh_interval(),
        KeyCode::Char('f') => app.cycle_trace_filter(),

        KeyCode::Char('c') => app.clear(),
        KeyCode::Char('e') => app.export_state(),
        KeyCode::Char('?') => app.toggle_help(),

        _ => {}
    }
}

/// Handle mouse events
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.select_prev(),
        MouseEventKind::ScrollDown => app.select_next(),

        // Tab clicks (row 1, after header)
        MouseEventKind::Down(MouseButton::Left) if mouse.row == 1 => {
            // Approximate tab positions: Flows (0-10), Traces (11-22)
            if mouse.column < 11 {
                app.set_view(View::Flows);
            } else if mouse.column < 23 {
                app.set_view(View::Traces);
            }
        }

        // Right-click goes back
        MouseEventKind::Down(MouseButton::Right) => app.go_back(),

        _ => {}
    }
}
