//! Input handling for the TUI.
//!
//! Processes keyboard events and updates application state.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::App;

/// Rows moved by PageUp/PageDown in the changelog pane.
const PAGE_SIZE: i32 = 10;

/// Handle keyboard events.
pub fn handle_events(key: KeyEvent, app: &mut App) {
    if key.kind == KeyEventKind::Release {
        return;
    }

    if app.show_welcome {
        handle_welcome_mode(key, app);
    } else {
        handle_normal_mode(key, app);
    }
}

/// Handle input while the welcome overlay is visible.
fn handle_welcome_mode(key: KeyEvent, app: &mut App) {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ') => app.dismiss_welcome(),
        _ => {}
    }
}

/// Handle input in normal mode.
fn handle_normal_mode(key: KeyEvent, app: &mut App) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        // Quit
        KeyCode::Esc => app.quit(),
        KeyCode::Char('c') if ctrl => app.quit(),

        // Rescan installed packages
        KeyCode::Char('r') if ctrl => app.start_scan(),

        // Clear search
        KeyCode::Char('u') if ctrl => app.clear_input(),

        // Package list navigation
        KeyCode::Up => app.select_previous(),
        KeyCode::Down => app.select_next(),
        KeyCode::Enter => app.open_selected(),

        // Changelog scrolling
        KeyCode::PageUp => app.scroll_changelog(-PAGE_SIZE),
        KeyCode::PageDown => app.scroll_changelog(PAGE_SIZE),

        // Search input
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Char(c) if !ctrl => app.enter_char(c),

        _ => {}
    }
}
