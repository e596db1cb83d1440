//! UI rendering for the TUI.
//!
//! Handles layout and widget rendering using ratatui.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap},
    Frame,
};

use crate::app::LOADING_TEXT;
use crate::core::NO_CHANGELOG;
use crate::App;

const KEY_HINTS: &str = "Enter open • PgUp/PgDn scroll • Ctrl+R rescan • Esc quit";

/// Draw the main UI.
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with search
            Constraint::Min(5),    // Package list + changelog
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(38), Constraint::Percentage(62)])
        .split(chunks[1]);

    draw_header(frame, app, chunks[0]);
    draw_package_list(frame, app, content_chunks[0]);
    draw_changelog(frame, app, content_chunks[1]);
    draw_status_bar(frame, app, chunks[2]);

    if app.show_welcome {
        draw_welcome_overlay(frame, app);
    }
}

/// Draw the header with search input.
fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    let count = if app.filtered_packages.len() == app.packages.len() {
        format!("{} packages ", app.packages.len())
    } else {
        format!("{}/{} packages ", app.filtered_packages.len(), app.packages.len())
    };

    let prompt = " Search: ";
    let input = Paragraph::new(Line::from(vec![
        Span::styled(prompt, Style::default().fg(theme.secondary)),
        Span::styled(&app.input, Style::default().fg(theme.text)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.primary))
            .title(" apt changelog viewer ")
            .title_style(Style::default().fg(theme.primary).add_modifier(Modifier::BOLD))
            .title_bottom(Line::from(count).right_aligned()),
    );

    frame.render_widget(input, area);

    if !app.show_welcome {
        let offset = u16::try_from(prompt.len() + app.cursor_position).unwrap_or(u16::MAX);
        frame.set_cursor_position((area.x.saturating_add(1).saturating_add(offset), area.y + 1));
    }
}

/// Draw the package list.
fn draw_package_list(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    let items: Vec<ListItem> = app
        .filtered_packages
        .iter()
        .filter_map(|&idx| app.packages.get(idx))
        .map(|pkg| {
            ListItem::new(Line::from(vec![
                Span::styled(&pkg.name, Style::default().fg(theme.text)),
                Span::raw(" "),
                Span::styled(&pkg.version, Style::default().fg(theme.text_dim)),
            ]))
        })
        .collect();

    let title = if app.is_scanning() { " Packages (scanning) " } else { " Packages " };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border))
                .title(title),
        )
        .highlight_style(
            Style::default().fg(theme.primary).bg(theme.selected_bg).add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let selected = (!app.filtered_packages.is_empty()).then_some(app.selected);
    let mut list_state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, area, &mut list_state);
}

/// Draw the changelog pane.
fn draw_changelog(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    let title = match (&app.current_package, app.changelog_source) {
        (Some(name), _) if app.is_loading_changelog() => format!(" {name} (loading) "),
        (Some(name), Some(source)) => format!(" {name} ({source}) "),
        (Some(name), None) => format!(" {name} "),
        (None, _) => " Changelog ".to_string(),
    };

    let text_style = if app.changelog_text == NO_CHANGELOG || app.changelog_text == LOADING_TEXT {
        Style::default().fg(theme.warning)
    } else {
        Style::default().fg(theme.text)
    };

    let body = if app.current_package.is_none() {
        Paragraph::new("Select a package and press Enter.").style(Style::default().fg(theme.text_dim))
    } else {
        Paragraph::new(app.changelog_text.as_str()).style(text_style)
    };

    let pane = body
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border))
                .title(title)
                .title_style(Style::default().fg(theme.secondary)),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.changelog_scroll, 0));

    frame.render_widget(pane, area);
}

/// Draw the status bar.
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    let mut spans = vec![Span::styled(
        format!(" {}", app.status_message),
        Style::default().fg(theme.text),
    )];
    if !app.plugins.is_empty() {
        spans.push(Span::styled(
            format!(" │ {} plugins", app.plugins.len()),
            Style::default().fg(theme.text_dim),
        ));
    }

    let used = Line::from(spans.clone()).width();
    let padding = usize::from(area.width).saturating_sub(used + KEY_HINTS.len() + 1).max(1);
    spans.push(Span::raw(" ".repeat(padding)));
    spans.push(Span::styled(KEY_HINTS, Style::default().fg(theme.text_dim)));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Draw the first-run welcome overlay.
fn draw_welcome_overlay(frame: &mut Frame, app: &App) {
    let theme = &app.theme;
    let area = frame.area();

    let width = 56.min(area.width.saturating_sub(4));
    let height = 10.min(area.height);
    let dialog_area = Rect::new(
        area.width.saturating_sub(width) / 2,
        area.height.saturating_sub(height) / 2,
        width,
        height,
    );

    let content = vec![
        Line::from(Span::styled(
            "Welcome!",
            Style::default().fg(theme.primary).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Type to filter installed packages."),
        Line::from("Press Enter to read a package's changelog."),
        Line::from(""),
        Line::from(Span::styled("Press Esc to continue", Style::default().fg(theme.text_dim))),
    ];

    let dialog = Paragraph::new(content).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.primary))
            .padding(Padding::vertical(1)),
    );

    frame.render_widget(Clear, dialog_area);
    frame.render_widget(dialog, dialog_area);
}

#[cfg(test)]
mod tests {
    use ratatui::{backend::TestBackend, Terminal};

    use super::*;
    use crate::core::{ChangelogSource, PackageRecord};

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_renders_packages_and_changelog() {
        let mut app = App::new_test();
        app.show_welcome = false;
        app.packages = vec![PackageRecord::new("coreutils", "9.4-3", "")];
        app.update_filtered_packages();
        app.current_package = Some("coreutils".to_string());
        app.changelog_text = "coreutils (9.4-3) unstable".to_string();
        app.changelog_source = Some(ChangelogSource::Local);

        let screen = render(&app);
        assert!(screen.contains("coreutils"));
        assert!(screen.contains("9.4-3"));
        assert!(screen.contains("(local)"));
    }

    #[test]
    fn test_welcome_overlay_shown() {
        let mut app = App::new_test();
        app.show_welcome = true;
        assert!(render(&app).contains("Welcome!"));

        app.show_welcome = false;
        assert!(!render(&app).contains("Welcome!"));
    }
}
