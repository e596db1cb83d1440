//! Application state and lifecycle management.
//!
//! `App` lives on the UI thread and owns everything the TUI renders. Blocking
//! work is handed to the [`TaskDispatcher`]; results come back through
//! [`App::tick`], which applies only the latest result per slot.

use crate::core::{
    filter_packages, truncate_chars, ChangelogFetcher, ChangelogSource, Config, DispatchError,
    PackageLister, PackageRecord, SessionDoc, SessionStore, SettingsDoc, SettingsStore,
    TaskDispatcher, TaskResult, TaskSlot,
};
use crate::plugin::{LoadedPlugin, PluginLoader};
use crate::tui::Theme;
use crate::APP_NAME;

/// Text shown in the changelog pane while a fetch is in flight.
pub const LOADING_TEXT: &str = "Loading changelog...";

/// Main application state.
#[derive(Debug)]
pub struct App {
    /// Current search input from the user
    pub input: String,

    /// Cursor position in the input field, in characters
    pub cursor_position: usize,

    /// Packages from the most recent scan
    pub packages: Vec<PackageRecord>,

    /// Indices into `packages` matching the search input
    pub filtered_packages: Vec<usize>,

    /// Currently selected row (in filtered list)
    pub selected: usize,

    /// Package whose changelog is shown or loading
    pub current_package: Option<String>,

    /// Changelog pane contents
    pub changelog_text: String,

    /// Where the shown changelog came from
    pub changelog_source: Option<ChangelogSource>,

    /// Vertical scroll offset of the changelog pane
    pub changelog_scroll: u16,

    /// Status bar text
    pub status_message: String,

    /// Whether the first-run welcome overlay is visible
    pub show_welcome: bool,

    /// Whether the application should quit
    pub should_quit: bool,

    /// Plugins that loaded at startup
    pub plugins: Vec<LoadedPlugin>,

    /// Application configuration
    pub config: Config,

    /// Current color theme
    pub theme: Theme,

    /// Last known window geometry
    pub session: SessionDoc,

    settings: SettingsDoc,
    settings_store: Option<SettingsStore>,
    session_store: Option<SessionStore>,
    lister: PackageLister,
    fetcher: ChangelogFetcher,
    dispatcher: TaskDispatcher<TaskResult>,
}

impl App {
    /// Create a new application instance using the default settings and
    /// session locations.
    pub fn new(config: Config) -> Self {
        let settings_store = Config::settings_path().map(SettingsStore::new);
        let session_store = Config::session_path().map(SessionStore::new);
        Self::with_stores(config, settings_store, session_store)
    }

    /// Create an application bound to explicit stores (`None` disables
    /// persistence for that document).
    pub fn with_stores(
        config: Config,
        settings_store: Option<SettingsStore>,
        session_store: Option<SessionStore>,
    ) -> Self {
        let settings = settings_store.as_ref().map(SettingsStore::load).unwrap_or_default();
        let session = session_store.as_ref().map(SessionStore::load).unwrap_or_default();

        let dispatcher = TaskDispatcher::new(
            config.workers.effective_threads(),
            config.workers.queue_capacity,
        );

        Self {
            input: String::new(),
            cursor_position: 0,
            packages: Vec::new(),
            filtered_packages: Vec::new(),
            selected: 0,
            current_package: None,
            changelog_text: String::new(),
            changelog_source: None,
            changelog_scroll: 0,
            status_message: "Ready".to_string(),
            show_welcome: !settings.welcome_shown,
            should_quit: false,
            plugins: Vec::new(),
            theme: Theme::from_config(&config.ui.theme),
            lister: PackageLister::new(&config.tools),
            fetcher: ChangelogFetcher::new(&config),
            config,
            session,
            settings,
            settings_store,
            session_store,
            dispatcher,
        }
    }

    /// Create an application for tests: no persistence, no external tools.
    #[cfg(test)]
    pub fn new_test() -> Self {
        let mut config = Config::default();
        config.tools.query_program = "true".to_string();
        config.tools.query_args = Vec::new();
        config.workers.threads = 1;
        Self::with_stores(config, None, None)
    }

    /// Load plugins and start the initial package scan.
    pub fn initialize(&mut self) {
        self.plugins = PluginLoader::new(&self.config.plugins).load_plugins(APP_NAME);
        if !self.plugins.is_empty() {
            tracing::info!(count = self.plugins.len(), "Plugins loaded");
        }
        self.start_scan();
    }

    /// Start scanning installed packages in the background.
    pub fn start_scan(&mut self) {
        let lister = self.lister.clone();
        match self.dispatcher.submit(TaskSlot::Scan, move |token| {
            TaskResult::Packages(lister.list_installed_cancellable(token))
        }) {
            Ok(_) => self.set_status("Scanning installed packages..."),
            Err(e) => self.report_dispatch_error(&e),
        }
    }

    /// Fetch the changelog of the selected package in the background.
    pub fn open_selected(&mut self) {
        let Some(name) = self.selected_package().map(|p| p.name.clone()) else {
            return;
        };

        let fetcher = self.fetcher.clone();
        let package = name.clone();
        let submitted = self.dispatcher.submit(TaskSlot::Changelog, move |token| {
            let changelog = fetcher.fetch_changelog_cancellable(&package, token);
            TaskResult::Changelog { package, changelog }
        });

        match submitted {
            Ok(_) => {
                self.current_package = Some(name);
                self.changelog_text = LOADING_TEXT.to_string();
                self.changelog_source = None;
                self.changelog_scroll = 0;
            }
            Err(e) => self.report_dispatch_error(&e),
        }
    }

    /// Apply finished background work (called on every tick).
    pub fn tick(&mut self) {
        for completion in self.dispatcher.poll() {
            self.apply_result(completion.result);
        }
    }

    fn apply_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::Packages(packages) => {
                self.packages = packages;
                self.update_filtered_packages();
            }
            TaskResult::Changelog { package, changelog } => {
                if self.current_package.as_deref() != Some(package.as_str()) {
                    tracing::debug!(package = %package, "Ignoring changelog for another package");
                    return;
                }
                let max = self.config.changelog.max_display_chars;
                self.changelog_text = truncate_chars(&changelog.text, max).to_string();
                self.changelog_source = Some(changelog.source);
                self.changelog_scroll = 0;
            }
        }
    }

    fn report_dispatch_error(&mut self, error: &DispatchError) {
        tracing::warn!(error = %error, "Could not start background task");
        self.set_status(match error {
            DispatchError::QueueFull => "Busy, try again in a moment",
            DispatchError::Closed => "Background workers stopped",
        });
    }

    /// Whether a scan is still running.
    pub fn is_scanning(&self) -> bool {
        self.dispatcher.is_pending(TaskSlot::Scan)
    }

    /// Whether a changelog fetch is still running.
    pub fn is_loading_changelog(&self) -> bool {
        self.dispatcher.is_pending(TaskSlot::Changelog)
    }

    /// Recompute the filtered list from the search input and report the
    /// number of displayed rows.
    pub fn update_filtered_packages(&mut self) {
        self.filtered_packages = filter_packages(&self.packages, &self.input, self.config.ui.max_rows);
        self.set_status(format!("{} packages", self.filtered_packages.len()));

        if self.selected >= self.filtered_packages.len() {
            self.selected = self.filtered_packages.len().saturating_sub(1);
        }
    }

    /// Get the package at the current selection.
    pub fn selected_package(&self) -> Option<&PackageRecord> {
        self.filtered_packages.get(self.selected).and_then(|&idx| self.packages.get(idx))
    }

    /// Handle a character input (typing in search field).
    pub fn enter_char(&mut self, c: char) {
        let byte_idx = self.byte_index();
        self.input.insert(byte_idx, c);
        self.cursor_position += 1;
        self.update_filtered_packages();
    }

    /// Delete the character before the cursor (backspace).
    pub fn delete_char(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            let byte_idx = self.byte_index();
            self.input.remove(byte_idx);
            self.update_filtered_packages();
        }
    }

    /// Move cursor left.
    pub fn move_cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    /// Move cursor right.
    pub fn move_cursor_right(&mut self) {
        if self.cursor_position < self.input.chars().count() {
            self.cursor_position += 1;
        }
    }

    /// Clear the current input.
    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_position = 0;
        self.update_filtered_packages();
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor_position)
            .map_or(self.input.len(), |(idx, _)| idx)
    }

    /// Move selection up in the package list.
    pub fn select_previous(&mut self) {
        if !self.filtered_packages.is_empty() {
            self.selected = self.selected.saturating_sub(1);
        }
    }

    /// Move selection down in the package list.
    pub fn select_next(&mut self) {
        if !self.filtered_packages.is_empty() {
            self.selected = (self.selected + 1).min(self.filtered_packages.len() - 1);
        }
    }

    /// Scroll the changelog pane.
    pub fn scroll_changelog(&mut self, delta: i32) {
        let max = u16::try_from(self.changelog_text.lines().count()).unwrap_or(u16::MAX);
        let next = i32::from(self.changelog_scroll).saturating_add(delta).clamp(0, i32::from(max));
        self.changelog_scroll = u16::try_from(next).unwrap_or(0);
    }

    /// Dismiss the welcome overlay and remember that it was shown.
    pub fn dismiss_welcome(&mut self) {
        self.show_welcome = false;
        if self.settings.welcome_shown {
            return;
        }

        self.settings.welcome_shown = true;
        if let Some(ref store) = self.settings_store {
            if let Err(e) = store.save(&self.settings) {
                tracing::warn!(error = %e, "Failed to save settings");
            }
        }
    }

    /// Record the current window size for the session document.
    pub fn record_geometry(&mut self, width: u16, height: u16) {
        self.session.width = u32::from(width);
        self.session.height = u32::from(height);
    }

    /// Persist the session document.
    pub fn save_session(&self) {
        if let Some(ref store) = self.session_store {
            if let Err(e) = store.save(&self.session) {
                tracing::warn!(error = %e, "Failed to save session");
            }
        }
    }

    /// Set the status bar text.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    /// Request the application to quit.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::thread;
    use std::time::{Duration, Instant};

    use tempfile::TempDir;

    use super::*;
    use crate::core::NO_CHANGELOG;

    fn test_config(doc_root: &Path, query_script: &str) -> Config {
        let mut config = Config::default();
        config.tools.query_program = "sh".to_string();
        config.tools.query_args = vec!["-c".to_string(), query_script.to_string()];
        config.tools.changelog_uri_program = "true".to_string();
        config.tools.changelog_uri_args = Vec::new();
        config.changelog.doc_root = doc_root.to_path_buf();
        config.workers.threads = 2;
        config
    }

    fn app_in(temp: &TempDir, query_script: &str) -> App {
        let config = test_config(temp.path(), query_script);
        App::with_stores(
            config,
            Some(SettingsStore::new(temp.path().join("cfg/settings.json"))),
            Some(SessionStore::new(temp.path().join("cfg/session.json"))),
        )
    }

    fn tick_until(app: &mut App, mut done: impl FnMut(&App) -> bool) {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(5) {
            app.tick();
            if done(app) {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_scan_populates_packages() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp, "printf 'bash\\t5.2\\tshell\\ncurl\\t8.5\\n'");

        app.start_scan();
        tick_until(&mut app, |a| !a.packages.is_empty());

        assert_eq!(app.packages.len(), 2);
        assert_eq!(app.filtered_packages, vec![0, 1]);
        assert_eq!(app.status_message, "2 packages");
        assert!(!app.is_scanning());
    }

    #[test]
    fn test_search_filters_list() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp, "true");
        app.packages = vec![
            PackageRecord::new("bash", "5.2", ""),
            PackageRecord::new("curl", "8.5", ""),
        ];
        app.update_filtered_packages();

        app.enter_char('C');
        assert_eq!(app.filtered_packages, vec![1]);
        assert_eq!(app.selected_package().unwrap().name, "curl");
        assert_eq!(app.status_message, "1 packages");

        app.delete_char();
        assert_eq!(app.filtered_packages, vec![0, 1]);
        assert_eq!(app.status_message, "2 packages");
    }

    #[test]
    fn test_status_reports_displayed_rows() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp, "true");
        app.config.ui.max_rows = 2;
        app.packages = (0..5).map(|i| PackageRecord::new(format!("lib{i}"), "1", "")).collect();

        app.update_filtered_packages();
        assert_eq!(app.status_message, "2 packages");

        app.enter_char('4');
        assert_eq!(app.status_message, "1 packages");
    }

    #[test]
    fn test_drop_with_slow_fetch_returns_promptly() {
        let temp = TempDir::new().unwrap();
        let mut config = test_config(temp.path(), "true");
        config.tools.changelog_uri_program = "sh".to_string();
        config.tools.changelog_uri_args = vec!["-c".to_string(), "sleep 4".to_string()];
        let mut app = App::with_stores(config, None, None);
        app.packages = vec![PackageRecord::new("slow", "1", "")];
        app.update_filtered_packages();

        app.open_selected();
        thread::sleep(Duration::from_millis(100));

        let start = Instant::now();
        drop(app);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_unicode_input_editing() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp, "true");
        app.enter_char('å');
        app.enter_char('b');
        app.move_cursor_left();
        app.enter_char('ä');
        assert_eq!(app.input, "åäb");
        app.delete_char();
        assert_eq!(app.input, "åb");
        app.clear_input();
        assert!(app.input.is_empty());
        assert_eq!(app.cursor_position, 0);
    }

    #[test]
    fn test_open_selected_shows_placeholder() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp, "true");
        app.packages = vec![PackageRecord::new("nothing-here", "1", "")];
        app.update_filtered_packages();

        app.open_selected();
        assert_eq!(app.changelog_text, LOADING_TEXT);
        assert_eq!(app.current_package.as_deref(), Some("nothing-here"));

        tick_until(&mut app, |a| a.changelog_text != LOADING_TEXT);
        assert_eq!(app.changelog_text, NO_CHANGELOG);
        assert_eq!(app.changelog_source, Some(ChangelogSource::Unavailable));
    }

    #[test]
    fn test_changelog_for_other_package_ignored() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp, "true");
        app.current_package = Some("vim".to_string());
        app.changelog_text = LOADING_TEXT.to_string();

        app.apply_result(TaskResult::Changelog {
            package: "emacs".to_string(),
            changelog: crate::core::Changelog::unavailable(),
        });
        assert_eq!(app.changelog_text, LOADING_TEXT);
    }

    #[test]
    fn test_changelog_truncated_for_display() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp, "true");
        app.config.changelog.max_display_chars = 10;
        app.current_package = Some("big".to_string());

        app.apply_result(TaskResult::Changelog {
            package: "big".to_string(),
            changelog: crate::core::Changelog {
                text: "0123456789abcdef".to_string(),
                source: ChangelogSource::Remote,
            },
        });
        assert_eq!(app.changelog_text, "0123456789");
    }

    #[test]
    fn test_welcome_dismissal_persists() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp, "true");
        assert!(app.show_welcome);

        app.dismiss_welcome();
        assert!(!app.show_welcome);

        let reopened = app_in(&temp, "true");
        assert!(!reopened.show_welcome);
    }

    #[test]
    fn test_session_round_trip() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp, "true");
        app.record_geometry(132, 43);
        app.save_session();

        let reopened = app_in(&temp, "true");
        assert_eq!(reopened.session.width, 132);
        assert_eq!(reopened.session.height, 43);
    }

    #[test]
    fn test_selection_bounds() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp, "true");
        app.select_next();
        assert_eq!(app.selected, 0);

        app.packages = vec![PackageRecord::new("a", "1", ""), PackageRecord::new("b", "1", "")];
        app.update_filtered_packages();
        app.select_next();
        app.select_next();
        assert_eq!(app.selected, 1);
        app.select_previous();
        app.select_previous();
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_scroll_clamps() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp, "true");
        app.changelog_text = "a\nb\nc".to_string();
        app.scroll_changelog(-5);
        assert_eq!(app.changelog_scroll, 0);
        app.scroll_changelog(10);
        assert_eq!(app.changelog_scroll, 3);
    }
}
