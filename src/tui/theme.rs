//! Color themes for the TUI.

use ratatui::style::Color;

/// A complete color theme for the TUI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Theme name for display and configuration
    pub name: String,
    /// Accent color (borders of focused panes, selected rows)
    pub primary: Color,
    /// Package versions and the changelog source label
    pub secondary: Color,
    /// Main text color
    pub text: Color,
    /// Dimmed text color (versions, hints)
    pub text_dim: Color,
    /// Selected item background
    pub selected_bg: Color,
    /// Border color
    pub border: Color,
    /// Color of the "no changelog" placeholder
    pub warning: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_theme()
    }
}

impl Theme {
    /// Default theme - works well on both light and dark terminals.
    pub fn default_theme() -> Self {
        Self {
            name: "default".to_string(),
            primary: Color::Rgb(99, 102, 241),    // Indigo
            secondary: Color::Rgb(16, 185, 129),  // Emerald
            text: Color::White,
            text_dim: Color::Rgb(156, 163, 175),  // Gray-400
            selected_bg: Color::Rgb(55, 65, 81),  // Gray-700
            border: Color::Rgb(75, 85, 99),       // Gray-600
            warning: Color::Rgb(234, 179, 8),     // Yellow
        }
    }

    /// Nord theme - arctic, bluish colors.
    pub fn nord() -> Self {
        Self {
            name: "nord".to_string(),
            primary: Color::Rgb(136, 192, 208),   // Nord8
            secondary: Color::Rgb(163, 190, 140), // Nord14
            text: Color::Rgb(236, 239, 244),      // Nord6
            text_dim: Color::Rgb(216, 222, 233),  // Nord5
            selected_bg: Color::Rgb(59, 66, 82),  // Nord1
            border: Color::Rgb(67, 76, 94),       // Nord2
            warning: Color::Rgb(235, 203, 139),   // Nord13
        }
    }

    /// High contrast theme for accessibility.
    pub fn high_contrast() -> Self {
        Self {
            name: "high-contrast".to_string(),
            primary: Color::Cyan,
            secondary: Color::Green,
            text: Color::White,
            text_dim: Color::Gray,
            selected_bg: Color::Blue,
            border: Color::White,
            warning: Color::LightYellow,
        }
    }

    /// Get a theme by name (case-insensitive).
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" => Some(Self::default_theme()),
            "nord" => Some(Self::nord()),
            "high-contrast" | "high_contrast" => Some(Self::high_contrast()),
            _ => None,
        }
    }

    /// Resolve a configured theme name, falling back to the default.
    pub fn from_config(name: &str) -> Self {
        Self::by_name(name).unwrap_or_else(|| {
            tracing::warn!(theme = %name, "Unknown theme, using default");
            Self::default_theme()
        })
    }
}
