//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::{MarkerTier, Rgb, Status};

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Axis lines and tick labels on the chart.
    pub axis: Color,
    /// Style for header rows in tables.
    pub header: Style,
    /// Style for selected/highlighted rows.
    pub selected: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
    /// Use the exact chart colors instead of the terminal palette.
    pub true_color: bool,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            border: Color::Gray,
            axis: Color::DarkGray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
            true_color: true,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            border: Color::DarkGray,
            axis: Color::Gray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
            true_color: false,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Terminal color for a chart color.
    ///
    /// Light themes fall back to the named palette so that the pale chart
    /// tones stay readable.
    pub fn color(&self, rgb: Rgb) -> Color {
        if self.true_color {
            Color::Rgb(rgb.0, rgb.1, rgb.2)
        } else {
            named(rgb)
        }
    }

    /// Get style for a reading status
    pub fn status_style(&self, status: Status) -> Style {
        let base = Style::default().fg(self.color(status.palette().primary));
        match status {
            Status::Alert => base.add_modifier(Modifier::BOLD),
            Status::Unknown => base.add_modifier(Modifier::DIM),
            Status::Safe | Status::Warning => base,
        }
    }

    /// Get style for a chart marker
    pub fn marker_style(&self, tier: MarkerTier) -> Style {
        Style::default().fg(self.color(tier.color()))
    }
}

fn named(rgb: Rgb) -> Color {
    use crate::data::color;

    match rgb {
        c if c == color::RED => Color::Red,
        c if c == color::GREEN => Color::Green,
        c if c == color::YELLOW => Color::Yellow,
        c if c == color::BLUE => Color::Blue,
        c if c == color::SKY => Color::Cyan,
        Rgb(r, g, b) => Color::Rgb(r, g, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::color;

    #[test]
    fn test_light_theme_uses_named_colors() {
        let theme = Theme::light();
        assert_eq!(theme.color(color::RED), Color::Red);
        assert_eq!(theme.color(color::SKY), Color::Cyan);
        assert_eq!(theme.color(color::SLATE_800), Color::Rgb(0x1f, 0x29, 0x37));
    }

    #[test]
    fn test_dark_theme_uses_exact_colors() {
        let theme = Theme::dark();
        assert_eq!(theme.color(color::GREEN), Color::Rgb(0x22, 0xc5, 0x5e));
        assert_eq!(
            theme.marker_style(MarkerTier::Alert).fg,
            Some(Color::Rgb(0xef, 0x44, 0x44))
        );
    }

    #[test]
    fn test_alert_status_is_bold() {
        let theme = Theme::dark();
        assert!(theme
            .status_style(Status::Alert)
            .add_modifier
            .contains(Modifier::BOLD));
        assert!(!theme
            .status_style(Status::Safe)
            .add_modifier
            .contains(Modifier::BOLD));
    }
}
