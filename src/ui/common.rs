//! Common UI components shared across views.
//!
//! This module contains the header bar, status card, status bar, and help
//! overlay.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::Status;

/// Render the header bar.
///
/// Displays: overall status dot, reading count, source description.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let status = app.status();
    let line = Line::from(vec![
        Span::styled(" ● ", app.theme.status_style(status)),
        Span::styled("DISTWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(
            format!("{}", app.window.len()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("/{} readings │ ", app.window.capacity())),
        Span::raw(app.source_description().to_string()),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status card for the latest reading.
///
/// Shows distance, status label, alert flag, device and timestamp, colored
/// by the status palette.
pub fn render_status_card(frame: &mut Frame, app: &App, area: Rect) {
    let status = app.status();
    let palette = status.palette();
    let card = Style::default()
        .fg(app.theme.color(palette.text))
        .bg(app.theme.color(palette.primary));
    let badge = Style::default()
        .fg(app.theme.color(palette.text))
        .bg(app.theme.color(palette.badge))
        .add_modifier(Modifier::BOLD);

    let block = Block::default()
        .title(" Latest Reading ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let lines = match app.window.latest() {
        Some(latest) => vec![
            Line::from(vec![
                Span::styled(
                    format!(" {:.1} cm ", latest.distance_cm()),
                    card.add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::styled(format!(" {} ", status.label()), badge),
                if latest.sensor_reading.alert {
                    Span::styled(" ALERT ", app.theme.status_style(Status::Alert))
                } else {
                    Span::raw("")
                },
            ]),
            Line::from(format!(
                " device {} │ {}",
                latest.device_id,
                latest.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            )),
        ],
        None => vec![
            Line::from(Span::styled(format!(" {} ", status.label()), badge)),
            Line::from(Span::styled(
                " No readings yet",
                Style::default().add_modifier(Modifier::DIM),
            )),
        ],
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Render the status bar at the bottom.
///
/// Shows: connection state, render count, available controls.
/// Also displays temporary status messages and errors.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    // Check for temporary status message first
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let status = if let Some(ref err) = app.load_error {
        format!(" Error: {} | r:reconnect q:quit", err)
    } else if app.loading {
        " Loading... | q:quit".to_string()
    } else {
        format!(
            " {} | {} renders | ↑↓:select e:export r:reconnect ?:help q:quit",
            app.connection_label(),
            app.render_count,
        )
    };

    let style = if app.load_error.is_some() {
        app.theme.status_style(Status::Alert)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    frame.render_widget(Paragraph::new(status).style(style), area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Readings",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  ↑/↓ j/k     Navigate list"),
        Line::from("  PgUp/PgDn   Jump 10 items"),
        Line::from("  Home/End    Jump to newest/oldest"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " General",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  r         Reconnect live feed"),
        Line::from("  e         Export chart to SVG"),
        Line::from("  q         Quit"),
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

    let paragraph = Paragraph::new(help_text).block(block);

    let [help_area] = Layout::horizontal([Constraint::Length(42)])
        .flex(ratatui::layout::Flex::Center)
        .areas(area);
    let [help_area] = Layout::vertical([Constraint::Length(17)])
        .flex(ratatui::layout::Flex::Center)
        .areas(help_area);

    // Clear the area behind the help
    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
