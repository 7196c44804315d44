//! Readings table.
//!
//! Lists the window newest first with per-row status.

use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::data::{classify, MarkerTier};

/// Render the readings table.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec![
        Cell::from("Time (UTC)"),
        Cell::from("Device"),
        Cell::from("Distance"),
        Cell::from("Status"),
        Cell::from("Alert"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = app
        .window
        .all()
        .map(|m| {
            let distance = m.distance_cm();
            let status = classify(Some(distance));
            Row::new(vec![
                Cell::from(m.created_at.format("%H:%M:%S").to_string()),
                Cell::from(m.device_id.clone()),
                Cell::from(format!("{:.1} cm", distance))
                    .style(app.theme.marker_style(MarkerTier::for_distance(distance))),
                Cell::from(status.label()).style(app.theme.status_style(status)),
                Cell::from(if m.sensor_reading.alert { "yes" } else { "-" }),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(10),
        Constraint::Fill(2),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(5),
    ];

    let count = app.window.len();
    let selected = app.selected_index.min(count.saturating_sub(1));
    let position_info = if count > 0 {
        format!(" [{}/{}]", selected + 1, count)
    } else {
        String::new()
    };
    let title = format!(" Readings{} ", position_info);

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    if count > 0 {
        state.select(Some(selected));
    }

    frame.render_stateful_widget(table, area, &mut state);
}
