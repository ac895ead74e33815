//! Online orders panel layout and rendering.

use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::coordinator::{OnlineStats, active_orders, elapsed_label};
use crate::models::OrderStatus;
use crate::tui::app::App;

/// Renders the online orders panel into `area`.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    render_stats(frame, layout[0], &OnlineStats::from_orders(&app.collection.orders));
    render_orders(frame, layout[1], app);
}

fn render_stats(frame: &mut Frame, area: Rect, stats: &OnlineStats) {
    let stat = |label: &str, value: usize, color: Color| {
        vec![
            Span::raw(format!(" {label}: ")),
            Span::styled(
                value.to_string(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
        ]
    };

    let mut spans = Vec::new();
    spans.extend(stat("Total", stats.total, Color::White));
    spans.extend(stat("New", stats.awaiting(), Color::Yellow));
    spans.extend(stat("Preparing", stats.preparing, Color::Blue));
    spans.extend(stat("Ready", stats.ready, Color::Green));
    spans.extend(stat("Completed", stats.completed, Color::DarkGray));
    spans.push(Span::raw(format!(" Revenue: ${:.2}", stats.revenue)));

    let para = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(" Today "));
    frame.render_widget(para, area);
}

fn status_color(status: OrderStatus) -> Color {
    match status {
        OrderStatus::Pending | OrderStatus::Confirmed => Color::Yellow,
        OrderStatus::Preparing => Color::Blue,
        OrderStatus::Ready => Color::Green,
        _ => Color::DarkGray,
    }
}

fn render_orders(frame: &mut Frame, area: Rect, app: &App) {
    let now = Utc::now();
    let active = active_orders(&app.collection.orders);

    let rows: Vec<Row> = active
        .iter()
        .enumerate()
        .map(|(i, order)| {
            let marker = if app.collection.is_new(&order.id) { "●" } else { " " };
            let style = if i == app.selected {
                Style::default().bg(Color::Rgb(40, 40, 60))
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(marker).style(Style::default().fg(Color::Green)),
                Cell::from(format!("#{}", order.order_number)),
                Cell::from(order.kind.label()),
                Cell::from(order.status.as_str()).style(Style::default().fg(status_color(order.status))),
                Cell::from(order.display_name().to_string()),
                Cell::from(order.delivery_address.clone().unwrap_or_default()),
                Cell::from(format!("${:.2}", order.total)),
                Cell::from(elapsed_label(order.created_at, now)),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(16),
            Constraint::Min(10),
            Constraint::Length(9),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(["", "Order", "Type", "Status", "Customer", "Address", "Total", "Age"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Active ({}) ", active.len())),
    );

    frame.render_widget(table, area);
}
