//! New-order banner component.

use std::time::Instant;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

use crate::coordinator::Banner;

/// Height the banner needs when shown.
pub const HEIGHT: u16 = 4;

/// Renders the banner with a countdown bar.
pub fn render(frame: &mut Frame, area: Rect, banner: &Banner, pending: usize) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green))
        .title(" New Order ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let mut spans = vec![
        Span::styled(
            format!(" #{} ", banner.order_number),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(banner.kind.label(), Style::default().fg(Color::Cyan)),
    ];
    if let Some(ref name) = banner.customer_name {
        spans.push(Span::raw(format!("  {name}")));
    }
    if let Some(total) = banner.total {
        spans.push(Span::styled(
            format!("  ${total:.2}"),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    }
    if pending > 1 {
        spans.push(Span::styled(
            format!("  (+{} more)", pending - 1),
            Style::default().fg(Color::DarkGray),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), rows[0]);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
        .ratio(banner.remaining_ratio(Instant::now()))
        .label("");
    frame.render_widget(gauge, rows[1]);
}
