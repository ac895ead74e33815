//! Order tracking layout and rendering.

use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::coordinator::{StepState, elapsed_label, step_label, timeline};
use crate::models::{Order, OrderStatus};
use crate::tui::app::App;

/// Renders the tracked order into `area`.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let Some(ref order) = app.tracker.order else {
        let text = if app.tracker.loading {
            "Loading order…".to_string()
        } else {
            app.tracker
                .last_error
                .clone()
                .unwrap_or_else(|| "Order not found".to_string())
        };
        let para = Paragraph::new(text).block(Block::default().borders(Borders::ALL));
        frame.render_widget(para, area);
        return;
    };

    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(30)])
        .split(area);

    render_timeline(frame, layout[0], order.status);
    render_details(frame, layout[1], order, app.tracker.finished);
}

fn render_timeline(frame: &mut Frame, area: Rect, status: OrderStatus) {
    let mut lines: Vec<Line> = timeline(status)
        .into_iter()
        .map(|(step, state)| {
            let (mark, style) = match state {
                StepState::Done => ("✔", Style::default().fg(Color::Green)),
                StepState::Current => (
                    "▶",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                StepState::Upcoming => ("·", Style::default().fg(Color::DarkGray)),
            };
            Line::from(Span::styled(format!(" {mark} {}", step_label(step)), style))
        })
        .collect();

    if status == OrderStatus::Cancelled {
        lines.push(Line::from(""));
        lines.push(Line::styled(" ✖ Cancelled", Style::default().fg(Color::Red)));
    }

    let para = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Status "));
    frame.render_widget(para, area);
}

fn render_details(frame: &mut Frame, area: Rect, order: &Order, finished: bool) {
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("#{}", order.order_number),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  {}", order.kind.label())),
            Span::styled(
                format!("  placed {} ago", elapsed_label(order.created_at, Utc::now())),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(""),
    ];

    for item in &order.items {
        lines.push(Line::from(format!(
            "{:>3}× {:<24} ${:.2}",
            item.quantity,
            item.name,
            item.subtotal()
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::styled(
        format!("Total  ${:.2}", order.total),
        Style::default().add_modifier(Modifier::BOLD),
    ));

    if finished {
        lines.push(Line::from(""));
        lines.push(Line::styled("Updates stopped", Style::default().fg(Color::DarkGray)));
    }

    let para = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Order "));
    frame.render_widget(para, area);
}
