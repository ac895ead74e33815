//! Kitchen board layout and rendering.

use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use crate::coordinator::{KitchenBoard, Lane, Ticket, elapsed_label, is_urgent};
use crate::models::OrderId;
use crate::tui::app::App;

/// Renders the kitchen board into `area`.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let board = KitchenBoard::from_view(&app.collection);
    let selected = app.selected_order().map(|o| o.id.clone());

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(5)])
        .split(area);

    let summary = Line::from(vec![
        Span::styled(
            format!(" {} active ", board.len()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {} online ", board.online_count),
            Style::default().fg(Color::Cyan),
        ),
        if app.collection.loaded {
            Span::raw("")
        } else {
            Span::styled(" loading… ", Style::default().fg(Color::DarkGray))
        },
    ]);
    frame.render_widget(Paragraph::new(summary), layout[0]);

    let lanes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(layout[1]);

    for (lane, column) in Lane::ALL.iter().zip(lanes.iter()) {
        render_lane(frame, *column, *lane, board.lane(*lane), selected.as_ref());
    }
}

fn lane_color(lane: Lane) -> Color {
    match lane {
        Lane::Incoming => Color::Yellow,
        Lane::Preparing => Color::Blue,
        Lane::Ready => Color::Green,
    }
}

fn render_lane(frame: &mut Frame, area: Rect, lane: Lane, tickets: &[Ticket], selected: Option<&OrderId>) {
    let now = Utc::now();
    let items: Vec<ListItem> = tickets
        .iter()
        .map(|ticket| ticket_item(ticket, selected == Some(&ticket.order.id), now))
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(lane_color(lane)))
        .title(format!(" {} ({}) ", lane.title(), tickets.len()));

    frame.render_widget(List::new(items).block(block), area);
}

fn ticket_item(ticket: &Ticket, is_selected: bool, now: chrono::DateTime<Utc>) -> ListItem<'static> {
    let order = &ticket.order;
    let urgent = is_urgent(order.created_at, now);

    let mut header = vec![Span::styled(
        format!("#{}", order.order_number),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if ticket.is_new {
        header.push(Span::styled(
            " NEW",
            Style::default().fg(Color::Black).bg(Color::Green),
        ));
    }
    if order.kind.is_online() {
        header.push(Span::styled(
            format!(" {}", order.kind.label()),
            Style::default().fg(Color::Cyan),
        ));
    }
    header.push(Span::styled(
        format!(" {}", elapsed_label(order.created_at, now)),
        if urgent {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        },
    ));

    let mut lines = vec![Line::from(header)];
    lines.push(Line::from(format!("  {}", order.display_name())));

    if ticket.is_partial {
        lines.push(Line::styled("  loading items…", Style::default().fg(Color::DarkGray)));
    }
    for item in &order.items {
        lines.push(Line::from(format!("  {}× {}", item.quantity, item.name)));
        if let Some(ref note) = item.note {
            lines.push(Line::styled(format!("     {note}"), Style::default().fg(Color::Yellow)));
        }
    }
    if let Some(ref instructions) = order.special_instructions {
        lines.push(Line::styled(
            format!("  ! {instructions}"),
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(action) = ticket.action() {
        lines.push(Line::styled(format!("  [Enter] {action}"), Style::default().fg(Color::Gray)));
    }
    lines.push(Line::from(""));

    let style = if is_selected {
        Style::default().bg(Color::Rgb(40, 40, 60))
    } else {
        Style::default()
    };
    ListItem::new(lines).style(style)
}
