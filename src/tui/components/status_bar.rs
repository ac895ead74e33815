//! Status bar component.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::tui::app::{App, Screen, ToastLevel};
use crate::websocket::ConnectionState;

/// Renders the status bar.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let status_color = match app.connection {
        ConnectionState::Open => Color::Green,
        ConnectionState::Connecting | ConnectionState::Reclosed => Color::Yellow,
        ConnectionState::Failed => Color::Red,
        ConnectionState::Closed => Color::DarkGray,
    };

    // The tracker polls only; it has no channel.
    let connection_span = if app.screen == Screen::Tracker {
        Span::styled(" polling ", Style::default().fg(Color::Cyan))
    } else {
        Span::styled(
            format!(" {} ", app.connection.label()),
            Style::default().fg(status_color),
        )
    };

    let toast_span = match app.toast {
        Some(ref toast) => {
            let color = match toast.level {
                ToastLevel::Info => Color::Green,
                ToastLevel::Error => Color::Red,
            };
            Span::styled(format!(" {} ", toast.message), Style::default().fg(color))
        }
        None => Span::raw(""),
    };

    let busy_span = if app.busy {
        Span::styled(" saving… ", Style::default().fg(Color::Yellow))
    } else {
        Span::raw("")
    };

    let subject = format!(" {} · {} ", app.screen.title(), app.subject);

    let line = Line::from(vec![
        connection_span,
        Span::raw("│"),
        Span::styled(subject, Style::default().fg(Color::White)),
        Span::raw("│"),
        busy_span,
        toast_span,
    ]);

    let para = Paragraph::new(line).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(para, area);
}
