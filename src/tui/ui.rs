//! Main UI rendering coordinator.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::Paragraph,
};

use super::app::{App, Screen};
use super::components::{banner, status_bar};
use super::screens::{kitchen, online, tracker};

/// Renders the entire application UI.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let banner_height = if app.banners.current().is_some() {
        banner::HEIGHT
    } else {
        0
    };

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),             // Status bar
            Constraint::Length(banner_height), // New-order banner
            Constraint::Min(5),                // Screen content
            Constraint::Length(1),             // Keybindings help
        ])
        .split(area);

    status_bar::render(frame, main_layout[0], app);

    if let Some(current) = app.banners.current() {
        banner::render(frame, main_layout[1], current, app.banners.pending());
    }

    match app.screen {
        Screen::Kitchen => kitchen::render(frame, main_layout[2], app),
        Screen::Online => online::render(frame, main_layout[2], app),
        Screen::Tracker => tracker::render(frame, main_layout[2], app),
    }

    render_keybindings(frame, main_layout[3], app);
}

fn render_keybindings(frame: &mut Frame, area: Rect, app: &App) {
    let keys = match app.screen {
        Screen::Kitchen => " j/k select  Enter advance  x cancel  d dismiss  f refresh  r reconnect  q quit",
        Screen::Online => " j/k select  d dismiss  f refresh  r reconnect  q quit",
        Screen::Tracker => " f refresh  q quit",
    };
    let para = Paragraph::new(Line::from(keys)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(para, area);
}
