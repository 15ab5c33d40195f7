//! Panel rendering
//!
//! Layout:
//! - Sessions sidebar (left, optional)
//! - Transcript, with the HTML preview beside it when visible
//! - Staged attachments bar
//! - Notice line
//! - Input bar (bottom)

use ratatui::style::Stylize;
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::api::Role;
use crate::state::NoticeLevel;
use crate::ui::input::render_help;
use crate::ui::state::App;

const SIDEBAR_WIDTH: u16 = 30;

/// Render the whole UI
pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &App) -> std::io::Result<()> {
    terminal.draw(|f| draw(f, app))?;
    Ok(())
}

/// Draw one frame (separate from `render` so tests can use a `TestBackend`)
pub fn draw(f: &mut Frame, app: &App) {
    let columns = if app.show_sidebar {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
            .split(f.area())
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(0), Constraint::Min(20)])
            .split(f.area())
    };
    if app.show_sidebar {
        render_sidebar(f, app, columns[0]);
    }

    // Main column: body + staging + notice + input
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(columns[1]);

    if app.chat.preview().is_visible() {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(rows[0]);
        render_transcript(f, app, body[0]);
        render_preview(f, app, body[1]);
    } else {
        render_transcript(f, app, rows[0]);
    }

    render_staging_bar(f, app, rows[1]);
    render_notice_line(f, app, rows[2]);
    render_input_bar(f, app, rows[3]);

    if app.show_help {
        let area = f.area();
        render_help_overlay(f, area);
    }
}

fn render_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let store = app.chat.sessions();
    let items: Vec<ListItem> = store
        .sessions()
        .iter()
        .enumerate()
        .map(|(i, session)| {
            let active = store.is_active(&session.id);
            let marker = if active { ">" } else { " " };
            let when = session
                .updated_at
                .map(|t| t.format("%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let style = if active {
                Style::default().fg(Color::Green).bold()
            } else {
                Style::default()
            };
            ListItem::new(vec![
                Line::from(Span::styled(
                    format!("{marker}{:>2}. {}", i + 1, session.title),
                    style,
                )),
                Line::from(Span::styled(
                    format!("     {when}"),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let list = if items.is_empty() {
        List::new(vec![ListItem::new(Span::styled(
            "(no sessions)",
            Style::default().fg(Color::DarkGray),
        ))])
    } else {
        List::new(items)
    };
    f.render_widget(
        list.block(Block::default().title(" Sessions ").borders(Borders::ALL)),
        area,
    );
}

fn render_transcript(f: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();

    for msg in app.chat.messages() {
        match msg.role {
            Role::User => {
                let mut header = format!("{}: {}", msg.role.label(), msg.content);
                if let Some(files) = msg.files.as_ref().filter(|f| !f.is_empty()) {
                    header.push_str(&format!("  [{} file(s)]", files.len()));
                }
                lines.push(Line::from(Span::styled(
                    header,
                    Style::default().fg(Color::Cyan),
                )));
            }
            Role::Assistant => {
                let in_flight = app
                    .chat
                    .log()
                    .in_flight_message()
                    .is_some_and(|m| m.id == msg.id);
                if msg.content.is_empty() && in_flight {
                    lines.push(Line::from(Span::styled(
                        "Thinking...",
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                for content_line in msg.content.lines() {
                    lines.push(Line::from(Span::styled(
                        content_line.to_string(),
                        Style::default().fg(Color::Yellow),
                    )));
                }
            }
        }
        lines.push(Line::from(""));
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Type a message to start chatting",
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(Span::styled(
            "Type /help for commands",
            Style::default().fg(Color::DarkGray),
        )));
    }

    // scroll_offset: 0 = bottom/latest, higher = further back
    let visible_lines = (area.height as usize).saturating_sub(2);
    let scroll_start = if lines.len() > visible_lines {
        let max_offset = lines.len() - visible_lines;
        max_offset.saturating_sub(app.chat_scroll_offset().min(max_offset))
    } else {
        0
    };
    let visible: Vec<_> = lines.into_iter().skip(scroll_start).collect();

    let title = match app.chat.sessions().active() {
        Some(session) => format!(" {} ", session.title),
        None => " Chat ".to_string(),
    };
    let paragraph = Paragraph::new(visible)
        .block(Block::default().title(title).borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn render_preview(f: &mut Frame, app: &App, area: Rect) {
    let html = app.chat.preview().html().unwrap_or_default();
    let paragraph = Paragraph::new(html.to_string())
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .title(" HTML Preview (/hide) ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Magenta)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn render_staging_bar(f: &mut Frame, app: &App, area: Rect) {
    let staged = app.chat.staged();
    let line = if staged.is_empty() {
        Line::from(Span::styled(
            " no attachments",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut spans = vec![Span::styled(" attached: ", Style::default().fg(Color::DarkGray))];
        for (i, attachment) in staged.iter().enumerate() {
            spans.push(Span::styled(
                format!("[{}] {} ", i + 1, attachment.filename),
                Style::default().fg(Color::Blue),
            ));
        }
        Line::from(spans)
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_notice_line(f: &mut Frame, app: &App, area: Rect) {
    let Some(notice) = app.chat.latest_notice() else {
        return;
    };
    let color = match notice.level {
        NoticeLevel::Info => Color::Gray,
        NoticeLevel::Warning => Color::Yellow,
        NoticeLevel::Error => Color::Red,
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", notice.at.format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(notice.text.clone(), Style::default().fg(color)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn render_input_bar(f: &mut Frame, app: &App, area: Rect) {
    let (title, border) = if app.chat.can_send() {
        (" Message ", Style::default())
    } else {
        (" Waiting for reply... ", Style::default().fg(Color::DarkGray))
    };
    let paragraph = Paragraph::new(format!("> {}", app.input_buffer)).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border),
    );
    f.render_widget(paragraph, area);
}

fn render_help_overlay(f: &mut Frame, area: Rect) {
    let help = render_help();
    let height = (help.lines().count() as u16 + 2).min(area.height);
    let width = 64.min(area.width);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(help).block(
            Block::default()
                .title(" Help (Esc to close) ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green)),
        ),
        popup,
    );
}
