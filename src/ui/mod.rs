//! Full-screen terminal chat interface.
//!
//! The event loop interleaves three things: draining stream messages from
//! the in-flight exchange, redrawing, and polling for key input. Stream
//! updates are applied synchronously in arrival order, so the transcript
//! only ever moves forward.

use std::error::Error;
use std::io;
use std::path::Path;
use std::time::Duration;

use base64::Engine as _;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};

use crate::core::chat_stream::ChatStreamService;
use crate::core::config::ChatConfig;
use crate::core::message::{Attachment, Message, Role};
use crate::core::session::{ChatSession, SubmitOutcome};

struct ChatUi {
    session: ChatSession,
    stream_service: ChatStreamService,
    input: String,
    pending_attachments: Vec<Attachment>,
    scroll_offset: u16,
    auto_scroll: bool,
}

pub async fn run_chat(config: ChatConfig) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, config).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: ChatConfig,
) -> Result<(), Box<dyn Error>> {
    let (stream_service, mut rx) = ChatStreamService::new();
    let mut app = ChatUi {
        session: ChatSession::new(config),
        stream_service,
        input: String::new(),
        pending_attachments: Vec::new(),
        scroll_offset: 0,
        auto_scroll: true,
    };

    loop {
        // Apply any stream progress before drawing.
        while let Ok(message) = rx.try_recv() {
            app.session.on_stream_message(message);
        }

        terminal.draw(|frame| draw(frame, &mut app))?;

        if !event::poll(Duration::from_millis(16))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
            KeyCode::Esc => app.session.clear_error(),
            KeyCode::Enter => app.handle_submit(),
            KeyCode::Backspace => {
                app.input.pop();
            }
            KeyCode::Up => {
                app.auto_scroll = false;
                app.scroll_offset = app.scroll_offset.saturating_sub(1);
            }
            KeyCode::Down => {
                app.scroll_offset = app.scroll_offset.saturating_add(1);
            }
            KeyCode::Char(ch) => app.input.push(ch),
            _ => {}
        }
    }

    Ok(())
}

impl ChatUi {
    fn handle_submit(&mut self) {
        let input = self.input.trim().to_string();
        if input.is_empty() || self.session.is_loading() {
            return;
        }
        self.input.clear();

        if let Some(path) = input.strip_prefix("/attach ") {
            self.handle_attach(path.trim());
            return;
        }

        let attachments = std::mem::take(&mut self.pending_attachments);
        match self.session.submit(input, attachments) {
            SubmitOutcome::Started(params) => {
                self.auto_scroll = true;
                self.stream_service.spawn_stream(params);
            }
            SubmitOutcome::ConfigurationRequired | SubmitOutcome::Busy => {}
        }
    }

    fn handle_attach(&mut self, path: &str) {
        if !self.session.config().enable_vision {
            self.session
                .set_error("Vision is disabled; enable it with `trickle set vision on`");
            return;
        }
        match stage_attachment(path) {
            Ok(attachment) => {
                self.pending_attachments.push(attachment);
                self.session.clear_error();
            }
            Err(err) => self.session.set_error(err),
        }
    }
}

/// Read an image file and wrap it as a `data:` URL attachment.
fn stage_attachment(path: &str) -> Result<Attachment, String> {
    let mime = match Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => return Err(format!("Not an image file: {path}")),
    };

    let bytes = std::fs::read(path).map_err(|err| format!("Cannot read {path}: {err}"))?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(Attachment::image(format!("data:{mime};base64,{encoded}")))
}

fn draw(frame: &mut Frame, app: &mut ChatUi) {
    let has_error = app.session.error().is_some();
    let constraints = if has_error {
        vec![
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(3),
        ]
    } else {
        vec![Constraint::Min(1), Constraint::Length(3)]
    };
    let areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    let lines = build_display_lines(app.session.conversation().messages());
    let available_height = areas[0].height.saturating_sub(2);
    let max_scroll = (lines.len() as u16).saturating_sub(available_height);
    if app.auto_scroll {
        app.scroll_offset = max_scroll;
    } else {
        app.scroll_offset = app.scroll_offset.min(max_scroll);
    }

    let title = if app.session.is_loading() {
        "trickle — streaming…"
    } else {
        "trickle"
    };
    let messages = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset, 0));
    frame.render_widget(messages, areas[0]);

    if let Some(error) = app.session.error() {
        let banner = Paragraph::new(Span::styled(
            error,
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Error — Esc to dismiss"),
        );
        frame.render_widget(banner, areas[1]);
    }

    let input_title = if app.pending_attachments.is_empty() {
        "Message".to_string()
    } else {
        format!("Message ({} image(s) attached)", app.pending_attachments.len())
    };
    let input = Paragraph::new(app.input.as_str())
        .block(Block::default().borders(Borders::ALL).title(input_title));
    let input_area = areas[areas.len() - 1];
    frame.render_widget(input, input_area);
    frame.set_cursor_position((
        input_area.x + app.input.chars().count() as u16 + 1,
        input_area.y + 1,
    ));
}

fn build_display_lines(messages: &[Message]) -> Vec<Line<'_>> {
    let mut lines = Vec::new();

    for msg in messages {
        match msg.role {
            Role::User => {
                let mut spans = vec![
                    Span::styled(
                        "You: ",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(msg.content.as_str(), Style::default().fg(Color::Cyan)),
                ];
                if let Some(attachments) = &msg.attachments {
                    spans.push(Span::styled(
                        format!(" [{} image(s)]", attachments.len()),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                lines.push(Line::from(spans));
                lines.push(Line::from(""));
            }
            Role::System => {
                lines.push(Line::from(Span::styled(
                    msg.content.as_str(),
                    Style::default().fg(Color::DarkGray),
                )));
                lines.push(Line::from(""));
            }
            Role::Assistant => {
                for content_line in msg.content.lines() {
                    lines.push(Line::from(Span::styled(
                        content_line,
                        Style::default().fg(Color::White),
                    )));
                }
                lines.push(Line::from(""));
            }
        }
    }

    lines
}
