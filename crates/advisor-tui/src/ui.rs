use ratatui::{
    Frame,
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use advisor_core::ChatRole;
use crate::app::App;

/// Parse a line of text with basic markdown (**bold**) into a styled Line
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("**") else {
            break;
        };
        if end == 0 {
            // "****" has nothing to embolden, keep it literal
            spans.push(Span::raw(rest[..start + 4].to_string()));
            rest = &after_open[2..];
            continue;
        }

        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(
            after_open[..end].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after_open[end + 2..];
    }

    // Push any remaining text
    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let [chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(format!(" L'Oréal Advisor: {} ", app.model));

    let mut lines: Vec<Line<'static>> = Vec::new();
    for (idx, msg) in app.session.messages().iter().enumerate() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(msg.content.clone()));
            }
            ChatRole::Assistant if app.session.is_pending_placeholder(idx) => {
                lines.push(Line::from(Span::styled(
                    "Advisor:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                // Animated ellipsis: cycles through ".", "..", "..."
                let dots = ".".repeat((app.animation_frame as usize) + 1);
                lines.push(Line::from(Span::styled(
                    format!("Thinking{}", dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "Advisor:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
            ChatRole::System => continue,
        }
        lines.push(Line::default());
    }

    let text = Text::from(lines);

    // Measure with the same wrapping the log pane renders with
    let chat_lines = Paragraph::new(text.clone())
        .wrap(Wrap { trim: true })
        .line_count(app.chat_width);
    app.update_chat_lines(u16::try_from(chat_lines).unwrap_or(u16::MAX));

    let chat = Paragraph::new(text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.scroll, 0));
    frame.render_widget(chat, chat_area);

    // Input line is greyed out while a request is in flight
    let enabled = app.input_enabled();
    let (border_color, title) = if enabled {
        (Color::Yellow, " Ask about products or routines (Enter to send) ")
    } else {
        (Color::DarkGray, " Waiting for a reply... ")
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scroll to keep the cursor visible. Inner width excludes borders.
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && app.cursor >= inner_width {
        app.cursor - inner_width + 1
    } else {
        0
    };
    let visible_text: String = app.session.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text_color = if enabled { Color::Cyan } else { Color::DarkGray };
    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(text_color))
        .block(input_block);
    frame.render_widget(input, input_area);

    if enabled {
        let cursor_x = (app.cursor - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(" Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" send  "),
        Span::styled("↑/↓ PgUp/PgDn", Style::default().fg(Color::Yellow)),
        Span::raw(" scroll  "),
        Span::styled("Esc", Style::default().fg(Color::Yellow)),
        Span::raw(" quit"),
    ]))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, footer_area);
}
