use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use skyway_core::ChatRole;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use crate::app::App;

const PRIMARY: Color = Color::Rgb(0x3b, 0x82, 0xf6);
const SECONDARY: Color = Color::Rgb(0x1e, 0x40, 0xaf);

const BRAND: &str = "SkyWay Travel";
const TAGLINE: &str = "AI-Powered Travel Assistant";
const HERO_TITLE: &str = "Your Journey Starts Here";
const HERO_TEXT: &str = "Chat with our AI assistant to find and book the perfect flights, hotels, and rental cars for your trip.";
const CHAT_TITLE: &str = "Travel Assistant";
const FOOTER: &str = "© 2025 SkyWay Travel. Powered by Spring AI.";

const FLIGHT_ICON: &str = "✈";
const HOTEL_ICON: &str = "🛏";
const CAR_ICON: &str = "🚗";
const AVATAR: &str = FLIGHT_ICON;

fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Wrap text to `width` display columns, breaking at whitespace.
/// Runs of spaces and indentation are kept; a word wider than the line is
/// split into line-sized pieces so nothing is cut off.
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    let text = text.replace('\t', "    ");
    if width == 0 {
        return vec![text];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for (is_space, chunk) in split_runs(&text) {
        let chunk_len = UnicodeWidthStr::width(chunk);

        if current_len + chunk_len <= width {
            current_line.push_str(chunk);
            current_len += chunk_len;
        } else if is_space {
            // Spaces at a break are dropped
            lines.push(std::mem::take(&mut current_line).trim_end().to_string());
            current_len = 0;
        } else {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current_line).trim_end().to_string());
                current_len = 0;
            }
            for c in chunk.chars() {
                let w = char_width(c);
                if current_len + w > width && current_len > 0 {
                    lines.push(std::mem::take(&mut current_line));
                    current_len = 0;
                }
                current_line.push(c);
                current_len += w;
            }
        }
    }

    if !current_line.is_empty() || lines.is_empty() {
        lines.push(current_line);
    }

    lines
}

/// Split text into alternating whitespace and non-whitespace runs.
fn split_runs(text: &str) -> Vec<(bool, &str)> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut in_space = None;

    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        match in_space {
            Some(prev) if prev != space => {
                runs.push((prev, &text[start..i]));
                start = i;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if let Some(space) = in_space {
        runs.push((space, &text[start..]));
    }

    runs
}

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        match after_open.find("**") {
            Some(close) if close > 0 => {
                if open > 0 {
                    spans.push(Span::raw(rest[..open].to_string()));
                }
                spans.push(Span::styled(
                    after_open[..close].to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
                rest = &after_open[close + 2..];
            }
            // No closing **, treat as literal
            _ => break,
        }
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Transcript lines pre-wrapped to `width`, so the line count is exact for scrolling.
fn transcript_lines(app: &App, width: usize) -> Vec<Line<'static>> {
    let bubble_width = width.saturating_sub(2).max(1);
    let mut lines: Vec<Line> = Vec::new();

    for (idx, msg) in app.messages.iter().enumerate() {
        let restored = idx < app.restored_count;
        let dim = if restored {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        let user_color = if restored { Color::DarkGray } else { Color::Cyan };

        if restored && idx == 0 {
            lines.push(
                Line::from(Span::styled("── earlier conversation ──", Style::default().fg(Color::DarkGray)))
                    .alignment(Alignment::Center),
            );
        }
        if !restored && idx == app.restored_count && app.restored_count > 0 {
            lines.push(Line::default());
        }

        match msg.role {
            ChatRole::User => {
                lines.push(
                    Line::from(Span::styled("You", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)))
                        .alignment(Alignment::Right),
                );
                for text_line in msg.content.lines() {
                    for wrapped in wrap_text_to_width(text_line, bubble_width) {
                        lines.push(
                            Line::from(Span::styled(wrapped, Style::default().fg(user_color)))
                                .alignment(Alignment::Right),
                        );
                    }
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(vec![
                    Span::styled(format!("{} ", AVATAR), Style::default().fg(PRIMARY)),
                    Span::styled(CHAT_TITLE, Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)),
                ]));
                for text_line in msg.content.lines() {
                    for wrapped in wrap_text_to_width(text_line, bubble_width) {
                        lines.push(parse_markdown_line(&wrapped).patch_style(dim));
                    }
                }
            }
        }
        lines.push(Line::default());
    }

    if app.awaiting_reply() {
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", AVATAR), Style::default().fg(PRIMARY)),
            Span::styled(CHAT_TITLE, Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)),
        ]));
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("typing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, hero_area, chat_area, footer_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(4),
        Constraint::Min(8),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);
    render_hero(frame, hero_area);
    render_chat(app, frame, chat_area);
    render_footer(app, frame, footer_area);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(SECONDARY));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [logo_area, nav_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(36),
    ])
    .areas(inner);

    let logo = Line::from(vec![
        Span::styled(format!(" {} ", FLIGHT_ICON), Style::default().fg(Color::White).bg(PRIMARY)),
        Span::raw(" "),
        Span::styled(BRAND, Style::default().fg(PRIMARY).bold()),
        Span::raw("  "),
        Span::styled(TAGLINE, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(logo), logo_area);

    // Flights is always the active item
    let active = Style::default().bg(PRIMARY).fg(Color::White).add_modifier(Modifier::BOLD);
    let inactive = Style::default().fg(Color::Gray);
    let nav = Line::from(vec![
        Span::styled(format!(" {} Flights ", FLIGHT_ICON), active),
        Span::raw(" "),
        Span::styled(format!(" {} Hotels ", HOTEL_ICON), inactive),
        Span::raw(" "),
        Span::styled(format!(" {} Cars ", CAR_ICON), inactive),
    ])
    .alignment(Alignment::Right);
    frame.render_widget(Paragraph::new(nav), nav_area);
}

fn render_hero(frame: &mut Frame, area: Rect) {
    let hero = Text::from(vec![
        Line::from(Span::styled(HERO_TITLE, Style::default().fg(Color::White).bold())),
        Line::from(Span::styled(HERO_TEXT, Style::default().fg(Color::Gray))),
    ]);
    let paragraph = Paragraph::new(hero)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area.inner(Margin { horizontal: 2, vertical: 0 }));
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(PRIMARY))
        .title(Line::from(vec![
            Span::styled(format!(" {} ", AVATAR), Style::default().fg(Color::White).bg(SECONDARY)),
            Span::styled(format!(" {} ", CHAT_TITLE), Style::default().fg(PRIMARY).bold()),
        ]));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [transcript_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(inner);

    // Leave one column for the scrollbar
    let text_width = transcript_area.width.saturating_sub(2) as usize;
    let lines = transcript_lines(app, text_width);
    let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    let visible = transcript_area.height;
    let max_scroll = total.saturating_sub(visible);

    app.chat_height = visible;
    if app.follow_tail || app.chat_scroll >= max_scroll {
        app.chat_scroll = max_scroll;
        app.follow_tail = true;
    }

    let transcript = Paragraph::new(Text::from(lines)).scroll((app.chat_scroll, 0));
    frame.render_widget(transcript, transcript_area.inner(Margin { horizontal: 1, vertical: 0 }));

    let mut scrollbar_state = ScrollbarState::new(max_scroll as usize).position(app.chat_scroll as usize);
    frame.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .style(Style::default().fg(SECONDARY)),
        transcript_area,
        &mut scrollbar_state,
    );

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.awaiting_reply() { Color::DarkGray } else { PRIMARY };
    let title = if app.awaiting_reply() { " Waiting for reply... " } else { " Type your message " };
    let input_block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let (visible_text, cursor_x) = visible_input(&app.input, app.cursor, area.width.saturating_sub(2) as usize);

    let input = Paragraph::new(format!(" {}", visible_text))
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, area);

    let cursor_x = u16::try_from(cursor_x).unwrap_or(u16::MAX);
    frame.set_cursor_position((area.x.saturating_add(cursor_x).saturating_add(1), area.y + 1));
}

/// The part of the input line that fits in `width` columns, scrolled so the
/// cursor stays visible, and the cursor's column within it.
fn visible_input(input: &str, cursor: usize, width: usize) -> (String, usize) {
    if width == 0 {
        return (String::new(), 0);
    }

    let chars: Vec<char> = input.chars().collect();
    let cursor = cursor.min(chars.len());
    let mut start = 0;
    let mut cursor_col: usize = chars[..cursor].iter().copied().map(char_width).sum();
    while start < cursor && cursor_col >= width {
        cursor_col -= char_width(chars[start]);
        start += 1;
    }

    let mut used = 0;
    let mut visible = String::new();
    for &c in &chars[start..] {
        let w = char_width(c);
        if used + w > width {
            break;
        }
        used += w;
        visible.push(c);
    }

    (visible, cursor_col)
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().fg(Color::Gray);

    let mut spans = vec![Span::styled(format!(" {} ", FOOTER), Style::default().fg(Color::DarkGray))];
    if let Some(status) = &app.status {
        spans.push(Span::styled(format!(" {} ", status), Style::default().fg(Color::Yellow)));
    }
    spans.extend(vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" ^L ", key_style),
        Span::styled(" clear history ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
