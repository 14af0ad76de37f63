use airdee_core::theme::THEME_CHOICES;
use airdee_core::{parse_blocks, ChatMessage, ChatRole, Inline, RenderBlock, Theme};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, MenuItem, Overlay};

/// Colours for one theme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub base: Style,
    pub user: Color,
    pub assistant: Color,
    pub accent: Color,
    pub muted: Color,
}

impl Palette {
    pub fn for_theme(theme: &Theme) -> Self {
        match theme.as_str() {
            "light" => Palette {
                base: Style::default().fg(Color::Black).bg(Color::White),
                user: Color::Blue,
                assistant: Color::Magenta,
                accent: Color::Blue,
                muted: Color::Gray,
            },
            "dark" => Palette {
                base: Style::default().fg(Color::White).bg(Color::Black),
                user: Color::Cyan,
                assistant: Color::Yellow,
                accent: Color::LightCyan,
                muted: Color::DarkGray,
            },
            // Follow the terminal's own colours.
            _ => Palette {
                base: Style::default(),
                user: Color::Cyan,
                assistant: Color::Yellow,
                accent: Color::Cyan,
                muted: Color::DarkGray,
            },
        }
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let palette = Palette::for_theme(app.session.theme());

    frame.render_widget(Block::default().style(palette.base), area);

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area, &palette);
    render_chat(app, frame, chat_area, &palette);
    render_input(app, frame, input_area, &palette);
    render_footer(app, frame, footer_area, &palette);

    match app.overlay {
        Overlay::None => {}
        Overlay::Menu => render_menu(app, frame, area, &palette),
        Overlay::Settings => render_settings(app, frame, area, &palette),
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let title = Line::from(vec![
        Span::styled(" Airdee ", Style::default().fg(palette.accent).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(palette.muted),
        ),
        Span::raw("  "),
        Span::styled(
            format!("thema: {}", app.session.theme()),
            Style::default().fg(palette.muted),
        ),
    ]);

    frame.render_widget(Paragraph::new(title).style(palette.base), area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2);

    let conversation = app.session.conversation();
    let text = if conversation.transcript().is_empty() && !conversation.is_sending() {
        Text::from(Span::styled(
            "Stel een vraag...",
            Style::default().fg(palette.muted),
        ))
    } else {
        let mut lines: Vec<Line<'static>> = Vec::new();
        for message in conversation.transcript().all() {
            lines.extend(message_lines(message, palette));
        }

        if let Some(indicator) = conversation.pending_indicator() {
            lines.push(role_line(ChatRole::Assistant, palette));
            let dots = ".".repeat(app.animation_frame as usize + 1);
            lines.push(Line::from(Span::styled(
                format!("{indicator} {dots}"),
                Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    // Keep the newest message visible unless the user scrolled up.
    let max_scroll = wrapped_height(&text, inner_width).saturating_sub(app.chat_height);
    if app.follow_bottom || app.chat_scroll >= max_scroll {
        app.chat_scroll = max_scroll;
        app.follow_bottom = true;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.muted))
        .title(" Chat ");

    let chat = Paragraph::new(text)
        .style(palette.base)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let sending = app.is_sending();
    let border_color = if sending { palette.muted } else { palette.accent };
    let title = if sending {
        " Vraag (wacht op antwoord) "
    } else {
        " Vraag "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scroll keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 || app.cursor < inner_width {
        0
    } else {
        app.cursor - inner_width + 1
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(palette.base.fg(palette.user))
        .block(block);
    frame.render_widget(input, area);

    if app.overlay == Overlay::None {
        let cursor_x = (app.cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let line = match &app.notice {
        Some(notice) => Line::from(Span::styled(
            format!(" {notice}"),
            Style::default().fg(palette.assistant),
        )),
        None => Line::from(vec![
            Span::styled(" Enter", Style::default().fg(palette.accent).bold()),
            Span::styled(" versturen  ", Style::default().fg(palette.muted)),
            Span::styled("Esc", Style::default().fg(palette.accent).bold()),
            Span::styled(" menu  ", Style::default().fg(palette.muted)),
            Span::styled("PgUp/PgDn", Style::default().fg(palette.accent).bold()),
            Span::styled(" scrollen  ", Style::default().fg(palette.muted)),
            Span::styled("Ctrl+N", Style::default().fg(palette.accent).bold()),
            Span::styled(" nieuwe chat", Style::default().fg(palette.muted)),
        ]),
    };

    frame.render_widget(Paragraph::new(line).style(palette.base), area);
}

/// Dropdown anchored to the top right, like the widget's menu button.
fn render_menu(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let width = 22.min(area.width);
    let height = (MenuItem::ALL.len() as u16 + 2).min(area.height.saturating_sub(1));
    let popup_area = Rect::new(area.x + area.width - width, area.y + 1, width, height);

    frame.render_widget(Clear, popup_area);

    let items: Vec<ListItem> = MenuItem::ALL
        .iter()
        .map(|item| ListItem::new(format!(" {} ", item.label())))
        .collect();

    let list = List::new(items)
        .style(palette.base)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent))
                .title(" Menu "),
        )
        .highlight_style(
            Style::default()
                .bg(palette.accent)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.menu_state);
}

fn render_settings(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let popup_width = 40.min(area.width.saturating_sub(4));
    let popup_height = (THEME_CHOICES.len() as u16 + 2).min(area.height.saturating_sub(4));
    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let current = app.session.theme().as_str().to_string();
    let items: Vec<ListItem> = THEME_CHOICES
        .iter()
        .map(|name| {
            let style = if *name == current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {name} ")).style(style)
        })
        .collect();

    let list = List::new(items)
        .style(palette.base)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent))
                .title(" Thema (Enter kiest, Esc sluit) "),
        )
        .highlight_style(
            Style::default()
                .bg(palette.accent)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.theme_state);
}

fn role_line(role: ChatRole, palette: &Palette) -> Line<'static> {
    let (label, color) = match role {
        ChatRole::User => ("Jij:", palette.user),
        ChatRole::Assistant => ("Airdee:", palette.assistant),
    };
    Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

/// Lines for one message, followed by a blank separator line.
///
/// User text is shown as typed. Assistant text goes through the same block
/// model the HTML renderer uses.
pub fn message_lines(message: &ChatMessage, palette: &Palette) -> Vec<Line<'static>> {
    let mut lines = vec![role_line(message.role, palette)];

    match message.role {
        ChatRole::User => {
            lines.extend(message.raw_text.lines().map(|l| Line::from(l.to_string())));
        }
        ChatRole::Assistant => {
            for (i, block) in parse_blocks(&message.raw_text).iter().enumerate() {
                if i > 0 {
                    lines.push(Line::default());
                }
                match block {
                    RenderBlock::Paragraph(inlines) => {
                        lines.extend(inline_lines(inlines, Vec::new(), palette));
                    }
                    RenderBlock::List(items) => {
                        for item in items {
                            let bullet = vec![Span::styled("• ", Style::default().fg(palette.accent))];
                            lines.extend(inline_lines(item, bullet, palette));
                        }
                    }
                }
            }
        }
    }

    lines.push(Line::default());
    lines
}

/// Lay out inline runs, breaking lines at `\n` inside text runs.
fn inline_lines(inlines: &[Inline], prefix: Vec<Span<'static>>, palette: &Palette) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut current = prefix;

    for inline in inlines {
        match inline {
            Inline::Text(text) => {
                let mut parts = text.split('\n');
                if let Some(first) = parts.next() {
                    if !first.is_empty() {
                        current.push(Span::raw(first.to_string()));
                    }
                }
                for part in parts {
                    lines.push(Line::from(std::mem::take(&mut current)));
                    if !part.is_empty() {
                        current.push(Span::raw(part.to_string()));
                    }
                }
            }
            Inline::Link { href, label } => {
                current.push(Span::styled(
                    label.clone(),
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::UNDERLINED),
                ));
                if href != label {
                    current.push(Span::styled(
                        format!(" ({href})"),
                        Style::default().fg(palette.muted),
                    ));
                }
            }
        }
    }
    lines.push(Line::from(current));

    lines
}

/// Rows `text` takes up when wrapped to `width` columns.
fn wrapped_height(text: &Text, width: u16) -> u16 {
    let width = width.max(1) as usize;
    let rows: usize = text
        .lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum();
    rows.min(u16::MAX as usize) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_assistant_list_items_get_bullets() {
        let palette = Palette::for_theme(&Theme::System);
        let message = ChatMessage::new(ChatRole::Assistant, "Lijst:\n\n- een\n• twee");

        let lines: Vec<String> = message_lines(&message, &palette).iter().map(plain).collect();
        assert_eq!(lines, vec!["Airdee:", "Lijst:", "", "• een", "• twee", ""]);
    }

    #[test]
    fn test_links_are_underlined_with_target() {
        let palette = Palette::for_theme(&Theme::System);
        let message = ChatMessage::new(ChatRole::Assistant, "Zie [RD](https://www.rd.nl) nu");

        let lines = message_lines(&message, &palette);
        let spans = &lines[1].spans;
        assert_eq!(plain(&lines[1]), "Zie RD (https://www.rd.nl) nu");
        let link = spans.iter().find(|s| s.content == "RD").unwrap();
        assert!(link.style.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn test_bare_url_shown_once() {
        let palette = Palette::for_theme(&Theme::System);
        let message = ChatMessage::new(ChatRole::Assistant, "https://www.rd.nl");
        let lines = message_lines(&message, &palette);
        assert_eq!(plain(&lines[1]), "https://www.rd.nl");
    }

    #[test]
    fn test_user_text_is_not_parsed() {
        let palette = Palette::for_theme(&Theme::System);
        let message = ChatMessage::new(ChatRole::User, "- geen lijst\n<b>");
        let lines: Vec<String> = message_lines(&message, &palette).iter().map(plain).collect();
        assert_eq!(lines, vec!["Jij:", "- geen lijst", "<b>", ""]);
    }

    #[test]
    fn test_paragraph_line_breaks() {
        let palette = Palette::for_theme(&Theme::System);
        let message = ChatMessage::new(ChatRole::Assistant, "een\ntwee");
        let lines: Vec<String> = message_lines(&message, &palette).iter().map(plain).collect();
        assert_eq!(lines, vec!["Airdee:", "een", "twee", ""]);
    }

    #[test]
    fn test_wrapped_height_counts_wrapped_rows() {
        let text = Text::from(vec![Line::from("abcdefghij"), Line::default(), Line::from("abc")]);
        assert_eq!(wrapped_height(&text, 4), 3 + 1 + 1);
        assert_eq!(wrapped_height(&text, 0), 10 + 1 + 3);
    }

    #[test]
    fn test_palettes_differ_per_theme() {
        let light = Palette::for_theme(&Theme::parse("light"));
        let dark = Palette::for_theme(&Theme::parse("dark"));
        let system = Palette::for_theme(&Theme::System);
        assert_ne!(light, dark);
        assert_eq!(system.base, Style::default());
        assert_eq!(Palette::for_theme(&Theme::parse("onbekend")), system);
    }
}
