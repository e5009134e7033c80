use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Paragraph, Wrap};

use crate::app::state::{AppState, Section};
use crate::app::truncate;
use crate::history::format_time;
use crate::nav::{Bounds, ElementInfo};

use super::layout::{Screen, TILE_WIDTH, Widget};

const ACCENT: Color = Color::Rgb(110, 170, 255);
const MUTED: Color = Color::Rgb(185, 195, 210);
const TEXT: Color = Color::Rgb(230, 235, 242);

/// Splits the terminal into header, body, key help and status line.
pub(super) fn frame_areas(area: Rect) -> [Rect; 4] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2], chunks[3]]
}

pub(super) fn draw(frame: &mut Frame, state: &AppState, screen: &Screen) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let [header, body, help, status] = frame_areas(frame.area());
    frame.render_widget(header_line(state), header);

    draw_decorations(frame, state, screen, body);
    for element in screen.visible_elements() {
        if let Some(area) = place(body, &element.bounds) {
            draw_widget(frame, state, &element, screen.focused() == Some(element.handle), area);
        }
    }

    let help_line = Paragraph::new(Span::styled(help_text(state.section), Style::default().fg(MUTED)))
        .alignment(Alignment::Center)
        .block(panel_block("Keys"));
    frame.render_widget(help_line, help);

    let status_widget = Paragraph::new(state.status.clone())
        .style(status_style(&state.status))
        .block(panel_block("Status"));
    frame.render_widget(status_widget, status);
}

fn header_line(state: &AppState) -> Paragraph<'static> {
    let mut spans = vec![
        Span::styled(
            "DUBVIEW",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(section_name(state.section), Style::default().fg(MUTED)),
    ];
    if state.section == Section::MovieList {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!(
                "\"{}\"  page {} of {}{}",
                truncate(&state.active_query, 30),
                state.pagination.current,
                state.pagination.total_estimate,
                if state.pagination.has_next() { "+" } else { "" }
            ),
            Style::default().fg(MUTED),
        ));
    }
    if state.is_loading() {
        spans.push(Span::raw("   "));
        spans.push(Span::styled("loading...", Style::default().fg(Color::Yellow)));
    }
    Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(panel_block("Catalog"))
}

fn section_name(section: Section) -> &'static str {
    match section {
        Section::Welcome => "Search",
        Section::MovieList => "Results",
        Section::MovieDetail => "Details",
        Section::History => "History",
        Section::Player => "Now playing",
    }
}

fn help_text(section: Section) -> &'static str {
    match section {
        Section::Welcome => "type to search  ↑/↓/←/→ move  Enter select  Ctrl-C quit",
        Section::MovieList => {
            "↑/↓/←/→ move  Enter open  PgUp/PgDn page  1-9 jump  Esc new search  q quit"
        }
        Section::MovieDetail => "↑/↓ move  Enter play  Esc back  q quit",
        Section::History => "↑/↓/←/→ move  Enter resume  Esc back  q quit",
        Section::Player => "←/→ seek  Space play/pause  ↑/↓ move  Esc close  q quit",
    }
}

/// Text above the focusable widgets that the engine never sees.
fn draw_decorations(frame: &mut Frame, state: &AppState, screen: &Screen, body: Rect) {
    match state.section {
        Section::MovieDetail => {
            let Some(detail) = state.detail.as_ref() else {
                return;
            };
            let summary = if detail.options.is_empty() {
                "No video sources are available for this title.".to_string()
            } else {
                format!("{} source(s)", detail.options.len())
            };
            let text = vec![
                Line::styled(
                    detail.record.title.clone(),
                    Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
                ),
                Line::styled(summary, Style::default().fg(MUTED)),
            ];
            let bounds = screen.to_view(Bounds::new(2, 3, i32::from(body.width) - 4, 2));
            if let Some(area) = place(body, &bounds) {
                frame.render_widget(Paragraph::new(text), area);
            }
        }
        Section::Player => {
            let Some(now_playing) = state.now_playing.as_ref() else {
                return;
            };
            let title = Paragraph::new(Line::styled(
                now_playing.entry.title.clone(),
                Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center);
            let width = i32::from(body.width) - 4;
            if let Some(area) = place(body, &screen.to_view(Bounds::new(2, 4, width, 1))) {
                frame.render_widget(title, area);
            }

            let duration = now_playing.entry.duration;
            let ratio = if duration > 0.0 {
                (now_playing.position / duration).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let label = format!(
                "{} {} / {}",
                if now_playing.is_playing { "▶" } else { "⏸" },
                format_time(now_playing.position),
                format_time(duration)
            );
            let gauge = Gauge::default()
                .gauge_style(
                    Style::default()
                        .fg(Color::Rgb(130, 190, 255))
                        .bg(Color::Black)
                        .add_modifier(Modifier::BOLD),
                )
                .label(label)
                .ratio(ratio);
            if let Some(area) = place(body, &screen.to_view(Bounds::new(2, 6, width, 1))) {
                frame.render_widget(gauge, area);
            }
        }
        Section::History if state.history.is_empty() => {
            let empty = Paragraph::new("Nothing watched yet.").style(Style::default().fg(MUTED));
            if let Some(area) = place(body, &screen.to_view(Bounds::new(2, 4, 30, 1))) {
                frame.render_widget(empty, area);
            }
        }
        _ => {}
    }
}

fn draw_widget(
    frame: &mut Frame,
    state: &AppState,
    element: &ElementInfo<Widget>,
    focused: bool,
    area: Rect,
) {
    let block = widget_block(focused, element.inert || element.disabled);
    let inner_width = (TILE_WIDTH - 2).max(1) as usize;

    let body: Vec<Line> = match element.handle {
        Widget::SearchInput => {
            let cursor = if focused { "▏" } else { "" };
            if state.query_input.is_empty() && !focused {
                vec![Line::styled("Search titles", Style::default().fg(MUTED))]
            } else {
                vec![Line::raw(format!("{}{cursor}", state.query_input))]
            }
        }
        Widget::SearchButton => vec![Line::raw("Search")],
        Widget::HistoryButton => vec![Line::raw("History")],
        Widget::NewSearch => vec![Line::raw("New search")],
        Widget::PrevPage => vec![Line::raw("◀ Prev")],
        Widget::NextPage => vec![Line::raw("Next ▶")],
        Widget::Back | Widget::BackFromHistory => vec![Line::raw("◀ Back")],
        Widget::Close => vec![Line::raw("✕ Close")],
        Widget::SeekBack => vec![Line::raw("◀◀ Rewind")],
        Widget::SeekForward => vec![Line::raw("Forward ▶▶")],
        Widget::PlayPause => {
            let playing = state.now_playing.as_ref().is_some_and(|now| now.is_playing);
            vec![Line::raw(if playing { "⏸ Pause" } else { "▶ Play" })]
        }
        Widget::Tile(index) => match state.results.get(index) {
            Some(record) => wrap_lines(&record.title, inner_width, 3),
            None => Vec::new(),
        },
        Widget::Quality(index) => match state.detail.as_ref() {
            Some(detail) => detail
                .options
                .get(index)
                .map(|option| vec![Line::raw(detail.option_label(option))])
                .unwrap_or_default(),
            None => Vec::new(),
        },
        Widget::HistoryTile(index) => match state.history.entries().get(index) {
            Some(entry) => vec![
                Line::raw(truncate(&entry.title, inner_width)),
                Line::styled(entry.progress_label(), Style::default().fg(MUTED)),
                Line::styled(
                    progress_bar(entry.progress_percent(), inner_width),
                    Style::default().fg(ACCENT),
                ),
            ],
            None => Vec::new(),
        },
    };

    let style = if element.inert || element.disabled {
        Style::default().fg(Color::Rgb(110, 115, 125))
    } else {
        Style::default().fg(TEXT)
    };
    let paragraph = Paragraph::new(body)
        .style(style)
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(paragraph, area);
}

fn widget_block(focused: bool, dimmed: bool) -> Block<'static> {
    let border = if focused {
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
    } else if dimmed {
        Style::default().fg(Color::Rgb(72, 82, 96))
    } else {
        Style::default().fg(Color::Rgb(125, 135, 150))
    };
    Block::default()
        .borders(Borders::ALL)
        .border_type(if focused {
            BorderType::Thick
        } else {
            BorderType::Rounded
        })
        .border_style(border)
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else if status.starts_with("INFO:") {
        Style::default().fg(Color::Rgb(205, 165, 255))
    } else {
        Style::default().fg(TEXT)
    }
}

/// Clips view-relative `bounds` to the body area; `None` when nothing is left.
fn place(body: Rect, bounds: &Bounds) -> Option<Rect> {
    let left = bounds.left.max(0);
    let top = bounds.top.max(0);
    let right = bounds.right().min(i32::from(body.width));
    let bottom = bounds.bottom().min(i32::from(body.height));
    if right <= left || bottom <= top {
        return None;
    }
    Some(Rect::new(
        body.x + u16::try_from(left).ok()?,
        body.y + u16::try_from(top).ok()?,
        u16::try_from(right - left).ok()?,
        u16::try_from(bottom - top).ok()?,
    ))
}

/// Greedy word wrap; the last line is clipped when the text runs long.
fn wrap_lines(text: &str, width: usize, max_lines: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.len() > max_lines {
        let rest = lines.split_off(max_lines - 1).join(" ");
        lines.push(rest);
    }
    lines
        .into_iter()
        .map(|line| Line::raw(truncate(&line, width)))
        .collect()
}

fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
