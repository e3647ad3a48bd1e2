use crate::state::{App, FocusMode};
use crate::theme::{self, icons};
use acute_core::{Summary, SummaryStatus};
use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

const NOTES_EXCERPT_CHARS: usize = 48;

pub fn render(f: &mut Frame, app: &mut App) {
    let area = f.size();
    app.set_viewport_width(area.width);

    let health = app.feed.health().clone();
    let show_banner = !health.is_healthy() && !health.is_blocking();
    let mut constraints = vec![Constraint::Length(3)];
    if show_banner {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(0));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    render_header(f, app, rows[0]);
    if show_banner {
        render_banner(f, app, rows[1]);
    }
    let body = rows[rows.len() - 1];

    if health.is_blocking() {
        app.update_layout(None, None);
        render_error(f, app, body);
    } else if app.feed.selected().is_some() {
        if app.is_list_visible() {
            let split = split_body(body);
            app.update_layout(Some(split[0]), Some(split[1]));
            render_list(f, app, split[0]);
            render_details(f, app, split[1]);
        } else {
            app.update_layout(None, Some(body));
            render_details(f, app, body);
        }
    } else if app.is_compact() {
        app.update_layout(Some(body), None);
        render_list(f, app, body);
    } else {
        let split = split_body(body);
        app.update_layout(Some(split[0]), None);
        render_list(f, app, split[0]);
        render_neutral(f, app, split[1]);
    }

    if app.show_help {
        render_help(f, area);
    }
}

fn split_body(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area)
}

fn focus_border(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let summaries = app.feed.summaries();
    let live = summaries.iter().filter(|summary| summary.is_live()).count();
    let processing = summaries
        .iter()
        .filter(|summary| summary.is_processing())
        .count();

    let synced = match &app.last_synced {
        Some(at) => format!("synced {}", at.format("%H:%M:%S")),
        None => "waiting for first sync".to_string(),
    };

    let mut spans = vec![
        Span::styled(format!("{} cases", summaries.len()), theme::HEADER_STYLE),
        Span::raw("  "),
        Span::styled(
            format!("{} {live} live", icons::LIVE),
            theme::status_badge_style(SummaryStatus::Live),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{} {processing} processing", icons::PROCESSING),
            theme::status_badge_style(SummaryStatus::Processing),
        ),
        Span::raw("  "),
        Span::styled(synced, theme::MUTED_STYLE),
    ];
    if let Some(note) = &app.status_note {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(note.clone(), theme::WARN_STYLE));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Acute Reports - {}", app.endpoint));
    let p = Paragraph::new(Line::from(spans)).block(block);
    f.render_widget(p, area);
}

fn render_banner(f: &mut Frame, app: &App, area: Rect) {
    let health = app.feed.health();
    let message = health.last_error.as_deref().unwrap_or("Sync problem");
    let text = format!(
        " {} {message} (failure {} of {}, still retrying)",
        icons::STALE,
        health.consecutive_failures,
        health.threshold.max(1)
    );
    f.render_widget(Paragraph::new(Span::styled(text, theme::WARN_STYLE)), area);
}

fn render_error(f: &mut Frame, app: &App, area: Rect) {
    let health = app.feed.health();
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Connection problem")
        .border_style(theme::ERROR_STYLE);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = vec![
        Line::from(Span::styled(
            health.last_error.clone().unwrap_or_default(),
            theme::ERROR_STYLE,
        )),
        Line::from(""),
    ];
    if let Some(detail) = &app.last_error_detail {
        lines.push(Line::from(Span::styled(detail.clone(), theme::MUTED_STYLE)));
    }
    lines.push(Line::from(Span::styled(
        format!("{} failed attempts in a row", health.consecutive_failures),
        theme::MUTED_STYLE,
    )));
    lines.push(Line::from(""));
    lines.push(Line::from("Press r to retry now, q to quit."));

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn render_list(f: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Cases")
        .border_style(focus_border(app.focus == FocusMode::List));

    if app.feed.summaries().is_empty() {
        let inner = block.inner(area);
        f.render_widget(block, area);
        let message = if app.feed.has_loaded() {
            "No cases reported."
        } else {
            "Loading summaries..."
        };
        let text = vec![
            Line::from(Span::styled(message, theme::WARN_STYLE)),
            Line::from(""),
            Line::from("Press r to refresh, q to quit."),
        ];
        f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), inner);
        return;
    }

    let items: Vec<ListItem> = app
        .feed
        .summaries()
        .iter()
        .enumerate()
        .map(|(index, summary)| {
            let mut spans = Vec::new();
            let marker = if app.feed.is_selected(&summary.key) {
                "> "
            } else {
                "  "
            };
            spans.push(Span::raw(marker));
            spans.push(Span::styled(
                format!("{} ", theme::status_icon(summary.status)),
                theme::status_color(summary.status),
            ));
            spans.push(Span::styled(
                title_or_placeholder(summary).to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                format!("[{}]", summary.status.label()),
                theme::status_badge_style(summary.status),
            ));
            spans.push(Span::styled(
                format!("  {}", format_date(summary.date)),
                theme::MUTED_STYLE,
            ));
            let excerpt = excerpt(&summary.ambulance_notes, NOTES_EXCERPT_CHARS);
            if !excerpt.is_empty() {
                spans.push(Span::styled(format!("  {excerpt}"), theme::MUTED_STYLE));
            }
            ListItem::new(Line::from(spans)).style(theme::zebra_row_style(index))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(theme::SELECTED_STYLE);
    f.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_neutral(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Details");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = vec![Line::from(Span::styled(
        "No case selected",
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    lines.push(Line::from(""));
    if app.feed.summaries().is_empty() {
        lines.push(Line::from(Span::styled(
            "Cases appear here as soon as crews report them.",
            theme::MUTED_STYLE,
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Move with j/k and press Enter to open a case.",
            theme::MUTED_STYLE,
        )));
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn render_details(f: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Case")
        .border_style(focus_border(
            app.focus == FocusMode::Details || !app.is_list_visible(),
        ));
    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let Some(summary) = app.feed.selected() else {
        return;
    };
    let lines = detail_lines(summary, app.feed.is_selection_stale());

    let total_height = wrapped_height(&lines, inner_area.width);
    app.details_max_scroll = total_height.saturating_sub(inner_area.height);
    if app.details_scroll > app.details_max_scroll {
        app.details_scroll = app.details_max_scroll;
    }

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .scroll((app.details_scroll, 0));
    f.render_widget(p, inner_area);
}

fn detail_lines(summary: &Summary, stale: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if summary.is_live() {
        lines.push(Line::from(Span::styled(
            format!(" {} LIVE - crew is reporting in real time ", icons::LIVE),
            theme::LIVE_BANNER_STYLE,
        )));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        title_or_placeholder(summary).to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(vec![
        Span::styled(
            format!("[{}]", summary.status.label()),
            theme::status_badge_style(summary.status),
        ),
        Span::raw("  "),
        Span::styled(format_date(summary.date), theme::MUTED_STYLE),
        Span::raw("  "),
        Span::styled(format!("#{}", summary.key), theme::MUTED_STYLE),
    ]));
    if stale {
        lines.push(Line::from(Span::styled(
            format!(
                "{} No longer in the latest update; showing the last known version.",
                icons::STALE
            ),
            theme::WARN_STYLE,
        )));
    }

    section(&mut lines, "Timeline");
    if summary.timeline_events.is_empty() {
        lines.push(muted("No timeline events yet."));
    } else {
        for event in &summary.timeline_events {
            lines.push(Line::from(vec![
                Span::styled(format!("{}  ", event.timestamp), theme::MUTED_STYLE),
                Span::raw(event.description.clone()),
            ]));
        }
    }

    if summary.is_live() {
        return lines;
    }

    section(&mut lines, "Emergency Summary");
    match summary.ai_summary.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => {
            lines.extend(text.lines().map(|line| Line::from(line.to_string())));
        }
        _ if summary.is_processing() => {
            lines.push(Line::from(Span::styled(
                "Summary is being generated...",
                theme::WARN_STYLE,
            )));
        }
        _ => lines.push(muted("No summary available.")),
    }

    section(&mut lines, "First Responder Notes");
    if summary.ambulance_notes.trim().is_empty() {
        lines.push(muted("No notes."));
    } else {
        lines.extend(
            summary
                .ambulance_notes
                .lines()
                .map(|line| Line::from(line.to_string())),
        );
    }

    section(&mut lines, "Patient Journal");
    let journal = &summary.medical_journal;
    if journal.is_empty() {
        lines.push(muted("No journal entries."));
        return lines;
    }
    if !journal.critical_information().is_empty() {
        lines.push(Line::from(Span::styled(
            "Critical information",
            theme::ERROR_STYLE,
        )));
        for entry in journal.critical_information() {
            lines.push(entry_line(&entry.condition, &entry.details));
        }
    }
    if !journal.current_medications().is_empty() {
        lines.push(Line::from(Span::styled(
            "Current medications",
            Style::default().fg(Color::Blue),
        )));
        for entry in journal.current_medications() {
            lines.push(entry_line(&entry.medication, &entry.reason));
        }
    }
    if !journal.allergy_information().is_empty() {
        lines.push(Line::from(Span::styled("Allergies", theme::WARN_STYLE)));
        for entry in journal.allergy_information() {
            lines.push(entry_line(&entry.allergy_name, &entry.details));
        }
    }

    lines
}

fn section(lines: &mut Vec<Line<'static>>, title: &'static str) {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(title, theme::SECTION_STYLE)));
}

fn muted(text: &'static str) -> Line<'static> {
    Line::from(Span::styled(text, theme::MUTED_STYLE))
}

fn entry_line(name: &str, details: &str) -> Line<'static> {
    if details.trim().is_empty() {
        Line::from(format!("- {name}"))
    } else {
        Line::from(vec![
            Span::raw(format!("- {name}: ")),
            Span::styled(details.to_string(), theme::MUTED_STYLE),
        ])
    }
}

fn render_help(f: &mut Frame, area: Rect) {
    let popup = centered(area, 46, 16);
    f.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let keys = [
        ("j / Down", "Next case / scroll"),
        ("k / Up", "Previous case / scroll"),
        ("Enter", "Open case"),
        ("Esc", "Close case"),
        ("b", "Show/hide case list"),
        ("Tab", "Switch focus"),
        ("r", "Refresh now"),
        ("?", "Toggle help"),
        ("q", "Quit"),
    ];
    let mut text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for (key, action) in keys {
        text.push(Line::from(vec![
            Span::styled(format!("{key:<11}"), Color::Cyan),
            Span::raw(action),
        ]));
    }
    f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), inner);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn title_or_placeholder(summary: &Summary) -> &str {
    if summary.title.trim().is_empty() {
        "Untitled case"
    } else {
        summary.title.as_str()
    }
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(date) => date
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        None => "no date".to_string(),
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

fn wrapped_height(lines: &[Line<'_>], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let mut total: usize = 0;
    for line in lines {
        let line_width = line.width();
        if line_width == 0 {
            total += 1;
        } else {
            total += (line_width + width - 1) / width;
        }
    }
    total as u16
}
