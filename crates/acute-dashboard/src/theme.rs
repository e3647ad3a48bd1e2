use acute_core::SummaryStatus;
use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(131, 165, 152))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const LIVE_BANNER_STYLE: Style = Style::new()
    .bg(Color::Rgb(204, 36, 29))
    .fg(Color::White)
    .add_modifier(Modifier::BOLD);
pub const ERROR_STYLE: Style = Style::new()
    .fg(Color::Rgb(251, 73, 52))
    .add_modifier(Modifier::BOLD);
pub const WARN_STYLE: Style = Style::new().fg(Color::Rgb(250, 189, 47));
pub const MUTED_STYLE: Style = Style::new().fg(Color::DarkGray);
pub const SECTION_STYLE: Style = Style::new()
    .fg(Color::Rgb(131, 165, 152))
    .add_modifier(Modifier::BOLD);

pub fn zebra_row_style(index: usize) -> Style {
    let bg = if index % 2 == 0 {
        Color::Rgb(18, 20, 26)
    } else {
        Color::Rgb(24, 27, 34)
    };
    Style::new().bg(bg)
}

pub mod icons {
    pub const LIVE: &str = "●";
    pub const PROCESSING: &str = "~";
    pub const COMPLETED: &str = "x";
    pub const STALE: &str = "!";
}

pub fn status_color(status: SummaryStatus) -> Color {
    match status {
        SummaryStatus::Live => Color::Rgb(251, 73, 52),
        SummaryStatus::Processing => Color::Rgb(250, 189, 47),
        SummaryStatus::Completed => Color::Rgb(184, 187, 38),
    }
}

pub fn status_icon(status: SummaryStatus) -> &'static str {
    match status {
        SummaryStatus::Live => icons::LIVE,
        SummaryStatus::Processing => icons::PROCESSING,
        SummaryStatus::Completed => icons::COMPLETED,
    }
}

pub fn status_badge_style(status: SummaryStatus) -> Style {
    Style::new()
        .fg(status_color(status))
        .add_modifier(Modifier::BOLD)
}
