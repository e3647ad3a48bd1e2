use acute_core::{Feed, FeedChange, FeedConfig, Summary, SummaryKey};
use acute_sync::PollEvent;
use chrono::{DateTime, Local};
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{layout::Rect, widgets::ListState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusMode {
    #[default]
    List,
    Details,
}

pub struct App {
    pub feed: Feed,
    pub endpoint: String,
    pub list_state: ListState,
    pub focus: FocusMode,
    pub show_help: bool,
    pub list_area: Option<Rect>,
    pub details_area: Option<Rect>,
    pub details_scroll: u16,
    pub details_max_scroll: u16,
    pub viewport_width: u16,
    pub status_note: Option<String>,
    pub last_error_detail: Option<String>,
    pub last_synced: Option<DateTime<Local>>,
    refresh_requested: bool,
    should_quit: bool,
}

impl App {
    pub fn new(config: FeedConfig, endpoint: impl Into<String>) -> Self {
        Self {
            feed: Feed::new(config),
            endpoint: endpoint.into(),
            list_state: ListState::default(),
            focus: FocusMode::List,
            show_help: false,
            list_area: None,
            details_area: None,
            details_scroll: 0,
            details_max_scroll: 0,
            viewport_width: u16::MAX,
            status_note: None,
            last_error_detail: None,
            last_synced: None,
            refresh_requested: false,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Returns true once per `r` press so the caller can nudge the poller.
    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }

    pub fn set_viewport_width(&mut self, width: u16) {
        self.viewport_width = width;
    }

    pub fn is_compact(&self) -> bool {
        self.feed.layout().is_compact(self.viewport_width)
    }

    /// The list is hidden only while a case is open and the list was
    /// collapsed for it.
    pub fn is_list_visible(&self) -> bool {
        self.feed.selected().is_none() || !self.feed.is_list_collapsed()
    }

    pub fn cursor_summary(&self) -> Option<&Summary> {
        let index = self.list_state.selected()?;
        self.feed.summaries().get(index)
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => {
                if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                    self.handle_key(key);
                }
            }
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, _) => self.set_viewport_width(width),
            _ => {}
        }
    }

    pub fn apply_poll_event(&mut self, event: PollEvent) -> FeedChange {
        match event {
            PollEvent::Snapshot { cycle, summaries } => {
                let cursor_key = self.cursor_summary().map(|summary| summary.key.clone());
                let change = self.feed.apply_snapshot(cycle, summaries);
                if change.applied {
                    self.last_synced = Some(Local::now());
                    self.last_error_detail = None;
                    self.restore_cursor(cursor_key);
                    if self.feed.selected().is_none() {
                        self.leave_details();
                    }
                }
                change
            }
            PollEvent::Failed { cycle, error } => {
                let change = self.feed.apply_failure(cycle, error.user_message());
                if change.applied {
                    self.last_error_detail = Some(error.to_string());
                }
                change
            }
        }
    }

    /// Applies one poll result and reports whether the screen needs a redraw.
    /// The sync clock in the footer is left to the redraw tick.
    pub fn handle_poll_event(&mut self, event: PollEvent) -> bool {
        let change = self.apply_poll_event(event);
        let cleared_note = change.applied && self.status_note.take().is_some();
        change.needs_redraw() || cleared_note
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Char('?') => {
                self.show_help = !self.show_help;
            }
            KeyCode::Esc => {
                if self.show_help {
                    self.show_help = false;
                } else if self.feed.selected().is_some() {
                    self.feed.clear_selection();
                    self.leave_details();
                }
            }
            KeyCode::Char('r') => {
                self.refresh_requested = true;
                self.status_note = Some("Refreshing...".to_string());
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.is_scrolling_details() {
                    self.scroll_details(1);
                } else {
                    self.move_cursor(1);
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.is_scrolling_details() {
                    self.scroll_details(-1);
                } else {
                    self.move_cursor(-1);
                }
            }
            KeyCode::Enter => {
                self.show_help = false;
                self.select_cursor();
            }
            KeyCode::Char('b') => {
                if self.feed.selected().is_some() {
                    let collapsed = self.feed.toggle_list();
                    self.focus = if collapsed {
                        FocusMode::Details
                    } else {
                        FocusMode::List
                    };
                }
            }
            KeyCode::Tab => {
                if self.feed.selected().is_some() && self.is_list_visible() {
                    self.focus = match self.focus {
                        FocusMode::List => FocusMode::Details,
                        FocusMode::Details => FocusMode::List,
                    };
                }
            }
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.handle_left_click(event.column, event.row);
            }
            MouseEventKind::ScrollUp => {
                self.handle_scroll(event.column, event.row, -1);
            }
            MouseEventKind::ScrollDown => {
                self.handle_scroll(event.column, event.row, 1);
            }
            _ => {}
        }
    }

    pub fn update_layout(&mut self, list_area: Option<Rect>, details_area: Option<Rect>) {
        self.list_area = list_area;
        self.details_area = details_area;
        if details_area.is_none() {
            self.details_scroll = 0;
            self.details_max_scroll = 0;
        }
    }

    fn is_scrolling_details(&self) -> bool {
        self.feed.selected().is_some()
            && (self.focus == FocusMode::Details || !self.is_list_visible())
    }

    fn select_cursor(&mut self) {
        let Some(key) = self.cursor_summary().map(|summary| summary.key.clone()) else {
            return;
        };
        if self.feed.select(&key, self.viewport_width) {
            self.focus = FocusMode::Details;
            self.details_scroll = 0;
        }
    }

    fn leave_details(&mut self) {
        self.feed.expand_list();
        self.focus = FocusMode::List;
        self.details_scroll = 0;
        self.details_max_scroll = 0;
    }

    fn restore_cursor(&mut self, key: Option<SummaryKey>) {
        let len = self.feed.summaries().len();
        if len == 0 {
            self.list_state.select(None);
            return;
        }

        if let Some(index) = key.as_ref().and_then(|key| self.feed.position_of(key)) {
            self.list_state.select(Some(index));
            return;
        }

        match self.list_state.selected() {
            Some(index) if index < len => {}
            Some(_) => self.list_state.select(Some(len - 1)),
            None => self.list_state.select(Some(0)),
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.feed.summaries().len() as isize;
        if len == 0 {
            return;
        }

        let current = self.list_state.selected().unwrap_or(0) as isize;
        let mut next = current + delta;
        if next < 0 {
            next = len - 1;
        }
        if next >= len {
            next = 0;
        }
        self.list_state.select(Some(next as usize));
    }

    fn scroll_details(&mut self, delta: i16) {
        if delta < 0 {
            self.details_scroll = self.details_scroll.saturating_sub(1);
        } else {
            let next = self.details_scroll.saturating_add(1);
            self.details_scroll = next.min(self.details_max_scroll);
        }
    }

    fn handle_left_click(&mut self, column: u16, row: u16) {
        if let Some(area) = self.list_area {
            if contains(area, column, row) {
                self.focus = FocusMode::List;
                if let Some(index) = self.row_from_coords(area, column, row) {
                    if index < self.feed.summaries().len() {
                        self.list_state.select(Some(index));
                        self.select_cursor();
                    }
                }
                return;
            }
        }

        if let Some(area) = self.details_area {
            if contains(area, column, row) && self.feed.selected().is_some() {
                self.focus = FocusMode::Details;
            }
        }
    }

    fn handle_scroll(&mut self, column: u16, row: u16, delta: i16) {
        let over_details = self
            .details_area
            .is_some_and(|area| contains(area, column, row));
        if over_details && self.feed.selected().is_some() {
            self.scroll_details(delta);
            return;
        }
        self.move_cursor(delta as isize);
    }

    fn row_from_coords(&self, area: Rect, column: u16, row: u16) -> Option<usize> {
        if !contains(area, column, row) || area.height <= 2 {
            return None;
        }

        let data_start = area.y.saturating_add(1);
        let data_end = area.y.saturating_add(area.height.saturating_sub(1));
        if row < data_start || row >= data_end {
            return None;
        }

        Some(self.list_state.offset() + (row - data_start) as usize)
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}
