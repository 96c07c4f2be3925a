//! Colours and small building blocks shared by every screen.

use crate::tui::Frame;
use crossterm::event::KeyCode;
use ratatui::widgets::calendar::{CalendarEventStore, Monthly};
use ratatui::{prelude::*, widgets::*};
use std::time::{Duration, Instant};
use time::{Date, Month, Weekday};

pub const BACKGROUND: Color = Color::Rgb(16, 16, 28);
pub const PANEL: Color = Color::Rgb(22, 22, 35);
pub const INPUT_BG: Color = Color::Rgb(26, 26, 36);
pub const BORDER: Color = Color::Rgb(75, 75, 120);
pub const BORDER_IDLE: Color = Color::Rgb(140, 140, 200);
pub const FOCUS: Color = Color::Rgb(250, 250, 110);
pub const TEXT: Color = Color::Rgb(220, 220, 240);
pub const TITLE: Color = Color::Rgb(230, 230, 250);
pub const ACCENT: Color = Color::Rgb(129, 199, 245);
pub const MUTED: Color = Color::Rgb(140, 140, 170);
pub const SUCCESS: Color = Color::Rgb(140, 219, 140);
pub const DANGER: Color = Color::Rgb(255, 100, 100);
pub const WARNING: Color = Color::Rgb(250, 180, 80);
pub const HIGHLIGHT_BG: Color = Color::Rgb(40, 40, 65);

const MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Error and success banners that disappear after a few seconds.
#[derive(Debug, Default)]
pub struct Flash {
    error: Option<(String, Instant)>,
    success: Option<(String, Instant)>,
}

impl Flash {
    pub fn error(&mut self, message: impl Into<String>) {
        self.error = Some((message.into(), Instant::now()));
        self.success = None;
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.success = Some((message.into(), Instant::now()));
        self.error = None;
    }

    pub fn clear(&mut self) {
        self.error = None;
        self.success = None;
    }

    pub fn check_timeout(&mut self) {
        if matches!(&self.error, Some((_, at)) if at.elapsed() >= MESSAGE_TIMEOUT) {
            self.error = None;
        }
        if matches!(&self.success, Some((_, at)) if at.elapsed() >= MESSAGE_TIMEOUT) {
            self.success = None;
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|(message, _)| message.as_str())
    }

    pub fn success_message(&self) -> Option<&str> {
        self.success.as_ref().map(|(message, _)| message.as_str())
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let (text, color) = match (self.error_message(), self.success_message()) {
            (Some(error), _) => (error, DANGER),
            (None, Some(success)) => (success, SUCCESS),
            (None, None) => return,
        };
        let paragraph = Paragraph::new(text)
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

/// Fills the whole frame with the application background.
pub fn paint_background(frame: &mut Frame) -> Rect {
    let area = frame.area();
    frame.render_widget(
        Block::default().style(Style::default().bg(BACKGROUND)),
        area,
    );
    area
}

pub fn render_header(frame: &mut Frame, area: Rect, title: &str) {
    let header_block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(BORDER))
        .style(Style::default().bg(BACKGROUND));
    frame.render_widget(header_block, area);

    let title = Paragraph::new(title.to_uppercase())
        .style(
            Style::default()
                .fg(TITLE)
                .add_modifier(Modifier::BOLD)
                .bg(BACKGROUND),
        )
        .alignment(Alignment::Center);
    frame.render_widget(title, area);
}

pub fn panel(title: &str, focused: bool) -> Block<'static> {
    Block::default()
        .title(format!(" {title} "))
        .title_style(Style::default().fg(TITLE).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if focused { FOCUS } else { BORDER }))
        .style(Style::default().bg(PANEL))
}

pub fn input(label: String, value: String, focused: bool) -> Paragraph<'static> {
    Paragraph::new(value)
        .style(Style::default().fg(TEXT).bg(INPUT_BG))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(Span::styled(label, Style::default().fg(TITLE)))
                .border_style(Style::default().fg(if focused { FOCUS } else { BORDER_IDLE }))
                .style(Style::default().bg(INPUT_BG)),
        )
}

pub fn button(label: &str, focused: bool, color: Color) -> Paragraph<'static> {
    let text = if focused {
        format!("► {label} ◄")
    } else {
        format!("  {label}  ")
    };
    let style = if focused {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Rgb(180, 180, 200))
    };
    Paragraph::new(text)
        .style(style)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(if focused { color } else { BORDER })),
        )
}

pub fn help_line(text: &str) -> Paragraph<'static> {
    Paragraph::new(text.to_string())
        .style(Style::default().fg(MUTED))
        .alignment(Alignment::Center)
}

pub fn table_header(titles: &[&'static str]) -> Row<'static> {
    let cells = titles
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(TITLE)));
    Row::new(cells)
        .style(Style::default().bg(INPUT_BG))
        .height(1)
        .bottom_margin(1)
}

pub fn row_highlight(focused: bool) -> Style {
    let bg = if focused {
        HIGHLIGHT_BG
    } else {
        Color::Rgb(30, 30, 45)
    };
    Style::default().bg(bg).add_modifier(Modifier::BOLD)
}

/// Moves a table selection one row down, wrapping at the end.
pub fn select_next(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let next = match state.selected() {
        Some(i) if i + 1 < len => i + 1,
        _ => 0,
    };
    state.select(Some(next));
}

pub fn select_previous(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let previous = match state.selected() {
        Some(0) | None => len - 1,
        Some(i) => (i - 1).min(len - 1),
    };
    state.select(Some(previous));
}

/// Keeps a selection inside a freshly loaded list.
pub fn clamp_selection(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else {
        state.select(Some(state.selected().unwrap_or(0).min(len - 1)));
    }
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// A yes/no confirmation with the `Yes` button at index 0.
#[derive(Debug, Clone, Default)]
pub struct Confirm {
    pub open: bool,
    pub selected: usize,
    pub message: String,
}

pub enum ConfirmOutcome {
    Yes,
    No,
}

impl Confirm {
    pub fn ask(&mut self, message: impl Into<String>) {
        self.open = true;
        self.selected = 1;
        self.message = message.into();
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Option<ConfirmOutcome> {
        match code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                self.selected = 1 - self.selected;
                None
            }
            KeyCode::Enter => {
                self.open = false;
                Some(if self.selected == 0 {
                    ConfirmOutcome::Yes
                } else {
                    ConfirmOutcome::No
                })
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.open = false;
                Some(ConfirmOutcome::Yes)
            }
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.open = false;
                Some(ConfirmOutcome::No)
            }
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame, title: &str) {
        if !self.open {
            return;
        }
        let area = frame.area();
        let width = 50.min(area.width);
        let height = 8.min(area.height);
        let dialog_area = Rect::new(
            area.width.saturating_sub(width) / 2,
            area.height.saturating_sub(height) / 2,
            width,
            height,
        );
        frame.render_widget(Clear, dialog_area);

        let block = Block::default()
            .title(format!(" {title} "))
            .title_style(Style::default().fg(TITLE).add_modifier(Modifier::BOLD))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(BORDER_IDLE))
            .style(Style::default().bg(Color::Rgb(30, 30, 46)));
        let inner = block.inner(dialog_area);
        frame.render_widget(block, dialog_area);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(inner);

        frame.render_widget(
            Paragraph::new(self.message.clone())
                .style(Style::default().fg(TEXT).add_modifier(Modifier::BOLD))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            layout[0],
        );

        let buttons = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(layout[1]);
        let yes = if self.selected == 0 { "► Yes ◄" } else { "  Yes  " };
        let no = if self.selected == 1 { "► No ◄" } else { "  No  " };
        let style = |active: bool, color: Color| {
            if active {
                Style::default().fg(color).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Rgb(180, 180, 200))
            }
        };
        frame.render_widget(
            Paragraph::new(yes)
                .style(style(self.selected == 0, SUCCESS))
                .alignment(Alignment::Center),
            buttons[0],
        );
        frame.render_widget(
            Paragraph::new(no)
                .style(style(self.selected == 1, DANGER))
                .alignment(Alignment::Center),
            buttons[1],
        );
    }
}

/// A one-month calendar driven by the arrow keys.
#[derive(Debug, Clone)]
pub struct DatePicker {
    pub selected: Date,
    /// Dates before this one cannot be selected.
    pub earliest: Option<Date>,
}

impl DatePicker {
    pub fn new(selected: Date) -> Self {
        Self {
            selected,
            earliest: None,
        }
    }

    pub fn not_before(mut self, earliest: Date) -> Self {
        self.earliest = Some(earliest);
        if self.selected < earliest {
            self.selected = earliest;
        }
        self
    }

    /// Returns true when the selected date changed.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        let candidate = match code {
            KeyCode::Left => self.selected.previous_day(),
            KeyCode::Right => self.selected.next_day(),
            KeyCode::Up => self.selected.checked_sub(time::Duration::days(7)),
            KeyCode::Down => self.selected.checked_add(time::Duration::days(7)),
            KeyCode::PageUp => Some(shift_month(self.selected, false)),
            KeyCode::PageDown => Some(shift_month(self.selected, true)),
            _ => None,
        };
        match candidate {
            Some(date) if self.earliest.map_or(true, |earliest| date >= earliest) => {
                let changed = date != self.selected;
                self.selected = date;
                changed
            }
            _ => false,
        }
    }

    /// Renders the month of the selected date. `marks` adds extra day styles.
    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool, marks: &[(Date, Style)]) {
        let mut events = CalendarEventStore::default();
        let weekend_style = Style::default().fg(DANGER).bg(Color::Rgb(35, 25, 25));

        if let Ok(first) = Date::from_calendar_date(self.selected.year(), self.selected.month(), 1)
        {
            let mut day = first;
            while day.month() == first.month() {
                if matches!(day.weekday(), Weekday::Saturday | Weekday::Sunday) {
                    events.add(day, weekend_style);
                }
                match day.next_day() {
                    Some(next) => day = next,
                    None => break,
                }
            }
        }
        for (date, style) in marks {
            events.add(*date, *style);
        }
        events.add(
            self.selected,
            Style::default()
                .fg(Color::Rgb(20, 20, 50))
                .bg(FOCUS)
                .add_modifier(Modifier::BOLD),
        );

        let month = Monthly::new(self.selected, events)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .title(format!(" {} {} ", self.selected.month(), self.selected.year()))
                    .title_style(Style::default().fg(TITLE).add_modifier(Modifier::BOLD))
                    .border_style(Style::default().fg(if focused { FOCUS } else { BORDER_IDLE }))
                    .style(Style::default().bg(INPUT_BG)),
            )
            .show_weekdays_header(
                Style::default()
                    .fg(Color::Rgb(180, 180, 250))
                    .bg(Color::Rgb(40, 40, 60))
                    .add_modifier(Modifier::BOLD),
            )
            .default_style(Style::default().fg(TEXT).bg(INPUT_BG));
        frame.render_widget(month, area);
    }
}

/// Same day in the neighbouring month, clamped to that month's length.
pub fn shift_month(date: Date, forward: bool) -> Date {
    let (year, month) = match (forward, date.month()) {
        (true, Month::December) => (date.year() + 1, Month::January),
        (false, Month::January) => (date.year() - 1, Month::December),
        (true, month) => (date.year(), month.next()),
        (false, month) => (date.year(), month.previous()),
    };
    let day = date.day().min(time::util::days_in_month(month, year));
    Date::from_calendar_date(year, month, day).unwrap_or(date)
}

/// A text bar proportional to `value / max`.
pub fn bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let filled = ((value / max) * width as f64).round() as usize;
    "█".repeat(filled.clamp(1, width))
}
