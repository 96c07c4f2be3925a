//! Generic data-entry form used by the add/edit screens.
//!
//! Focus runs over every field and then the submit and back buttons.
//! Choice fields cycle with the arrow keys or jump by first letter.

use crate::components::widgets::{self, BORDER, INPUT_BG, SUCCESS};
use crate::tui::Frame;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Text,
    Secret,
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
    pub required: bool,
    kind: FieldKind,
    choice: usize,
}

impl Field {
    pub fn text(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            required: false,
            kind: FieldKind::Text,
            choice: 0,
        }
    }

    pub fn secret(label: &'static str) -> Self {
        Self {
            kind: FieldKind::Secret,
            ..Self::text(label)
        }
    }

    pub fn choice(label: &'static str, options: &'static [&'static str]) -> Self {
        Self {
            kind: FieldKind::Choice(options),
            required: true,
            ..Self::text(label)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    fn display(&self) -> String {
        match self.kind {
            FieldKind::Text => self.value.clone(),
            FieldKind::Secret => "•".repeat(self.value.chars().count()),
            FieldKind::Choice(options) => {
                format!("◄ {} ►", options.get(self.choice).copied().unwrap_or(""))
            }
        }
    }

    fn is_blank(&self) -> bool {
        match self.kind {
            FieldKind::Choice(_) => false,
            _ => self.value.trim().is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    Submit,
    Back,
}

#[derive(Debug, Clone)]
pub struct Form {
    pub fields: Vec<Field>,
    pub focus: usize,
}

impl Form {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields, focus: 0 }
    }

    fn submit_index(&self) -> usize {
        self.fields.len()
    }

    fn back_index(&self) -> usize {
        self.fields.len() + 1
    }

    /// Trimmed text of field `index`.
    pub fn value(&self, index: usize) -> &str {
        self.fields
            .get(index)
            .map(|field| field.value.trim())
            .unwrap_or("")
    }

    /// `None` when the field was left blank.
    pub fn optional(&self, index: usize) -> Option<String> {
        let value = self.value(index);
        (!value.is_empty()).then(|| value.to_string())
    }

    pub fn choice(&self, index: usize) -> usize {
        self.fields.get(index).map_or(0, |field| field.choice)
    }

    pub fn set_value(&mut self, index: usize, value: impl Into<String>) {
        if let Some(field) = self.fields.get_mut(index) {
            field.value = value.into();
        }
    }

    pub fn set_choice(&mut self, index: usize, choice: usize) {
        if let Some(field) = self.fields.get_mut(index) {
            if let FieldKind::Choice(options) = field.kind {
                field.choice = choice.min(options.len().saturating_sub(1));
            }
        }
    }

    /// Label of the first required field left blank.
    pub fn missing_required(&self) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|field| field.required && field.is_blank())
            .map(|field| field.label)
    }

    pub fn reset(&mut self) {
        for field in &mut self.fields {
            field.value.clear();
            field.choice = 0;
        }
        self.focus = 0;
    }

    fn cycle_choice(&mut self, forward: bool) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            if let FieldKind::Choice(options) = field.kind {
                let len = options.len().max(1);
                field.choice = if forward {
                    (field.choice + 1) % len
                } else {
                    (field.choice + len - 1) % len
                };
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<FormEvent> {
        let total = self.fields.len() + 2;
        match key.code {
            KeyCode::Char(c) => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    match field.kind {
                        FieldKind::Text | FieldKind::Secret => field.value.push(c),
                        FieldKind::Choice(options) => {
                            if let Some(position) = options.iter().position(|option| {
                                option
                                    .chars()
                                    .next()
                                    .is_some_and(|first| first.eq_ignore_ascii_case(&c))
                            }) {
                                field.choice = position;
                            }
                        }
                    }
                }
            }
            KeyCode::Backspace => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    field.value.pop();
                }
            }
            KeyCode::Left => self.cycle_choice(false),
            KeyCode::Right => self.cycle_choice(true),
            KeyCode::Tab | KeyCode::Down => self.focus = (self.focus + 1) % total,
            KeyCode::BackTab | KeyCode::Up => self.focus = (self.focus + total - 1) % total,
            KeyCode::Enter => {
                if self.focus == self.back_index() {
                    return Some(FormEvent::Back);
                }
                if self.focus == self.submit_index() {
                    return Some(FormEvent::Submit);
                }
                self.focus += 1;
            }
            KeyCode::Esc => return Some(FormEvent::Back),
            _ => {}
        }
        None
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, submit_label: &str) {
        let columns = if self.fields.len() > 6 { 2 } else { 1 };
        let per_column = self.fields.len().div_ceil(columns);

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(3)])
            .split(area);

        let column_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
            .spacing(1)
            .split(outer[0]);

        for (column, column_area) in column_areas.iter().enumerate() {
            let start = column * per_column;
            let end = (start + per_column).min(self.fields.len());
            if start >= end {
                continue;
            }
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints(vec![Constraint::Length(3); end - start])
                .split(*column_area);
            for (row, index) in (start..end).enumerate() {
                let field = &self.fields[index];
                let label = format!(" {}{} ", field.label, if field.required { "*" } else { "" });
                frame.render_widget(
                    widgets::input(label, field.display(), self.focus == index),
                    rows[row],
                );
            }
        }

        let buttons = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .spacing(2)
            .split(outer[1]);
        frame.render_widget(
            widgets::button(submit_label, self.focus == self.submit_index(), SUCCESS),
            buttons[0],
        );
        frame.render_widget(
            widgets::button("Back", self.focus == self.back_index(), widgets::DANGER),
            buttons[1],
        );
    }
}

/// A bordered panel to host a form.
pub fn form_block(title: &str) -> Block<'static> {
    Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .style(Style::default().bg(INPUT_BG))
}
