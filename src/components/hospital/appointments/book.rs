//! Appointment booking: patient and doctor pickers, a calendar and the
//! doctor's slot grid for the chosen day.
//!
//! The same screen reschedules an existing appointment, in which case the
//! patient and doctor are fixed.

use crate::components::hospital::appointments::AppointmentAction;
use crate::components::hospital::Context;
use crate::components::widgets::{
    self, DatePicker, Flash, ACCENT, FOCUS, HIGHLIGHT_BG, MUTED, SUCCESS, TEXT,
};
use crate::models::{Appointment, NewAppointment, Patient, StaffMember, UserRole};
use crate::scheduling::TimeSlot;
use crate::tui::Frame;
use crate::utils;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};
use std::cell::Cell;

const PATIENTS: usize = 0;
const DOCTORS: usize = 1;
const CALENDAR: usize = 2;
const SLOTS: usize = 3;
const REASON: usize = 4;
const BOOK: usize = 5;
const FOCUS_COUNT: usize = 6;

const SLOTS_PER_ROW: usize = 6;

pub struct BookAppointment {
    ctx: Context,
    patients: Vec<Patient>,
    patient_state: TableState,
    doctors: Vec<StaffMember>,
    doctor_state: TableState,
    picker: DatePicker,
    slots: Vec<TimeSlot>,
    slot_index: usize,
    reason: String,
    focus: usize,
    /// Set when moving an existing appointment.
    rescheduling: Option<Appointment>,
    /// Slots per row in the last drawn grid; ↑↓ move by this much.
    slots_per_row: Cell<usize>,
    flash: Flash,
}

impl BookAppointment {
    pub fn new(ctx: Context) -> Self {
        let today = utils::today();
        let mut screen = Self {
            ctx,
            patients: Vec::new(),
            patient_state: TableState::default(),
            doctors: Vec::new(),
            doctor_state: TableState::default(),
            picker: DatePicker::new(today).not_before(today),
            slots: Vec::new(),
            slot_index: 0,
            reason: String::new(),
            focus: PATIENTS,
            rescheduling: None,
            slots_per_row: Cell::new(SLOTS_PER_ROW),
            flash: Flash::default(),
        };
        screen.load_people();
        if screen.patient_locked() {
            screen.focus = DOCTORS;
        }
        screen.refresh_slots();
        screen
    }

    pub fn reschedule(ctx: Context, appointment: Appointment) -> Self {
        let mut screen = Self::new(ctx);
        if let Some(i) = screen.patients.iter().position(|p| p.id == appointment.patient_id) {
            screen.patient_state.select(Some(i));
        }
        if let Some(i) = screen.doctors.iter().position(|d| d.id == appointment.doctor_id) {
            screen.doctor_state.select(Some(i));
        }
        if appointment.date >= utils::today() {
            screen.picker.selected = appointment.date;
        }
        screen.reason = appointment.reason.clone();
        screen.rescheduling = Some(appointment);
        screen.focus = CALENDAR;
        screen.refresh_slots();
        screen
    }

    fn patient_locked(&self) -> bool {
        self.ctx.session.role == UserRole::Patient || self.rescheduling.is_some()
    }

    fn load_people(&mut self) {
        let session = &self.ctx.session;
        let patients = match session.patient_id {
            Some(own) if session.role == UserRole::Patient => {
                self.ctx.hospital.patient(session, own).map(|p| vec![p])
            }
            _ => self.ctx.hospital.patients(session),
        };
        match patients {
            Ok(patients) => self.patients = patients,
            Err(e) => self.flash.error(format!("Failed to load patients: {e}")),
        }
        match self.ctx.hospital.doctors(session) {
            Ok(doctors) => self.doctors = doctors,
            Err(e) => self.flash.error(format!("Failed to load doctors: {e}")),
        }
        widgets::clamp_selection(&mut self.patient_state, self.patients.len());
        widgets::clamp_selection(&mut self.doctor_state, self.doctors.len());
    }

    fn selected_patient(&self) -> Option<&Patient> {
        self.patient_state.selected().and_then(|i| self.patients.get(i))
    }

    fn selected_doctor(&self) -> Option<&StaffMember> {
        self.doctor_state.selected().and_then(|i| self.doctors.get(i))
    }

    /// Reloads the grid. A failed lookup is logged and shows no slots.
    fn refresh_slots(&mut self) {
        let Some(doctor_id) = self.selected_doctor().map(|d| d.id) else {
            self.slots.clear();
            return;
        };
        let date = self.picker.selected;
        self.slots = match self
            .ctx
            .hospital
            .available_slots(&self.ctx.session, doctor_id, date)
        {
            Ok(slots) => slots,
            Err(e) => {
                tracing::error!(doctor_id, date = %utils::format_date(date), "Slot lookup failed: {e}");
                Vec::new()
            }
        };
        self.slot_index = self
            .slots
            .iter()
            .position(|slot| slot.available)
            .unwrap_or(0);
    }

    fn selected_slot(&self) -> Option<&TimeSlot> {
        self.slots.get(self.slot_index)
    }

    pub fn tick(&mut self) {
        self.flash.check_timeout();
    }

    fn book(&mut self) {
        let (Some(patient_id), Some(doctor_id)) = (
            self.selected_patient().map(|p| p.id),
            self.selected_doctor().map(|d| d.id),
        ) else {
            self.flash.error("Choose a patient and a doctor first");
            return;
        };
        let Some(slot) = self.selected_slot().cloned() else {
            self.flash.error("The doctor has no slots on this day");
            return;
        };
        if !slot.available {
            self.flash.error(format!("{} is already taken", slot.label()));
            return;
        }
        let date = self.picker.selected;

        let result = match &self.rescheduling {
            Some(existing) => self
                .ctx
                .hospital
                .reschedule_appointment(&self.ctx.session, existing.id, date, slot.start)
                .map(|a| format!("Appointment #{} moved to {}", a.id, describe(&a))),
            None => {
                let request = NewAppointment {
                    patient_id,
                    doctor_id,
                    date,
                    start_time: slot.start,
                    duration_minutes: self.ctx.hospital.config().slot_minutes,
                    reason: self.reason.trim().to_string(),
                    notes: None,
                };
                self.ctx
                    .hospital
                    .book_appointment(&self.ctx.session, &request)
                    .map(|a| format!("Booked #{} for {}", a.id, describe(&a)))
            }
        };
        match result {
            Ok(message) => {
                self.flash.success(message);
                if self.rescheduling.is_none() {
                    self.reason.clear();
                }
            }
            Err(e) => self.flash.error(e.to_string()),
        }
        self.refresh_slots();
    }

    fn next_focus(&self, forward: bool) -> usize {
        let mut focus = self.focus;
        loop {
            focus = if forward {
                (focus + 1) % FOCUS_COUNT
            } else {
                (focus + FOCUS_COUNT - 1) % FOCUS_COUNT
            };
            let locked = match focus {
                PATIENTS => self.patient_locked(),
                DOCTORS => self.rescheduling.is_some(),
                REASON => self.rescheduling.is_some(),
                _ => false,
            };
            if !locked {
                return focus;
            }
        }
    }

    fn move_slot(&mut self, code: KeyCode) {
        if self.slots.is_empty() {
            return;
        }
        let last = self.slots.len() - 1;
        let per_row = self.slots_per_row.get();
        self.slot_index = match code {
            KeyCode::Left => self.slot_index.saturating_sub(1),
            KeyCode::Right => (self.slot_index + 1).min(last),
            KeyCode::Up => self.slot_index.saturating_sub(per_row),
            KeyCode::Down => (self.slot_index + per_row).min(last),
            _ => self.slot_index,
        };
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Result<Option<AppointmentAction>> {
        self.tick();
        match key.code {
            KeyCode::Esc => return Ok(Some(AppointmentAction::BackToList)),
            KeyCode::Tab => {
                self.focus = self.next_focus(true);
                return Ok(None);
            }
            KeyCode::BackTab => {
                self.focus = self.next_focus(false);
                return Ok(None);
            }
            _ => {}
        }

        match self.focus {
            PATIENTS => match key.code {
                KeyCode::Down => widgets::select_next(&mut self.patient_state, self.patients.len()),
                KeyCode::Up => {
                    widgets::select_previous(&mut self.patient_state, self.patients.len())
                }
                KeyCode::Enter => self.focus = self.next_focus(true),
                _ => {}
            },
            DOCTORS => match key.code {
                KeyCode::Down => {
                    widgets::select_next(&mut self.doctor_state, self.doctors.len());
                    self.refresh_slots();
                }
                KeyCode::Up => {
                    widgets::select_previous(&mut self.doctor_state, self.doctors.len());
                    self.refresh_slots();
                }
                KeyCode::Enter => self.focus = self.next_focus(true),
                _ => {}
            },
            CALENDAR => {
                if key.code == KeyCode::Enter {
                    self.focus = SLOTS;
                } else if self.picker.handle_key(key.code) {
                    self.refresh_slots();
                }
            }
            SLOTS => match key.code {
                KeyCode::Enter => {
                    self.focus = if self.rescheduling.is_some() { BOOK } else { REASON }
                }
                code => self.move_slot(code),
            },
            REASON => match key.code {
                KeyCode::Char(c) => self.reason.push(c),
                KeyCode::Backspace => {
                    self.reason.pop();
                }
                KeyCode::Enter => self.focus = BOOK,
                _ => {}
            },
            _ => {
                if key.code == KeyCode::Enter {
                    self.book();
                }
            }
        }
        Ok(None)
    }

    fn slot_lines(&self, width: u16) -> Vec<Line<'static>> {
        let per_row = SLOTS_PER_ROW.min(usize::from(width / 9).max(1));
        self.slots_per_row.set(per_row);
        self.slots
            .chunks(per_row)
            .enumerate()
            .map(|(row, chunk)| {
                let spans: Vec<Span> = chunk
                    .iter()
                    .enumerate()
                    .flat_map(|(col, slot)| {
                        let index = row * per_row + col;
                        let mut style = if slot.available {
                            Style::default().fg(SUCCESS)
                        } else {
                            Style::default()
                                .fg(Color::Rgb(120, 70, 70))
                                .add_modifier(Modifier::CROSSED_OUT)
                        };
                        if index == self.slot_index {
                            style = style.bg(HIGHLIGHT_BG).add_modifier(Modifier::BOLD);
                            if self.focus == SLOTS {
                                style = style.fg(FOCUS);
                            }
                        }
                        [
                            Span::styled(format!(" {} ", utils::format_time(slot.start)), style),
                            Span::raw("  "),
                        ]
                    })
                    .collect();
                Line::from(spans)
            })
            .collect()
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(12),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(area);

        let title = if self.rescheduling.is_some() {
            "📅 Reschedule Appointment"
        } else {
            "📅 Book Appointment"
        };
        widgets::render_header(frame, layout[0], title);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(50),
            ])
            .spacing(1)
            .split(layout[1]);

        let patient_rows = self.patients.iter().map(|p| {
            Row::new(vec![ratatui::widgets::Cell::from(p.id.to_string()), ratatui::widgets::Cell::from(p.full_name())])
                .style(Style::default().fg(TEXT))
        });
        let patients = Table::new(patient_rows, [Constraint::Length(5), Constraint::Min(10)])
            .block(widgets::panel("Patient", self.focus == PATIENTS))
            .row_highlight_style(widgets::row_highlight(self.focus == PATIENTS))
            .highlight_symbol("► ");
        frame.render_stateful_widget(patients, columns[0], &mut self.patient_state.clone());

        let doctor_rows = self.doctors.iter().map(|d| {
            Row::new(vec![
                ratatui::widgets::Cell::from(d.name.clone()),
                ratatui::widgets::Cell::from(d.specialization.clone().unwrap_or_default())
                    .style(Style::default().fg(MUTED)),
            ])
            .style(Style::default().fg(TEXT))
        });
        let doctors = Table::new(doctor_rows, [Constraint::Percentage(55), Constraint::Percentage(45)])
            .block(widgets::panel("Doctor", self.focus == DOCTORS))
            .row_highlight_style(widgets::row_highlight(self.focus == DOCTORS))
            .highlight_symbol("► ");
        frame.render_stateful_widget(doctors, columns[1], &mut self.doctor_state.clone());

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(10), Constraint::Min(4)])
            .split(columns[2]);
        self.picker
            .render(frame, right[0], self.focus == CALENDAR, &[]);

        let free = self.slots.iter().filter(|s| s.available).count();
        let slot_title = format!(
            "Slots on {} ({free} free of {})",
            utils::format_date(self.picker.selected),
            self.slots.len()
        );
        let slot_body = if self.slots.is_empty() {
            vec![Line::from(Span::styled(
                "No availability for this doctor and day",
                Style::default().fg(MUTED),
            ))]
        } else {
            self.slot_lines(right[1].width.saturating_sub(2))
        };
        frame.render_widget(
            Paragraph::new(slot_body).block(widgets::panel(&slot_title, self.focus == SLOTS)),
            right[1],
        );

        let reason_label = if self.rescheduling.is_some() {
            " Reason (fixed) ".to_string()
        } else {
            " Reason for visit* ".to_string()
        };
        frame.render_widget(
            widgets::input(reason_label, self.reason.clone(), self.focus == REASON),
            layout[2],
        );

        let summary = match (self.selected_patient(), self.selected_doctor(), self.selected_slot()) {
            (Some(p), Some(d), Some(s)) => format!(
                "{} with {} on {} at {}",
                p.full_name(),
                d.name,
                utils::format_date(self.picker.selected),
                s.label()
            ),
            _ => "Choose a patient, doctor, day and slot".to_string(),
        };
        let action = if self.rescheduling.is_some() {
            "Move"
        } else {
            "Book"
        };
        frame.render_widget(
            widgets::button(&format!("{action}: {summary}"), self.focus == BOOK, ACCENT),
            layout[3],
        );

        self.flash.render(frame, layout[4]);
        frame.render_widget(
            widgets::help_line(
                "Tab: Next panel | ↑↓←→: Move | PgUp/PgDn: Month | Enter: Confirm step | Esc: Back",
            ),
            layout[5],
        );
    }
}

fn describe(appointment: &Appointment) -> String {
    format!(
        "{} at {}",
        utils::format_date(appointment.date),
        utils::format_time(appointment.start_time)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::hospital::tests::demo_context;
    use crossterm::event::KeyModifiers;

    fn press(screen: &mut BookAppointment, code: KeyCode) {
        screen
            .handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap();
    }

    /// Moves the calendar to the next Monday so the slot grid is predictable.
    fn next_monday(screen: &mut BookAppointment) {
        screen.focus = CALENDAR;
        press(screen, KeyCode::Down);
        while screen.picker.selected.weekday() != time::Weekday::Monday {
            press(screen, KeyCode::Right);
        }
    }

    #[test]
    fn booking_takes_the_slot() {
        let mut screen = BookAppointment::new(demo_context("pam"));
        next_monday(&mut screen);
        let free_before = screen.slots.iter().filter(|s| s.available).count();
        assert!(free_before > 0);

        screen.reason = "Check-up".into();
        screen.focus = BOOK;
        press(&mut screen, KeyCode::Enter);
        assert!(screen.flash.error_message().is_none(), "{:?}", screen.flash.error_message());
        let free_after = screen.slots.iter().filter(|s| s.available).count();
        assert_eq!(free_after, free_before - 1);
    }

    #[test]
    fn taken_slots_cannot_be_booked() {
        let mut screen = BookAppointment::new(demo_context("pam"));
        next_monday(&mut screen);
        screen.reason = "First".into();
        let first = screen.slot_index;
        screen.focus = BOOK;
        press(&mut screen, KeyCode::Enter);

        screen.slot_index = first;
        screen.reason = "Second".into();
        press(&mut screen, KeyCode::Enter);
        assert!(screen.flash.error_message().is_some());
    }

    #[test]
    fn vertical_moves_follow_the_drawn_row_width() {
        let mut screen = BookAppointment::new(demo_context("pam"));
        next_monday(&mut screen);
        screen.focus = SLOTS;
        screen.slot_index = 0;
        press(&mut screen, KeyCode::Down);
        assert_eq!(screen.slot_index, SLOTS_PER_ROW);

        let lines = screen.slot_lines(27);
        assert_eq!(lines.len(), screen.slots.len().div_ceil(3));
        screen.slot_index = 0;
        press(&mut screen, KeyCode::Down);
        assert_eq!(screen.slot_index, 3);
        press(&mut screen, KeyCode::Up);
        assert_eq!(screen.slot_index, 0);
    }

    #[test]
    fn patients_book_for_themselves() {
        let screen = BookAppointment::new(demo_context("ada"));
        assert_eq!(screen.patients.len(), 1);
        assert_eq!(screen.focus, DOCTORS);
        assert_eq!(screen.next_focus(false), BOOK);
    }
}
