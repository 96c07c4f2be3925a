use crate::auth::Permission;
use crate::components::hospital::appointments::AppointmentAction;
use crate::components::hospital::Context;
use crate::components::widgets::{
    self, Confirm, ConfirmOutcome, Flash, ACCENT, DANGER, FOCUS, MUTED, SUCCESS, TEXT, WARNING,
};
use crate::models::{Appointment, AppointmentStatus, UserRole};
use crate::tui::Frame;
use crate::utils;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    Upcoming,
    Today,
    All,
}

impl Filter {
    fn next(self) -> Self {
        match self {
            Filter::Upcoming => Filter::Today,
            Filter::Today => Filter::All,
            Filter::All => Filter::Upcoming,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Filter::Upcoming => "Upcoming",
            Filter::Today => "Today",
            Filter::All => "All",
        }
    }
}

pub fn status_color(status: AppointmentStatus) -> Color {
    match status {
        AppointmentStatus::Scheduled => ACCENT,
        AppointmentStatus::Confirmed => SUCCESS,
        AppointmentStatus::InProgress => WARNING,
        AppointmentStatus::Completed => MUTED,
        AppointmentStatus::Cancelled | AppointmentStatus::NoShow => DANGER,
    }
}

pub struct ListAppointments {
    ctx: Context,
    appointments: Vec<Appointment>,
    patient_names: HashMap<i64, String>,
    doctor_names: HashMap<i64, String>,
    filter: Filter,
    state: TableState,
    confirm: Confirm,
    flash: Flash,
}

impl ListAppointments {
    pub fn new(ctx: Context) -> Self {
        let mut list = Self {
            ctx,
            appointments: Vec::new(),
            patient_names: HashMap::new(),
            doctor_names: HashMap::new(),
            filter: Filter::Upcoming,
            state: TableState::default(),
            confirm: Confirm::default(),
            flash: Flash::default(),
        };
        list.load_names();
        list.fetch_appointments();
        list
    }

    fn is_patient(&self) -> bool {
        self.ctx.session.role == UserRole::Patient
    }

    fn load_names(&mut self) {
        let session = &self.ctx.session;
        let patients = match session.patient_id {
            Some(own) if self.is_patient() => {
                self.ctx.hospital.patient(session, own).map(|p| vec![p])
            }
            _ => self.ctx.hospital.patients(session),
        };
        if let Ok(patients) = patients {
            self.patient_names = patients.into_iter().map(|p| (p.id, p.full_name())).collect();
        }
        if let Ok(doctors) = self.ctx.hospital.doctors(session) {
            self.doctor_names = doctors.into_iter().map(|d| (d.id, d.name)).collect();
        }
    }

    pub fn fetch_appointments(&mut self) {
        let session = &self.ctx.session;
        let result = match session.patient_id {
            Some(own) if self.is_patient() => {
                self.ctx.hospital.appointments_for_patient(session, own)
            }
            _ if self.filter == Filter::Today => {
                self.ctx.hospital.appointments_on(session, utils::today())
            }
            _ => self.ctx.hospital.appointments(session),
        };
        match result {
            Ok(all) => {
                let today = utils::today();
                self.appointments = all
                    .into_iter()
                    .filter(|a| match self.filter {
                        Filter::Upcoming => a.date >= today && !a.status.is_terminal(),
                        Filter::Today => a.date == today,
                        Filter::All => true,
                    })
                    .collect();
                widgets::clamp_selection(&mut self.state, self.appointments.len());
            }
            Err(e) => self.flash.error(format!("Failed to fetch appointments: {e}")),
        }
    }

    fn selected(&self) -> Option<&Appointment> {
        self.state.selected().and_then(|i| self.appointments.get(i))
    }

    fn patient_name(&self, id: i64) -> String {
        self.patient_names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Patient #{id}"))
    }

    fn doctor_name(&self, id: i64) -> String {
        self.doctor_names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Doctor #{id}"))
    }

    pub fn tick(&mut self) {
        self.flash.check_timeout();
    }

    fn set_status(&mut self, status: AppointmentStatus) {
        let Some(id) = self.selected().map(|a| a.id) else {
            return;
        };
        match self
            .ctx
            .hospital
            .update_appointment_status(&self.ctx.session, id, status, None)
        {
            Ok(updated) => {
                self.flash
                    .success(format!("Appointment #{} is now {}", updated.id, updated.status));
                self.fetch_appointments();
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn cancel_selected(&mut self) {
        let Some(id) = self.selected().map(|a| a.id) else {
            return;
        };
        match self.ctx.hospital.cancel_appointment(&self.ctx.session, id) {
            Ok(_) => {
                self.flash.success(format!("Appointment #{id} cancelled"));
                self.fetch_appointments();
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Result<Option<AppointmentAction>> {
        self.tick();
        if self.confirm.open {
            if let Some(ConfirmOutcome::Yes) = self.confirm.handle_key(key.code) {
                self.cancel_selected();
            }
            return Ok(None);
        }

        let can_update = self.ctx.session.can(Permission::UpdateAppointments);
        match key.code {
            KeyCode::Esc => return Ok(Some(AppointmentAction::BackToHome)),
            KeyCode::Down => widgets::select_next(&mut self.state, self.appointments.len()),
            KeyCode::Up => widgets::select_previous(&mut self.state, self.appointments.len()),
            KeyCode::Char('b') => return Ok(Some(AppointmentAction::Book)),
            KeyCode::Char('f') => {
                self.filter = self.filter.next();
                self.fetch_appointments();
            }
            KeyCode::Char('r') => {
                self.load_names();
                self.fetch_appointments();
            }
            KeyCode::Char('m') => {
                if let Some(appointment) = self.selected() {
                    return Ok(Some(AppointmentAction::Reschedule(appointment.clone())));
                }
            }
            KeyCode::Char('x') => {
                if let Some(appointment) = self.selected() {
                    let message = format!(
                        "Cancel the appointment of {} on {} at {}?",
                        self.patient_name(appointment.patient_id),
                        utils::format_date(appointment.date),
                        utils::format_time(appointment.start_time)
                    );
                    self.confirm.ask(message);
                }
            }
            KeyCode::Char('c') if can_update => self.set_status(AppointmentStatus::Confirmed),
            KeyCode::Char('i') if can_update => self.set_status(AppointmentStatus::InProgress),
            KeyCode::Char('d') if can_update => self.set_status(AppointmentStatus::Completed),
            KeyCode::Char('n') if can_update => self.set_status(AppointmentStatus::NoShow),
            _ => {}
        }
        Ok(None)
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(5),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(area);

        widgets::render_header(frame, layout[0], "📋 Appointments");

        let rows = self.appointments.iter().map(|a| {
            Row::new(vec![
                Cell::from(a.id.to_string()),
                Cell::from(utils::format_date(a.date)),
                Cell::from(format!(
                    "{}-{}",
                    utils::format_time(a.start_time),
                    utils::format_time(a.end_time())
                )),
                Cell::from(self.patient_name(a.patient_id)),
                Cell::from(self.doctor_name(a.doctor_id)),
                Cell::from(a.reason.clone()),
                Cell::from(a.status.as_str()).style(Style::default().fg(status_color(a.status))),
            ])
            .style(Style::default().fg(TEXT))
        });
        let title = format!(
            "{} appointments ({})",
            self.filter.label(),
            self.appointments.len()
        );
        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Length(11),
                Constraint::Length(12),
                Constraint::Percentage(20),
                Constraint::Percentage(20),
                Constraint::Min(10),
                Constraint::Length(12),
            ],
        )
        .header(widgets::table_header(&[
            "ID", "Date", "Time", "Patient", "Doctor", "Reason", "Status",
        ]))
        .block(widgets::panel(&title, true))
        .row_highlight_style(widgets::row_highlight(true))
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, layout[1], &mut self.state.clone());

        let details = match self.selected() {
            Some(a) => vec![
                Line::from(vec![
                    Span::styled("Patient: ", Style::default().fg(MUTED)),
                    Span::styled(self.patient_name(a.patient_id), Style::default().fg(TEXT)),
                    Span::styled("   Doctor: ", Style::default().fg(MUTED)),
                    Span::styled(self.doctor_name(a.doctor_id), Style::default().fg(TEXT)),
                ]),
                Line::from(vec![
                    Span::styled("Duration: ", Style::default().fg(MUTED)),
                    Span::styled(
                        format!("{} min", a.duration_minutes),
                        Style::default().fg(TEXT),
                    ),
                    Span::styled("   Booked: ", Style::default().fg(MUTED)),
                    Span::styled(utils::format_datetime(a.created_at), Style::default().fg(TEXT)),
                ]),
                Line::from(vec![
                    Span::styled("Notes: ", Style::default().fg(MUTED)),
                    Span::styled(
                        a.notes.clone().unwrap_or_else(|| "-".to_string()),
                        Style::default().fg(TEXT),
                    ),
                ]),
            ],
            None => vec![Line::from(Span::styled(
                "No appointments match this view",
                Style::default().fg(MUTED),
            ))],
        };
        frame.render_widget(
            Paragraph::new(details).block(widgets::panel("Details", false)),
            layout[2],
        );

        self.flash.render(frame, layout[3]);
        let help = if self.ctx.session.can(Permission::UpdateAppointments) {
            "↑↓: Select | b: Book | m: Move | c: Confirm | i: Start | d: Done | n: No-show | x: Cancel | f: Filter | Esc: Back"
        } else {
            "↑↓: Select | b: Book | m: Move | x: Cancel | f: Filter | r: Refresh | Esc: Back"
        };
        frame.render_widget(
            Paragraph::new(help)
                .style(Style::default().fg(FOCUS))
                .alignment(Alignment::Center),
            layout[4],
        );
        self.confirm.render(frame, "Cancel Appointment");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::hospital::tests::demo_context;
    use crate::models::NewAppointment;
    use crossterm::event::KeyModifiers;
    use time::{Duration, Weekday};

    fn press(list: &mut ListAppointments, code: KeyCode) -> Option<AppointmentAction> {
        list.handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    fn book_next_week(ctx: &Context) -> Appointment {
        let mut date = utils::today() + Duration::days(7);
        while date.weekday() != Weekday::Tuesday {
            date = date.next_day().unwrap();
        }
        let doctor = ctx.hospital.doctors(&ctx.session).unwrap()[0].clone();
        let patient = ctx.hospital.patients(&ctx.session).unwrap()[0].clone();
        let slot = ctx
            .hospital
            .available_slots(&ctx.session, doctor.id, date)
            .unwrap()
            .into_iter()
            .find(|s| s.available)
            .unwrap();
        ctx.hospital
            .book_appointment(
                &ctx.session,
                &NewAppointment {
                    patient_id: patient.id,
                    doctor_id: doctor.id,
                    date,
                    start_time: slot.start,
                    duration_minutes: 30,
                    reason: "Follow-up".into(),
                    notes: None,
                },
            )
            .unwrap()
    }

    fn select(list: &mut ListAppointments, id: i64) {
        let index = list.appointments.iter().position(|a| a.id == id).unwrap();
        list.state.select(Some(index));
    }

    #[test]
    fn confirms_and_cancels_an_appointment() {
        let ctx = demo_context("pam");
        let booked = book_next_week(&ctx);
        let mut list = ListAppointments::new(ctx);
        select(&mut list, booked.id);

        press(&mut list, KeyCode::Char('c'));
        let current = list.appointments.iter().find(|a| a.id == booked.id).unwrap();
        assert_eq!(current.status, AppointmentStatus::Confirmed);

        press(&mut list, KeyCode::Char('x'));
        assert!(list.confirm.open);
        press(&mut list, KeyCode::Char('y'));
        // Cancelled appointments leave the upcoming view.
        assert!(list.appointments.iter().all(|a| a.id != booked.id));
    }

    #[test]
    fn invalid_transitions_are_reported() {
        let ctx = demo_context("pam");
        let booked = book_next_week(&ctx);
        let mut list = ListAppointments::new(ctx);
        select(&mut list, booked.id);
        press(&mut list, KeyCode::Char('d'));
        assert!(list.flash.error_message().is_some());
    }

    #[test]
    fn reschedule_carries_the_selected_appointment() {
        let ctx = demo_context("pam");
        let booked = book_next_week(&ctx);
        let mut list = ListAppointments::new(ctx);
        select(&mut list, booked.id);
        match press(&mut list, KeyCode::Char('m')) {
            Some(AppointmentAction::Reschedule(a)) => assert_eq!(a.id, booked.id),
            _ => panic!("expected a reschedule action"),
        }
    }

    #[test]
    fn patients_only_see_their_own() {
        let ctx = demo_context("ada");
        let own = ctx.session.patient_id.unwrap();
        let mut list = ListAppointments::new(ctx);
        list.filter = Filter::All;
        list.fetch_appointments();
        assert!(list.appointments.iter().all(|a| a.patient_id == own));
    }
}
