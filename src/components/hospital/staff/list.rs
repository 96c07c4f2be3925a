//! Staff list with status changes, removal and doctor schedules.

use crate::components::form::{Field, Form, FormEvent};
use crate::components::hospital::staff::StaffAction;
use crate::components::hospital::Context;
use crate::components::widgets::{
    self, centered_rect, Confirm, ConfirmOutcome, Flash, ACCENT, DANGER, SUCCESS, TEXT, WARNING,
};
use crate::models::{DoctorSchedule, StaffMember, StaffRole, StaffStatus};
use crate::tui::Frame;
use crate::utils;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};
use time::Weekday;

const WEEKDAYS: &[&str] = &[
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

fn weekday_at(index: usize) -> Weekday {
    // Monday plus `index` days
    (0..index).fold(Weekday::Monday, |day, _| day.next())
}

pub struct ListStaff {
    ctx: Context,
    staff: Vec<StaffMember>,
    state: TableState,
    show_details: bool,
    /// Schedules of the selected doctor, loaded with the details panel.
    schedules: Vec<DoctorSchedule>,
    schedule_form: Option<Form>,
    confirm: Confirm,
    flash: Flash,
}

impl ListStaff {
    pub fn new(ctx: Context) -> Self {
        let mut list = Self {
            ctx,
            staff: Vec::new(),
            state: TableState::default(),
            show_details: false,
            schedules: Vec::new(),
            schedule_form: None,
            confirm: Confirm::default(),
            flash: Flash::default(),
        };
        list.fetch_staff();
        list
    }

    pub fn fetch_staff(&mut self) {
        match self.ctx.hospital.staff(&self.ctx.session) {
            Ok(staff) => {
                self.staff = staff;
                widgets::clamp_selection(&mut self.state, self.staff.len());
                self.load_schedules();
            }
            Err(e) => self.flash.error(format!("Failed to fetch staff: {e}")),
        }
    }

    fn selected(&self) -> Option<&StaffMember> {
        self.state.selected().and_then(|i| self.staff.get(i))
    }

    fn load_schedules(&mut self) {
        self.schedules = match self.selected() {
            Some(member) if member.role == StaffRole::Doctor => self
                .ctx
                .hospital
                .schedules_for(&self.ctx.session, member.id)
                .unwrap_or_else(|e| {
                    tracing::error!("Failed to load schedules: {e}");
                    Vec::new()
                }),
            _ => Vec::new(),
        };
    }

    pub fn tick(&mut self) {
        self.flash.check_timeout();
    }

    fn cycle_status(&mut self) {
        let Some(member) = self.selected() else {
            return;
        };
        let next = match member.status {
            StaffStatus::Active => StaffStatus::OnLeave,
            StaffStatus::OnLeave => StaffStatus::Inactive,
            StaffStatus::Inactive => StaffStatus::Active,
        };
        let (id, name) = (member.id, member.name.clone());
        match self.ctx.hospital.set_staff_status(&self.ctx.session, id, next) {
            Ok(()) => {
                self.flash.success(format!("{name} is now {next}"));
                self.fetch_staff();
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn remove_selected(&mut self) {
        let Some(member) = self.selected().cloned() else {
            return;
        };
        match self.ctx.hospital.remove_staff(&self.ctx.session, member.id) {
            Ok(()) => {
                self.flash.success(format!("Removed {}", member.name));
                self.fetch_staff();
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn open_schedule_form(&mut self) {
        match self.selected().map(|member| member.role) {
            Some(StaffRole::Doctor) => {
                let (start, end) = {
                    let config = self.ctx.hospital.config();
                    (config.day_start, config.day_end)
                };
                self.schedule_form = Some(Form::new(vec![
                    Field::choice("Weekday", WEEKDAYS),
                    Field::text("Start (HH:MM)")
                        .required()
                        .with_value(utils::format_time(start)),
                    Field::text("End (HH:MM)")
                        .required()
                        .with_value(utils::format_time(end)),
                ]));
            }
            Some(_) => self.flash.error("Working hours apply to doctors only"),
            None => {}
        }
    }

    fn save_schedule(&mut self, form: &Form) -> bool {
        let Some(doctor_id) = self.selected().map(|member| member.id) else {
            return true;
        };
        let (Some(start_time), Some(end_time)) =
            (utils::parse_time(form.value(1)), utils::parse_time(form.value(2)))
        else {
            self.flash.error("Times must look like 08:30");
            return false;
        };
        if start_time >= end_time {
            self.flash.error("The working day must end after it starts");
            return false;
        }
        let schedule = DoctorSchedule {
            doctor_id,
            weekday: weekday_at(form.choice(0)),
            start_time,
            end_time,
        };
        match self.ctx.hospital.set_schedule(&self.ctx.session, &schedule) {
            Ok(()) => {
                self.flash.success(format!(
                    "{} hours set to {}–{}",
                    schedule.weekday,
                    utils::format_time(start_time),
                    utils::format_time(end_time)
                ));
                self.load_schedules();
                true
            }
            Err(e) => {
                self.flash.error(e.to_string());
                false
            }
        }
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Result<Option<StaffAction>> {
        self.tick();
        if let Some(mut form) = self.schedule_form.take() {
            let keep_open = match form.handle_key(key) {
                Some(FormEvent::Back) => false,
                Some(FormEvent::Submit) => !self.save_schedule(&form),
                None => true,
            };
            if keep_open {
                self.schedule_form = Some(form);
            }
            return Ok(None);
        }
        if self.confirm.open {
            if let Some(ConfirmOutcome::Yes) = self.confirm.handle_key(key.code) {
                self.remove_selected();
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Down => {
                widgets::select_next(&mut self.state, self.staff.len());
                self.load_schedules();
            }
            KeyCode::Up => {
                widgets::select_previous(&mut self.state, self.staff.len());
                self.load_schedules();
            }
            KeyCode::Enter => self.show_details = !self.show_details,
            KeyCode::Char('s') => self.cycle_status(),
            KeyCode::Char('w') => self.open_schedule_form(),
            KeyCode::Char('a') => return Ok(Some(StaffAction::Add)),
            KeyCode::Char('e') => {
                if let Some(member) = self.selected() {
                    return Ok(Some(StaffAction::Edit(member.clone())));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(member) = self.selected() {
                    let message = format!("Remove {} ({})?", member.name, member.employee_code);
                    self.confirm.ask(message);
                }
            }
            KeyCode::Char('r') => self.fetch_staff(),
            KeyCode::Esc | KeyCode::Char('b') => {
                if self.show_details {
                    self.show_details = false;
                } else {
                    return Ok(Some(StaffAction::BackToHome));
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn detail_lines(&self, member: &StaffMember) -> Vec<Line<'static>> {
        let label = |text: &'static str| Span::styled(text, Style::default().fg(ACCENT));
        let mut lines = vec![Line::from(vec![
            label("Email: "),
            Span::raw(member.email.clone()),
            label("   Address: "),
            Span::raw(member.address.clone()),
            label("   Joined: "),
            Span::raw(utils::format_date(member.joined_on)),
        ])];
        match member.role {
            StaffRole::Doctor => {
                lines.push(Line::from(vec![
                    label("Specialization: "),
                    Span::raw(member.specialization.clone().unwrap_or_default()),
                    label("   License: "),
                    Span::raw(member.license_number.clone().unwrap_or_default()),
                    label("   Fee: "),
                    Span::raw(
                        member
                            .consultation_fee
                            .map(|fee| self.ctx.money(fee))
                            .unwrap_or_default(),
                    ),
                ]));
                let hours = if self.schedules.is_empty() {
                    "default hours".to_string()
                } else {
                    self.schedules
                        .iter()
                        .map(|s| {
                            format!(
                                "{} {}–{}",
                                s.weekday,
                                utils::format_time(s.start_time),
                                utils::format_time(s.end_time)
                            )
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                lines.push(Line::from(vec![label("Hours: "), Span::raw(hours)]));
            }
            StaffRole::Nurse => lines.push(Line::from(vec![
                label("Shift: "),
                Span::raw(member.shift.map(|s| s.to_string()).unwrap_or_default()),
                label("   Wards: "),
                Span::raw(member.wards.join(", ")),
            ])),
            _ => {}
        }
        lines
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(if self.show_details { 5 } else { 0 }),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(area);

        widgets::render_header(frame, layout[0], "👥 Staff Directory");

        let header =
            widgets::table_header(&["Code", "Name", "Role", "Department", "Phone", "Status"]);
        let rows = self.staff.iter().map(|member| {
            let status_color = match member.status {
                StaffStatus::Active => SUCCESS,
                StaffStatus::OnLeave => WARNING,
                StaffStatus::Inactive => DANGER,
            };
            Row::new(vec![
                Cell::from(member.employee_code.clone()),
                Cell::from(member.name.clone()),
                Cell::from(member.role.as_str()),
                Cell::from(member.department.clone().unwrap_or_default()),
                Cell::from(member.phone_number.clone()),
                Cell::from(member.status.as_str()).style(Style::default().fg(status_color)),
            ])
            .style(Style::default().fg(TEXT))
        });
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(14),
                Constraint::Percentage(24),
                Constraint::Percentage(14),
                Constraint::Percentage(18),
                Constraint::Percentage(16),
                Constraint::Percentage(14),
            ],
        )
        .header(header)
        .block(widgets::panel(&format!("Staff ({})", self.staff.len()), true))
        .row_highlight_style(widgets::row_highlight(true))
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, layout[1], &mut self.state.clone());

        if self.show_details {
            if let Some(member) = self.selected() {
                let details = Paragraph::new(self.detail_lines(member))
                    .style(Style::default().fg(TEXT))
                    .block(widgets::panel(&member.name, false))
                    .wrap(Wrap { trim: true });
                frame.render_widget(details, layout[2]);
            }
        }

        self.flash.render(frame, layout[3]);
        frame.render_widget(
            widgets::help_line(
                "↑↓: Navigate | Enter: Details | S: Cycle status | W: Working hours | A: Add | E: Edit | D: Remove | Esc: Back",
            ),
            layout[4],
        );

        if let Some(form) = &self.schedule_form {
            let popup = centered_rect(50, 60, area);
            frame.render_widget(Clear, popup);
            let block = widgets::panel("Working Hours", true);
            let inner = block.inner(popup);
            frame.render_widget(block, popup);
            form.render(frame, inner.inner(Margin::new(1, 1)), "Save");
        }
        self.confirm.render(frame, "Confirm Removal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use crate::components::hospital::tests::demo_context;

    fn press(list: &mut ListStaff, code: KeyCode) {
        list.handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap();
    }

    #[test]
    fn weekdays_map_from_monday() {
        assert_eq!(weekday_at(0), Weekday::Monday);
        assert_eq!(weekday_at(6), Weekday::Sunday);
    }

    #[test]
    fn status_cycles_through_the_service() {
        let mut list = ListStaff::new(demo_context("root"));
        let before = list.selected().unwrap().status;
        press(&mut list, KeyCode::Char('s'));
        assert_ne!(list.selected().unwrap().status, before);
    }

    #[test]
    fn doctors_get_working_hours() {
        let mut list = ListStaff::new(demo_context("root"));
        let index = list
            .staff
            .iter()
            .position(|m| m.name == "Dr. Gregory House")
            .unwrap();
        list.state.select(Some(index));
        press(&mut list, KeyCode::Char('w'));
        let form = list.schedule_form.as_mut().unwrap();
        form.set_choice(0, 5);
        form.focus = form.fields.len();
        press(&mut list, KeyCode::Enter);
        assert!(list.schedule_form.is_none());
        assert!(list.schedules.iter().any(|s| s.weekday == Weekday::Saturday));
    }
}
