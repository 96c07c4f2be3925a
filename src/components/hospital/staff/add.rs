//! Staff form, used both to hire and to edit a member.

use crate::auth::Credentials;
use crate::components::form::{form_block, Field, Form, FormEvent};
use crate::components::hospital::staff::StaffAction;
use crate::components::hospital::Context;
use crate::components::widgets::{self, Flash};
use crate::models::{Shift, StaffMember, StaffRole, StaffStatus};
use crate::tui::Frame;
use crate::utils;
use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

const ROLES: &[&str] = &["Doctor", "Nurse", "Receptionist", "Admin", "Technician"];
const SHIFTS: &[&str] = &["None", "Morning", "Afternoon", "Night"];

const NAME: usize = 0;
const ROLE: usize = 1;
const DEPARTMENT: usize = 2;
const PHONE: usize = 3;
const EMAIL: usize = 4;
const ADDRESS: usize = 5;
const SPECIALIZATION: usize = 6;
const LICENSE: usize = 7;
const FEE: usize = 8;
const SHIFT: usize = 9;
const WARDS: usize = 10;
const USERNAME: usize = 11;
const PASSWORD: usize = 12;

pub struct AddStaff {
    ctx: Context,
    form: Form,
    flash: Flash,
    /// The member being edited; `None` when hiring.
    editing: Option<StaffMember>,
}

impl AddStaff {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            form: Form::new(vec![
                Field::text("Name").required(),
                Field::choice("Role", ROLES),
                Field::text("Department"),
                Field::text("Phone").required(),
                Field::text("Email").required(),
                Field::text("Address"),
                Field::text("Specialization (doctors)"),
                Field::text("License No. (doctors)"),
                Field::text("Consultation Fee (doctors)"),
                Field::choice("Shift (nurses)", SHIFTS),
                Field::text("Wards, comma separated (nurses)"),
                Field::text("Login Username (optional)"),
                Field::secret("Login Password"),
            ]),
            flash: Flash::default(),
            editing: None,
        }
    }

    pub fn edit(ctx: Context, member: StaffMember) -> Self {
        let mut screen = Self::new(ctx);
        let form = &mut screen.form;
        form.set_value(NAME, member.name.clone());
        form.set_choice(
            ROLE,
            StaffRole::ALL.iter().position(|r| *r == member.role).unwrap_or(0),
        );
        form.set_value(DEPARTMENT, member.department.clone().unwrap_or_default());
        form.set_value(PHONE, member.phone_number.clone());
        form.set_value(EMAIL, member.email.clone());
        form.set_value(ADDRESS, member.address.clone());
        form.set_value(SPECIALIZATION, member.specialization.clone().unwrap_or_default());
        form.set_value(LICENSE, member.license_number.clone().unwrap_or_default());
        form.set_value(
            FEE,
            member.consultation_fee.map(|fee| fee.to_string()).unwrap_or_default(),
        );
        form.set_choice(
            SHIFT,
            member
                .shift
                .and_then(|shift| Shift::ALL.iter().position(|s| *s == shift))
                .map_or(0, |i| i + 1),
        );
        form.set_value(WARDS, member.wards.join(", "));
        // Accounts are created at hiring time only.
        form.fields.truncate(USERNAME);
        screen.editing = Some(member);
        screen
    }

    pub fn tick(&mut self) {
        self.flash.check_timeout();
    }

    /// Builds the staff record; the employee code is assigned by the service.
    fn read_member(&self) -> std::result::Result<StaffMember, String> {
        let role = StaffRole::ALL
            .get(self.form.choice(ROLE))
            .copied()
            .unwrap_or(StaffRole::Doctor);
        let consultation_fee = match self.form.optional(FEE) {
            Some(raw) => Some(
                raw.parse::<f64>()
                    .map_err(|_| format!("'{raw}' is not a valid fee"))?,
            ),
            None => None,
        };
        let shift = match self.form.choice(SHIFT) {
            0 => None,
            n => Shift::ALL.get(n - 1).copied(),
        };
        let wards = self
            .form
            .value(WARDS)
            .split(',')
            .map(str::trim)
            .filter(|ward| !ward.is_empty())
            .map(String::from)
            .collect();

        let doctor = role == StaffRole::Doctor;
        let original = self.editing.as_ref();
        Ok(StaffMember {
            id: original.map_or(0, |m| m.id),
            employee_code: original.map(|m| m.employee_code.clone()).unwrap_or_default(),
            name: self.form.value(NAME).to_string(),
            role,
            department: self.form.optional(DEPARTMENT),
            phone_number: self.form.value(PHONE).to_string(),
            email: self.form.value(EMAIL).to_string(),
            address: self.form.value(ADDRESS).to_string(),
            status: original.map_or(StaffStatus::Active, |m| m.status),
            joined_on: original.map_or_else(utils::today, |m| m.joined_on),
            specialization: self.form.optional(SPECIALIZATION).filter(|_| doctor),
            license_number: self.form.optional(LICENSE).filter(|_| doctor),
            consultation_fee: consultation_fee.filter(|_| doctor),
            shift: shift.filter(|_| role == StaffRole::Nurse),
            wards,
        })
    }

    /// Saves the form; returns to the list after a successful edit.
    fn submit(&mut self) -> Option<StaffAction> {
        if let Some(label) = self.form.missing_required() {
            self.flash.error(format!("{label} cannot be empty"));
            return None;
        }
        let member = match self.read_member() {
            Ok(member) => member,
            Err(message) => {
                self.flash.error(message);
                return None;
            }
        };
        if self.editing.is_some() {
            return match self.ctx.hospital.update_staff(&self.ctx.session, &member) {
                Ok(()) => Some(StaffAction::BackToList),
                Err(e) => {
                    self.flash.error(e.to_string());
                    None
                }
            };
        }
        let credentials = self.form.optional(USERNAME).map(|username| Credentials {
            username,
            password: self.form.value(PASSWORD).to_string(),
        });
        if credentials.as_ref().is_some_and(|c| c.password.len() < 4) {
            self.flash
                .error("Login password must be at least 4 characters");
            return None;
        }

        match self
            .ctx
            .hospital
            .add_staff(&self.ctx.session, &member, credentials.as_ref())
        {
            Ok(saved) => {
                self.form.reset();
                self.flash.success(format!(
                    "{} added with employee code {}",
                    saved.name, saved.employee_code
                ));
            }
            Err(e) => self.flash.error(e.to_string()),
        }
        None
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Result<Option<StaffAction>> {
        self.tick();
        match self.form.handle_key(key) {
            Some(FormEvent::Back) => return Ok(Some(StaffAction::BackToList)),
            Some(FormEvent::Submit) => return Ok(self.submit()),
            None => {}
        }
        Ok(None)
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(24),
                Constraint::Length(2),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(area);

        let (title, submit) = match &self.editing {
            Some(member) => (format!("👥 Edit {}", member.employee_code), "Save"),
            None => ("👥 Add Staff Member".to_string(), "Add Staff"),
        };
        widgets::render_header(frame, layout[0], &title);

        let block = form_block("Role-specific fields are ignored for other roles");
        let inner = block.inner(layout[1]);
        frame.render_widget(block, layout[1]);
        self.form
            .render(frame, inner.inner(Margin::new(1, 0)), submit);

        self.flash.render(frame, layout[2]);
        frame.render_widget(
            widgets::help_line("↑↓/Tab: Move | ←→: Change choice | Enter: Next/Activate | Esc: Back"),
            layout[3],
        );
    }
}
