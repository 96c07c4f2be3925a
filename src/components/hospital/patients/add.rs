//! Patient registration and editing form.

use crate::components::form::{form_block, Field, Form, FormEvent};
use crate::components::hospital::patients::PatientAction;
use crate::components::hospital::Context;
use crate::components::widgets::{self, Flash};
use crate::components::Component;
use crate::models::{Gender, Patient};
use crate::tui::Frame;
use crate::utils;
use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use time::Date;

pub const GENDERS: &[&str] = &["Male", "Female", "Other"];

const FIRST_NAME: usize = 0;
const LAST_NAME: usize = 1;
const DOB: usize = 2;
const GENDER: usize = 3;
const PHONE: usize = 4;
const ADDRESS: usize = 5;
const EMAIL: usize = 6;
const BLOOD_GROUP: usize = 7;
const HISTORY: usize = 8;
const ALLERGIES: usize = 9;
const MEDICATIONS: usize = 10;

/// Fields describing a patient; also used by the self-registration screen.
pub fn patient_fields() -> Vec<Field> {
    vec![
        Field::text("First Name").required(),
        Field::text("Last Name").required(),
        Field::text("Date of Birth (YYYY-MM-DD)").required(),
        Field::choice("Gender", GENDERS),
        Field::text("Phone").required(),
        Field::text("Address").required(),
        Field::text("Email"),
        Field::text("Blood Group"),
        Field::text("Medical History"),
        Field::text("Allergies"),
        Field::text("Current Medications"),
    ]
}

/// Reads the patient fields starting at `offset`.
pub fn read_patient(
    form: &Form,
    offset: usize,
    id: i64,
    registered_on: Date,
) -> std::result::Result<Patient, String> {
    let date_of_birth = utils::parse_date(form.value(offset + DOB))
        .ok_or_else(|| "Date of birth must look like 1990-04-21".to_string())?;
    Ok(Patient {
        id,
        first_name: form.value(offset + FIRST_NAME).to_string(),
        last_name: form.value(offset + LAST_NAME).to_string(),
        date_of_birth,
        gender: Gender::ALL
            .get(form.choice(offset + GENDER))
            .copied()
            .unwrap_or(Gender::Other),
        address: form.value(offset + ADDRESS).to_string(),
        phone_number: form.value(offset + PHONE).to_string(),
        email: form.optional(offset + EMAIL),
        blood_group: form.optional(offset + BLOOD_GROUP),
        medical_history: form.optional(offset + HISTORY),
        allergies: form.optional(offset + ALLERGIES),
        current_medications: form.optional(offset + MEDICATIONS),
        registered_on,
    })
}

fn fill_patient(form: &mut Form, patient: &Patient) {
    form.set_value(FIRST_NAME, patient.first_name.clone());
    form.set_value(LAST_NAME, patient.last_name.clone());
    form.set_value(DOB, utils::format_date(patient.date_of_birth));
    form.set_choice(
        GENDER,
        Gender::ALL
            .iter()
            .position(|g| *g == patient.gender)
            .unwrap_or(0),
    );
    form.set_value(PHONE, patient.phone_number.clone());
    form.set_value(ADDRESS, patient.address.clone());
    let optional = [
        (EMAIL, &patient.email),
        (BLOOD_GROUP, &patient.blood_group),
        (HISTORY, &patient.medical_history),
        (ALLERGIES, &patient.allergies),
        (MEDICATIONS, &patient.current_medications),
    ];
    for (index, value) in optional {
        form.set_value(index, value.clone().unwrap_or_default());
    }
}

pub struct AddPatient {
    ctx: Context,
    form: Form,
    /// The patient being edited; `None` when registering a new one.
    editing: Option<Patient>,
    flash: Flash,
}

impl AddPatient {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            form: Form::new(patient_fields()),
            editing: None,
            flash: Flash::default(),
        }
    }

    pub fn edit(ctx: Context, patient: Patient) -> Self {
        let mut screen = Self::new(ctx);
        fill_patient(&mut screen.form, &patient);
        screen.editing = Some(patient);
        screen
    }

    pub fn tick(&mut self) {
        self.flash.check_timeout();
    }

    fn submit(&mut self) {
        if let Some(label) = self.form.missing_required() {
            self.flash.error(format!("{label} cannot be empty"));
            return;
        }
        let (id, registered_on) = match &self.editing {
            Some(patient) => (patient.id, patient.registered_on),
            None => (0, utils::today()),
        };
        let patient = match read_patient(&self.form, 0, id, registered_on) {
            Ok(patient) => patient,
            Err(message) => {
                self.flash.error(message);
                return;
            }
        };

        let result = if self.editing.is_some() {
            self.ctx
                .hospital
                .update_patient(&self.ctx.session, &patient)
                .map(|_| format!("{} updated", patient.full_name()))
        } else {
            self.ctx
                .hospital
                .register_patient(&self.ctx.session, &patient)
                .map(|id| format!("Patient #{id} added successfully!"))
        };
        match result {
            Ok(message) => {
                if self.editing.is_some() {
                    self.editing = Some(patient);
                } else {
                    self.form.reset();
                }
                self.flash.success(message);
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Result<Option<PatientAction>> {
        self.tick();
        match self.form.handle_key(key) {
            Some(FormEvent::Back) => return Ok(Some(PatientAction::BackToList)),
            Some(FormEvent::Submit) => self.submit(),
            None => {}
        }
        Ok(None)
    }
}

impl Component for AddPatient {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<crate::app::SelectedApp>> {
        match self.handle_input(event)? {
            Some(_) => Ok(Some(crate::app::SelectedApp::None)),
            None => Ok(None),
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(22),
                Constraint::Length(2),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(area);

        let title = if self.editing.is_some() {
            "✎ Update Patient"
        } else {
            "🏥 Patient Registration"
        };
        widgets::render_header(frame, layout[0], title);

        let block = form_block("● Required fields are marked with *");
        let inner = block.inner(layout[1]);
        frame.render_widget(block, layout[1]);
        let label = if self.editing.is_some() {
            "Save Changes"
        } else {
            "Register"
        };
        self.form.render(frame, inner.inner(Margin::new(1, 0)), label);

        self.flash.render(frame, layout[2]);
        frame.render_widget(
            widgets::help_line("↑↓/Tab: Move | ←→: Change choice | Enter: Next/Activate | Esc: Back"),
            layout[3],
        );
    }

    fn tick(&mut self) {
        AddPatient::tick(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::hospital::tests::demo_context;
    use crossterm::event::{KeyCode, KeyModifiers};
    use time::macros::date;

    fn fill(form: &mut Form, values: &[(usize, &str)]) {
        for (index, value) in values {
            form.set_value(*index, *value);
        }
    }

    #[test]
    fn reads_a_complete_patient() {
        let mut form = Form::new(patient_fields());
        fill(
            &mut form,
            &[
                (FIRST_NAME, "Marie"),
                (LAST_NAME, "Curie"),
                (DOB, "1867-11-07"),
                (PHONE, "555-0110"),
                (ADDRESS, "Rue Cuvier"),
                (ALLERGIES, " radium "),
            ],
        );
        form.set_choice(GENDER, 1);
        let patient = read_patient(&form, 0, 0, date!(2025 - 01 - 01)).unwrap();
        assert_eq!(patient.gender, Gender::Female);
        assert_eq!(patient.date_of_birth, date!(1867 - 11 - 07));
        assert_eq!(patient.allergies.as_deref(), Some("radium"));
        assert_eq!(patient.email, None);
    }

    #[test]
    fn rejects_malformed_birth_dates() {
        let mut form = Form::new(patient_fields());
        form.set_value(DOB, "07/11/1867");
        assert!(read_patient(&form, 0, 0, date!(2025 - 01 - 01)).is_err());
    }

    #[test]
    fn editing_saves_through_the_service() {
        let ctx = demo_context("pam");
        let patient = ctx.hospital.patients(&ctx.session).unwrap().remove(0);
        let mut screen = AddPatient::edit(ctx.clone(), patient.clone());
        screen.form.set_value(PHONE, "555-9999");
        screen.form.focus = screen.form.fields.len();
        screen
            .handle_input(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
            .unwrap();
        assert!(screen.flash.error_message().is_none());
        let saved = ctx.hospital.patient(&ctx.session, patient.id).unwrap();
        assert_eq!(saved.phone_number, "555-9999");
    }
}
