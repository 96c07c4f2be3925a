//! Self-registration for patients: an account plus the patient file it
//! belongs to.

use crate::app::SelectedApp;
use crate::auth::Credentials;
use crate::components::form::{form_block, Field, Form, FormEvent};
use crate::components::hospital::patients::add::{patient_fields, read_patient};
use crate::components::widgets::{self, centered_rect, Flash, TITLE};
use crate::components::Component;
use crate::service::Hospital;
use crate::tui::Frame;
use crate::utils;
use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use std::rc::Rc;

const USERNAME: usize = 0;
const PASSWORD: usize = 1;
const CONFIRM: usize = 2;
/// Index of the first patient field.
const PATIENT_OFFSET: usize = 3;

fn register_fields() -> Vec<Field> {
    let mut fields = vec![
        Field::text("Username").required(),
        Field::secret("Password").required(),
        Field::secret("Confirm Password").required(),
    ];
    fields.extend(patient_fields());
    fields
}

pub struct Register {
    hospital: Rc<Hospital>,
    form: Form,
    flash: Flash,
    registered_username: String,
    /// Set once an account was created; the app shows a notice on login.
    pub registration_success: bool,
}

impl Register {
    pub fn new(hospital: Rc<Hospital>) -> Self {
        Self {
            hospital,
            form: Form::new(register_fields()),
            flash: Flash::default(),
            registered_username: String::new(),
            registration_success: false,
        }
    }

    /// Clears the form before the screen is shown again.
    pub fn reset(&mut self) {
        self.form.reset();
        self.flash.clear();
        self.registration_success = false;
        self.registered_username.clear();
    }

    pub fn tick(&mut self) {
        self.flash.check_timeout();
    }

    /// The username of the account created last.
    pub fn username(&self) -> &str {
        &self.registered_username
    }

    fn submit(&mut self) -> bool {
        if let Some(label) = self.form.missing_required() {
            self.flash.error(format!("{label} is required"));
            return false;
        }
        if self.form.value(PASSWORD) != self.form.value(CONFIRM) {
            self.flash.error("Passwords do not match");
            return false;
        }
        let patient = match read_patient(&self.form, PATIENT_OFFSET, 0, utils::today()) {
            Ok(patient) => patient,
            Err(message) => {
                self.flash.error(message);
                return false;
            }
        };
        let credentials = Credentials {
            username: self.form.value(USERNAME).to_string(),
            password: self.form.value(PASSWORD).to_string(),
        };
        match self.hospital.register_account(&credentials, &patient) {
            Ok(session) => {
                self.registered_username = session.username;
                self.registration_success = true;
                self.form.reset();
                true
            }
            Err(e) => {
                tracing::warn!(user = %credentials.username, "Registration failed: {e}");
                self.flash.error(e.to_string());
                false
            }
        }
    }
}

impl Component for Register {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<SelectedApp>> {
        self.flash.check_timeout();
        match self.form.handle_key(event) {
            Some(FormEvent::Back) => {
                self.registration_success = false;
                Ok(Some(SelectedApp::None))
            }
            Some(FormEvent::Submit) => Ok(self.submit().then_some(SelectedApp::None)),
            None => Ok(None),
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);
        let container = centered_rect(90, 90, area);
        let block = form_block("Create Patient Account");
        let inner = block.inner(container);
        frame.render_widget(block, container);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(10),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(inner);

        frame.render_widget(
            Paragraph::new("Create Account")
                .style(Style::default().fg(TITLE).add_modifier(Modifier::BOLD))
                .alignment(Alignment::Center),
            layout[0],
        );
        self.form.render(frame, layout[1], "Register");
        self.flash.render(frame, layout[2]);
        frame.render_widget(
            widgets::help_line("TAB/Arrow Keys: Navigate | ←→: Change choice | ENTER: Select | ESC: Back to Login"),
            layout[3],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::hospital::tests::demo_context;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn fill(register: &mut Register, username: &str, confirm: &str) {
        let form = &mut register.form;
        form.set_value(USERNAME, username);
        form.set_value(PASSWORD, "secret");
        form.set_value(CONFIRM, confirm);
        form.set_value(PATIENT_OFFSET, "Barbara");
        form.set_value(PATIENT_OFFSET + 1, "Liskov");
        form.set_value(PATIENT_OFFSET + 2, "1939-11-07");
        form.set_value(PATIENT_OFFSET + 4, "555-0199");
        form.set_value(PATIENT_OFFSET + 5, "MIT, Cambridge");
        form.focus = form.fields.len();
    }

    fn submit(register: &mut Register) -> Option<SelectedApp> {
        register
            .handle_input(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
            .unwrap()
    }

    #[test]
    fn registers_an_account_that_can_log_in() {
        let hospital = demo_context("root").hospital;
        let mut register = Register::new(Rc::clone(&hospital));
        fill(&mut register, "barbara", "secret");
        assert_eq!(submit(&mut register), Some(SelectedApp::None));
        assert!(register.registration_success);
        assert_eq!(register.username(), "barbara");

        let session = hospital
            .login(&Credentials {
                username: "barbara".into(),
                password: "secret".into(),
            })
            .unwrap();
        assert!(session.patient_id.is_some());
    }

    #[test]
    fn mismatched_passwords_keep_the_form_open() {
        let mut register = Register::new(demo_context("root").hospital);
        fill(&mut register, "barbara", "different");
        assert_eq!(submit(&mut register), None);
        assert_eq!(register.flash.error_message(), Some("Passwords do not match"));
        assert!(!register.registration_success);
    }

    #[test]
    fn taken_usernames_are_reported() {
        let mut register = Register::new(demo_context("root").hospital);
        fill(&mut register, "ada", "secret");
        assert_eq!(submit(&mut register), None);
        assert!(register.flash.error_message().is_some());
    }

    #[test]
    fn reset_clears_previous_input() {
        let mut register = Register::new(demo_context("root").hospital);
        fill(&mut register, "barbara", "secret");
        register.reset();
        assert_eq!(register.form.missing_required(), Some("Username"));
        assert_eq!(register.form.focus, 0);
    }
}
