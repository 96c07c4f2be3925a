//! Patient management module within the Hospital application.

use crate::app::SelectedApp;
use crate::components::hospital::patients::add::AddPatient;
use crate::components::hospital::patients::list::ListPatients;
use crate::components::hospital::Context;
use crate::components::Component;
use crate::models::Patient;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::KeyEvent;

pub mod add;
pub mod list;

/// Represents the actions that can be performed within the patient management component.
#[derive(Debug, Clone, PartialEq)]
pub enum PatientAction {
    /// Return to the home screen.
    BackToHome,
    /// Leave the form; goes home when the form was opened from the menu.
    BackToList,
    Add,
    Edit(Patient),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientsState {
    AddPatient,
    ListPatients,
}

/// Switches between the patient list and the add/edit form.
pub struct Patients {
    ctx: Context,
    pub list_patients: ListPatients,
    /// The open form, if any.
    pub form: Option<AddPatient>,
    /// Whether the screen was opened on the list, so `Back` returns there.
    started_on_list: bool,
}

impl Patients {
    pub fn new(ctx: Context, state: PatientsState) -> Self {
        let list_patients = ListPatients::new(ctx.clone());
        let form = match state {
            PatientsState::AddPatient => Some(AddPatient::new(ctx.clone())),
            PatientsState::ListPatients => None,
        };
        Self {
            ctx,
            list_patients,
            form,
            started_on_list: state == PatientsState::ListPatients,
        }
    }

    #[cfg(test)]
    fn state(&self) -> PatientsState {
        if self.form.is_some() {
            PatientsState::AddPatient
        } else {
            PatientsState::ListPatients
        }
    }
}

impl Component for Patients {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<SelectedApp>> {
        if let Some(form) = self.form.as_mut() {
            if form.handle_input(event)?.is_some() {
                if !self.started_on_list {
                    return Ok(Some(SelectedApp::None));
                }
                self.form = None;
                self.list_patients.fetch_patients();
            }
            return Ok(None);
        }

        match self.list_patients.handle_input(event)? {
            Some(PatientAction::BackToHome) => return Ok(Some(SelectedApp::None)),
            Some(PatientAction::Add) => self.form = Some(AddPatient::new(self.ctx.clone())),
            Some(PatientAction::Edit(patient)) => {
                self.form = Some(AddPatient::edit(self.ctx.clone(), patient))
            }
            Some(PatientAction::BackToList) | None => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        match &self.form {
            Some(form) => form.render(frame),
            None => self.list_patients.render(frame),
        }
    }

    fn tick(&mut self) {
        match self.form.as_mut() {
            Some(form) => form.tick(),
            None => self.list_patients.tick(),
        }
    }
}
