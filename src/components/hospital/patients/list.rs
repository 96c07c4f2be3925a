//! List Patient component for the Hospital application.

use crate::components::hospital::patients::PatientAction;
use crate::components::hospital::Context;
use crate::components::widgets::{self, Confirm, ConfirmOutcome, Flash, ACCENT, BORDER, TEXT};
use crate::components::Component;
use crate::models::Patient;
use crate::tui::Frame;
use crate::utils;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

/// Component to display and search the patient register.
pub struct ListPatients {
    ctx: Context,
    patients: Vec<Patient>,
    state: TableState,
    query: String,
    searching: bool,
    show_details: bool,
    confirm: Confirm,
    flash: Flash,
}

impl ListPatients {
    pub fn new(ctx: Context) -> Self {
        let mut list = Self {
            ctx,
            patients: Vec::new(),
            state: TableState::default(),
            query: String::new(),
            searching: false,
            show_details: false,
            confirm: Confirm::default(),
            flash: Flash::default(),
        };
        list.fetch_patients();
        list
    }

    /// Reloads the list, honouring the current search text.
    pub fn fetch_patients(&mut self) {
        let result = if self.query.trim().is_empty() {
            self.ctx.hospital.patients(&self.ctx.session)
        } else {
            self.ctx
                .hospital
                .search_patients(&self.ctx.session, &self.query)
        };
        match result {
            Ok(patients) => {
                self.patients = patients;
                widgets::clamp_selection(&mut self.state, self.patients.len());
            }
            Err(e) => self.flash.error(format!("Failed to fetch patients: {e}")),
        }
    }

    fn selected_patient(&self) -> Option<&Patient> {
        self.state.selected().and_then(|i| self.patients.get(i))
    }

    pub fn tick(&mut self) {
        self.flash.check_timeout();
    }

    fn delete_selected(&mut self) {
        let Some(patient) = self.selected_patient().cloned() else {
            return;
        };
        match self
            .ctx
            .hospital
            .delete_patient(&self.ctx.session, patient.id)
        {
            Ok(()) => {
                self.flash
                    .success(format!("Deleted {} (#{})", patient.full_name(), patient.id));
                self.show_details = false;
                self.fetch_patients();
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn handle_search_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => {
                self.query.push(c);
                self.fetch_patients();
            }
            KeyCode::Backspace => {
                self.query.pop();
                self.fetch_patients();
            }
            KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => self.searching = false,
            _ => {}
        }
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Result<Option<PatientAction>> {
        self.tick();
        if self.confirm.open {
            if let Some(ConfirmOutcome::Yes) = self.confirm.handle_key(key.code) {
                self.delete_selected();
            }
            return Ok(None);
        }
        if self.searching {
            self.handle_search_input(key);
            return Ok(None);
        }

        match key.code {
            KeyCode::Down => widgets::select_next(&mut self.state, self.patients.len()),
            KeyCode::Up => widgets::select_previous(&mut self.state, self.patients.len()),
            KeyCode::Enter => {
                if self.selected_patient().is_some() {
                    self.show_details = !self.show_details;
                }
            }
            KeyCode::Char('/') | KeyCode::Char('s') => self.searching = true,
            KeyCode::Char('a') => return Ok(Some(PatientAction::Add)),
            KeyCode::Char('e') => {
                if let Some(patient) = self.selected_patient() {
                    return Ok(Some(PatientAction::Edit(patient.clone())));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(patient) = self.selected_patient() {
                    let message = format!("Delete {} and their records?", patient.full_name());
                    self.confirm.ask(message);
                }
            }
            KeyCode::Char('r') => self.fetch_patients(),
            KeyCode::Char('b') => return Ok(Some(PatientAction::BackToHome)),
            KeyCode::Esc => {
                if self.show_details {
                    self.show_details = false;
                } else if !self.query.is_empty() {
                    self.query.clear();
                    self.fetch_patients();
                } else {
                    return Ok(Some(PatientAction::BackToHome));
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn details(&self, patient: &Patient) -> Vec<Line<'static>> {
        let today = utils::today();
        let label = |text: &'static str| Span::styled(text, Style::default().fg(ACCENT));
        let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "—".to_string());
        vec![
            Line::from(vec![
                label("Name: "),
                Span::raw(patient.full_name()),
                label("   Age: "),
                Span::raw(patient.age_on(today).to_string()),
                label("   Blood group: "),
                Span::raw(or_dash(&patient.blood_group)),
                label("   Registered: "),
                Span::raw(utils::format_date(patient.registered_on)),
            ]),
            Line::from(vec![
                label("Email: "),
                Span::raw(or_dash(&patient.email)),
                label("   Address: "),
                Span::raw(patient.address.clone()),
            ]),
            Line::from(vec![
                label("History: "),
                Span::raw(or_dash(&patient.medical_history)),
                label("   Allergies: "),
                Span::raw(or_dash(&patient.allergies)),
                label("   Medications: "),
                Span::raw(or_dash(&patient.current_medications)),
            ]),
        ]
    }
}

impl Component for ListPatients {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<crate::app::SelectedApp>> {
        match self.handle_input(event)? {
            Some(PatientAction::BackToHome) => Ok(Some(crate::app::SelectedApp::None)),
            _ => Ok(None),
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(3), // Search
                Constraint::Min(8),    // Table
                Constraint::Length(5), // Details
                Constraint::Length(1), // Messages
                Constraint::Length(1), // Help
            ])
            .margin(1)
            .split(area);

        widgets::render_header(frame, layout[0], "🏥 Patient List");

        let search_label = if self.searching {
            " Search (typing…) ".to_string()
        } else {
            " Search (press /) ".to_string()
        };
        frame.render_widget(
            widgets::input(search_label, self.query.clone(), self.searching),
            layout[1],
        );

        let header = widgets::table_header(&["ID", "Name", "DOB", "Age", "Gender", "Phone", "Address"]);
        let today = utils::today();
        let rows = self.patients.iter().map(|patient| {
            Row::new(vec![
                Cell::from(patient.id.to_string()),
                Cell::from(patient.full_name()),
                Cell::from(utils::format_date(patient.date_of_birth)),
                Cell::from(patient.age_on(today).to_string()),
                Cell::from(patient.gender.as_str()),
                Cell::from(patient.phone_number.clone()),
                Cell::from(patient.address.clone()),
            ])
            .style(Style::default().fg(TEXT))
        });

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(6),
                Constraint::Percentage(20),
                Constraint::Percentage(12),
                Constraint::Percentage(6),
                Constraint::Percentage(9),
                Constraint::Percentage(15),
                Constraint::Percentage(32),
            ],
        )
        .header(header)
        .block(widgets::panel(
            &format!("Patients ({})", self.patients.len()),
            !self.searching,
        ))
        .row_highlight_style(widgets::row_highlight(!self.searching))
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, layout[2], &mut self.state.clone());

        match self.selected_patient() {
            Some(patient) if self.show_details => {
                let details = Paragraph::new(self.details(patient))
                    .style(Style::default().fg(TEXT))
                    .block(
                        Block::default()
                            .title(" Patient Details ")
                            .borders(Borders::ALL)
                            .border_type(BorderType::Rounded)
                            .border_style(Style::default().fg(BORDER)),
                    )
                    .wrap(Wrap { trim: true });
                frame.render_widget(details, layout[3]);
            }
            _ => {}
        }

        self.flash.render(frame, layout[4]);
        frame.render_widget(
            widgets::help_line(
                "↑↓: Navigate | Enter: Details | /: Search | A: Add | E: Edit | D: Delete | R: Refresh | Esc: Back",
            ),
            layout[5],
        );

        self.confirm.render(frame, "Confirm Delete");
    }

    fn tick(&mut self) {
        ListPatients::tick(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::hospital::tests::demo_context;
    use crossterm::event::KeyModifiers;

    fn press(list: &mut ListPatients, code: KeyCode) -> Option<PatientAction> {
        list.handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    #[test]
    fn search_narrows_the_list() {
        let mut list = ListPatients::new(demo_context("pam"));
        let everyone = list.patients.len();
        assert!(everyone > 1);
        press(&mut list, KeyCode::Char('/'));
        for c in "Lovelace".chars() {
            press(&mut list, KeyCode::Char(c));
        }
        assert_eq!(list.patients.len(), 1);
        press(&mut list, KeyCode::Enter);
        press(&mut list, KeyCode::Esc);
        assert_eq!(list.patients.len(), everyone);
    }

    #[test]
    fn delete_requires_confirmation() {
        let mut list = ListPatients::new(demo_context("root"));
        let before = list.patients.len();
        press(&mut list, KeyCode::Char('d'));
        assert!(list.confirm.open);
        press(&mut list, KeyCode::Esc);
        assert_eq!(list.patients.len(), before);

        press(&mut list, KeyCode::Char('d'));
        press(&mut list, KeyCode::Char('y'));
        assert_eq!(list.patients.len(), before - 1);
    }

    #[test]
    fn nurses_cannot_delete() {
        let mut list = ListPatients::new(demo_context("carla"));
        let before = list.patients.len();
        press(&mut list, KeyCode::Char('d'));
        press(&mut list, KeyCode::Char('y'));
        assert_eq!(list.patients.len(), before);
        assert!(list.flash.error_message().is_some());
    }
}
