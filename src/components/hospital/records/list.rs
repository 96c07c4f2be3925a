//! Visit history with a detail pane.

use crate::auth::Permission;
use crate::components::hospital::records::RecordAction;
use crate::components::hospital::Context;
use crate::components::widgets::{self, Flash, ACCENT, FOCUS, MUTED, TEXT, WARNING};
use crate::models::{UserRole, Visit, VisitType};
use crate::tui::Frame;
use crate::utils;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};
use std::collections::HashMap;

pub struct ListRecords {
    ctx: Context,
    visits: Vec<Visit>,
    patient_names: HashMap<i64, String>,
    doctor_names: HashMap<i64, String>,
    query: String,
    searching: bool,
    state: TableState,
    flash: Flash,
}

impl ListRecords {
    pub fn new(ctx: Context) -> Self {
        let mut list = Self {
            ctx,
            visits: Vec::new(),
            patient_names: HashMap::new(),
            doctor_names: HashMap::new(),
            query: String::new(),
            searching: false,
            state: TableState::default(),
            flash: Flash::default(),
        };
        list.fetch_visits();
        list
    }

    fn own_patient(&self) -> Option<i64> {
        self.ctx
            .session
            .patient_id
            .filter(|_| self.ctx.session.role == UserRole::Patient)
    }

    pub fn fetch_visits(&mut self) {
        let hospital = &self.ctx.hospital;
        let session = &self.ctx.session;
        let (visits, patients) = match self.own_patient() {
            Some(own) => (
                hospital.visits_for_patient(session, own),
                hospital.patient(session, own).map(|p| vec![p]),
            ),
            None => (hospital.visits(session), hospital.patients(session)),
        };
        if let Ok(patients) = patients {
            self.patient_names = patients.into_iter().map(|p| (p.id, p.full_name())).collect();
        }
        if let Ok(doctors) = hospital.doctors(session) {
            self.doctor_names = doctors.into_iter().map(|d| (d.id, d.name)).collect();
        }
        match visits {
            Ok(visits) => {
                let query = self.query.to_lowercase();
                self.visits = visits
                    .into_iter()
                    .filter(|v| {
                        query.is_empty()
                            || v.diagnosis.to_lowercase().contains(&query)
                            || self
                                .patient_names
                                .get(&v.patient_id)
                                .is_some_and(|name| name.to_lowercase().contains(&query))
                    })
                    .collect();
                widgets::clamp_selection(&mut self.state, self.visits.len());
            }
            Err(e) => self.flash.error(format!("Failed to fetch records: {e}")),
        }
    }

    fn selected(&self) -> Option<&Visit> {
        self.state.selected().and_then(|i| self.visits.get(i))
    }

    fn name_of(names: &HashMap<i64, String>, id: i64, fallback: &str) -> String {
        names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("{fallback} #{id}"))
    }

    pub fn tick(&mut self) {
        self.flash.check_timeout();
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Result<Option<RecordAction>> {
        self.tick();
        if self.searching {
            match key.code {
                KeyCode::Char(c) => {
                    self.query.push(c);
                    self.fetch_visits();
                }
                KeyCode::Backspace => {
                    self.query.pop();
                    self.fetch_visits();
                }
                KeyCode::Enter | KeyCode::Esc | KeyCode::Down => self.searching = false,
                _ => {}
            }
            return Ok(None);
        }

        let can_write = self.ctx.session.can(Permission::RecordVisits);
        match key.code {
            KeyCode::Esc if !self.query.is_empty() => {
                self.query.clear();
                self.fetch_visits();
            }
            KeyCode::Esc => return Ok(Some(RecordAction::BackToHome)),
            KeyCode::Down => widgets::select_next(&mut self.state, self.visits.len()),
            KeyCode::Up => widgets::select_previous(&mut self.state, self.visits.len()),
            KeyCode::Char('/') | KeyCode::Char('s') => self.searching = true,
            KeyCode::Char('r') => self.fetch_visits(),
            KeyCode::Char('a') if can_write => return Ok(Some(RecordAction::Store)),
            KeyCode::Char('e') if can_write => {
                if let Some(visit) = self.selected() {
                    return Ok(Some(RecordAction::Edit(visit.clone())));
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn detail_lines(&self, visit: &Visit) -> Vec<Line<'static>> {
        let label = |text: &'static str| Span::styled(text, Style::default().fg(MUTED));
        let value = |text: String| Span::styled(text, Style::default().fg(TEXT));
        let or_dash = |text: &Option<String>| text.clone().unwrap_or_else(|| "-".to_string());

        let mut lines = vec![
            Line::from(vec![
                label("Patient: "),
                value(Self::name_of(&self.patient_names, visit.patient_id, "Patient")),
                label("   Doctor: "),
                value(Self::name_of(&self.doctor_names, visit.doctor_id, "Doctor")),
            ]),
            Line::from(vec![label("Symptoms: "), value(or_dash(&visit.symptoms))]),
            Line::from(vec![
                label("Diagnosis: "),
                Span::styled(
                    visit.diagnosis.clone(),
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                ),
            ]),
        ];
        if visit.visit_type == VisitType::Ipd {
            let stay = visit
                .length_of_stay(utils::today())
                .map(|days| format!("{days} day(s)"))
                .unwrap_or_default();
            let status = match visit.discharge_date {
                Some(date) => format!("discharged {}", utils::format_date(date)),
                None => "still admitted".to_string(),
            };
            lines.push(Line::from(vec![
                label("Admission: "),
                value(format!(
                    "{} | {stay} | {status}",
                    visit.admission_date.map(utils::format_date).unwrap_or_default()
                )),
            ]));
        }
        lines.push(Line::from(label("Prescriptions:")));
        if visit.prescribed_medicines.is_empty() {
            lines.push(Line::from(value("  none".to_string())));
        }
        for medicine in &visit.prescribed_medicines {
            lines.push(Line::from(value(format!(
                "  • {} {} {} for {} days",
                medicine.name, medicine.dosage, medicine.frequency, medicine.duration_days
            ))));
        }
        lines.push(Line::from(vec![
            label("Doctor notes: "),
            value(or_dash(&visit.doctor_notes)),
        ]));
        lines.push(Line::from(vec![
            label("Nurse notes: "),
            value(or_dash(&visit.nurse_notes)),
        ]));
        if let Some(follow_up) = visit.follow_up_date {
            lines.push(Line::from(vec![
                label("Follow-up: "),
                Span::styled(utils::format_date(follow_up), Style::default().fg(WARNING)),
            ]));
        }
        lines
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(area);

        widgets::render_header(frame, layout[0], "📁 Medical Records");
        frame.render_widget(
            widgets::input(
                " Search diagnosis or patient (/) ".to_string(),
                self.query.clone(),
                self.searching,
            ),
            layout[1],
        );

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .spacing(1)
            .split(layout[2]);

        let rows = self.visits.iter().map(|v| {
            let kind = match v.visit_type {
                VisitType::Opd => Cell::from("OPD").style(Style::default().fg(ACCENT)),
                VisitType::Ipd => Cell::from("IPD").style(Style::default().fg(WARNING)),
            };
            Row::new(vec![
                Cell::from(v.id.to_string()),
                Cell::from(utils::format_date(v.visit_date)),
                kind,
                Cell::from(Self::name_of(&self.patient_names, v.patient_id, "Patient")),
                Cell::from(v.diagnosis.clone()),
            ])
            .style(Style::default().fg(TEXT))
        });
        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Length(11),
                Constraint::Length(4),
                Constraint::Percentage(35),
                Constraint::Min(10),
            ],
        )
        .header(widgets::table_header(&["ID", "Date", "Type", "Patient", "Diagnosis"]))
        .block(widgets::panel(&format!("Visits ({})", self.visits.len()), !self.searching))
        .row_highlight_style(widgets::row_highlight(!self.searching))
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, columns[0], &mut self.state.clone());

        let details = match self.selected() {
            Some(visit) => self.detail_lines(visit),
            None => vec![Line::from(Span::styled(
                "No visits recorded",
                Style::default().fg(MUTED),
            ))],
        };
        let title = self
            .selected()
            .map(|v| format!("Visit #{}", v.id))
            .unwrap_or_else(|| "Visit".to_string());
        frame.render_widget(
            Paragraph::new(details)
                .block(widgets::panel(&title, false))
                .wrap(Wrap { trim: false }),
            columns[1],
        );

        self.flash.render(frame, layout[3]);
        let help = if self.ctx.session.can(Permission::RecordVisits) {
            "↑↓: Select | /: Search | a: Record visit | e: Amend | r: Refresh | Esc: Back"
        } else {
            "↑↓: Select | /: Search | r: Refresh | Esc: Back"
        };
        frame.render_widget(
            Paragraph::new(help)
                .style(Style::default().fg(FOCUS))
                .alignment(Alignment::Center),
            layout[4],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use crate::components::hospital::tests::demo_context;

    fn press(list: &mut ListRecords, code: KeyCode) -> Option<RecordAction> {
        list.handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    #[test]
    fn search_filters_by_diagnosis_and_name() {
        let mut list = ListRecords::new(demo_context("carla"));
        assert_eq!(list.visits.len(), 2);
        press(&mut list, KeyCode::Char('/'));
        for c in "append".chars() {
            press(&mut list, KeyCode::Char(c));
        }
        assert_eq!(list.visits.len(), 1);
        assert_eq!(list.visits[0].diagnosis, "Appendicitis");

        press(&mut list, KeyCode::Enter);
        press(&mut list, KeyCode::Esc);
        assert_eq!(list.visits.len(), 2);
        list.query = "turing".into();
        list.fetch_visits();
        assert_eq!(list.visits.len(), 1);
    }

    #[test]
    fn receptionists_cannot_amend() {
        let mut list = ListRecords::new(demo_context("pam"));
        assert_eq!(press(&mut list, KeyCode::Char('e')), None);
        assert_eq!(press(&mut list, KeyCode::Char('a')), None);
    }

    #[test]
    fn doctors_open_the_amend_form() {
        let mut list = ListRecords::new(demo_context("grey"));
        assert!(matches!(
            press(&mut list, KeyCode::Char('e')),
            Some(RecordAction::Edit(_))
        ));
    }

    #[test]
    fn patients_see_only_their_history() {
        let list = ListRecords::new(demo_context("ada"));
        assert!(list.visits.is_empty());
        assert!(list.flash.error_message().is_none());
    }
}
