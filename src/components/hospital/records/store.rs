//! Form for recording an outpatient visit, also used to amend one.

use crate::components::form::{form_block, Field, Form, FormEvent};
use crate::components::hospital::records::RecordAction;
use crate::components::hospital::Context;
use crate::components::widgets::{self, Flash, ACCENT, MUTED, TEXT};
use crate::models::{Patient, PrescribedMedicine, StaffMember, UserRole, Visit, VisitType};
use crate::tui::Frame;
use crate::utils;
use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::{prelude::*, widgets::*};

const PATIENT_ID: usize = 0;
const DOCTOR_ID: usize = 1;
const APPOINTMENT_ID: usize = 2;
const VISIT_DATE: usize = 3;
const SYMPTOMS: usize = 4;
const DIAGNOSIS: usize = 5;
const MEDICINES: usize = 6;
const DOCTOR_NOTES: usize = 7;
const NURSE_NOTES: usize = 8;
const FOLLOW_UP: usize = 9;

/// Parses `name, dosage, frequency, days; ...` into prescriptions.
pub fn parse_medicines(input: &str) -> std::result::Result<Vec<PrescribedMedicine>, String> {
    input
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split(',').map(str::trim).collect();
            let [name, dosage, frequency, days] = parts.as_slice() else {
                return Err(format!(
                    "'{entry}' should read: name, dosage, frequency, days"
                ));
            };
            let duration_days = days
                .trim_end_matches("days")
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("'{days}' is not a number of days"))?;
            if name.is_empty() {
                return Err("A medicine name is missing".to_string());
            }
            Ok(PrescribedMedicine {
                name: name.to_string(),
                dosage: dosage.to_string(),
                frequency: frequency.to_string(),
                duration_days,
            })
        })
        .collect()
}

pub fn format_medicines(medicines: &[PrescribedMedicine]) -> String {
    medicines
        .iter()
        .map(|m| format!("{}, {}, {}, {}", m.name, m.dosage, m.frequency, m.duration_days))
        .collect::<Vec<_>>()
        .join("; ")
}

fn parse_id(form: &Form, index: usize, label: &str) -> std::result::Result<i64, String> {
    form.value(index)
        .parse::<i64>()
        .map_err(|_| format!("{label} must be a number"))
}

pub struct StoreRecord {
    ctx: Context,
    form: Form,
    /// The visit being amended.
    editing: Option<Visit>,
    patients: Vec<Patient>,
    doctors: Vec<StaffMember>,
    flash: Flash,
}

impl StoreRecord {
    pub fn new(ctx: Context) -> Self {
        let mut fields = vec![
            Field::text("Patient ID").required(),
            Field::text("Doctor ID").required(),
            Field::text("Appointment ID (optional)"),
            Field::text("Visit Date (YYYY-MM-DD)")
                .required()
                .with_value(utils::format_date(utils::today())),
            Field::text("Symptoms"),
            Field::text("Diagnosis").required(),
            Field::text("Medicines: name, dosage, frequency, days; ..."),
            Field::text("Doctor Notes"),
            Field::text("Nurse Notes"),
            Field::text("Follow-up Date (YYYY-MM-DD)"),
        ];
        if ctx.session.role == UserRole::Doctor {
            if let Some(staff_id) = ctx.session.staff_id {
                fields[DOCTOR_ID] = Field::text("Doctor ID").required().with_value(staff_id.to_string());
            }
        }
        let patients = ctx.hospital.patients(&ctx.session).unwrap_or_default();
        let doctors = ctx.hospital.doctors(&ctx.session).unwrap_or_default();
        Self {
            ctx,
            form: Form::new(fields),
            editing: None,
            patients,
            doctors,
            flash: Flash::default(),
        }
    }

    pub fn edit(ctx: Context, visit: Visit) -> Self {
        let mut screen = Self::new(ctx);
        let form = &mut screen.form;
        form.set_value(PATIENT_ID, visit.patient_id.to_string());
        form.set_value(DOCTOR_ID, visit.doctor_id.to_string());
        form.set_value(
            APPOINTMENT_ID,
            visit.appointment_id.map(|id| id.to_string()).unwrap_or_default(),
        );
        form.set_value(VISIT_DATE, utils::format_date(visit.visit_date));
        form.set_value(SYMPTOMS, visit.symptoms.clone().unwrap_or_default());
        form.set_value(DIAGNOSIS, visit.diagnosis.clone());
        form.set_value(MEDICINES, format_medicines(&visit.prescribed_medicines));
        form.set_value(DOCTOR_NOTES, visit.doctor_notes.clone().unwrap_or_default());
        form.set_value(NURSE_NOTES, visit.nurse_notes.clone().unwrap_or_default());
        form.set_value(
            FOLLOW_UP,
            visit.follow_up_date.map(utils::format_date).unwrap_or_default(),
        );
        screen.editing = Some(visit);
        screen
    }

    pub fn tick(&mut self) {
        self.flash.check_timeout();
    }

    fn read_visit(&self) -> std::result::Result<Visit, String> {
        let visit_date = utils::parse_date(self.form.value(VISIT_DATE))
            .ok_or("Visit date must be YYYY-MM-DD")?;
        let follow_up_date = match self.form.optional(FOLLOW_UP) {
            Some(raw) => Some(
                utils::parse_date(&raw).ok_or("Follow-up date must be YYYY-MM-DD")?,
            ),
            None => None,
        };
        if follow_up_date.is_some_and(|follow_up| follow_up < visit_date) {
            return Err("Follow-up cannot be before the visit".to_string());
        }
        let appointment_id = match self.form.optional(APPOINTMENT_ID) {
            Some(_) => Some(parse_id(&self.form, APPOINTMENT_ID, "Appointment ID")?),
            None => None,
        };
        let base = self.editing.clone();
        Ok(Visit {
            id: base.as_ref().map_or(0, |v| v.id),
            patient_id: parse_id(&self.form, PATIENT_ID, "Patient ID")?,
            doctor_id: parse_id(&self.form, DOCTOR_ID, "Doctor ID")?,
            appointment_id,
            visit_type: base.as_ref().map_or(VisitType::Opd, |v| v.visit_type),
            visit_date,
            symptoms: self.form.optional(SYMPTOMS),
            diagnosis: self.form.value(DIAGNOSIS).to_string(),
            prescribed_medicines: parse_medicines(self.form.value(MEDICINES))?,
            doctor_notes: self.form.optional(DOCTOR_NOTES),
            nurse_notes: self.form.optional(NURSE_NOTES),
            follow_up_date,
            bed_id: base.as_ref().and_then(|v| v.bed_id),
            admission_date: base.as_ref().and_then(|v| v.admission_date),
            discharge_date: base.as_ref().and_then(|v| v.discharge_date),
        })
    }

    fn submit(&mut self) -> Option<RecordAction> {
        if let Some(label) = self.form.missing_required() {
            self.flash.error(format!("{label} cannot be empty"));
            return None;
        }
        let visit = match self.read_visit() {
            Ok(visit) => visit,
            Err(message) => {
                self.flash.error(message);
                return None;
            }
        };

        if self.editing.is_some() {
            match self.ctx.hospital.update_visit(&self.ctx.session, &visit) {
                Ok(()) => return Some(RecordAction::BackToList),
                Err(e) => self.flash.error(e.to_string()),
            }
        } else {
            match self.ctx.hospital.record_visit(&self.ctx.session, &visit) {
                Ok(id) => {
                    self.form.reset();
                    if let Some(staff_id) = self.ctx.session.staff_id.filter(|_| {
                        self.ctx.session.role == UserRole::Doctor
                    }) {
                        self.form.set_value(DOCTOR_ID, staff_id.to_string());
                    }
                    self.form
                        .set_value(VISIT_DATE, utils::format_date(utils::today()));
                    self.flash.success(format!("Visit #{id} recorded"));
                }
                Err(e) => self.flash.error(e.to_string()),
            }
        }
        None
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Result<Option<RecordAction>> {
        self.tick();
        match self.form.handle_key(key) {
            Some(FormEvent::Back) => Ok(Some(RecordAction::BackToList)),
            Some(FormEvent::Submit) => Ok(self.submit()),
            None => Ok(None),
        }
    }

    fn reference_lines(&self) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(Span::styled(
            "Doctors",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ))];
        lines.extend(self.doctors.iter().map(|d| {
            Line::from(vec![
                Span::styled(format!("{:>4} ", d.id), Style::default().fg(MUTED)),
                Span::styled(d.name.clone(), Style::default().fg(TEXT)),
            ])
        }));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Patients",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )));
        lines.extend(self.patients.iter().map(|p| {
            Line::from(vec![
                Span::styled(format!("{:>4} ", p.id), Style::default().fg(MUTED)),
                Span::styled(p.full_name(), Style::default().fg(TEXT)),
            ])
        }));
        lines
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(20),
                Constraint::Length(2),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(area);

        let title = match &self.editing {
            Some(visit) => format!("📝 Amend Visit #{}", visit.id),
            None => "📝 Record Visit".to_string(),
        };
        widgets::render_header(frame, layout[0], &title);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(72), Constraint::Percentage(28)])
            .spacing(1)
            .split(layout[1]);

        let block = form_block("Consultation details");
        let inner = block.inner(columns[0]);
        frame.render_widget(block, columns[0]);
        let submit = if self.editing.is_some() { "Save Changes" } else { "Record Visit" };
        self.form.render(frame, inner.inner(Margin::new(1, 0)), submit);

        frame.render_widget(
            Paragraph::new(self.reference_lines())
                .block(widgets::panel("IDs", false))
                .wrap(Wrap { trim: true }),
            columns[1],
        );

        self.flash.render(frame, layout[2]);
        frame.render_widget(
            widgets::help_line("↑↓/Tab: Move | Enter: Next/Activate | Esc: Back"),
            layout[3],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::hospital::tests::demo_context;

    #[test]
    fn parses_prescriptions() {
        let medicines =
            parse_medicines("Ibuprofen, 400mg, 2x daily, 5 days; Omeprazole, 20mg, daily, 14")
                .unwrap();
        assert_eq!(medicines.len(), 2);
        assert_eq!(medicines[0].duration_days, 5);
        assert_eq!(medicines[1].name, "Omeprazole");
        assert_eq!(parse_medicines("  ").unwrap(), Vec::new());
        assert!(parse_medicines("Ibuprofen, 400mg").is_err());
        assert!(parse_medicines("Ibuprofen, 400mg, daily, often").is_err());
    }

    #[test]
    fn doctors_get_their_id_prefilled_and_record_a_visit() {
        let ctx = demo_context("house");
        let mut screen = StoreRecord::new(ctx.clone());
        let own = ctx.session.staff_id.unwrap();
        assert_eq!(screen.form.value(DOCTOR_ID), own.to_string());

        let patient = &ctx.hospital.patients(&ctx.session).unwrap()[0];
        let before = ctx.hospital.visits_for_patient(&ctx.session, patient.id).unwrap().len();
        screen.form.set_value(PATIENT_ID, patient.id.to_string());
        screen.form.set_value(DIAGNOSIS, "Migraine");
        screen.form.set_value(MEDICINES, "Sumatriptan, 50mg, as needed, 10");
        assert_eq!(screen.submit(), None);
        assert!(screen.flash.error_message().is_none(), "{:?}", screen.flash.error_message());

        let after = ctx.hospital.visits_for_patient(&ctx.session, patient.id).unwrap();
        assert_eq!(after.len(), before + 1);
        assert!(after.iter().any(|v| v.diagnosis == "Migraine"
            && v.prescribed_medicines[0].name == "Sumatriptan"));
    }

    #[test]
    fn follow_up_must_not_precede_the_visit() {
        let mut screen = StoreRecord::new(demo_context("house"));
        screen.form.set_value(PATIENT_ID, "1");
        screen.form.set_value(DIAGNOSIS, "Flu");
        screen.form.set_value(VISIT_DATE, "2026-03-10");
        screen.form.set_value(FOLLOW_UP, "2026-03-01");
        assert!(screen.read_visit().is_err());
    }

    #[test]
    fn amending_keeps_the_visit_id() {
        let ctx = demo_context("house");
        let visit = ctx.hospital.visits(&ctx.session).unwrap()[0].clone();
        let mut screen = StoreRecord::edit(ctx.clone(), visit.clone());
        screen.form.set_value(DIAGNOSIS, "Revised diagnosis");
        assert_eq!(screen.submit(), Some(RecordAction::BackToList));
        let saved = ctx
            .hospital
            .visits(&ctx.session)
            .unwrap()
            .into_iter()
            .find(|v| v.id == visit.id)
            .unwrap();
        assert_eq!(saved.diagnosis, "Revised diagnosis");
        assert_eq!(saved.visit_type, visit.visit_type);
    }
}
