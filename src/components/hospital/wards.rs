//! Ward board: beds, occupancy, admissions and discharges.

use crate::analytics;
use crate::app::SelectedApp;
use crate::components::form::{Field, Form, FormEvent};
use crate::components::hospital::Context;
use crate::components::widgets::{
    self, centered_rect, Confirm, ConfirmOutcome, Flash, ACCENT, DANGER, FOCUS, INPUT_BG, MUTED,
    SUCCESS, TEXT, WARNING,
};
use crate::components::Component;
use crate::models::{Bed, BedStatus, BedType, UserRole, Visit};
use crate::service::Admission;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};
use std::collections::HashMap;

const BED_TYPES: &[&str] = &["General", "Private", "ICU", "Emergency"];

fn status_color(status: BedStatus) -> Color {
    match status {
        BedStatus::Available => SUCCESS,
        BedStatus::Occupied => DANGER,
        BedStatus::Maintenance => MUTED,
        BedStatus::Reserved => WARNING,
    }
}

enum Overlay {
    Admit { bed_id: i64, form: Form },
    AddBed(Form),
}

pub struct Wards {
    ctx: Context,
    beds: Vec<Bed>,
    /// Active admissions keyed by bed.
    admissions: HashMap<i64, Visit>,
    patient_names: HashMap<i64, String>,
    wards: Vec<String>,
    /// Index into `wards`; `None` shows every ward.
    ward_filter: Option<usize>,
    state: TableState,
    overlay: Option<Overlay>,
    confirm: Confirm,
    flash: Flash,
}

impl Wards {
    pub fn new(ctx: Context) -> Self {
        let mut wards = Self {
            ctx,
            beds: Vec::new(),
            admissions: HashMap::new(),
            patient_names: HashMap::new(),
            wards: Vec::new(),
            ward_filter: None,
            state: TableState::default(),
            overlay: None,
            confirm: Confirm::default(),
            flash: Flash::default(),
        };
        wards.fetch_beds();
        wards
    }

    fn fetch_beds(&mut self) {
        let hospital = &self.ctx.hospital;
        let session = &self.ctx.session;
        match hospital.beds(session) {
            Ok(beds) => {
                let mut wards: Vec<String> = beds.iter().map(|b| b.ward.clone()).collect();
                wards.sort();
                wards.dedup();
                self.wards = wards;
                self.beds = beds;
            }
            Err(e) => {
                self.flash.error(format!("Failed to fetch beds: {e}"));
                return;
            }
        }
        if let Ok(visits) = hospital.visits(session) {
            self.admissions = visits
                .into_iter()
                .filter(Visit::is_active_admission)
                .filter_map(|v| v.bed_id.map(|bed| (bed, v)))
                .collect();
        }
        if let Ok(patients) = hospital.patients(session) {
            self.patient_names = patients.into_iter().map(|p| (p.id, p.full_name())).collect();
        }
        let len = self.visible().len();
        widgets::clamp_selection(&mut self.state, len);
    }

    fn visible(&self) -> Vec<&Bed> {
        let ward = self.ward_filter.and_then(|i| self.wards.get(i));
        self.beds
            .iter()
            .filter(|b| ward.map_or(true, |w| &b.ward == w))
            .collect()
    }

    fn selected(&self) -> Option<Bed> {
        self.state
            .selected()
            .and_then(|i| self.visible().get(i).map(|b| (*b).clone()))
    }

    fn occupant(&self, bed: &Bed) -> String {
        bed.patient_id
            .map(|id| {
                self.patient_names
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| format!("Patient #{id}"))
            })
            .unwrap_or_default()
    }

    fn open_admit(&mut self) {
        let Some(bed) = self.selected() else {
            return;
        };
        if !matches!(bed.status, BedStatus::Available | BedStatus::Reserved) {
            self.flash
                .error(format!("Bed {} is {}", bed.bed_number, bed.status));
            return;
        }
        let mut doctor = Field::text("Doctor ID").required();
        if self.ctx.session.role == UserRole::Doctor {
            if let Some(staff_id) = self.ctx.session.staff_id {
                doctor = doctor.with_value(staff_id.to_string());
            }
        }
        self.overlay = Some(Overlay::Admit {
            bed_id: bed.id,
            form: Form::new(vec![
                Field::text("Patient ID").required(),
                doctor,
                Field::text("Symptoms"),
                Field::text("Admitting Diagnosis").required(),
            ]),
        });
    }

    /// Returns true when the admission went through.
    fn admit(&mut self, bed_id: i64, form: &Form) -> bool {
        if let Some(label) = form.missing_required() {
            self.flash.error(format!("{label} cannot be empty"));
            return false;
        }
        let (Ok(patient_id), Ok(doctor_id)) =
            (form.value(0).parse::<i64>(), form.value(1).parse::<i64>())
        else {
            self.flash.error("Patient and doctor IDs must be numbers");
            return false;
        };
        let admission = Admission {
            patient_id,
            doctor_id,
            bed_id,
            symptoms: form.optional(2),
            diagnosis: form.value(3).to_string(),
        };
        match self.ctx.hospital.admit_patient(&self.ctx.session, &admission) {
            Ok(visit) => {
                self.flash
                    .success(format!("Admitted, visit #{} opened", visit.id));
                self.fetch_beds();
                true
            }
            Err(e) => {
                self.flash.error(e.to_string());
                false
            }
        }
    }

    fn add_bed(&mut self, form: &Form) -> bool {
        if let Some(label) = form.missing_required() {
            self.flash.error(format!("{label} cannot be empty"));
            return false;
        }
        let Ok(daily_rate) = form.value(4).parse::<f64>() else {
            self.flash.error("Daily rate must be a number");
            return false;
        };
        let bed = Bed {
            id: 0,
            bed_number: form.value(0).to_string(),
            room_number: form.value(1).to_string(),
            ward: form.value(2).to_string(),
            bed_type: BedType::ALL
                .get(form.choice(3))
                .copied()
                .unwrap_or(BedType::General),
            status: BedStatus::Available,
            patient_id: None,
            daily_rate,
        };
        match self.ctx.hospital.add_bed(&self.ctx.session, &bed) {
            Ok(_) => {
                self.flash.success(format!("Bed {} added", bed.bed_number));
                self.fetch_beds();
                true
            }
            Err(e) => {
                self.flash.error(e.to_string());
                false
            }
        }
    }

    fn ask_discharge(&mut self) {
        let Some(bed) = self.selected() else {
            return;
        };
        if !self.admissions.contains_key(&bed.id) {
            self.flash
                .error(format!("Nobody is admitted to bed {}", bed.bed_number));
            return;
        }
        let message = format!(
            "Discharge {} from bed {}?",
            self.occupant(&bed),
            bed.bed_number
        );
        self.confirm.ask(message);
    }

    fn discharge(&mut self) {
        let Some(visit_id) = self
            .selected()
            .and_then(|bed| self.admissions.get(&bed.id).map(|v| v.id))
        else {
            return;
        };
        match self.ctx.hospital.discharge_patient(&self.ctx.session, visit_id) {
            Ok(visit) => {
                let stay = visit
                    .length_of_stay(crate::utils::today())
                    .unwrap_or(1);
                self.flash
                    .success(format!("Discharged after {stay} day(s)"));
                self.fetch_beds();
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn toggle_maintenance(&mut self) {
        let Some(bed) = self.selected() else {
            return;
        };
        let on = bed.status != BedStatus::Maintenance;
        match self
            .ctx
            .hospital
            .set_bed_maintenance(&self.ctx.session, bed.id, on)
        {
            Ok(()) => {
                let state = if on { "out of service" } else { "back in service" };
                self.flash.success(format!("Bed {} {state}", bed.bed_number));
                self.fetch_beds();
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn reserve(&mut self) {
        let Some(bed) = self.selected() else {
            return;
        };
        match self.ctx.hospital.reserve_bed(&self.ctx.session, bed.id) {
            Ok(()) => {
                self.flash.success(format!("Bed {} reserved", bed.bed_number));
                self.fetch_beds();
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn handle_overlay(&mut self, overlay: Overlay, key: KeyEvent) {
        let keep = match overlay {
            Overlay::Admit { bed_id, mut form } => {
                let done = match form.handle_key(key) {
                    Some(FormEvent::Back) => true,
                    Some(FormEvent::Submit) => self.admit(bed_id, &form),
                    None => false,
                };
                (!done).then_some(Overlay::Admit { bed_id, form })
            }
            Overlay::AddBed(mut form) => {
                let done = match form.handle_key(key) {
                    Some(FormEvent::Back) => true,
                    Some(FormEvent::Submit) => self.add_bed(&form),
                    None => false,
                };
                (!done).then_some(Overlay::AddBed(form))
            }
        };
        self.overlay = keep;
    }
}

impl Component for Wards {
    fn handle_input(&mut self, key: KeyEvent) -> Result<Option<SelectedApp>> {
        self.flash.check_timeout();
        if let Some(overlay) = self.overlay.take() {
            self.handle_overlay(overlay, key);
            return Ok(None);
        }
        if self.confirm.open {
            if let Some(ConfirmOutcome::Yes) = self.confirm.handle_key(key.code) {
                self.discharge();
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Esc => return Ok(Some(SelectedApp::None)),
            KeyCode::Down => {
                let len = self.visible().len();
                widgets::select_next(&mut self.state, len);
            }
            KeyCode::Up => {
                let len = self.visible().len();
                widgets::select_previous(&mut self.state, len);
            }
            KeyCode::Char('w') => {
                self.ward_filter = match self.ward_filter {
                    None if !self.wards.is_empty() => Some(0),
                    Some(i) if i + 1 < self.wards.len() => Some(i + 1),
                    _ => None,
                };
                self.state.select(None);
                let len = self.visible().len();
                widgets::clamp_selection(&mut self.state, len);
            }
            KeyCode::Char('a') => self.open_admit(),
            KeyCode::Char('d') => self.ask_discharge(),
            KeyCode::Char('m') => self.toggle_maintenance(),
            KeyCode::Char('v') => self.reserve(),
            KeyCode::Char('n') => {
                self.overlay = Some(Overlay::AddBed(Form::new(vec![
                    Field::text("Bed Number").required(),
                    Field::text("Room").required(),
                    Field::text("Ward").required(),
                    Field::choice("Type", BED_TYPES),
                    Field::text("Daily Rate").required(),
                ])))
            }
            KeyCode::Char('r') => self.fetch_beds(),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(area);

        widgets::render_header(frame, layout[0], "🛏 Wards & Beds");

        let visible = self.visible();
        let owned: Vec<Bed> = visible.iter().map(|b| (*b).clone()).collect();
        let occupancy = analytics::occupancy_rate(&owned);
        let counts = |status: BedStatus| visible.iter().filter(|b| b.status == status).count();
        let ward = self
            .ward_filter
            .and_then(|i| self.wards.get(i))
            .map(String::as_str)
            .unwrap_or("All wards");
        let label = format!(
            "{ward}: {:.0}% occupied | {} free | {} occupied | {} reserved | {} maintenance",
            occupancy,
            counts(BedStatus::Available),
            counts(BedStatus::Occupied),
            counts(BedStatus::Reserved),
            counts(BedStatus::Maintenance),
        );
        frame.render_widget(
            Gauge::default()
                .block(widgets::panel("Occupancy", false))
                .gauge_style(Style::default().fg(ACCENT).bg(INPUT_BG))
                .ratio((occupancy / 100.0).clamp(0.0, 1.0))
                .label(Span::styled(label, Style::default().fg(TEXT))),
            layout[1],
        );

        let rows = visible.iter().map(|bed| {
            let diagnosis = self
                .admissions
                .get(&bed.id)
                .map(|v| v.diagnosis.clone())
                .unwrap_or_default();
            Row::new(vec![
                Cell::from(bed.bed_number.clone()),
                Cell::from(bed.room_number.clone()),
                Cell::from(bed.ward.clone()),
                Cell::from(bed.bed_type.as_str()),
                Cell::from(self.ctx.money(bed.daily_rate)),
                Cell::from(bed.status.as_str()).style(Style::default().fg(status_color(bed.status))),
                Cell::from(self.occupant(bed)),
                Cell::from(diagnosis),
            ])
            .style(Style::default().fg(TEXT))
        });
        let table = Table::new(
            rows,
            [
                Constraint::Length(8),
                Constraint::Length(6),
                Constraint::Length(11),
                Constraint::Length(10),
                Constraint::Length(10),
                Constraint::Length(12),
                Constraint::Percentage(20),
                Constraint::Min(10),
            ],
        )
        .header(widgets::table_header(&[
            "Bed", "Room", "Ward", "Type", "Rate/day", "Status", "Patient", "Diagnosis",
        ]))
        .block(widgets::panel(&format!("Beds ({})", visible.len()), true))
        .row_highlight_style(widgets::row_highlight(true))
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, layout[2], &mut self.state.clone());

        self.flash.render(frame, layout[3]);
        frame.render_widget(
            Paragraph::new(
                "↑↓: Select | a: Admit | d: Discharge | m: Maintenance | v: Reserve | n: New bed | w: Ward | Esc: Back",
            )
            .style(Style::default().fg(FOCUS))
            .alignment(Alignment::Center),
            layout[4],
        );

        let (title, form, submit) = match &self.overlay {
            Some(Overlay::Admit { form, .. }) => ("Admit Patient", form, "Admit"),
            Some(Overlay::AddBed(form)) => ("New Bed", form, "Add Bed"),
            None => {
                self.confirm.render(frame, "Confirm Discharge");
                return;
            }
        };
        let popup = centered_rect(50, 60, area);
        frame.render_widget(Clear, popup);
        let block = widgets::panel(title, true);
        let inner = block.inner(popup);
        frame.render_widget(block, popup);
        form.render(frame, inner.inner(Margin::new(1, 1)), submit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::hospital::tests::demo_context;
    use crossterm::event::KeyModifiers;

    fn press(wards: &mut Wards, code: KeyCode) {
        wards
            .handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap();
    }

    fn select_bed(wards: &mut Wards, number: &str) {
        let index = wards
            .visible()
            .iter()
            .position(|b| b.bed_number == number)
            .unwrap();
        wards.state.select(Some(index));
    }

    fn bed<'a>(wards: &'a Wards, number: &str) -> &'a Bed {
        wards.beds.iter().find(|b| b.bed_number == number).unwrap()
    }

    #[test]
    fn admits_and_discharges_a_patient() {
        let ctx = demo_context("carla");
        let linus = ctx
            .hospital
            .patients(&ctx.session)
            .unwrap()
            .into_iter()
            .find(|p| p.last_name == "Torvalds")
            .unwrap();
        let doctor = ctx.hospital.doctors(&ctx.session).unwrap()[0].id;
        let mut wards = Wards::new(ctx);

        select_bed(&mut wards, "G-101");
        press(&mut wards, KeyCode::Char('a'));
        if let Some(Overlay::Admit { form, .. }) = wards.overlay.as_mut() {
            form.set_value(0, linus.id.to_string());
            form.set_value(1, doctor.to_string());
            form.set_value(3, "Observation");
            form.focus = form.fields.len();
        } else {
            panic!("admit form should be open");
        }
        press(&mut wards, KeyCode::Enter);
        assert!(wards.overlay.is_none(), "{:?}", wards.flash.error_message());
        assert_eq!(bed(&wards, "G-101").status, BedStatus::Occupied);
        assert_eq!(bed(&wards, "G-101").patient_id, Some(linus.id));

        select_bed(&mut wards, "G-101");
        press(&mut wards, KeyCode::Char('d'));
        assert!(wards.confirm.open);
        press(&mut wards, KeyCode::Char('y'));
        assert_eq!(bed(&wards, "G-101").status, BedStatus::Available);
    }

    #[test]
    fn occupied_beds_cannot_take_admissions() {
        let mut wards = Wards::new(demo_context("carla"));
        select_bed(&mut wards, "P-201");
        press(&mut wards, KeyCode::Char('a'));
        assert!(wards.overlay.is_none());
        assert!(wards.flash.error_message().is_some());
    }

    #[test]
    fn maintenance_toggles_and_needs_bed_rights() {
        let mut wards = Wards::new(demo_context("carla"));
        select_bed(&mut wards, "G-103");
        press(&mut wards, KeyCode::Char('m'));
        assert_eq!(bed(&wards, "G-103").status, BedStatus::Available);

        let mut wards = Wards::new(demo_context("house"));
        select_bed(&mut wards, "G-102");
        press(&mut wards, KeyCode::Char('m'));
        assert_eq!(bed(&wards, "G-102").status, BedStatus::Available);
        assert!(wards.flash.error_message().is_some());
    }

    #[test]
    fn ward_filter_cycles_through_wards() {
        let mut wards = Wards::new(demo_context("carla"));
        assert_eq!(wards.visible().len(), 6);
        press(&mut wards, KeyCode::Char('w'));
        let first = wards.wards[0].clone();
        assert!(wards.visible().iter().all(|b| b.ward == first));
        for _ in 0..wards.wards.len() {
            press(&mut wards, KeyCode::Char('w'));
        }
        assert_eq!(wards.ward_filter, None);
    }

    #[test]
    fn adds_a_bed() {
        let mut wards = Wards::new(demo_context("carla"));
        press(&mut wards, KeyCode::Char('n'));
        if let Some(Overlay::AddBed(form)) = wards.overlay.as_mut() {
            form.set_value(0, "ICU-2");
            form.set_value(1, "302");
            form.set_value(2, "ICU");
            form.set_choice(3, 2);
            form.set_value(4, "650");
            form.focus = form.fields.len();
        }
        press(&mut wards, KeyCode::Enter);
        assert_eq!(bed(&wards, "ICU-2").bed_type, BedType::Icu);
    }
}
