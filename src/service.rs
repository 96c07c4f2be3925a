//! The hospital service: every operation the screens perform, checked against
//! the caller's role and run against the single SQLite connection.
//!
//! Operations that read and then write (booking, rescheduling, admission,
//! discharge, payments) run inside an immediate transaction so the check and
//! the write see the same state.

use crate::analytics::DashboardKpis;
use crate::auth::{self, Credentials, Permission, Session};
use crate::billing::{self, InvoiceTotals, SETTLED_EPSILON};
use crate::config::AppConfig;
use crate::db::{
    self, appointments, beds, billing as invoices_db, inventory as inventory_db,
    notifications as notifications_db, patients, seed, staff, users, visits,
};
use crate::error::{HospitalError, Result};
use crate::inventory;
use crate::models::{
    Appointment, AppointmentStatus, Bed, BedStatus, DoctorSchedule, InventoryItem, Invoice,
    InvoiceItem, InvoiceStatus, NewAppointment, Notification, Patient, Payment, PaymentMethod,
    Shift, ShiftAssignment, StaffMember, StaffRole, StaffStatus, UserRole, Visit, VisitType,
};
use crate::notifications;
use crate::reports::{self, DateRange, Report, ReportData, ReportKind};
use crate::scheduling::{self, TimeSlot, WorkingWindow};
use crate::utils::{self, format_date, format_time, unique_suffix};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use time::{Date, Duration, Time};

/// Fields for a new invoice; totals and numbering are derived.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    pub patient_id: i64,
    pub visit_id: Option<i64>,
    pub items: Vec<InvoiceItem>,
    pub discount_percent: f64,
    pub tax_percent: f64,
}

/// Fields for admitting a patient to a bed.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub bed_id: i64,
    pub symptoms: Option<String>,
    pub diagnosis: String,
}

pub fn validate_patient(patient: &Patient) -> Result<()> {
    if patient.first_name.trim().is_empty() || patient.last_name.trim().is_empty() {
        return Err(HospitalError::validation("First and last name are required"));
    }
    if patient.phone_number.trim().is_empty() {
        return Err(HospitalError::validation("Phone number is required"));
    }
    if patient.date_of_birth > utils::today() {
        return Err(HospitalError::validation(
            "Date of birth cannot be in the future",
        ));
    }
    if let Some(email) = patient.email.as_deref() {
        if !email.is_empty() && !email.contains('@') {
            return Err(HospitalError::validation("Email address is not valid"));
        }
    }
    Ok(())
}

pub fn validate_staff(member: &StaffMember) -> Result<()> {
    if member.name.trim().is_empty() {
        return Err(HospitalError::validation("Name is required"));
    }
    if member.phone_number.trim().is_empty() {
        return Err(HospitalError::validation("Phone number is required"));
    }
    if !member.email.contains('@') {
        return Err(HospitalError::validation("Email address is not valid"));
    }
    if member.consultation_fee.is_some_and(|fee| !fee.is_finite() || fee < 0.0) {
        return Err(HospitalError::validation(
            "Consultation fee cannot be negative",
        ));
    }
    Ok(())
}

pub struct Hospital {
    conn: Connection,
    config: AppConfig,
}

impl Hospital {
    pub fn new(conn: Connection, config: AppConfig) -> Self {
        Self { conn, config }
    }

    /// Opens the configured database, seeding the in-memory one with demo
    /// data, and makes sure the `root` account exists.
    pub fn open(config: AppConfig) -> Result<Self> {
        let conn = if config.uses_memory_database() {
            let conn = db::open_memory_database()?;
            seed::seed_demo_data(&conn, utils::now())?;
            conn
        } else {
            db::open_database(Path::new(&config.database))?
        };
        users::ensure_root_user(&conn)?;

        let hospital = Self::new(conn, config);
        let overdue = hospital.refresh_overdue(utils::today())?;
        if overdue > 0 {
            tracing::info!(count = overdue, "Marked invoices overdue");
        }
        Ok(hospital)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn format_money(&self, amount: f64) -> String {
        billing::format_currency(amount, &self.config.currency)
    }

    fn default_window(&self) -> WorkingWindow {
        WorkingWindow {
            start: self.config.day_start,
            end: self.config.day_end,
        }
    }

    // Accounts

    pub fn login(&self, credentials: &Credentials) -> Result<Session> {
        auth::login(&self.conn, credentials)
    }

    pub fn register_account(&self, credentials: &Credentials, patient: &Patient) -> Result<Session> {
        auth::register_patient_account(&self.conn, credentials, patient)
    }

    // Patients

    pub fn register_patient(&self, session: &Session, patient: &Patient) -> Result<i64> {
        session.require(Permission::WritePatients)?;
        validate_patient(patient)?;
        let id = patients::create_patient(&self.conn, patient)?;
        tracing::info!(patient_id = id, by = %session.username, "Registered patient");
        Ok(id)
    }

    pub fn update_patient(&self, session: &Session, patient: &Patient) -> Result<()> {
        session.require(Permission::WritePatients)?;
        validate_patient(patient)?;
        patients::update_patient(&self.conn, patient)?;
        tracing::info!(patient_id = patient.id, by = %session.username, "Updated patient");
        Ok(())
    }

    pub fn delete_patient(&self, session: &Session, patient_id: i64) -> Result<()> {
        session.require(Permission::DeletePatients)?;
        patients::delete_patient(&self.conn, patient_id)?;
        tracing::info!(patient_id, by = %session.username, "Deleted patient");
        Ok(())
    }

    pub fn patients(&self, session: &Session) -> Result<Vec<Patient>> {
        session.require(Permission::ReadPatients)?;
        patients::get_all_patients(&self.conn)
    }

    pub fn search_patients(&self, session: &Session, query: &str) -> Result<Vec<Patient>> {
        session.require(Permission::ReadPatients)?;
        if query.trim().is_empty() {
            return patients::get_all_patients(&self.conn);
        }
        patients::search_patients(&self.conn, query.trim())
    }

    pub fn patient(&self, session: &Session, patient_id: i64) -> Result<Patient> {
        session.require_staff_or_owner(Permission::ReadPatients, patient_id)?;
        patients::get_patient(&self.conn, patient_id)
    }

    // Staff

    fn new_employee_code(&self, role: StaffRole) -> Result<String> {
        for _ in 0..5 {
            let code = format!("{}-{}", role.code_prefix(), unique_suffix(utils::now()));
            if !staff::employee_code_exists(&self.conn, &code)? {
                return Ok(code);
            }
        }
        Err(HospitalError::validation(
            "Could not generate a unique employee code, try again",
        ))
    }

    /// Adds a staff member, generating the employee code. With `login` set,
    /// an account with the matching role is created too.
    pub fn add_staff(
        &self,
        session: &Session,
        member: &StaffMember,
        login: Option<&Credentials>,
    ) -> Result<StaffMember> {
        session.require(Permission::ManageStaff)?;
        validate_staff(member)?;
        let code = self.new_employee_code(member.role)?;
        let record = StaffMember {
            employee_code: code,
            ..member.clone()
        };

        let id = db::with_immediate_transaction(&self.conn, |tx| {
            let id = staff::create_staff_member(tx, &record)?;
            if let Some(credentials) = login {
                users::create_user(
                    tx,
                    &credentials.username,
                    &credentials.password,
                    record.role.user_role(),
                    Some(id),
                    None,
                )?;
            }
            Ok(id)
        })?;
        tracing::info!(
            staff_id = id,
            code = %record.employee_code,
            role = %record.role,
            by = %session.username,
            "Added staff member"
        );
        staff::get_staff(&self.conn, id)
    }

    pub fn update_staff(&self, session: &Session, member: &StaffMember) -> Result<()> {
        session.require(Permission::ManageStaff)?;
        validate_staff(member)?;
        staff::update_staff_member(&self.conn, member)
    }

    pub fn set_staff_status(
        &self,
        session: &Session,
        staff_id: i64,
        status: StaffStatus,
    ) -> Result<()> {
        session.require(Permission::ManageStaff)?;
        staff::set_staff_status(&self.conn, staff_id, status)?;
        tracing::info!(staff_id, status = %status, "Changed staff status");
        Ok(())
    }

    /// Deletes a staff member with no appointments or visits. Members with
    /// clinical history must be marked inactive instead.
    pub fn remove_staff(&self, session: &Session, staff_id: i64) -> Result<()> {
        session.require(Permission::ManageStaff)?;
        if session.staff_id == Some(staff_id) {
            return Err(HospitalError::validation("You cannot remove yourself"));
        }
        db::with_immediate_transaction(&self.conn, |tx| {
            if staff::count_clinical_references(tx, staff_id)? > 0 {
                return Err(HospitalError::validation(
                    "Staff member has appointments or visits; mark them inactive instead",
                ));
            }
            staff::delete_staff_member(tx, staff_id)
        })?;
        tracing::info!(staff_id, by = %session.username, "Removed staff member");
        Ok(())
    }

    pub fn staff(&self, session: &Session) -> Result<Vec<StaffMember>> {
        session.require(Permission::ManageStaff)?;
        staff::get_all_staff(&self.conn)
    }

    /// Active doctors. Visible to every signed-in user for booking.
    pub fn doctors(&self, _session: &Session) -> Result<Vec<StaffMember>> {
        staff::list_doctors(&self.conn)
    }

    pub fn assign_shift(
        &self,
        session: &Session,
        staff_id: i64,
        date: Date,
        shift: Shift,
    ) -> Result<()> {
        session.require(Permission::ManageStaff)?;
        staff::get_staff(&self.conn, staff_id)?;
        staff::assign_staff_shift(&self.conn, staff_id, date, shift)?;
        tracing::info!(staff_id, date = %format_date(date), shift = %shift, "Assigned shift");
        Ok(())
    }

    pub fn shifts_for(&self, session: &Session, staff_id: i64) -> Result<Vec<ShiftAssignment>> {
        if session.staff_id != Some(staff_id) {
            session.require(Permission::ManageStaff)?;
        }
        staff::get_assigned_shifts_for_staff(&self.conn, staff_id)
    }

    pub fn set_schedule(&self, session: &Session, schedule: &DoctorSchedule) -> Result<()> {
        session.require(Permission::ManageStaff)?;
        let doctor = staff::get_staff(&self.conn, schedule.doctor_id)?;
        if doctor.role != StaffRole::Doctor {
            return Err(HospitalError::validation(format!(
                "{} is not a doctor",
                doctor.name
            )));
        }
        staff::set_doctor_schedule(&self.conn, schedule)
    }

    pub fn schedules_for(&self, _session: &Session, doctor_id: i64) -> Result<Vec<DoctorSchedule>> {
        staff::get_doctor_schedules(&self.conn, doctor_id)
    }

    // Appointments

    fn window_for(&self, conn: &Connection, doctor_id: i64, date: Date) -> Result<WorkingWindow> {
        let schedules = staff::get_doctor_schedules(conn, doctor_id)?;
        Ok(scheduling::working_window(
            &schedules,
            date.weekday(),
            self.default_window(),
        ))
    }

    fn require_bookable_doctor(conn: &Connection, doctor_id: i64) -> Result<StaffMember> {
        let doctor = staff::get_staff(conn, doctor_id)?;
        if !doctor.is_active_doctor() {
            return Err(HospitalError::validation(format!(
                "{} is not an active doctor",
                doctor.name
            )));
        }
        Ok(doctor)
    }

    /// Checks the window and existing bookings for a proposed slot.
    fn check_slot(
        &self,
        conn: &Connection,
        doctor_id: i64,
        date: Date,
        start: Time,
        duration_minutes: u32,
        exclude_id: Option<i64>,
    ) -> Result<()> {
        if scheduling::has_started(date, start, utils::now()) {
            return Err(HospitalError::validation(
                "Appointments cannot be booked in the past",
            ));
        }
        let window = self.window_for(conn, doctor_id, date)?;
        scheduling::validate_within_window(window, start, duration_minutes)?;

        let day = appointments::list_appointments_for_doctor_on(conn, doctor_id, date)?;
        if let Some(existing) = scheduling::find_conflict(&day, start, duration_minutes, exclude_id)
        {
            tracing::debug!(
                doctor_id,
                conflicting = existing.id,
                "Rejected overlapping appointment"
            );
            return Err(HospitalError::SlotUnavailable {
                doctor_id,
                date: format_date(date),
                time: format_time(start),
            });
        }
        Ok(())
    }

    /// Every slot in the doctor's window on `date`, marked free or taken.
    pub fn available_slots(
        &self,
        session: &Session,
        doctor_id: i64,
        date: Date,
    ) -> Result<Vec<TimeSlot>> {
        if !session.can(Permission::SelfService) {
            session.require(Permission::ReadAppointments)?;
        }
        Self::require_bookable_doctor(&self.conn, doctor_id)?;
        let window = self.window_for(&self.conn, doctor_id, date)?;
        let slots = scheduling::generate_slots(window, self.config.slot_minutes);
        let day = appointments::list_appointments_for_doctor_on(&self.conn, doctor_id, date)?;
        let mut marked = scheduling::mark_availability(&slots, self.config.slot_minutes, &day);
        scheduling::close_elapsed(&mut marked, date, utils::now());
        Ok(marked)
    }

    pub fn book_appointment(
        &self,
        session: &Session,
        request: &NewAppointment,
    ) -> Result<Appointment> {
        session.require_staff_or_owner(Permission::BookAppointments, request.patient_id)?;
        if request.reason.trim().is_empty() {
            return Err(HospitalError::validation("A reason for the visit is required"));
        }
        let now = utils::now();

        let id = db::with_immediate_transaction(&self.conn, |tx| {
            let doctor = Self::require_bookable_doctor(tx, request.doctor_id)?;
            let patient = patients::get_patient(tx, request.patient_id)?;
            self.check_slot(
                tx,
                request.doctor_id,
                request.date,
                request.start_time,
                request.duration_minutes,
                None,
            )?;
            let id = appointments::insert_appointment(tx, request, now)?;

            let message = notifications::appointment_booked(
                &patient.full_name(),
                &doctor.name,
                request.date,
                request.start_time,
            );
            notifications::notify_patient(tx, patient.id, &message, now)?;
            notifications::notify_staff(tx, doctor.id, &message, now)?;
            Ok(id)
        })?;

        tracing::info!(
            appointment_id = id,
            doctor_id = request.doctor_id,
            patient_id = request.patient_id,
            date = %format_date(request.date),
            time = %format_time(request.start_time),
            "Booked appointment"
        );
        appointments::get_appointment(&self.conn, id)
    }

    pub fn reschedule_appointment(
        &self,
        session: &Session,
        appointment_id: i64,
        date: Date,
        start_time: Time,
    ) -> Result<Appointment> {
        let now = utils::now();
        db::with_immediate_transaction(&self.conn, |tx| {
            let current = appointments::get_appointment(tx, appointment_id)?;
            session.require_staff_or_owner(Permission::UpdateAppointments, current.patient_id)?;
            if current.status.is_terminal() || current.status == AppointmentStatus::InProgress {
                return Err(HospitalError::validation(format!(
                    "A {} appointment cannot be rescheduled",
                    current.status
                )));
            }
            self.check_slot(
                tx,
                current.doctor_id,
                date,
                start_time,
                current.duration_minutes,
                Some(current.id),
            )?;
            appointments::update_appointment_time(
                tx,
                appointment_id,
                date,
                start_time,
                current.duration_minutes,
            )?;

            let patient = patients::get_patient(tx, current.patient_id)?;
            let doctor = staff::get_staff(tx, current.doctor_id)?;
            let message = notifications::appointment_rescheduled(
                &patient.full_name(),
                &doctor.name,
                date,
                start_time,
            );
            notifications::notify_patient(tx, patient.id, &message, now)?;
            notifications::notify_staff(tx, doctor.id, &message, now)?;
            Ok(())
        })?;
        tracing::info!(appointment_id, date = %format_date(date), "Rescheduled appointment");
        appointments::get_appointment(&self.conn, appointment_id)
    }

    /// Moves an appointment along its lifecycle.
    pub fn update_appointment_status(
        &self,
        session: &Session,
        appointment_id: i64,
        status: AppointmentStatus,
        notes: Option<&str>,
    ) -> Result<Appointment> {
        session.require(Permission::UpdateAppointments)?;
        self.transition(appointment_id, status, notes)
    }

    /// Cancels an appointment. Patients may cancel their own.
    pub fn cancel_appointment(&self, session: &Session, appointment_id: i64) -> Result<Appointment> {
        let current = appointments::get_appointment(&self.conn, appointment_id)?;
        session.require_staff_or_owner(Permission::UpdateAppointments, current.patient_id)?;
        self.transition(appointment_id, AppointmentStatus::Cancelled, None)
    }

    fn transition(
        &self,
        appointment_id: i64,
        status: AppointmentStatus,
        notes: Option<&str>,
    ) -> Result<Appointment> {
        let now = utils::now();
        db::with_immediate_transaction(&self.conn, |tx| {
            let current = appointments::get_appointment(tx, appointment_id)?;
            if !current.status.can_transition_to(status) {
                return Err(HospitalError::InvalidTransition {
                    from: current.status.to_string(),
                    to: status.to_string(),
                });
            }
            appointments::update_appointment_status(tx, appointment_id, status, notes)?;

            if status == AppointmentStatus::Cancelled {
                let patient = patients::get_patient(tx, current.patient_id)?;
                let doctor = staff::get_staff(tx, current.doctor_id)?;
                let message = notifications::appointment_cancelled(
                    &patient.full_name(),
                    &doctor.name,
                    current.date,
                    current.start_time,
                );
                notifications::notify_patient(tx, patient.id, &message, now)?;
                notifications::notify_staff(tx, doctor.id, &message, now)?;
            }
            Ok(())
        })?;
        tracing::info!(appointment_id, status = %status, "Appointment status changed");
        appointments::get_appointment(&self.conn, appointment_id)
    }

    pub fn appointments(&self, session: &Session) -> Result<Vec<Appointment>> {
        session.require(Permission::ReadAppointments)?;
        appointments::list_appointments(&self.conn)
    }

    pub fn appointments_on(&self, session: &Session, date: Date) -> Result<Vec<Appointment>> {
        session.require(Permission::ReadAppointments)?;
        appointments::list_appointments_on(&self.conn, date)
    }

    pub fn appointments_for_patient(
        &self,
        session: &Session,
        patient_id: i64,
    ) -> Result<Vec<Appointment>> {
        session.require_staff_or_owner(Permission::ReadAppointments, patient_id)?;
        appointments::list_appointments_for_patient(&self.conn, patient_id)
    }

    // Visits and admissions

    /// Records an outpatient consultation. A linked appointment that is in
    /// progress is marked completed.
    pub fn record_visit(&self, session: &Session, visit: &Visit) -> Result<i64> {
        session.require(Permission::RecordVisits)?;
        if visit.diagnosis.trim().is_empty() {
            return Err(HospitalError::validation("A diagnosis is required"));
        }
        let record = Visit {
            visit_type: VisitType::Opd,
            bed_id: None,
            admission_date: None,
            discharge_date: None,
            ..visit.clone()
        };

        let id = db::with_immediate_transaction(&self.conn, |tx| {
            patients::get_patient(tx, record.patient_id)?;
            let doctor = staff::get_staff(tx, record.doctor_id)?;
            if doctor.role != StaffRole::Doctor {
                return Err(HospitalError::validation(format!(
                    "{} is not a doctor",
                    doctor.name
                )));
            }
            if let Some(appointment_id) = record.appointment_id {
                let appointment = appointments::get_appointment(tx, appointment_id)?;
                if appointment.patient_id != record.patient_id {
                    return Err(HospitalError::validation(
                        "The appointment belongs to another patient",
                    ));
                }
                if appointment.status == AppointmentStatus::InProgress {
                    appointments::update_appointment_status(
                        tx,
                        appointment_id,
                        AppointmentStatus::Completed,
                        None,
                    )?;
                }
            }
            visits::insert_visit(tx, &record)
        })?;
        tracing::info!(visit_id = id, patient_id = record.patient_id, "Recorded visit");
        Ok(id)
    }

    pub fn update_visit(&self, session: &Session, visit: &Visit) -> Result<()> {
        session.require(Permission::RecordVisits)?;
        if visit.diagnosis.trim().is_empty() {
            return Err(HospitalError::validation("A diagnosis is required"));
        }
        visits::update_visit(&self.conn, visit)
    }

    pub fn admit_patient(&self, session: &Session, admission: &Admission) -> Result<Visit> {
        session.require(Permission::ManageAdmissions)?;
        if admission.diagnosis.trim().is_empty() {
            return Err(HospitalError::validation(
                "An admitting diagnosis is required",
            ));
        }
        let now = utils::now();
        let today = now.date();

        let id = db::with_immediate_transaction(&self.conn, |tx| {
            let patient = patients::get_patient(tx, admission.patient_id)?;
            Self::require_bookable_doctor(tx, admission.doctor_id)?;
            if visits::list_visits_for_patient(tx, patient.id)?
                .iter()
                .any(Visit::is_active_admission)
            {
                return Err(HospitalError::validation(format!(
                    "{} is already admitted",
                    patient.full_name()
                )));
            }
            let bed = beds::get_bed(tx, admission.bed_id)?;
            if !matches!(bed.status, BedStatus::Available | BedStatus::Reserved) {
                return Err(HospitalError::BedUnavailable { bed_id: bed.id });
            }

            let id = visits::insert_visit(
                tx,
                &Visit {
                    id: 0,
                    patient_id: patient.id,
                    doctor_id: admission.doctor_id,
                    appointment_id: None,
                    visit_type: VisitType::Ipd,
                    visit_date: today,
                    symptoms: admission.symptoms.clone(),
                    diagnosis: admission.diagnosis.clone(),
                    prescribed_medicines: Vec::new(),
                    doctor_notes: None,
                    nurse_notes: None,
                    follow_up_date: None,
                    bed_id: Some(bed.id),
                    admission_date: Some(today),
                    discharge_date: None,
                },
            )?;
            beds::set_bed_status(tx, bed.id, BedStatus::Occupied, Some(patient.id))?;

            let message =
                notifications::patient_admitted(&patient.full_name(), &bed.bed_number, &bed.ward);
            notifications::notify_role(tx, UserRole::Nurse, &message, now)?;
            notifications::notify_staff(tx, admission.doctor_id, &message, now)?;
            Ok(id)
        })?;
        tracing::info!(
            visit_id = id,
            patient_id = admission.patient_id,
            bed_id = admission.bed_id,
            "Admitted patient"
        );
        visits::get_visit(&self.conn, id)
    }

    pub fn discharge_patient(&self, session: &Session, visit_id: i64) -> Result<Visit> {
        session.require(Permission::ManageAdmissions)?;
        let now = utils::now();

        db::with_immediate_transaction(&self.conn, |tx| {
            let visit = visits::get_visit(tx, visit_id)?;
            if !visit.is_active_admission() {
                return Err(HospitalError::validation(
                    "Only an active admission can be discharged",
                ));
            }
            visits::set_discharge(tx, visit_id, now.date())?;
            if let Some(bed_id) = visit.bed_id {
                let bed = beds::get_bed(tx, bed_id)?;
                beds::set_bed_status(tx, bed_id, BedStatus::Available, None)?;
                let patient = patients::get_patient(tx, visit.patient_id)?;
                let message =
                    notifications::patient_discharged(&patient.full_name(), &bed.bed_number);
                notifications::notify_role(tx, UserRole::Nurse, &message, now)?;
            }
            Ok(())
        })?;
        tracing::info!(visit_id, "Discharged patient");
        visits::get_visit(&self.conn, visit_id)
    }

    pub fn visits(&self, session: &Session) -> Result<Vec<Visit>> {
        session.require(Permission::ReadPatients)?;
        visits::list_visits(&self.conn)
    }

    pub fn visits_for_patient(&self, session: &Session, patient_id: i64) -> Result<Vec<Visit>> {
        session.require_staff_or_owner(Permission::ReadPatients, patient_id)?;
        visits::list_visits_for_patient(&self.conn, patient_id)
    }

    // Beds

    pub fn add_bed(&self, session: &Session, bed: &Bed) -> Result<i64> {
        session.require(Permission::ManageBeds)?;
        if bed.bed_number.trim().is_empty() || bed.ward.trim().is_empty() {
            return Err(HospitalError::validation("Bed number and ward are required"));
        }
        if !bed.daily_rate.is_finite() || bed.daily_rate < 0.0 {
            return Err(HospitalError::validation("Daily rate cannot be negative"));
        }
        let record = Bed {
            status: BedStatus::Available,
            patient_id: None,
            ..bed.clone()
        };
        let id = beds::insert_bed(&self.conn, &record)?;
        tracing::info!(bed_id = id, bed = %record.bed_number, "Added bed");
        Ok(id)
    }

    pub fn beds(&self, session: &Session) -> Result<Vec<Bed>> {
        if !session.can(Permission::ManageBeds) {
            session.require(Permission::ManageAdmissions)?;
        }
        beds::list_beds(&self.conn)
    }

    /// Takes a free bed out of service, or returns it to service.
    pub fn set_bed_maintenance(&self, session: &Session, bed_id: i64, on: bool) -> Result<()> {
        session.require(Permission::ManageBeds)?;
        let bed = beds::get_bed(&self.conn, bed_id)?;
        if bed.status == BedStatus::Occupied {
            return Err(HospitalError::BedUnavailable { bed_id });
        }
        let status = if on {
            BedStatus::Maintenance
        } else {
            BedStatus::Available
        };
        beds::set_bed_status(&self.conn, bed_id, status, None)
    }

    pub fn reserve_bed(&self, session: &Session, bed_id: i64) -> Result<()> {
        session.require(Permission::ManageBeds)?;
        let bed = beds::get_bed(&self.conn, bed_id)?;
        if bed.status != BedStatus::Available {
            return Err(HospitalError::BedUnavailable { bed_id });
        }
        beds::set_bed_status(&self.conn, bed_id, BedStatus::Reserved, None)
    }

    // Billing

    pub fn create_invoice(&self, session: &Session, request: &NewInvoice) -> Result<Invoice> {
        session.require(Permission::ManageBilling)?;
        billing::validate_items(&request.items, request.discount_percent, request.tax_percent)?;
        let now = utils::now();
        let today = now.date();
        let totals =
            InvoiceTotals::compute(&request.items, request.discount_percent, request.tax_percent);
        let due_date = today.saturating_add(Duration::days(self.config.invoice_due_days));

        let id = db::with_immediate_transaction(&self.conn, |tx| {
            patients::get_patient(tx, request.patient_id)?;
            if let Some(visit_id) = request.visit_id {
                let visit = visits::get_visit(tx, visit_id)?;
                if visit.patient_id != request.patient_id {
                    return Err(HospitalError::validation(
                        "The visit belongs to another patient",
                    ));
                }
            }
            let invoice = Invoice {
                id: 0,
                invoice_number: billing::generate_invoice_number(now),
                patient_id: request.patient_id,
                visit_id: request.visit_id,
                items: request.items.clone(),
                discount_percent: request.discount_percent,
                tax_percent: request.tax_percent,
                subtotal: totals.subtotal,
                discount_amount: totals.discount_amount,
                tax_amount: totals.tax_amount,
                total: totals.total,
                amount_paid: 0.0,
                balance: totals.total,
                status: billing::derive_status(totals.total, due_date, today),
                issued_on: today,
                due_date,
            };
            let id = invoices_db::insert_invoice(tx, &invoice)?;
            let message = notifications::invoice_issued(
                &invoice.invoice_number,
                &self.format_money(invoice.total),
                due_date,
            );
            notifications::notify_patient(tx, request.patient_id, &message, now)?;
            Ok(id)
        })?;
        let invoice = invoices_db::get_invoice(&self.conn, id)?;
        tracing::info!(
            invoice = %invoice.invoice_number,
            total = invoice.total,
            "Created invoice"
        );
        Ok(invoice)
    }

    /// Records a payment and updates the invoice's balance and status.
    /// Payments larger than the outstanding balance are rejected.
    pub fn record_payment(
        &self,
        session: &Session,
        invoice_id: i64,
        amount: f64,
        method: PaymentMethod,
    ) -> Result<Invoice> {
        session.require(Permission::ManageBilling)?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(HospitalError::validation("Payment amount must be positive"));
        }
        let now = utils::now();
        let today = now.date();

        db::with_immediate_transaction(&self.conn, |tx| {
            let invoice = invoices_db::get_invoice(tx, invoice_id)?;
            if invoice.status == InvoiceStatus::Paid {
                return Err(HospitalError::validation(format!(
                    "Invoice {} is already paid",
                    invoice.invoice_number
                )));
            }
            if amount > invoice.balance + SETTLED_EPSILON {
                return Err(HospitalError::validation(format!(
                    "Payment of {} exceeds the balance of {}",
                    self.format_money(amount),
                    self.format_money(invoice.balance)
                )));
            }
            invoices_db::insert_payment(
                tx,
                &Payment {
                    id: 0,
                    invoice_id,
                    amount,
                    method,
                    paid_on: today,
                },
            )?;
            let amount_paid = invoice.amount_paid + amount;
            let balance = billing::balance(invoice.total, amount_paid);
            let status = billing::derive_status(balance, invoice.due_date, today);
            invoices_db::update_invoice_amounts(tx, invoice_id, amount_paid, balance, status)?;

            let message = notifications::payment_received(
                &invoice.invoice_number,
                &self.format_money(amount),
                &self.format_money(balance.max(0.0)),
            );
            notifications::notify_patient(tx, invoice.patient_id, &message, now)?;
            Ok(())
        })?;
        tracing::info!(invoice_id, amount, method = %method, "Recorded payment");
        invoices_db::get_invoice(&self.conn, invoice_id)
    }

    /// Marks unpaid invoices past their due date as overdue. Returns how many changed.
    pub fn refresh_overdue(&self, today: Date) -> Result<usize> {
        db::with_immediate_transaction(&self.conn, |tx| {
            let mut changed = 0;
            for invoice in invoices_db::list_invoices(tx)? {
                if invoice.status != InvoiceStatus::Pending {
                    continue;
                }
                let status = billing::derive_status(invoice.balance, invoice.due_date, today);
                if status != invoice.status {
                    invoices_db::update_invoice_amounts(
                        tx,
                        invoice.id,
                        invoice.amount_paid,
                        invoice.balance,
                        status,
                    )?;
                    changed += 1;
                }
            }
            Ok(changed)
        })
    }

    pub fn invoices(&self, session: &Session) -> Result<Vec<Invoice>> {
        session.require(Permission::ManageBilling)?;
        invoices_db::list_invoices(&self.conn)
    }

    pub fn invoices_for_patient(&self, session: &Session, patient_id: i64) -> Result<Vec<Invoice>> {
        session.require_staff_or_owner(Permission::ManageBilling, patient_id)?;
        invoices_db::list_invoices_for_patient(&self.conn, patient_id)
    }

    pub fn payments_for(&self, session: &Session, invoice_id: i64) -> Result<Vec<Payment>> {
        let invoice = invoices_db::get_invoice(&self.conn, invoice_id)?;
        session.require_staff_or_owner(Permission::ManageBilling, invoice.patient_id)?;
        invoices_db::list_payments_for_invoice(&self.conn, invoice_id)
    }

    // Inventory

    pub fn add_item(&self, session: &Session, item: &InventoryItem) -> Result<i64> {
        session.require(Permission::ManageInventory)?;
        inventory::validate_item(item)?;
        let id = inventory_db::insert_item(&self.conn, item)?;
        tracing::info!(item_id = id, name = %item.name, "Added inventory item");
        Ok(id)
    }

    pub fn adjust_stock(&self, session: &Session, item_id: i64, delta: i64) -> Result<InventoryItem> {
        session.require(Permission::ManageInventory)?;
        let now = utils::now();
        db::with_immediate_transaction(&self.conn, |tx| {
            inventory::adjust_stock(tx, item_id, delta, now)
        })
    }

    pub fn inventory(&self, session: &Session) -> Result<Vec<InventoryItem>> {
        session.require(Permission::ManageInventory)?;
        inventory_db::list_items(&self.conn)
    }

    // Dashboards and reports

    /// Headline figures for staff. Patients get an empty dashboard.
    pub fn dashboard(&self, session: &Session, today: Date) -> Result<DashboardKpis> {
        if session.role == UserRole::Patient {
            return Ok(DashboardKpis::default());
        }
        Ok(DashboardKpis::compute(
            today,
            &appointments::list_appointments_on(&self.conn, today)?,
            &invoices_db::list_invoices(&self.conn)?,
            &invoices_db::list_payments(&self.conn)?,
            &beds::list_beds(&self.conn)?,
            &inventory_db::list_items(&self.conn)?,
        ))
    }

    pub fn generate_report(
        &self,
        session: &Session,
        kind: ReportKind,
        range: DateRange,
    ) -> Result<Report> {
        session.require(Permission::ViewReports)?;
        let appointments = appointments::list_appointments(&self.conn)?;
        let payments = invoices_db::list_payments(&self.conn)?;
        let visits = visits::list_visits(&self.conn)?;
        let beds = beds::list_beds(&self.conn)?;
        let items = inventory_db::list_items(&self.conn)?;
        let doctors = staff::list_doctors(&self.conn)?;
        let data = ReportData {
            appointments: &appointments,
            payments: &payments,
            visits: &visits,
            beds: &beds,
            inventory: &items,
            doctors: &doctors,
        };
        Ok(reports::generate(kind, range, data, utils::now()))
    }

    pub fn export_report(&self, session: &Session, report: &Report) -> Result<PathBuf> {
        session.require(Permission::ViewReports)?;
        reports::export_json(report, &self.config.reports_dir)
    }

    // Notifications

    pub fn notifications_for(&self, session: &Session) -> Result<Vec<Notification>> {
        notifications_db::list_notifications_for_user(&self.conn, session.user_id)
    }

    pub fn mark_read(&self, session: &Session, notification_id: i64) -> Result<()> {
        notifications_db::mark_notification_read(&self.conn, session.user_id, notification_id)
    }

    pub fn mark_all_read(&self, session: &Session) -> Result<usize> {
        notifications_db::mark_all_read(&self.conn, session.user_id)
    }

    pub fn unread_count(&self, session: &Session) -> Result<i64> {
        notifications_db::unread_count(&self.conn, session.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::beds::tests::sample_bed;
    use crate::db::inventory::tests::sample_item;
    use crate::db::patients::tests::sample_patient;
    use crate::db::staff::tests::sample_doctor;
    use crate::db::visits::tests::opd_visit;
    use time::macros::time;

    fn hospital() -> Hospital {
        let conn = db::open_memory_database().unwrap();
        users::ensure_root_user(&conn).unwrap();
        Hospital::new(conn, AppConfig::default())
    }

    fn admin(h: &Hospital) -> Session {
        h.login(&Credentials {
            username: "root".into(),
            password: "root".into(),
        })
        .unwrap()
    }

    fn session(role: UserRole, patient_id: Option<i64>) -> Session {
        Session {
            user_id: 999,
            username: format!("{role}-user"),
            role,
            staff_id: None,
            patient_id,
        }
    }

    /// A weekday at least a week ahead, so the default window applies.
    fn future_day() -> Date {
        let mut day = utils::today() + Duration::days(7);
        while day.weekday() == time::Weekday::Saturday || day.weekday() == time::Weekday::Sunday {
            day += Duration::days(1);
        }
        day
    }

    struct Fixture {
        h: Hospital,
        admin: Session,
        patient: i64,
        doctor: i64,
    }

    fn fixture() -> Fixture {
        let h = hospital();
        let admin = admin(&h);
        let patient = h
            .register_patient(&admin, &sample_patient("Grace", "Hopper"))
            .unwrap();
        let doctor = h
            .add_staff(&admin, &sample_doctor("", "Dr. House"), None)
            .unwrap()
            .id;
        Fixture {
            h,
            admin,
            patient,
            doctor,
        }
    }

    fn request(f: &Fixture, date: Date, start: Time) -> NewAppointment {
        NewAppointment {
            patient_id: f.patient,
            doctor_id: f.doctor,
            date,
            start_time: start,
            duration_minutes: 30,
            reason: "Checkup".into(),
            notes: None,
        }
    }

    #[test]
    fn staff_get_generated_codes_and_accounts() {
        let h = hospital();
        let admin = admin(&h);
        let mut nurse = sample_doctor("", "Nurse Joy");
        nurse.role = StaffRole::Nurse;
        let login = Credentials {
            username: "joy".into(),
            password: "pw1234".into(),
        };
        let created = h.add_staff(&admin, &nurse, Some(&login)).unwrap();

        assert!(created.employee_code.starts_with("NUR-"));
        assert_eq!(created.employee_code.len(), "NUR-".len() + 6);
        let session = h.login(&login).unwrap();
        assert_eq!(session.role, UserRole::Nurse);
        assert_eq!(session.staff_id, Some(created.id));
    }

    #[test]
    fn roles_are_enforced() {
        let f = fixture();
        let nurse = session(UserRole::Nurse, None);
        let err = f
            .h
            .register_patient(&nurse, &sample_patient("Ada", "Byron"))
            .unwrap_err();
        assert!(matches!(err, HospitalError::Unauthorized(_)));
        assert!(f.h.staff(&session(UserRole::Receptionist, None)).is_err());
        assert!(f.h.patients(&nurse).is_ok());
    }

    #[test]
    fn booking_marks_the_slot_taken() {
        let f = fixture();
        let day = future_day();
        let booked = f
            .h
            .book_appointment(&f.admin, &request(&f, day, time!(10:00)))
            .unwrap();
        assert_eq!(booked.status, AppointmentStatus::Scheduled);

        let slots = f.h.available_slots(&f.admin, f.doctor, day).unwrap();
        let at = |t: Time| slots.iter().find(|s| s.start == t).unwrap().available;
        assert!(!at(time!(10:00)));
        assert!(at(time!(09:30)));
        assert!(at(time!(10:30)));
    }

    #[test]
    fn double_booking_is_rejected() {
        let f = fixture();
        let day = future_day();
        f.h.book_appointment(&f.admin, &request(&f, day, time!(10:00)))
            .unwrap();
        let err = f
            .h
            .book_appointment(&f.admin, &request(&f, day, time!(10:15)))
            .unwrap_err();
        assert!(matches!(err, HospitalError::SlotUnavailable { .. }));
        assert!(f
            .h
            .book_appointment(&f.admin, &request(&f, day, time!(10:30)))
            .is_ok());
    }

    #[test]
    fn bookings_outside_hours_or_in_the_past_fail() {
        let f = fixture();
        let day = future_day();
        assert!(f
            .h
            .book_appointment(&f.admin, &request(&f, day, time!(16:45)))
            .is_err());
        let yesterday = utils::today() - Duration::days(1);
        assert!(f
            .h
            .book_appointment(&f.admin, &request(&f, yesterday, time!(10:00)))
            .is_err());
    }

    #[test]
    fn earlier_slots_today_are_closed() {
        let f = fixture();
        let today = utils::today();
        f.h.set_schedule(
            &f.admin,
            &DoctorSchedule {
                doctor_id: f.doctor,
                weekday: today.weekday(),
                start_time: time!(00:00),
                end_time: time!(23:59),
            },
        )
        .unwrap();

        let slots = f.h.available_slots(&f.admin, f.doctor, today).unwrap();
        assert_eq!(slots[0].start, time!(00:00));
        assert!(!slots[0].available);

        let err = f
            .h
            .book_appointment(&f.admin, &request(&f, today, time!(00:00)))
            .unwrap_err();
        assert!(matches!(err, HospitalError::Validation(_)), "{err}");

        let booked = f
            .h
            .book_appointment(&f.admin, &request(&f, future_day(), time!(10:00)))
            .unwrap();
        assert!(f
            .h
            .reschedule_appointment(&f.admin, booked.id, today, time!(00:00))
            .is_err());
    }

    #[test]
    fn cancelling_frees_the_slot_and_is_final() {
        let f = fixture();
        let day = future_day();
        let booked = f
            .h
            .book_appointment(&f.admin, &request(&f, day, time!(11:00)))
            .unwrap();
        let cancelled = f.h.cancel_appointment(&f.admin, booked.id).unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

        assert!(f
            .h
            .book_appointment(&f.admin, &request(&f, day, time!(11:00)))
            .is_ok());
        let err = f
            .h
            .update_appointment_status(&f.admin, booked.id, AppointmentStatus::Confirmed, None)
            .unwrap_err();
        assert!(matches!(err, HospitalError::InvalidTransition { .. }));
    }

    #[test]
    fn rescheduling_checks_conflicts_but_ignores_itself() {
        let f = fixture();
        let day = future_day();
        let first = f
            .h
            .book_appointment(&f.admin, &request(&f, day, time!(09:00)))
            .unwrap();
        f.h.book_appointment(&f.admin, &request(&f, day, time!(10:00)))
            .unwrap();

        let moved = f
            .h
            .reschedule_appointment(&f.admin, first.id, day, time!(09:15))
            .unwrap();
        assert_eq!(moved.start_time, time!(09:15));
        assert!(f
            .h
            .reschedule_appointment(&f.admin, first.id, day, time!(09:45))
            .is_err());
    }

    #[test]
    fn patients_book_only_for_themselves() {
        let f = fixture();
        let day = future_day();
        let own = session(UserRole::Patient, Some(f.patient));
        let other = session(UserRole::Patient, Some(f.patient + 100));

        assert!(f.h.book_appointment(&own, &request(&f, day, time!(13:00))).is_ok());
        let err = f
            .h
            .book_appointment(&other, &request(&f, day, time!(14:00)))
            .unwrap_err();
        assert!(matches!(err, HospitalError::Unauthorized(_)));
    }

    #[test]
    fn booking_notifies_linked_accounts() {
        let f = fixture();
        let credentials = Credentials {
            username: "ada".into(),
            password: "secret".into(),
        };
        let patient_session = f
            .h
            .register_account(&credentials, &sample_patient("Ada", "Byron"))
            .unwrap();
        let mut req = request(&f, future_day(), time!(09:00));
        req.patient_id = patient_session.patient_id.unwrap();
        f.h.book_appointment(&patient_session, &req).unwrap();

        assert_eq!(f.h.unread_count(&patient_session).unwrap(), 1);
        let list = f.h.notifications_for(&patient_session).unwrap();
        assert_eq!(list[0].title, "Appointment booked");
        f.h.mark_all_read(&patient_session).unwrap();
        assert_eq!(f.h.unread_count(&patient_session).unwrap(), 0);
    }

    #[test]
    fn inactive_doctors_cannot_be_booked() {
        let f = fixture();
        f.h.set_staff_status(&f.admin, f.doctor, StaffStatus::OnLeave)
            .unwrap();
        assert!(f
            .h
            .book_appointment(&f.admin, &request(&f, future_day(), time!(10:00)))
            .is_err());
    }

    #[test]
    fn staff_with_history_cannot_be_removed() {
        let f = fixture();
        f.h.book_appointment(&f.admin, &request(&f, future_day(), time!(10:00)))
            .unwrap();
        assert!(f.h.remove_staff(&f.admin, f.doctor).is_err());

        let spare = f
            .h
            .add_staff(&f.admin, &sample_doctor("", "Dr. Spare"), None)
            .unwrap();
        f.h.remove_staff(&f.admin, spare.id).unwrap();
        assert_eq!(f.h.staff(&f.admin).unwrap().len(), 1);
    }

    #[test]
    fn admission_and_discharge_move_the_bed() {
        let f = fixture();
        let bed = f.h.add_bed(&f.admin, &sample_bed("G-1")).unwrap();
        let admission = Admission {
            patient_id: f.patient,
            doctor_id: f.doctor,
            bed_id: bed,
            symptoms: None,
            diagnosis: "Observation".into(),
        };
        let visit = f.h.admit_patient(&f.admin, &admission).unwrap();
        assert_eq!(visit.visit_type, VisitType::Ipd);
        assert!(visit.is_active_admission());

        let beds = f.h.beds(&f.admin).unwrap();
        assert_eq!(beds[0].status, BedStatus::Occupied);
        assert_eq!(beds[0].patient_id, Some(f.patient));

        let err = f.h.admit_patient(&f.admin, &admission).unwrap_err();
        assert!(matches!(err, HospitalError::Validation(_)));

        let discharged = f.h.discharge_patient(&f.admin, visit.id).unwrap();
        assert!(discharged.discharge_date.is_some());
        let beds = f.h.beds(&f.admin).unwrap();
        assert_eq!(beds[0].status, BedStatus::Available);
        assert_eq!(beds[0].patient_id, None);
        assert!(f.h.discharge_patient(&f.admin, visit.id).is_err());
    }

    #[test]
    fn occupied_or_maintenance_beds_cannot_take_patients() {
        let f = fixture();
        let bed = f.h.add_bed(&f.admin, &sample_bed("G-1")).unwrap();
        f.h.set_bed_maintenance(&f.admin, bed, true).unwrap();
        let err = f
            .h
            .admit_patient(
                &f.admin,
                &Admission {
                    patient_id: f.patient,
                    doctor_id: f.doctor,
                    bed_id: bed,
                    symptoms: None,
                    diagnosis: "Observation".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, HospitalError::BedUnavailable { .. }));
        assert!(f.h.reserve_bed(&f.admin, bed).is_err());
        f.h.set_bed_maintenance(&f.admin, bed, false).unwrap();
        f.h.reserve_bed(&f.admin, bed).unwrap();
    }

    #[test]
    fn recording_a_visit_completes_the_appointment() {
        let f = fixture();
        let booked = f
            .h
            .book_appointment(&f.admin, &request(&f, future_day(), time!(10:00)))
            .unwrap();
        f.h.update_appointment_status(&f.admin, booked.id, AppointmentStatus::InProgress, None)
            .unwrap();

        let mut visit = opd_visit(f.patient, f.doctor, booked.date);
        visit.appointment_id = Some(booked.id);
        f.h.record_visit(&f.admin, &visit).unwrap();

        let appointments = f.h.appointments_for_patient(&f.admin, f.patient).unwrap();
        assert_eq!(appointments[0].status, AppointmentStatus::Completed);
        assert_eq!(f.h.visits_for_patient(&f.admin, f.patient).unwrap().len(), 1);
    }

    #[test]
    fn invoices_compute_totals_and_track_payments() {
        let f = fixture();
        let invoice = f
            .h
            .create_invoice(
                &f.admin,
                &NewInvoice {
                    patient_id: f.patient,
                    visit_id: None,
                    items: vec![InvoiceItem {
                        description: "Consultation".into(),
                        quantity: 2,
                        unit_price: 50.0,
                    }],
                    discount_percent: 10.0,
                    tax_percent: 18.0,
                },
            )
            .unwrap();
        assert!((invoice.total - 106.2).abs() < 1e-9);
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert!(invoice.invoice_number.starts_with("INV-"));

        let err = f
            .h
            .record_payment(&f.admin, invoice.id, 200.0, PaymentMethod::Cash)
            .unwrap_err();
        assert!(matches!(err, HospitalError::Validation(_)));

        let partial = f
            .h
            .record_payment(&f.admin, invoice.id, 100.0, PaymentMethod::Card)
            .unwrap();
        assert_eq!(partial.status, InvoiceStatus::Pending);
        assert!((partial.balance - 6.2).abs() < 1e-9);

        let settled = f
            .h
            .record_payment(&f.admin, invoice.id, partial.balance, PaymentMethod::Cash)
            .unwrap();
        assert_eq!(settled.status, InvoiceStatus::Paid);
        assert_eq!(f.h.payments_for(&f.admin, invoice.id).unwrap().len(), 2);
        assert!(f
            .h
            .record_payment(&f.admin, invoice.id, 1.0, PaymentMethod::Cash)
            .is_err());

        let kpis = f.h.dashboard(&f.admin, utils::today()).unwrap();
        assert!((kpis.revenue_today - 106.2).abs() < 1e-9);
        assert_eq!(kpis.outstanding, 0.0);
    }

    #[test]
    fn overdue_invoices_are_flagged() {
        let f = fixture();
        let invoice = f
            .h
            .create_invoice(
                &f.admin,
                &NewInvoice {
                    patient_id: f.patient,
                    visit_id: None,
                    items: vec![InvoiceItem {
                        description: "Dressing".into(),
                        quantity: 1,
                        unit_price: 15.0,
                    }],
                    discount_percent: 0.0,
                    tax_percent: 0.0,
                },
            )
            .unwrap();
        let later = invoice.due_date + Duration::days(1);
        assert_eq!(f.h.refresh_overdue(invoice.due_date).unwrap(), 0);
        assert_eq!(f.h.refresh_overdue(later).unwrap(), 1);
        let stored = f.h.invoices_for_patient(&f.admin, f.patient).unwrap();
        assert_eq!(stored[0].status, InvoiceStatus::Overdue);
    }

    #[test]
    fn stock_adjustments_are_admin_only() {
        let f = fixture();
        let id = f
            .h
            .add_item(&f.admin, &sample_item("Gauze", 5, 2))
            .unwrap();
        assert!(f
            .h
            .adjust_stock(&session(UserRole::Nurse, None), id, -1)
            .is_err());
        assert_eq!(f.h.adjust_stock(&f.admin, id, -3).unwrap().quantity, 2);
        // root is the only admin; it hears about the crossing
        assert_eq!(f.h.unread_count(&f.admin).unwrap(), 1);
    }

    #[test]
    fn reports_are_generated_and_exported() {
        let dir = tempfile::tempdir().unwrap();
        let conn = db::open_memory_database().unwrap();
        users::ensure_root_user(&conn).unwrap();
        let config = AppConfig {
            reports_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        let h = Hospital::new(conn, config);
        let admin = admin(&h);

        let today = utils::today();
        let range = DateRange::new(today, today).unwrap();
        let report = h
            .generate_report(&admin, ReportKind::Occupancy, range)
            .unwrap();
        let path = h.export_report(&admin, &report).unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(path.exists());
        assert!(h
            .generate_report(&session(UserRole::Doctor, None), ReportKind::Revenue, range)
            .is_err());
    }

    #[test]
    fn memory_database_opens_seeded() {
        let config = AppConfig {
            database: crate::config::MEMORY_DB.to_string(),
            ..AppConfig::default()
        };
        let h = Hospital::open(config).unwrap();
        let admin = admin(&h);
        assert_eq!(h.patients(&admin).unwrap().len(), 4);
        assert!(!h.doctors(&admin).unwrap().is_empty());
    }
}
