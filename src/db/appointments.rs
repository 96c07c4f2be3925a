//! Appointment persistence. Appointments are never deleted; cancelling only
//! changes their status.

use super::{
    date_column, date_param, datetime_column, datetime_param, enum_column, time_column, time_param,
};
use crate::error::{HospitalError, Result};
use crate::models::{Appointment, AppointmentStatus, NewAppointment};
use rusqlite::{params, Connection, OptionalExtension, Row};
use time::{Date, PrimitiveDateTime, Time};

const APPOINTMENT_COLUMNS: &str =
    "id, patient_id, doctor_id, date, start_time, duration_minutes, status, reason, notes, created_at";

fn map_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        date: date_column(row, 3)?,
        start_time: time_column(row, 4)?,
        duration_minutes: row.get(5)?,
        status: enum_column(row, 6)?,
        reason: row.get(7)?,
        notes: row.get(8)?,
        created_at: datetime_column(row, 9)?,
    })
}

fn query_appointments(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments {filter} ORDER BY date, start_time, id"
    ))?;
    let appointments = stmt
        .query_map(params, map_appointment)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(appointments)
}

/// Inserts a new appointment in the `scheduled` state and returns its ID.
///
/// No overlap check happens here; the caller checks the slot inside the same
/// transaction.
///
/// # Arguments
///
/// * `appointment` - Patient, doctor, slot and reason to book.
/// * `created_at` - Booking time, stored with the row.
///
/// # Errors
///
/// Returns an error if the insert fails, for example when the patient or
/// doctor does not exist.
///
/// # Side Effects
///
/// Adds a row to the `appointments` table.
pub fn insert_appointment(
    conn: &Connection,
    appointment: &NewAppointment,
    created_at: PrimitiveDateTime,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO appointments (patient_id, doctor_id, date, start_time, duration_minutes, \
         status, reason, notes, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            appointment.patient_id,
            appointment.doctor_id,
            date_param(appointment.date),
            time_param(appointment.start_time),
            appointment.duration_minutes,
            AppointmentStatus::Scheduled.as_str(),
            appointment.reason,
            appointment.notes,
            datetime_param(created_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetches an appointment by ID.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if no appointment has that ID.
pub fn get_appointment(conn: &Connection, appointment_id: i64) -> Result<Appointment> {
    conn.query_row(
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?"),
        params![appointment_id],
        map_appointment,
    )
    .optional()?
    .ok_or_else(|| HospitalError::not_found("Appointment", appointment_id))
}

/// Lists every appointment by date and start time.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_appointments(conn: &Connection) -> Result<Vec<Appointment>> {
    query_appointments(conn, "", [])
}

/// Appointments on `date` for all doctors, cancelled ones included.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_appointments_on(conn: &Connection, date: Date) -> Result<Vec<Appointment>> {
    query_appointments(conn, "WHERE date = ?", params![date_param(date)])
}

/// Every appointment a doctor has on a day, cancelled ones included.
///
/// Slot checks filter out the cancelled rows themselves.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_appointments_for_doctor_on(
    conn: &Connection,
    doctor_id: i64,
    date: Date,
) -> Result<Vec<Appointment>> {
    query_appointments(
        conn,
        "WHERE doctor_id = ? AND date = ?",
        params![doctor_id, date_param(date)],
    )
}

/// A patient's appointments by date and start time.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_appointments_for_patient(conn: &Connection, patient_id: i64) -> Result<Vec<Appointment>> {
    query_appointments(conn, "WHERE patient_id = ?", params![patient_id])
}

/// Stores a new status for an appointment.
///
/// Transition rules are checked by the caller.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if the appointment does not exist.
///
/// # Side Effects
///
/// Updates one row in the `appointments` table.
pub fn update_appointment_status(
    conn: &Connection,
    appointment_id: i64,
    status: AppointmentStatus,
    notes: Option<&str>,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE appointments SET status = ?, notes = coalesce(?, notes) WHERE id = ?",
        params![status.as_str(), notes, appointment_id],
    )?;
    if changed == 0 {
        return Err(HospitalError::not_found("Appointment", appointment_id));
    }
    Ok(())
}

/// Moves an appointment to a new day and start time.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if the appointment does not exist.
///
/// # Side Effects
///
/// Updates one row in the `appointments` table.
pub fn update_appointment_time(
    conn: &Connection,
    appointment_id: i64,
    date: Date,
    start_time: Time,
    duration_minutes: u32,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE appointments SET date = ?, start_time = ?, duration_minutes = ? WHERE id = ?",
        params![
            date_param(date),
            time_param(start_time),
            duration_minutes,
            appointment_id
        ],
    )?;
    if changed == 0 {
        return Err(HospitalError::not_found("Appointment", appointment_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::patients::{create_patient, tests::sample_patient};
    use crate::db::staff::{create_staff_member, tests::sample_doctor};
    use time::macros::{date, datetime, time};

    fn setup() -> (Connection, i64, i64) {
        let conn = open_memory_database().unwrap();
        let patient = create_patient(&conn, &sample_patient("Grace", "Hopper")).unwrap();
        let doctor = create_staff_member(&conn, &sample_doctor("DOC-1", "Dr. House")).unwrap();
        (conn, patient, doctor)
    }

    fn new_appointment(patient_id: i64, doctor_id: i64, date: Date, start: Time) -> NewAppointment {
        NewAppointment {
            patient_id,
            doctor_id,
            date,
            start_time: start,
            duration_minutes: 30,
            reason: "Follow-up".into(),
            notes: None,
        }
    }

    #[test]
    fn insert_and_filter_by_doctor_and_day() {
        let (conn, patient, doctor) = setup();
        let created = datetime!(2026-03-01 08:00);
        insert_appointment(
            &conn,
            &new_appointment(patient, doctor, date!(2026 - 03 - 02), time!(11:00)),
            created,
        )
        .unwrap();
        let first = insert_appointment(
            &conn,
            &new_appointment(patient, doctor, date!(2026 - 03 - 02), time!(09:30)),
            created,
        )
        .unwrap();
        insert_appointment(
            &conn,
            &new_appointment(patient, doctor, date!(2026 - 03 - 03), time!(09:30)),
            created,
        )
        .unwrap();

        let day = list_appointments_for_doctor_on(&conn, doctor, date!(2026 - 03 - 02)).unwrap();
        assert_eq!(day.len(), 2);
        assert_eq!(day[0].id, first);
        assert_eq!(day[0].status, AppointmentStatus::Scheduled);
        assert_eq!(day[0].created_at, created);

        assert_eq!(list_appointments_for_patient(&conn, patient).unwrap().len(), 3);
        assert_eq!(list_appointments_on(&conn, date!(2026 - 03 - 03)).unwrap().len(), 1);
    }

    #[test]
    fn status_update_keeps_existing_notes() {
        let (conn, patient, doctor) = setup();
        let mut appt = new_appointment(patient, doctor, date!(2026 - 03 - 02), time!(10:00));
        appt.notes = Some("Bring reports".into());
        let id = insert_appointment(&conn, &appt, datetime!(2026-03-01 08:00)).unwrap();

        update_appointment_status(&conn, id, AppointmentStatus::Confirmed, None).unwrap();
        let stored = get_appointment(&conn, id).unwrap();
        assert_eq!(stored.status, AppointmentStatus::Confirmed);
        assert_eq!(stored.notes.as_deref(), Some("Bring reports"));

        update_appointment_status(&conn, id, AppointmentStatus::Cancelled, Some("Patient ill"))
            .unwrap();
        let stored = get_appointment(&conn, id).unwrap();
        assert_eq!(stored.notes.as_deref(), Some("Patient ill"));
    }

    #[test]
    fn reschedule_moves_appointment() {
        let (conn, patient, doctor) = setup();
        let id = insert_appointment(
            &conn,
            &new_appointment(patient, doctor, date!(2026 - 03 - 02), time!(10:00)),
            datetime!(2026-03-01 08:00),
        )
        .unwrap();
        update_appointment_time(&conn, id, date!(2026 - 03 - 04), time!(14:30), 45).unwrap();

        let stored = get_appointment(&conn, id).unwrap();
        assert_eq!(stored.date, date!(2026 - 03 - 04));
        assert_eq!(stored.start_time, time!(14:30));
        assert_eq!(stored.duration_minutes, 45);
    }

    #[test]
    fn missing_appointment_is_reported() {
        let (conn, _, _) = setup();
        assert!(matches!(
            update_appointment_status(&conn, 7, AppointmentStatus::Confirmed, None),
            Err(HospitalError::NotFound { .. })
        ));
    }
}
