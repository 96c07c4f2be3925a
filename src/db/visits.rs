//! Outpatient visits and inpatient admissions.

use super::{
    date_column, date_param, enum_column, json_column, optional_date_column, optional_date_param,
    to_json,
};
use crate::error::{HospitalError, Result};
use crate::models::Visit;
use rusqlite::{params, Connection, OptionalExtension, Row};
use time::Date;

const VISIT_COLUMNS: &str = "id, patient_id, doctor_id, appointment_id, visit_type, visit_date, \
     symptoms, diagnosis, prescribed_medicines, doctor_notes, nurse_notes, follow_up_date, bed_id, \
     admission_date, discharge_date";

fn map_visit(row: &Row<'_>) -> rusqlite::Result<Visit> {
    Ok(Visit {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        appointment_id: row.get(3)?,
        visit_type: enum_column(row, 4)?,
        visit_date: date_column(row, 5)?,
        symptoms: row.get(6)?,
        diagnosis: row.get(7)?,
        prescribed_medicines: json_column(row, 8)?,
        doctor_notes: row.get(9)?,
        nurse_notes: row.get(10)?,
        follow_up_date: optional_date_column(row, 11)?,
        bed_id: row.get(12)?,
        admission_date: optional_date_column(row, 13)?,
        discharge_date: optional_date_column(row, 14)?,
    })
}

/// Records a visit and returns its ID.
///
/// Prescribed medicines are stored as JSON text.
///
/// # Errors
///
/// Returns an error if the insert fails or the prescriptions cannot be
/// serialized.
///
/// # Side Effects
///
/// Adds a row to the `visits` table.
pub fn insert_visit(conn: &Connection, visit: &Visit) -> Result<i64> {
    conn.execute(
        "INSERT INTO visits (patient_id, doctor_id, appointment_id, visit_type, visit_date, \
         symptoms, diagnosis, prescribed_medicines, doctor_notes, nurse_notes, follow_up_date, \
         bed_id, admission_date, discharge_date) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            visit.patient_id,
            visit.doctor_id,
            visit.appointment_id,
            visit.visit_type.as_str(),
            date_param(visit.visit_date),
            visit.symptoms,
            visit.diagnosis,
            to_json(&visit.prescribed_medicines)?,
            visit.doctor_notes,
            visit.nurse_notes,
            optional_date_param(visit.follow_up_date),
            visit.bed_id,
            optional_date_param(visit.admission_date),
            optional_date_param(visit.discharge_date),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetches a visit by ID.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if no visit has that ID.
pub fn get_visit(conn: &Connection, visit_id: i64) -> Result<Visit> {
    conn.query_row(
        &format!("SELECT {VISIT_COLUMNS} FROM visits WHERE id = ?"),
        params![visit_id],
        map_visit,
    )
    .optional()?
    .ok_or_else(|| HospitalError::not_found("Visit", visit_id))
}

/// All visits, most recent first.
///
/// # Errors
///
/// Returns an error if the query fails or stored prescriptions cannot be
/// decoded.
pub fn list_visits(conn: &Connection) -> Result<Vec<Visit>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VISIT_COLUMNS} FROM visits ORDER BY visit_date DESC, id DESC"
    ))?;
    let visits = stmt
        .query_map([], map_visit)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(visits)
}

/// A patient's visits, most recent first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_visits_for_patient(conn: &Connection, patient_id: i64) -> Result<Vec<Visit>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VISIT_COLUMNS} FROM visits WHERE patient_id = ? ORDER BY visit_date DESC, id DESC"
    ))?;
    let visits = stmt
        .query_map(params![patient_id], map_visit)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(visits)
}

/// Updates the clinical fields of a visit.
///
/// Patient, doctor, type and dates other than the follow-up stay as
/// recorded.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if the visit does not exist.
///
/// # Side Effects
///
/// Updates one row in the `visits` table.
pub fn update_visit(conn: &Connection, visit: &Visit) -> Result<()> {
    let changed = conn.execute(
        "UPDATE visits SET symptoms = ?, diagnosis = ?, prescribed_medicines = ?, \
         doctor_notes = ?, nurse_notes = ?, follow_up_date = ? WHERE id = ?",
        params![
            visit.symptoms,
            visit.diagnosis,
            to_json(&visit.prescribed_medicines)?,
            visit.doctor_notes,
            visit.nurse_notes,
            optional_date_param(visit.follow_up_date),
            visit.id,
        ],
    )?;
    if changed == 0 {
        return Err(HospitalError::not_found("Visit", visit.id));
    }
    Ok(())
}

/// Stamps the discharge date on an inpatient visit.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if the visit does not exist.
pub fn set_discharge(conn: &Connection, visit_id: i64, discharge_date: Date) -> Result<()> {
    let changed = conn.execute(
        "UPDATE visits SET discharge_date = ? WHERE id = ?",
        params![date_param(discharge_date), visit_id],
    )?;
    if changed == 0 {
        return Err(HospitalError::not_found("Visit", visit_id));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::patients::{create_patient, tests::sample_patient};
    use crate::db::staff::{create_staff_member, tests::sample_doctor};
    use crate::models::{PrescribedMedicine, VisitType};
    use time::macros::date;

    pub(crate) fn opd_visit(patient_id: i64, doctor_id: i64, date: Date) -> Visit {
        Visit {
            id: 0,
            patient_id,
            doctor_id,
            appointment_id: None,
            visit_type: VisitType::Opd,
            visit_date: date,
            symptoms: Some("Cough".into()),
            diagnosis: "Bronchitis".into(),
            prescribed_medicines: vec![PrescribedMedicine {
                name: "Amoxicillin".into(),
                dosage: "500mg".into(),
                frequency: "3x daily".into(),
                duration_days: 7,
            }],
            doctor_notes: None,
            nurse_notes: None,
            follow_up_date: Some(date!(2026 - 03 - 16)),
            bed_id: None,
            admission_date: None,
            discharge_date: None,
        }
    }

    #[test]
    fn visit_round_trips_prescriptions() {
        let conn = open_memory_database().unwrap();
        let patient = create_patient(&conn, &sample_patient("Grace", "Hopper")).unwrap();
        let doctor = create_staff_member(&conn, &sample_doctor("DOC-1", "Dr. House")).unwrap();

        let id = insert_visit(&conn, &opd_visit(patient, doctor, date!(2026 - 03 - 02))).unwrap();
        let visit = get_visit(&conn, id).unwrap();
        assert_eq!(visit.prescribed_medicines.len(), 1);
        assert_eq!(visit.prescribed_medicines[0].name, "Amoxicillin");
        assert_eq!(visit.follow_up_date, Some(date!(2026 - 03 - 16)));
        assert!(!visit.is_active_admission());
    }

    #[test]
    fn listing_is_most_recent_first() {
        let conn = open_memory_database().unwrap();
        let patient = create_patient(&conn, &sample_patient("Grace", "Hopper")).unwrap();
        let doctor = create_staff_member(&conn, &sample_doctor("DOC-1", "Dr. House")).unwrap();
        insert_visit(&conn, &opd_visit(patient, doctor, date!(2026 - 03 - 01))).unwrap();
        let latest = insert_visit(&conn, &opd_visit(patient, doctor, date!(2026 - 03 - 05))).unwrap();

        let visits = list_visits_for_patient(&conn, patient).unwrap();
        assert_eq!(visits[0].id, latest);
        assert_eq!(list_visits(&conn).unwrap().len(), 2);
    }

    #[test]
    fn update_and_discharge() {
        let conn = open_memory_database().unwrap();
        let patient = create_patient(&conn, &sample_patient("Grace", "Hopper")).unwrap();
        let doctor = create_staff_member(&conn, &sample_doctor("DOC-1", "Dr. House")).unwrap();
        let id = insert_visit(&conn, &opd_visit(patient, doctor, date!(2026 - 03 - 01))).unwrap();

        let mut visit = get_visit(&conn, id).unwrap();
        visit.nurse_notes = Some("Vitals stable".into());
        update_visit(&conn, &visit).unwrap();
        set_discharge(&conn, id, date!(2026 - 03 - 03)).unwrap();

        let stored = get_visit(&conn, id).unwrap();
        assert_eq!(stored.nurse_notes.as_deref(), Some("Vitals stable"));
        assert_eq!(stored.discharge_date, Some(date!(2026 - 03 - 03)));
    }
}
