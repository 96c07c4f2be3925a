//! Patient records.

use super::{date_column, date_param, enum_column};
use crate::error::{HospitalError, Result};
use crate::models::Patient;
use rusqlite::{params, Connection, OptionalExtension, Row};

const PATIENT_COLUMNS: &str = "id, first_name, last_name, date_of_birth, gender, address, \
     phone_number, email, blood_group, medical_history, allergies, current_medications, registered_on";

fn map_patient(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        date_of_birth: date_column(row, 3)?,
        gender: enum_column(row, 4)?,
        address: row.get(5)?,
        phone_number: row.get(6)?,
        email: row.get(7)?,
        blood_group: row.get(8)?,
        medical_history: row.get(9)?,
        allergies: row.get(10)?,
        current_medications: row.get(11)?,
        registered_on: date_column(row, 12)?,
    })
}

/// Inserts a patient and returns the new ID.
///
/// The `id` field of `patient` is ignored.
///
/// # Errors
///
/// Returns an error if the insert fails.
///
/// # Side Effects
///
/// Adds a row to the `patients` table.
pub fn create_patient(conn: &Connection, patient: &Patient) -> Result<i64> {
    conn.execute(
        "INSERT INTO patients (first_name, last_name, date_of_birth, gender, address, phone_number, \
         email, blood_group, medical_history, allergies, current_medications, registered_on) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            patient.first_name,
            patient.last_name,
            date_param(patient.date_of_birth),
            patient.gender.as_str(),
            patient.address,
            patient.phone_number,
            patient.email,
            patient.blood_group,
            patient.medical_history,
            patient.allergies,
            patient.current_medications,
            date_param(patient.registered_on),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Lists every patient, ordered by last then first name.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row cannot be decoded.
pub fn get_all_patients(conn: &Connection) -> Result<Vec<Patient>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY last_name, first_name"
    ))?;
    let patients = stmt
        .query_map([], map_patient)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(patients)
}

/// Fetches a patient by ID.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if no patient has that ID.
pub fn get_patient(conn: &Connection, patient_id: i64) -> Result<Patient> {
    conn.query_row(
        &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?"),
        params![patient_id],
        map_patient,
    )
    .optional()?
    .ok_or_else(|| HospitalError::not_found("Patient", patient_id))
}

/// Case-insensitive match on name, phone number or email.
///
/// A blank query matches every patient.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn search_patients(conn: &Connection, query: &str) -> Result<Vec<Patient>> {
    let pattern = format!("%{}%", query.trim().to_lowercase());
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients \
         WHERE lower(first_name || ' ' || last_name) LIKE ?1 \
            OR phone_number LIKE ?1 \
            OR lower(coalesce(email, '')) LIKE ?1 \
         ORDER BY last_name, first_name"
    ))?;
    let patients = stmt
        .query_map(params![pattern], map_patient)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(patients)
}

/// Overwrites every editable field of a patient.
///
/// The registration date is kept as stored.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if the patient does not exist.
///
/// # Side Effects
///
/// Updates one row in the `patients` table.
pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<()> {
    let changed = conn.execute(
        "UPDATE patients SET first_name = ?, last_name = ?, date_of_birth = ?, gender = ?, \
         address = ?, phone_number = ?, email = ?, blood_group = ?, medical_history = ?, \
         allergies = ?, current_medications = ? WHERE id = ?",
        params![
            patient.first_name,
            patient.last_name,
            date_param(patient.date_of_birth),
            patient.gender.as_str(),
            patient.address,
            patient.phone_number,
            patient.email,
            patient.blood_group,
            patient.medical_history,
            patient.allergies,
            patient.current_medications,
            patient.id,
        ],
    )?;
    if changed == 0 {
        return Err(HospitalError::not_found("Patient", patient.id));
    }
    Ok(())
}

/// Deletes a patient together with their appointments, visits and invoices.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if the patient does not exist.
///
/// # Side Effects
///
/// Cascades through every table that references the patient. Linked
/// accounts lose their patient link.
pub fn delete_patient(conn: &Connection, patient_id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM patients WHERE id = ?", params![patient_id])?;
    if changed == 0 {
        return Err(HospitalError::not_found("Patient", patient_id));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::models::Gender;
    use time::macros::date;

    pub(crate) fn sample_patient(first: &str, last: &str) -> Patient {
        Patient {
            id: 0,
            first_name: first.into(),
            last_name: last.into(),
            date_of_birth: date!(1985 - 04 - 12),
            gender: Gender::Female,
            address: "12 Elm Street".into(),
            phone_number: "555-0101".into(),
            email: Some(format!("{}@example.com", first.to_lowercase())),
            blood_group: Some("O+".into()),
            medical_history: None,
            allergies: Some("Penicillin".into()),
            current_medications: None,
            registered_on: date!(2026 - 01 - 05),
        }
    }

    #[test]
    fn create_and_fetch_patient() {
        let conn = open_memory_database().unwrap();
        let id = create_patient(&conn, &sample_patient("Grace", "Hopper")).unwrap();

        let patient = get_patient(&conn, id).unwrap();
        assert_eq!(patient.id, id);
        assert_eq!(patient.full_name(), "Grace Hopper");
        assert_eq!(patient.date_of_birth, date!(1985 - 04 - 12));
        assert_eq!(patient.allergies.as_deref(), Some("Penicillin"));
    }

    #[test]
    fn search_matches_name_and_phone() {
        let conn = open_memory_database().unwrap();
        create_patient(&conn, &sample_patient("Grace", "Hopper")).unwrap();
        let mut other = sample_patient("Alan", "Turing");
        other.phone_number = "555-9999".into();
        create_patient(&conn, &other).unwrap();

        assert_eq!(search_patients(&conn, "hop").unwrap().len(), 1);
        assert_eq!(search_patients(&conn, "9999").unwrap()[0].first_name, "Alan");
        assert_eq!(search_patients(&conn, "").unwrap().len(), 2);
    }

    #[test]
    fn update_and_delete_patient() {
        let conn = open_memory_database().unwrap();
        let id = create_patient(&conn, &sample_patient("Grace", "Hopper")).unwrap();

        let mut patient = get_patient(&conn, id).unwrap();
        patient.address = "1 Navy Yard".into();
        update_patient(&conn, &patient).unwrap();
        assert_eq!(get_patient(&conn, id).unwrap().address, "1 Navy Yard");

        delete_patient(&conn, id).unwrap();
        assert!(matches!(
            get_patient(&conn, id),
            Err(HospitalError::NotFound { .. })
        ));
        assert!(delete_patient(&conn, id).is_err());
    }
}
