//! Ward beds and their occupancy.

use super::enum_column;
use crate::error::{HospitalError, Result};
use crate::models::{Bed, BedStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};

const BED_COLUMNS: &str =
    "id, bed_number, room_number, ward, bed_type, status, patient_id, daily_rate";

fn map_bed(row: &Row<'_>) -> rusqlite::Result<Bed> {
    Ok(Bed {
        id: row.get(0)?,
        bed_number: row.get(1)?,
        room_number: row.get(2)?,
        ward: row.get(3)?,
        bed_type: enum_column(row, 4)?,
        status: enum_column(row, 5)?,
        patient_id: row.get(6)?,
        daily_rate: row.get(7)?,
    })
}

/// Adds a bed and returns its ID.
///
/// # Errors
///
/// Returns an error if the bed number is taken or the insert fails.
pub fn insert_bed(conn: &Connection, bed: &Bed) -> Result<i64> {
    conn.execute(
        "INSERT INTO beds (bed_number, room_number, ward, bed_type, status, patient_id, daily_rate) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            bed.bed_number,
            bed.room_number,
            bed.ward,
            bed.bed_type.as_str(),
            bed.status.as_str(),
            bed.patient_id,
            bed.daily_rate,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetches a bed by ID.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if no bed has that ID.
pub fn get_bed(conn: &Connection, bed_id: i64) -> Result<Bed> {
    conn.query_row(
        &format!("SELECT {BED_COLUMNS} FROM beds WHERE id = ?"),
        params![bed_id],
        map_bed,
    )
    .optional()?
    .ok_or_else(|| HospitalError::not_found("Bed", bed_id))
}

/// Every bed, grouped by ward.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_beds(conn: &Connection) -> Result<Vec<Bed>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BED_COLUMNS} FROM beds ORDER BY ward, bed_number"
    ))?;
    let beds = stmt
        .query_map([], map_bed)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(beds)
}

/// Sets a bed's status. Only an occupied bed keeps a patient; any other
/// status clears the assignment.
///
/// # Errors
///
/// Returns [`HospitalError::Validation`] if `status` is occupied and no
/// patient is given, and [`HospitalError::NotFound`] if the bed does not
/// exist.
///
/// # Side Effects
///
/// Updates one row in the `beds` table.
pub fn set_bed_status(
    conn: &Connection,
    bed_id: i64,
    status: BedStatus,
    patient_id: Option<i64>,
) -> Result<()> {
    let patient_id = match status {
        BedStatus::Occupied => Some(patient_id.ok_or_else(|| {
            HospitalError::validation("An occupied bed must have a patient")
        })?),
        _ => None,
    };
    let changed = conn.execute(
        "UPDATE beds SET status = ?, patient_id = ? WHERE id = ?",
        params![status.as_str(), patient_id, bed_id],
    )?;
    if changed == 0 {
        return Err(HospitalError::not_found("Bed", bed_id));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::patients::{create_patient, tests::sample_patient};
    use crate::models::BedType;

    pub(crate) fn sample_bed(number: &str) -> Bed {
        Bed {
            id: 0,
            bed_number: number.into(),
            room_number: "101".into(),
            ward: "General".into(),
            bed_type: BedType::General,
            status: BedStatus::Available,
            patient_id: None,
            daily_rate: 120.0,
        }
    }

    #[test]
    fn occupying_requires_a_patient() {
        let conn = open_memory_database().unwrap();
        let bed = insert_bed(&conn, &sample_bed("G-1")).unwrap();
        let err = set_bed_status(&conn, bed, BedStatus::Occupied, None).unwrap_err();
        assert!(matches!(err, HospitalError::Validation(_)));
    }

    #[test]
    fn freeing_a_bed_clears_the_patient() {
        let conn = open_memory_database().unwrap();
        let patient = create_patient(&conn, &sample_patient("Grace", "Hopper")).unwrap();
        let bed = insert_bed(&conn, &sample_bed("G-1")).unwrap();

        set_bed_status(&conn, bed, BedStatus::Occupied, Some(patient)).unwrap();
        assert_eq!(get_bed(&conn, bed).unwrap().patient_id, Some(patient));

        set_bed_status(&conn, bed, BedStatus::Maintenance, Some(patient)).unwrap();
        let stored = get_bed(&conn, bed).unwrap();
        assert_eq!(stored.status, BedStatus::Maintenance);
        assert_eq!(stored.patient_id, None);
    }

    #[test]
    fn bed_numbers_are_unique() {
        let conn = open_memory_database().unwrap();
        insert_bed(&conn, &sample_bed("G-1")).unwrap();
        assert!(insert_bed(&conn, &sample_bed("G-1")).is_err());
        assert_eq!(list_beds(&conn).unwrap().len(), 1);
    }
}
