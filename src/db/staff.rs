//! Staff members, shift assignments and doctor working hours.

use super::{
    date_column, date_param, enum_column, json_column, optional_enum_column, time_column,
    time_param, to_json,
};
use crate::error::{HospitalError, Result};
use crate::models::{DoctorSchedule, Shift, ShiftAssignment, StaffMember, StaffRole, StaffStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};
use time::{Date, Weekday};

const STAFF_COLUMNS: &str = "id, employee_code, name, role, department, phone_number, email, \
     address, status, joined_on, specialization, license_number, consultation_fee, shift, wards";

fn map_staff(row: &Row<'_>) -> rusqlite::Result<StaffMember> {
    Ok(StaffMember {
        id: row.get(0)?,
        employee_code: row.get(1)?,
        name: row.get(2)?,
        role: enum_column(row, 3)?,
        department: row.get(4)?,
        phone_number: row.get(5)?,
        email: row.get(6)?,
        address: row.get(7)?,
        status: enum_column(row, 8)?,
        joined_on: date_column(row, 9)?,
        specialization: row.get(10)?,
        license_number: row.get(11)?,
        consultation_fee: row.get(12)?,
        shift: optional_enum_column(row, 13)?,
        wards: json_column(row, 14)?,
    })
}

/// Inserts a staff member and returns the new ID.
///
/// The employee code must already be generated; wards are stored as JSON
/// text.
///
/// # Errors
///
/// Returns an error if the employee code is taken or the insert fails.
///
/// # Side Effects
///
/// Adds a row to the `staff` table.
pub fn create_staff_member(conn: &Connection, staff_member: &StaffMember) -> Result<i64> {
    conn.execute(
        "INSERT INTO staff (employee_code, name, role, department, phone_number, email, address, \
         status, joined_on, specialization, license_number, consultation_fee, shift, wards) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            staff_member.employee_code,
            staff_member.name,
            staff_member.role.as_str(),
            staff_member.department,
            staff_member.phone_number,
            staff_member.email,
            staff_member.address,
            staff_member.status.as_str(),
            date_param(staff_member.joined_on),
            staff_member.specialization,
            staff_member.license_number,
            staff_member.consultation_fee,
            staff_member.shift.map(|s| s.as_str()),
            to_json(&staff_member.wards)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Lists every staff member by name, inactive ones included.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row cannot be decoded.
pub fn get_all_staff(conn: &Connection) -> Result<Vec<StaffMember>> {
    let mut stmt = conn.prepare(&format!("SELECT {STAFF_COLUMNS} FROM staff ORDER BY name"))?;
    let staff = stmt
        .query_map([], map_staff)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(staff)
}

/// Active doctors, ordered by name.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_doctors(conn: &Connection) -> Result<Vec<StaffMember>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STAFF_COLUMNS} FROM staff WHERE role = ? AND status = ? ORDER BY name"
    ))?;
    let doctors = stmt
        .query_map(
            params![StaffRole::Doctor.as_str(), StaffStatus::Active.as_str()],
            map_staff,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(doctors)
}

/// Checks whether `code` is already used by a staff member.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn employee_code_exists(conn: &Connection, code: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM staff WHERE employee_code = ?",
        params![code],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Fetches a staff member by ID.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if no staff member has that ID.
pub fn get_staff(conn: &Connection, staff_id: i64) -> Result<StaffMember> {
    conn.query_row(
        &format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = ?"),
        params![staff_id],
        map_staff,
    )
    .optional()?
    .ok_or_else(|| HospitalError::not_found("Staff member", staff_id))
}

/// Overwrites the editable fields of a staff member.
///
/// The employee code and joining date never change.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if the staff member does not exist.
///
/// # Side Effects
///
/// Updates one row in the `staff` table.
pub fn update_staff_member(conn: &Connection, staff_member: &StaffMember) -> Result<()> {
    let changed = conn.execute(
        "UPDATE staff SET name = ?, role = ?, department = ?, phone_number = ?, email = ?, \
         address = ?, status = ?, specialization = ?, license_number = ?, consultation_fee = ?, \
         shift = ?, wards = ? WHERE id = ?",
        params![
            staff_member.name,
            staff_member.role.as_str(),
            staff_member.department,
            staff_member.phone_number,
            staff_member.email,
            staff_member.address,
            staff_member.status.as_str(),
            staff_member.specialization,
            staff_member.license_number,
            staff_member.consultation_fee,
            staff_member.shift.map(|s| s.as_str()),
            to_json(&staff_member.wards)?,
            staff_member.id,
        ],
    )?;
    if changed == 0 {
        return Err(HospitalError::not_found("Staff member", staff_member.id));
    }
    Ok(())
}

/// Marks a staff member active, on leave or inactive.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if the staff member does not exist.
pub fn set_staff_status(conn: &Connection, staff_id: i64, status: StaffStatus) -> Result<()> {
    let changed = conn.execute(
        "UPDATE staff SET status = ? WHERE id = ?",
        params![status.as_str(), staff_id],
    )?;
    if changed == 0 {
        return Err(HospitalError::not_found("Staff member", staff_id));
    }
    Ok(())
}

/// Number of appointments and visits that reference the staff member.
///
/// A non-zero count means the record must be deactivated rather than
/// deleted.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_clinical_references(conn: &Connection, staff_id: i64) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM appointments WHERE doctor_id = ?1) + \
                (SELECT COUNT(*) FROM visits WHERE doctor_id = ?1)",
        params![staff_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Deletes a staff member.
///
/// Callers check [`count_clinical_references`] first; appointments and
/// visits keep a hard reference to their doctor.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if the staff member does not exist,
/// or a constraint error if clinical records still point at them.
///
/// # Side Effects
///
/// Removes the member's shifts and schedules. Linked accounts lose their
/// staff link.
pub fn delete_staff_member(conn: &Connection, staff_id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM staff WHERE id = ?", params![staff_id])?;
    if changed == 0 {
        return Err(HospitalError::not_found("Staff member", staff_id));
    }
    Ok(())
}

/// Assigns a shift for a day, replacing any earlier assignment for that day.
///
/// # Errors
///
/// Returns an error if the staff member does not exist or the upsert fails.
///
/// # Side Effects
///
/// Inserts or updates one row in the `shifts` table.
pub fn assign_staff_shift(conn: &Connection, staff_id: i64, date: Date, shift: Shift) -> Result<()> {
    conn.execute(
        "INSERT INTO shifts (staff_id, date, shift) VALUES (?, ?, ?) \
         ON CONFLICT (staff_id, date) DO UPDATE SET shift = excluded.shift",
        params![staff_id, date_param(date), shift.as_str()],
    )?;
    Ok(())
}

/// A staff member's shift assignments, earliest day first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_assigned_shifts_for_staff(conn: &Connection, staff_id: i64) -> Result<Vec<ShiftAssignment>> {
    let mut stmt =
        conn.prepare("SELECT staff_id, date, shift FROM shifts WHERE staff_id = ? ORDER BY date")?;
    let shifts = stmt
        .query_map(params![staff_id], |row| {
            Ok(ShiftAssignment {
                staff_id: row.get(0)?,
                date: date_column(row, 1)?,
                shift: enum_column(row, 2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(shifts)
}

/// Stores a doctor's working hours for one weekday.
///
/// An existing schedule for the same weekday is replaced.
///
/// # Errors
///
/// Returns [`HospitalError::Validation`] if the window does not start before
/// it ends, and an error if the upsert fails.
///
/// # Side Effects
///
/// Inserts or updates one row in the `doctor_schedules` table.
pub fn set_doctor_schedule(conn: &Connection, schedule: &DoctorSchedule) -> Result<()> {
    if schedule.start_time >= schedule.end_time {
        return Err(HospitalError::validation(
            "Schedule must start before it ends",
        ));
    }
    conn.execute(
        "INSERT INTO doctor_schedules (doctor_id, weekday, start_time, end_time) VALUES (?, ?, ?, ?) \
         ON CONFLICT (doctor_id, weekday) DO UPDATE SET start_time = excluded.start_time, \
         end_time = excluded.end_time",
        params![
            schedule.doctor_id,
            schedule.weekday.number_from_monday(),
            time_param(schedule.start_time),
            time_param(schedule.end_time),
        ],
    )?;
    Ok(())
}

/// A doctor's weekly schedule, Monday first.
///
/// Weekdays without a row fall back to the configured default window.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_doctor_schedules(conn: &Connection, doctor_id: i64) -> Result<Vec<DoctorSchedule>> {
    let mut stmt = conn.prepare(
        "SELECT doctor_id, weekday, start_time, end_time FROM doctor_schedules \
         WHERE doctor_id = ? ORDER BY weekday",
    )?;
    let schedules = stmt
        .query_map(params![doctor_id], |row| {
            let weekday: u8 = row.get(1)?;
            Ok(DoctorSchedule {
                doctor_id: row.get(0)?,
                weekday: Weekday::Sunday.nth_next(weekday % 7),
                start_time: time_column(row, 2)?,
                end_time: time_column(row, 3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(schedules)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use time::macros::{date, time};

    pub(crate) fn sample_doctor(code: &str, name: &str) -> StaffMember {
        StaffMember {
            id: 0,
            employee_code: code.into(),
            name: name.into(),
            role: StaffRole::Doctor,
            department: Some("General Medicine".into()),
            phone_number: "555-0200".into(),
            email: format!("{code}@caredesk.test"),
            address: "Staff Quarters".into(),
            status: StaffStatus::Active,
            joined_on: date!(2024 - 09 - 01),
            specialization: Some("Internal Medicine".into()),
            license_number: Some("LIC-1234".into()),
            consultation_fee: Some(50.0),
            shift: None,
            wards: Vec::new(),
        }
    }

    #[test]
    fn create_and_list_staff() {
        let conn = open_memory_database().unwrap();
        let doc_id = create_staff_member(&conn, &sample_doctor("DOC-1", "Dr. House")).unwrap();

        let mut nurse = sample_doctor("NUR-1", "Nurse Joy");
        nurse.role = StaffRole::Nurse;
        nurse.specialization = None;
        nurse.shift = Some(Shift::Night);
        nurse.wards = vec!["A".into(), "ICU".into()];
        let nurse_id = create_staff_member(&conn, &nurse).unwrap();

        let fetched = get_staff(&conn, nurse_id).unwrap();
        assert_eq!(fetched.shift, Some(Shift::Night));
        assert_eq!(fetched.wards, vec!["A".to_string(), "ICU".to_string()]);

        assert_eq!(get_all_staff(&conn).unwrap().len(), 2);
        let doctors = list_doctors(&conn).unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0].id, doc_id);
    }

    #[test]
    fn inactive_doctors_are_not_listed() {
        let conn = open_memory_database().unwrap();
        let id = create_staff_member(&conn, &sample_doctor("DOC-1", "Dr. House")).unwrap();
        set_staff_status(&conn, id, StaffStatus::OnLeave).unwrap();
        assert!(list_doctors(&conn).unwrap().is_empty());
        assert_eq!(get_staff(&conn, id).unwrap().status, StaffStatus::OnLeave);
    }

    #[test]
    fn shifts_replace_same_day_assignment() {
        let conn = open_memory_database().unwrap();
        let id = create_staff_member(&conn, &sample_doctor("DOC-1", "Dr. House")).unwrap();
        assign_staff_shift(&conn, id, date!(2026 - 03 - 02), Shift::Morning).unwrap();
        assign_staff_shift(&conn, id, date!(2026 - 03 - 02), Shift::Night).unwrap();
        assign_staff_shift(&conn, id, date!(2026 - 03 - 01), Shift::Afternoon).unwrap();

        let shifts = get_assigned_shifts_for_staff(&conn, id).unwrap();
        assert_eq!(shifts.len(), 2);
        assert_eq!(shifts[0].date, date!(2026 - 03 - 01));
        assert_eq!(shifts[1].shift, Shift::Night);
    }

    #[test]
    fn schedules_round_trip_weekdays() {
        let conn = open_memory_database().unwrap();
        let id = create_staff_member(&conn, &sample_doctor("DOC-1", "Dr. House")).unwrap();
        for weekday in [Weekday::Monday, Weekday::Sunday] {
            set_doctor_schedule(
                &conn,
                &DoctorSchedule {
                    doctor_id: id,
                    weekday,
                    start_time: time!(08:00),
                    end_time: time!(12:00),
                },
            )
            .unwrap();
        }
        let schedules = get_doctor_schedules(&conn, id).unwrap();
        assert_eq!(schedules.len(), 2);
        assert_eq!(schedules[0].weekday, Weekday::Monday);
        assert_eq!(schedules[1].weekday, Weekday::Sunday);
        assert_eq!(schedules[1].end_time, time!(12:00));
    }

    #[test]
    fn inverted_schedule_is_rejected() {
        let conn = open_memory_database().unwrap();
        let id = create_staff_member(&conn, &sample_doctor("DOC-1", "Dr. House")).unwrap();
        let err = set_doctor_schedule(
            &conn,
            &DoctorSchedule {
                doctor_id: id,
                weekday: Weekday::Tuesday,
                start_time: time!(17:00),
                end_time: time!(09:00),
            },
        )
        .unwrap_err();
        assert!(matches!(err, HospitalError::Validation(_)));
    }
}
