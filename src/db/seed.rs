//! Demo data for the in-memory database.
//!
//! Dates are laid out around `today` so the dashboard has something to show
//! on every run.

use super::{appointments, beds, billing, inventory, patients, staff, users, visits};
use crate::billing::{balance, derive_status, InvoiceTotals};
use crate::error::Result;
use crate::models::{
    AppointmentStatus, Bed, BedStatus, BedType, DoctorSchedule, Gender, InventoryItem, Invoice,
    InvoiceItem, InvoiceStatus, NewAppointment, Patient, Payment, PaymentMethod,
    PrescribedMedicine, Shift, StaffMember, StaffRole, StaffStatus, UserRole, Visit, VisitType,
};
use rusqlite::Connection;
use time::macros::{date, time};
use time::{Date, Duration, PrimitiveDateTime, Time, Weekday};

/// Password given to every demo account.
pub const DEMO_PASSWORD: &str = "password";

fn staff_member(
    code: &str,
    name: &str,
    role: StaffRole,
    department: &str,
    joined_on: Date,
) -> StaffMember {
    StaffMember {
        id: 0,
        employee_code: code.to_string(),
        name: name.to_string(),
        role,
        department: Some(department.to_string()),
        phone_number: "555-0100".to_string(),
        email: format!("{}@caredesk.local", code.to_lowercase()),
        address: "Hospital Campus".to_string(),
        status: StaffStatus::Active,
        joined_on,
        specialization: None,
        license_number: None,
        consultation_fee: None,
        shift: None,
        wards: Vec::new(),
    }
}

fn doctor(code: &str, name: &str, department: &str, specialization: &str, fee: f64) -> StaffMember {
    StaffMember {
        specialization: Some(specialization.to_string()),
        license_number: Some(format!("LIC-{code}")),
        consultation_fee: Some(fee),
        ..staff_member(code, name, StaffRole::Doctor, department, date!(2020 - 01 - 15))
    }
}

fn patient(
    first: &str,
    last: &str,
    date_of_birth: Date,
    gender: Gender,
    phone: &str,
    registered_on: Date,
) -> Patient {
    Patient {
        id: 0,
        first_name: first.to_string(),
        last_name: last.to_string(),
        date_of_birth,
        gender,
        address: "12 Harbour Road".to_string(),
        phone_number: phone.to_string(),
        email: Some(format!("{}.{}@mail.test", first.to_lowercase(), last.to_lowercase())),
        blood_group: Some("O+".to_string()),
        medical_history: None,
        allergies: None,
        current_medications: None,
        registered_on,
    }
}

fn bed(number: &str, room: &str, ward: &str, bed_type: BedType, rate: f64) -> Bed {
    Bed {
        id: 0,
        bed_number: number.to_string(),
        room_number: room.to_string(),
        ward: ward.to_string(),
        bed_type,
        status: BedStatus::Available,
        patient_id: None,
        daily_rate: rate,
    }
}

fn item(
    name: &str,
    category: &str,
    quantity: u32,
    reorder_level: u32,
    unit: &str,
    unit_price: f64,
    expiry_date: Option<Date>,
) -> InventoryItem {
    InventoryItem {
        id: 0,
        name: name.to_string(),
        category: category.to_string(),
        quantity,
        reorder_level,
        unit: unit.to_string(),
        unit_price,
        expiry_date,
    }
}

fn book(
    conn: &Connection,
    patient_id: i64,
    doctor_id: i64,
    date: Date,
    start_time: Time,
    reason: &str,
    at: PrimitiveDateTime,
) -> Result<i64> {
    appointments::insert_appointment(
        conn,
        &NewAppointment {
            patient_id,
            doctor_id,
            date,
            start_time,
            duration_minutes: 30,
            reason: reason.to_string(),
            notes: None,
        },
        at,
    )
}

/// Fills an empty database with demo records.
///
/// The data is laid out around `now`: appointments today and in the coming
/// days, an occupied bed, stock near its reorder level and demo accounts for
/// every role.
///
/// # Returns
///
/// `false` when the database already holds patients and nothing was written.
///
/// # Errors
///
/// Returns an error if any insert fails. Earlier inserts stay unless the
/// caller wraps the call in a transaction.
///
/// # Side Effects
///
/// Writes to every table except `notifications`.
pub fn seed_demo_data(conn: &Connection, now: PrimitiveDateTime) -> Result<bool> {
    if !patients::get_all_patients(conn)?.is_empty() {
        return Ok(false);
    }
    let today = now.date();
    let days = |n: i64| today.saturating_add(Duration::days(n));

    let house = staff::create_staff_member(
        conn,
        &doctor("DOC-100001", "Dr. Gregory House", "Diagnostics", "Nephrology", 80.0),
    )?;
    let grey = staff::create_staff_member(
        conn,
        &doctor("DOC-100002", "Dr. Meredith Grey", "Surgery", "General Surgery", 65.0),
    )?;
    let nurse = staff::create_staff_member(
        conn,
        &StaffMember {
            shift: Some(Shift::Morning),
            wards: vec!["General".to_string(), "ICU".to_string()],
            ..staff_member("NUR-100003", "Carla Espinosa", StaffRole::Nurse, "Nursing", date!(2021 - 06 - 01))
        },
    )?;
    let reception = staff::create_staff_member(
        conn,
        &staff_member("REC-100004", "Pam Beesly", StaffRole::Receptionist, "Front Desk", date!(2022 - 03 - 10)),
    )?;

    for weekday in [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ] {
        staff::set_doctor_schedule(
            conn,
            &DoctorSchedule {
                doctor_id: grey,
                weekday,
                start_time: time!(08:00),
                end_time: time!(14:00),
            },
        )?;
    }
    staff::assign_staff_shift(conn, nurse, today, Shift::Morning)?;
    staff::assign_staff_shift(conn, nurse, days(1), Shift::Night)?;

    users::create_user(conn, "house", DEMO_PASSWORD, UserRole::Doctor, Some(house), None)?;
    users::create_user(conn, "grey", DEMO_PASSWORD, UserRole::Doctor, Some(grey), None)?;
    users::create_user(conn, "carla", DEMO_PASSWORD, UserRole::Nurse, Some(nurse), None)?;
    users::create_user(conn, "pam", DEMO_PASSWORD, UserRole::Receptionist, Some(reception), None)?;

    let ada = patients::create_patient(
        conn,
        &patient("Ada", "Lovelace", date!(1985 - 12 - 10), Gender::Female, "555-0111", days(-60)),
    )?;
    let alan = patients::create_patient(
        conn,
        &Patient {
            allergies: Some("Penicillin".to_string()),
            ..patient("Alan", "Turing", date!(1972 - 06 - 23), Gender::Male, "555-0112", days(-30))
        },
    )?;
    let grace = patients::create_patient(
        conn,
        &patient("Grace", "Hopper", date!(1956 - 12 - 09), Gender::Female, "555-0113", days(-7)),
    )?;
    let linus = patients::create_patient(
        conn,
        &patient("Linus", "Torvalds", date!(1990 - 12 - 28), Gender::Male, "555-0114", today),
    )?;
    users::create_user(conn, "ada", DEMO_PASSWORD, UserRole::Patient, None, Some(ada))?;

    let general = [
        bed("G-101", "101", "General", BedType::General, 120.0),
        bed("G-102", "101", "General", BedType::General, 120.0),
        bed("G-103", "102", "General", BedType::General, 120.0),
        bed("P-201", "201", "Private", BedType::Private, 250.0),
        bed("ICU-1", "301", "ICU", BedType::Icu, 600.0),
        bed("ER-1", "001", "Emergency", BedType::Emergency, 300.0),
    ];
    let mut bed_ids = Vec::with_capacity(general.len());
    for b in &general {
        bed_ids.push(beds::insert_bed(conn, b)?);
    }
    beds::set_bed_status(conn, bed_ids[2], BedStatus::Maintenance, None)?;

    for stock in [
        item("Paracetamol 500mg", "medicine", 240, 50, "tablets", 0.1, Some(days(400))),
        item("Amoxicillin 250mg", "medicine", 18, 30, "capsules", 0.35, Some(days(20))),
        item("Insulin Glargine", "medicine", 12, 5, "pens", 24.0, Some(days(90))),
        item("Surgical Gloves", "consumable", 0, 100, "pairs", 0.25, None),
        item("Gauze Pads", "consumable", 500, 100, "pads", 0.05, None),
        item("Saline 0.9% 1L", "fluid", 60, 20, "bags", 1.8, Some(days(200))),
    ] {
        inventory::insert_item(conn, &stock)?;
    }

    let at = now.checked_sub(Duration::days(1)).unwrap_or(now);
    let done = book(conn, alan, house, today, time!(09:00), "Persistent cough", at)?;
    appointments::update_appointment_status(conn, done, AppointmentStatus::Completed, None)?;
    let confirmed = book(conn, ada, house, today, time!(10:00), "Follow-up", at)?;
    appointments::update_appointment_status(conn, confirmed, AppointmentStatus::Confirmed, None)?;
    book(conn, grace, grey, today, time!(11:00), "Pre-operative check", at)?;
    book(conn, linus, house, days(1), time!(14:30), "Back pain", at)?;
    let cancelled = book(conn, ada, grey, days(2), time!(09:00), "Consultation", at)?;
    appointments::update_appointment_status(conn, cancelled, AppointmentStatus::Cancelled, None)?;

    let consultation = visits::insert_visit(
        conn,
        &Visit {
            id: 0,
            patient_id: alan,
            doctor_id: house,
            appointment_id: Some(done),
            visit_type: VisitType::Opd,
            visit_date: today,
            symptoms: Some("Dry cough for two weeks".to_string()),
            diagnosis: "Acute bronchitis".to_string(),
            prescribed_medicines: vec![PrescribedMedicine {
                name: "Amoxicillin 250mg".to_string(),
                dosage: "1 capsule".to_string(),
                frequency: "3x daily".to_string(),
                duration_days: 7,
            }],
            doctor_notes: Some("Review in one week".to_string()),
            nurse_notes: None,
            follow_up_date: Some(days(7)),
            bed_id: None,
            admission_date: None,
            discharge_date: None,
        },
    )?;

    visits::insert_visit(
        conn,
        &Visit {
            id: 0,
            patient_id: grace,
            doctor_id: grey,
            appointment_id: None,
            visit_type: VisitType::Ipd,
            visit_date: days(-2),
            symptoms: Some("Abdominal pain".to_string()),
            diagnosis: "Appendicitis".to_string(),
            prescribed_medicines: Vec::new(),
            doctor_notes: None,
            nurse_notes: Some("Post-op, stable".to_string()),
            follow_up_date: None,
            bed_id: Some(bed_ids[3]),
            admission_date: Some(days(-2)),
            discharge_date: None,
        },
    )?;
    beds::set_bed_status(conn, bed_ids[3], BedStatus::Occupied, Some(grace))?;

    let items = vec![
        InvoiceItem {
            description: "Consultation".to_string(),
            quantity: 1,
            unit_price: 80.0,
        },
        InvoiceItem {
            description: "Chest X-ray".to_string(),
            quantity: 1,
            unit_price: 120.0,
        },
    ];
    let totals = InvoiceTotals::compute(&items, 5.0, 10.0);
    let paid = 100.0;
    let due_date = days(30);
    let remaining = balance(totals.total, paid);
    let invoice_id = billing::insert_invoice(
        conn,
        &Invoice {
            id: 0,
            invoice_number: crate::billing::generate_invoice_number(now),
            patient_id: alan,
            visit_id: Some(consultation),
            items,
            discount_percent: 5.0,
            tax_percent: 10.0,
            subtotal: totals.subtotal,
            discount_amount: totals.discount_amount,
            tax_amount: totals.tax_amount,
            total: totals.total,
            amount_paid: paid,
            balance: remaining,
            status: derive_status(remaining, due_date, today),
            issued_on: today,
            due_date,
        },
    )?;
    billing::insert_payment(
        conn,
        &Payment {
            id: 0,
            invoice_id,
            amount: paid,
            method: PaymentMethod::Card,
            paid_on: today,
        },
    )?;

    let old_items = vec![InvoiceItem {
        description: "Blood panel".to_string(),
        quantity: 1,
        unit_price: 45.0,
    }];
    let old_totals = InvoiceTotals::compute(&old_items, 0.0, 0.0);
    billing::insert_invoice(
        conn,
        &Invoice {
            id: 0,
            invoice_number: format!("INV-DEMO-{}", ada),
            patient_id: ada,
            visit_id: None,
            items: old_items,
            discount_percent: 0.0,
            tax_percent: 0.0,
            subtotal: old_totals.subtotal,
            discount_amount: 0.0,
            tax_amount: 0.0,
            total: old_totals.total,
            amount_paid: 0.0,
            balance: old_totals.total,
            status: InvoiceStatus::Overdue,
            issued_on: days(-45),
            due_date: days(-15),
        },
    )?;

    tracing::info!("Seeded demo data");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use time::macros::datetime;

    #[test]
    fn seeding_fills_every_area_once() {
        let conn = open_memory_database().unwrap();
        let now = datetime!(2026-03-04 08:00);
        assert!(seed_demo_data(&conn, now).unwrap());

        assert_eq!(patients::get_all_patients(&conn).unwrap().len(), 4);
        assert_eq!(staff::list_doctors(&conn).unwrap().len(), 2);
        assert_eq!(beds::list_beds(&conn).unwrap().len(), 6);
        assert_eq!(appointments::list_appointments_on(&conn, now.date()).unwrap().len(), 3);
        assert_eq!(billing::list_invoices(&conn).unwrap().len(), 2);
        assert!(users::authenticate_user(&conn, "ada", DEMO_PASSWORD).is_ok());

        assert!(!seed_demo_data(&conn, now).unwrap());
        assert_eq!(patients::get_all_patients(&conn).unwrap().len(), 4);
    }
}
