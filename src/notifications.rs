//! Notification messages and their delivery to users.

use crate::db::{notifications as store, users};
use crate::error::Result;
use crate::models::{NotificationKind, UserRole};
use crate::utils::{format_date, format_time};
use time::{Date, PrimitiveDateTime, Time};

/// A notification ready to be delivered to one or more users.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}

impl Message {
    fn new(kind: NotificationKind, title: &str, body: String) -> Self {
        Self {
            kind,
            title: title.to_string(),
            body,
        }
    }
}

pub fn appointment_booked(patient: &str, doctor: &str, date: Date, start: Time) -> Message {
    Message::new(
        NotificationKind::Appointment,
        "Appointment booked",
        format!(
            "{patient} is booked with {doctor} on {} at {}",
            format_date(date),
            format_time(start)
        ),
    )
}

pub fn appointment_cancelled(patient: &str, doctor: &str, date: Date, start: Time) -> Message {
    Message::new(
        NotificationKind::Appointment,
        "Appointment cancelled",
        format!(
            "The appointment of {patient} with {doctor} on {} at {} was cancelled",
            format_date(date),
            format_time(start)
        ),
    )
}

pub fn appointment_rescheduled(patient: &str, doctor: &str, date: Date, start: Time) -> Message {
    Message::new(
        NotificationKind::Appointment,
        "Appointment rescheduled",
        format!(
            "The appointment of {patient} with {doctor} moved to {} at {}",
            format_date(date),
            format_time(start)
        ),
    )
}

pub fn invoice_issued(invoice_number: &str, amount: &str, due: Date) -> Message {
    Message::new(
        NotificationKind::Billing,
        "Invoice issued",
        format!(
            "Invoice {invoice_number} for {amount} is due on {}",
            format_date(due)
        ),
    )
}

pub fn payment_received(invoice_number: &str, amount: &str, balance: &str) -> Message {
    Message::new(
        NotificationKind::Billing,
        "Payment received",
        format!("Received {amount} for invoice {invoice_number}. Balance: {balance}"),
    )
}

pub fn low_stock(item: &str, quantity: u32, unit: &str) -> Message {
    Message::new(
        NotificationKind::Inventory,
        "Low stock",
        format!("{item} is down to {quantity} {unit}"),
    )
}

pub fn patient_admitted(patient: &str, bed: &str, ward: &str) -> Message {
    Message::new(
        NotificationKind::Admission,
        "Patient admitted",
        format!("{patient} was admitted to bed {bed} in {ward}"),
    )
}

pub fn patient_discharged(patient: &str, bed: &str) -> Message {
    Message::new(
        NotificationKind::Admission,
        "Patient discharged",
        format!("{patient} was discharged and bed {bed} is free"),
    )
}

pub fn notify_user(
    conn: &rusqlite::Connection,
    user_id: i64,
    message: &Message,
    at: PrimitiveDateTime,
) -> Result<i64> {
    store::insert_notification(conn, user_id, message.kind, &message.title, &message.body, at)
}

/// Sends `message` to every account holding `role`. Returns how many were written.
pub fn notify_role(
    conn: &rusqlite::Connection,
    role: UserRole,
    message: &Message,
    at: PrimitiveDateTime,
) -> Result<usize> {
    let recipients = users::list_users_by_role(conn, role)?;
    for user in &recipients {
        notify_user(conn, user.id, message, at)?;
    }
    tracing::debug!(
        role = %role,
        count = recipients.len(),
        title = %message.title,
        "Delivered notification"
    );
    Ok(recipients.len())
}

/// Sends `message` to the account linked to a patient, if there is one.
pub fn notify_patient(
    conn: &rusqlite::Connection,
    patient_id: i64,
    message: &Message,
    at: PrimitiveDateTime,
) -> Result<bool> {
    match users::find_user_for_patient(conn, patient_id)? {
        Some(user) => {
            notify_user(conn, user.id, message, at)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Sends `message` to the account linked to a staff member, if there is one.
pub fn notify_staff(
    conn: &rusqlite::Connection,
    staff_id: i64,
    message: &Message,
    at: PrimitiveDateTime,
) -> Result<bool> {
    match users::find_user_for_staff(conn, staff_id)? {
        Some(user) => {
            notify_user(conn, user.id, message, at)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
