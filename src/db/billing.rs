//! Invoices and the payments recorded against them.

use super::{date_column, date_param, enum_column, json_column, to_json};
use crate::error::{HospitalError, Result};
use crate::models::{Invoice, InvoiceStatus, Payment};
use rusqlite::{params, Connection, OptionalExtension, Row};

const INVOICE_COLUMNS: &str = "id, invoice_number, patient_id, visit_id, items, discount_percent, \
     tax_percent, subtotal, discount_amount, tax_amount, total, amount_paid, balance, status, \
     issued_on, due_date";

fn map_invoice(row: &Row<'_>) -> rusqlite::Result<Invoice> {
    Ok(Invoice {
        id: row.get(0)?,
        invoice_number: row.get(1)?,
        patient_id: row.get(2)?,
        visit_id: row.get(3)?,
        items: json_column(row, 4)?,
        discount_percent: row.get(5)?,
        tax_percent: row.get(6)?,
        subtotal: row.get(7)?,
        discount_amount: row.get(8)?,
        tax_amount: row.get(9)?,
        total: row.get(10)?,
        amount_paid: row.get(11)?,
        balance: row.get(12)?,
        status: enum_column(row, 13)?,
        issued_on: date_column(row, 14)?,
        due_date: date_column(row, 15)?,
    })
}

fn map_payment(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get(0)?,
        invoice_id: row.get(1)?,
        amount: row.get(2)?,
        method: enum_column(row, 3)?,
        paid_on: date_column(row, 4)?,
    })
}

/// Inserts an invoice with its computed totals and returns the new ID.
///
/// Line items are stored as JSON text alongside the totals, so the invoice
/// keeps the prices it was issued with.
///
/// # Errors
///
/// Returns an error if the insert fails or the invoice number is taken.
///
/// # Side Effects
///
/// Adds a row to the `invoices` table.
pub fn insert_invoice(conn: &Connection, invoice: &Invoice) -> Result<i64> {
    conn.execute(
        "INSERT INTO invoices (invoice_number, patient_id, visit_id, items, discount_percent, \
         tax_percent, subtotal, discount_amount, tax_amount, total, amount_paid, balance, status, \
         issued_on, due_date) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            invoice.invoice_number,
            invoice.patient_id,
            invoice.visit_id,
            to_json(&invoice.items)?,
            invoice.discount_percent,
            invoice.tax_percent,
            invoice.subtotal,
            invoice.discount_amount,
            invoice.tax_amount,
            invoice.total,
            invoice.amount_paid,
            invoice.balance,
            invoice.status.as_str(),
            date_param(invoice.issued_on),
            date_param(invoice.due_date),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetches an invoice by ID.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if no invoice has that ID.
pub fn get_invoice(conn: &Connection, invoice_id: i64) -> Result<Invoice> {
    conn.query_row(
        &format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?"),
        params![invoice_id],
        map_invoice,
    )
    .optional()?
    .ok_or_else(|| HospitalError::not_found("Invoice", invoice_id))
}

/// All invoices, newest first.
///
/// # Errors
///
/// Returns an error if the query fails or stored line items cannot be decoded.
pub fn list_invoices(conn: &Connection) -> Result<Vec<Invoice>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY issued_on DESC, id DESC"
    ))?;
    let invoices = stmt
        .query_map([], map_invoice)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(invoices)
}

/// A patient's invoices, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_invoices_for_patient(conn: &Connection, patient_id: i64) -> Result<Vec<Invoice>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices WHERE patient_id = ? ORDER BY issued_on DESC, id DESC"
    ))?;
    let invoices = stmt
        .query_map(params![patient_id], map_invoice)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(invoices)
}

/// Stores the paid amount, balance and status of an invoice.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if the invoice does not exist.
///
/// # Side Effects
///
/// Updates one row in the `invoices` table.
pub fn update_invoice_amounts(
    conn: &Connection,
    invoice_id: i64,
    amount_paid: f64,
    balance: f64,
    status: InvoiceStatus,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE invoices SET amount_paid = ?, balance = ?, status = ? WHERE id = ?",
        params![amount_paid, balance, status.as_str(), invoice_id],
    )?;
    if changed == 0 {
        return Err(HospitalError::not_found("Invoice", invoice_id));
    }
    Ok(())
}

/// Records a payment against an invoice and returns its ID.
///
/// The invoice's own totals are not touched; see [`update_invoice_amounts`].
///
/// # Errors
///
/// Returns an error if the insert fails.
///
/// # Side Effects
///
/// Adds a row to the `payments` table.
pub fn insert_payment(conn: &Connection, payment: &Payment) -> Result<i64> {
    conn.execute(
        "INSERT INTO payments (invoice_id, amount, method, paid_on) VALUES (?, ?, ?, ?)",
        params![
            payment.invoice_id,
            payment.amount,
            payment.method.as_str(),
            date_param(payment.paid_on),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Every payment, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_payments(conn: &Connection) -> Result<Vec<Payment>> {
    let mut stmt = conn.prepare(
        "SELECT id, invoice_id, amount, method, paid_on FROM payments ORDER BY paid_on, id",
    )?;
    let payments = stmt
        .query_map([], map_payment)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(payments)
}

/// Payments made against one invoice, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_payments_for_invoice(conn: &Connection, invoice_id: i64) -> Result<Vec<Payment>> {
    let mut stmt = conn.prepare(
        "SELECT id, invoice_id, amount, method, paid_on FROM payments WHERE invoice_id = ? \
         ORDER BY paid_on, id",
    )?;
    let payments = stmt
        .query_map(params![invoice_id], map_payment)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(payments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::patients::{create_patient, tests::sample_patient};
    use crate::models::{InvoiceItem, PaymentMethod};
    use time::macros::date;

    fn sample_invoice(patient_id: i64) -> Invoice {
        Invoice {
            id: 0,
            invoice_number: "INV-20260302-000001".into(),
            patient_id,
            visit_id: None,
            items: vec![InvoiceItem {
                description: "Consultation".into(),
                quantity: 2,
                unit_price: 50.0,
            }],
            discount_percent: 10.0,
            tax_percent: 18.0,
            subtotal: 100.0,
            discount_amount: 10.0,
            tax_amount: 16.2,
            total: 106.2,
            amount_paid: 0.0,
            balance: 106.2,
            status: InvoiceStatus::Pending,
            issued_on: date!(2026 - 03 - 02),
            due_date: date!(2026 - 04 - 01),
        }
    }

    #[test]
    fn invoice_items_are_stored_as_json() {
        let conn = open_memory_database().unwrap();
        let patient = create_patient(&conn, &sample_patient("Grace", "Hopper")).unwrap();
        let id = insert_invoice(&conn, &sample_invoice(patient)).unwrap();

        let invoice = get_invoice(&conn, id).unwrap();
        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.items[0].quantity, 2);
        assert_eq!(invoice.total, 106.2);
        assert_eq!(list_invoices_for_patient(&conn, patient).unwrap().len(), 1);
    }

    #[test]
    fn payments_and_amount_updates() {
        let conn = open_memory_database().unwrap();
        let patient = create_patient(&conn, &sample_patient("Grace", "Hopper")).unwrap();
        let id = insert_invoice(&conn, &sample_invoice(patient)).unwrap();

        insert_payment(
            &conn,
            &Payment {
                id: 0,
                invoice_id: id,
                amount: 60.0,
                method: PaymentMethod::Card,
                paid_on: date!(2026 - 03 - 03),
            },
        )
        .unwrap();
        update_invoice_amounts(&conn, id, 60.0, 46.2, InvoiceStatus::Pending).unwrap();

        let payments = list_payments_for_invoice(&conn, id).unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].method, PaymentMethod::Card);
        assert_eq!(list_payments(&conn).unwrap().len(), 1);
        assert_eq!(get_invoice(&conn, id).unwrap().amount_paid, 60.0);
    }

    #[test]
    fn invoice_numbers_are_unique() {
        let conn = open_memory_database().unwrap();
        let patient = create_patient(&conn, &sample_patient("Grace", "Hopper")).unwrap();
        insert_invoice(&conn, &sample_invoice(patient)).unwrap();
        assert!(insert_invoice(&conn, &sample_invoice(patient)).is_err());
    }
}
