//! Invoice arithmetic and status rules.

use crate::error::{HospitalError, Result};
use crate::models::{InvoiceItem, InvoiceStatus};
use crate::utils::unique_suffix;
use serde::Serialize;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

/// Balances at or below this are treated as settled.
pub const SETTLED_EPSILON: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub discount_amount: f64,
    pub taxable: f64,
    pub tax_amount: f64,
    pub total: f64,
}

impl InvoiceTotals {
    /// Discount applies to the subtotal; tax applies after the discount.
    pub fn compute(items: &[InvoiceItem], discount_percent: f64, tax_percent: f64) -> Self {
        let subtotal: f64 = items.iter().map(InvoiceItem::line_total).sum();
        let discount_amount = subtotal * discount_percent / 100.0;
        let taxable = subtotal - discount_amount;
        let tax_amount = taxable * tax_percent / 100.0;
        Self {
            subtotal,
            discount_amount,
            taxable,
            tax_amount,
            total: taxable + tax_amount,
        }
    }
}

fn validate_percent(name: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(HospitalError::validation(format!(
            "{name} must be between 0 and 100"
        )));
    }
    Ok(())
}

/// Rejects empty invoices, blank descriptions, zero quantities, negative
/// prices and out-of-range percentages.
pub fn validate_items(
    items: &[InvoiceItem],
    discount_percent: f64,
    tax_percent: f64,
) -> Result<()> {
    if items.is_empty() {
        return Err(HospitalError::validation(
            "An invoice needs at least one item",
        ));
    }
    for (index, item) in items.iter().enumerate() {
        let line = index + 1;
        if item.description.trim().is_empty() {
            return Err(HospitalError::validation(format!(
                "Item {line} needs a description"
            )));
        }
        if item.quantity == 0 {
            return Err(HospitalError::validation(format!(
                "Item {line} must have a quantity of at least 1"
            )));
        }
        if !item.unit_price.is_finite() || item.unit_price < 0.0 {
            return Err(HospitalError::validation(format!(
                "Item {line} has an invalid price"
            )));
        }
    }
    validate_percent("Discount", discount_percent)?;
    validate_percent("Tax", tax_percent)
}

pub fn balance(total: f64, amount_paid: f64) -> f64 {
    total - amount_paid
}

pub fn derive_status(balance: f64, due_date: Date, today: Date) -> InvoiceStatus {
    if balance <= SETTLED_EPSILON {
        InvoiceStatus::Paid
    } else if today > due_date {
        InvoiceStatus::Overdue
    } else {
        InvoiceStatus::Pending
    }
}

/// Formats an amount with thousands separators and two decimals, e.g. `$1,234.50`.
pub fn format_currency(amount: f64, symbol: &str) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{sign}{symbol}{grouped}.{cents}")
}

/// Builds an invoice number of the form `INV-YYYYMMDD-NNNNNN`.
pub fn generate_invoice_number(at: PrimitiveDateTime) -> String {
    let day = at
        .date()
        .format(format_description!("[year][month][day]"))
        .unwrap_or_default();
    format!("INV-{day}-{}", unique_suffix(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn item(description: &str, quantity: u32, unit_price: f64) -> InvoiceItem {
        InvoiceItem {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn totals_apply_discount_before_tax() {
        let totals = InvoiceTotals::compute(&[item("Consultation", 2, 50.0)], 10.0, 18.0);
        assert!(close(totals.subtotal, 100.0));
        assert!(close(totals.discount_amount, 10.0));
        assert!(close(totals.taxable, 90.0));
        assert!(close(totals.tax_amount, 16.2));
        assert!(close(totals.total, 106.2));
    }

    #[test]
    fn no_items_means_zero_total() {
        let totals = InvoiceTotals::compute(&[], 10.0, 18.0);
        assert_eq!(totals, InvoiceTotals::default());
    }

    #[test]
    fn full_discount_gives_zero_total() {
        let totals = InvoiceTotals::compute(&[item("X-ray", 1, 80.0)], 100.0, 18.0);
        assert!(close(totals.total, 0.0));
    }

    #[test]
    fn invalid_items_are_rejected() {
        assert!(validate_items(&[], 0.0, 0.0).is_err());
        assert!(validate_items(&[item(" ", 1, 1.0)], 0.0, 0.0).is_err());
        assert!(validate_items(&[item("Bandage", 0, 1.0)], 0.0, 0.0).is_err());
        assert!(validate_items(&[item("Bandage", 1, -1.0)], 0.0, 0.0).is_err());
        assert!(validate_items(&[item("Bandage", 1, 1.0)], 120.0, 0.0).is_err());
        assert!(validate_items(&[item("Bandage", 1, 1.0)], 0.0, -5.0).is_err());
        assert!(validate_items(&[item("Bandage", 1, 0.0)], 0.0, 18.0).is_ok());
    }

    #[test]
    fn status_follows_balance_and_due_date() {
        let due = date!(2026 - 04 - 01);
        assert_eq!(derive_status(0.004, due, date!(2026 - 05 - 01)), InvoiceStatus::Paid);
        assert_eq!(derive_status(10.0, due, date!(2026 - 04 - 01)), InvoiceStatus::Pending);
        assert_eq!(derive_status(10.0, due, date!(2026 - 04 - 02)), InvoiceStatus::Overdue);
        assert!(close(balance(106.2, 60.0), 46.2));
    }

    #[test]
    fn currency_has_separators_and_cents() {
        assert_eq!(format_currency(1234.5, "$"), "$1,234.50");
        assert_eq!(format_currency(1234567.891, "$"), "$1,234,567.89");
        assert_eq!(format_currency(0.0, "€"), "€0.00");
        assert_eq!(format_currency(-42.0, "$"), "-$42.00");
        assert_eq!(format_currency(999.999, "$"), "$1,000.00");
    }

    #[test]
    fn invoice_number_embeds_the_date() {
        let number = generate_invoice_number(datetime!(2026-03-02 10:20:30));
        assert!(number.starts_with("INV-20260302-"));
        assert_eq!(number.len(), "INV-20260302-".len() + 6);
    }
}
