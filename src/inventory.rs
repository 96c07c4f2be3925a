//! Stock level rules for drugs and consumables.

use crate::db::inventory as store;
use crate::error::{HospitalError, Result};
use crate::models::{InventoryItem, UserRole};
use crate::notifications::{self, Message};
use rusqlite::Connection;
use time::{Date, Duration, PrimitiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    OutOfStock,
    Low,
    Ok,
}

impl StockLevel {
    pub fn label(&self) -> &'static str {
        match self {
            StockLevel::OutOfStock => "out of stock",
            StockLevel::Low => "low",
            StockLevel::Ok => "ok",
        }
    }
}

pub fn stock_level(item: &InventoryItem) -> StockLevel {
    if item.quantity == 0 {
        StockLevel::OutOfStock
    } else if item.quantity <= item.reorder_level {
        StockLevel::Low
    } else {
        StockLevel::Ok
    }
}

/// At or below the reorder level, out of stock included.
pub fn is_low_stock(item: &InventoryItem) -> bool {
    item.quantity <= item.reorder_level
}

/// Items whose expiry date falls within `days` of `today`, already expired
/// ones included. Soonest first.
pub fn expiring_within(items: &[InventoryItem], today: Date, days: i64) -> Vec<&InventoryItem> {
    let horizon = today.saturating_add(Duration::days(days));
    let mut expiring: Vec<&InventoryItem> = items
        .iter()
        .filter(|item| item.expiry_date.is_some_and(|expiry| expiry <= horizon))
        .collect();
    expiring.sort_by_key(|item| item.expiry_date);
    expiring
}

/// Validates a new stock item.
pub fn validate_item(item: &InventoryItem) -> Result<()> {
    if item.name.trim().is_empty() {
        return Err(HospitalError::validation("Item name cannot be empty"));
    }
    if item.unit.trim().is_empty() {
        return Err(HospitalError::validation("Unit cannot be empty"));
    }
    if !item.unit_price.is_finite() || item.unit_price < 0.0 {
        return Err(HospitalError::validation("Unit price cannot be negative"));
    }
    Ok(())
}

/// Applies `delta` to an item's quantity and returns the updated item.
///
/// Admins are notified when the change takes the item from above its reorder
/// level to at or below it.
pub fn adjust_stock(
    conn: &Connection,
    item_id: i64,
    delta: i64,
    at: PrimitiveDateTime,
) -> Result<InventoryItem> {
    let mut item = store::get_item(conn, item_id)?;
    let updated = i64::from(item.quantity) + delta;
    if updated < 0 {
        return Err(HospitalError::validation(format!(
            "Only {} {} of {} in stock",
            item.quantity, item.unit, item.name
        )));
    }
    let updated = u32::try_from(updated)
        .map_err(|_| HospitalError::validation("Quantity is too large"))?;

    let was_low = is_low_stock(&item);
    store::set_item_quantity(conn, item_id, updated)?;
    item.quantity = updated;
    tracing::info!(item = %item.name, delta, quantity = updated, "Adjusted stock");

    if !was_low && is_low_stock(&item) {
        let message: Message = notifications::low_stock(&item.name, item.quantity, &item.unit);
        notifications::notify_role(conn, UserRole::Admin, &message, at)?;
        tracing::warn!(item = %item.name, quantity = updated, "Stock fell to reorder level");
    }
    Ok(item)
}
