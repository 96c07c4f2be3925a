//! Drug and consumable stock.

use super::{date_param, optional_date_column};
use crate::error::{HospitalError, Result};
use crate::models::InventoryItem;
use rusqlite::{params, Connection, OptionalExtension, Row};

const ITEM_COLUMNS: &str =
    "id, name, category, quantity, reorder_level, unit, unit_price, expiry_date";

fn map_item(row: &Row<'_>) -> rusqlite::Result<InventoryItem> {
    Ok(InventoryItem {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        quantity: row.get(3)?,
        reorder_level: row.get(4)?,
        unit: row.get(5)?,
        unit_price: row.get(6)?,
        expiry_date: optional_date_column(row, 7)?,
    })
}

/// Adds an inventory item and returns its ID.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_item(conn: &Connection, item: &InventoryItem) -> Result<i64> {
    conn.execute(
        "INSERT INTO inventory (name, category, quantity, reorder_level, unit, unit_price, expiry_date) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            item.name,
            item.category,
            item.quantity,
            item.reorder_level,
            item.unit,
            item.unit_price,
            item.expiry_date.map(date_param),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetches an inventory item by ID.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if no item has that ID.
pub fn get_item(conn: &Connection, item_id: i64) -> Result<InventoryItem> {
    conn.query_row(
        &format!("SELECT {ITEM_COLUMNS} FROM inventory WHERE id = ?"),
        params![item_id],
        map_item,
    )
    .optional()?
    .ok_or_else(|| HospitalError::not_found("Inventory item", item_id))
}

/// Every inventory item, by category then name.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_items(conn: &Connection) -> Result<Vec<InventoryItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM inventory ORDER BY category, name"
    ))?;
    let items = stmt
        .query_map([], map_item)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

/// Stores a new stock quantity.
///
/// The quantity is absolute; adjustments are computed by the caller.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if the item does not exist.
///
/// # Side Effects
///
/// Updates one row in the `inventory` table.
pub fn set_item_quantity(conn: &Connection, item_id: i64, quantity: u32) -> Result<()> {
    let changed = conn.execute(
        "UPDATE inventory SET quantity = ? WHERE id = ?",
        params![quantity, item_id],
    )?;
    if changed == 0 {
        return Err(HospitalError::not_found("Inventory item", item_id));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use time::macros::date;

    pub(crate) fn sample_item(name: &str, quantity: u32, reorder_level: u32) -> InventoryItem {
        InventoryItem {
            id: 0,
            name: name.into(),
            category: "medicine".into(),
            quantity,
            reorder_level,
            unit: "box".into(),
            unit_price: 4.5,
            expiry_date: Some(date!(2027 - 01 - 31)),
        }
    }

    #[test]
    fn insert_and_adjust_quantity() {
        let conn = open_memory_database().unwrap();
        let id = insert_item(&conn, &sample_item("Paracetamol", 40, 10)).unwrap();
        set_item_quantity(&conn, id, 8).unwrap();

        let item = get_item(&conn, id).unwrap();
        assert_eq!(item.quantity, 8);
        assert_eq!(item.expiry_date, Some(date!(2027 - 01 - 31)));
        assert_eq!(list_items(&conn).unwrap().len(), 1);
    }

    #[test]
    fn unknown_item_is_reported() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            set_item_quantity(&conn, 3, 1),
            Err(HospitalError::NotFound { .. })
        ));
    }
}
