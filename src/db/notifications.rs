//! Per-user notifications.

use super::{datetime_column, datetime_param, enum_column};
use crate::error::{HospitalError, Result};
use crate::models::{Notification, NotificationKind};
use rusqlite::{params, Connection, Row};
use time::PrimitiveDateTime;

fn map_notification(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: enum_column(row, 2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        read: row.get(5)?,
        created_at: datetime_column(row, 6)?,
    })
}

/// Stores an unread notification for one account and returns its ID.
///
/// # Errors
///
/// Returns an error if the account does not exist or the insert fails.
///
/// # Side Effects
///
/// Adds a row to the `notifications` table.
pub fn insert_notification(
    conn: &Connection,
    user_id: i64,
    kind: NotificationKind,
    title: &str,
    message: &str,
    created_at: PrimitiveDateTime,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO notifications (user_id, kind, title, message, read, created_at) \
         VALUES (?, ?, ?, ?, 0, ?)",
        params![user_id, kind.as_str(), title, message, datetime_param(created_at)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Notifications for a user, unread first, newest first within each group.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_notifications_for_user(conn: &Connection, user_id: i64) -> Result<Vec<Notification>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, kind, title, message, read, created_at FROM notifications \
         WHERE user_id = ? ORDER BY read, created_at DESC, id DESC",
    )?;
    let notifications = stmt
        .query_map(params![user_id], map_notification)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(notifications)
}

/// Marks a notification as read. Only the owner may do so.
///
/// Marking an already read notification succeeds and changes nothing.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if the notification does not exist or
/// belongs to someone else.
pub fn mark_notification_read(conn: &Connection, user_id: i64, notification_id: i64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE notifications SET read = 1 WHERE id = ? AND user_id = ?",
        params![notification_id, user_id],
    )?;
    if changed == 0 {
        return Err(HospitalError::not_found("Notification", notification_id));
    }
    Ok(())
}

/// Marks every unread notification of a user as read.
///
/// # Returns
///
/// How many notifications changed.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn mark_all_read(conn: &Connection, user_id: i64) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE notifications SET read = 1 WHERE user_id = ? AND read = 0",
        params![user_id],
    )?;
    Ok(changed)
}

/// Number of unread notifications for a user.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn unread_count(conn: &Connection, user_id: i64) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read = 0",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}
