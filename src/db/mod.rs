//! Database module for CareDesk.
//!
//! This module owns the SQLite schema and every query the application runs.
//! Each submodule groups the functions for one kind of record; all of them
//! take a borrowed [`Connection`] so that callers can compose them inside a
//! single transaction.
//!
//! Dates are stored as `YYYY-MM-DD` text, times as `HH:MM`, and structured
//! lists (line items, prescriptions, wards) as JSON text.

pub mod appointments;
pub mod beds;
pub mod billing;
pub mod inventory;
pub mod notifications;
pub mod patients;
pub mod seed;
pub mod staff;
pub mod users;
pub mod visits;

use crate::error::Result;
use crate::utils;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;
use time::{Date, PrimitiveDateTime, Time};

/// Versioned schema migrations, applied in order.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("schema.sql"))];

/// Opens (or creates) the database at `path` and brings its schema up to date.
///
/// Foreign keys are switched on and a busy timeout is set before any
/// migration runs.
///
/// # Errors
///
/// Returns an error if the file cannot be opened as an SQLite database or a
/// migration fails.
///
/// # Side Effects
///
/// Creates the database file if it doesn't exist and applies pending
/// migrations to it.
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Opens an in-memory database with the full schema.
///
/// The database lives as long as the returned connection. It starts empty;
/// [`seed::seed_demo_data`] fills it for demos and tests.
///
/// # Errors
///
/// Returns an error if SQLite cannot allocate the database or the schema
/// fails to apply.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys=ON;
         PRAGMA busy_timeout=5000;",
    )?;
    Ok(())
}

/// Runs all migrations newer than the recorded schema version.
///
/// A database without a `schema_version` table counts as version 0. Running
/// this twice is a no-op the second time.
///
/// # Errors
///
/// Returns an error if a migration script fails. Earlier migrations in the
/// same call stay applied.
///
/// # Side Effects
///
/// Creates tables and indexes and records the new schema version.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current = current_version(conn);
    for (version, sql) in MIGRATIONS {
        if *version > current {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql)?;
        }
    }
    Ok(())
}

fn current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .ok()
    .flatten()
    .unwrap_or(0)
}

// Column conversion helpers used by the row mappers in the submodules.

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

pub(crate) fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Date> {
    let raw: String = row.get(idx)?;
    utils::parse_date(&raw).ok_or_else(|| conversion_error(idx, format!("Invalid date: {raw}")))
}

pub(crate) fn optional_date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Date>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => utils::parse_date(&raw)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, format!("Invalid date: {raw}"))),
        None => Ok(None),
    }
}

pub(crate) fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Time> {
    let raw: String = row.get(idx)?;
    utils::parse_time(&raw).ok_or_else(|| conversion_error(idx, format!("Invalid time: {raw}")))
}

pub(crate) fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<PrimitiveDateTime> {
    let raw: String = row.get(idx)?;
    utils::parse_datetime(&raw)
        .ok_or_else(|| conversion_error(idx, format!("Invalid timestamp: {raw}")))
}

pub(crate) fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = crate::error::HospitalError>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: crate::error::HospitalError| conversion_error(idx, e.to_string()))
}

pub(crate) fn optional_enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = crate::error::HospitalError>,
{
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: crate::error::HospitalError| conversion_error(idx, e.to_string())),
        None => Ok(None),
    }
}

pub(crate) fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

pub(crate) fn date_param(date: Date) -> String {
    utils::format_date(date)
}

pub(crate) fn optional_date_param(date: Option<Date>) -> Option<String> {
    date.map(utils::format_date)
}

pub(crate) fn time_param(time: Time) -> String {
    utils::format_time(time)
}

pub(crate) fn datetime_param(value: PrimitiveDateTime) -> String {
    utils::format_datetime(value)
}

/// Runs `f` inside an immediate transaction, committing on success.
///
/// `BEGIN IMMEDIATE` takes the write lock up front, so a read-then-write
/// sequence inside `f` cannot interleave with another writer.
///
/// # Errors
///
/// Returns the error from `f`, or an error if the transaction cannot begin
/// or commit. The transaction is rolled back whenever an error is returned.
///
/// # Side Effects
///
/// Holds the database write lock until `f` returns.
pub fn with_immediate_transaction<T, F>(conn: &Connection, f: F) -> Result<T>
where
    F: FnOnce(&Connection) -> Result<T>,
{
    let tx = rusqlite::Transaction::new_unchecked(conn, rusqlite::TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}
