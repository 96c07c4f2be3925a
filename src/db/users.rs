//! User accounts and credentials.

use super::enum_column;
use crate::error::{HospitalError, Result};
use crate::models::{User, UserRole};
use bcrypt::{hash, verify};
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_COLUMNS: &str = "id, username, role, staff_id, patient_id";

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
// Cheap hashes keep seeded test databases fast.
#[cfg(test)]
const HASH_COST: u32 = 4;

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        role: enum_column(row, 2)?,
        staff_id: row.get(3)?,
        patient_id: row.get(4)?,
    })
}

/// Creates the default `root` administrator if it does not exist yet.
///
/// The account uses "root" as its password and is meant to be changed after
/// the first login.
///
/// # Returns
///
/// `true` when the account was created, `false` when it already existed.
///
/// # Errors
///
/// Returns an error if the lookup fails or the password cannot be hashed.
///
/// # Side Effects
///
/// May insert a row into the `users` table.
pub fn ensure_root_user(conn: &Connection) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?",
        params!["root"],
        |row| row.get(0),
    )?;
    if count > 0 {
        return Ok(false);
    }
    create_user(conn, "root", "root", UserRole::Admin, None, None)?;
    tracing::info!("Created 'root' user with default password");
    Ok(true)
}

/// Creates a new account.
///
/// The username is trimmed before it is checked and stored. The password is
/// hashed with bcrypt; only the hash reaches the database.
///
/// # Arguments
///
/// * `username` - Login name, unique across all accounts.
/// * `password` - Plain-text password to hash.
/// * `role` - Role that decides the account's dashboard and permissions.
/// * `staff_id` - Staff record the account belongs to, for staff roles.
/// * `patient_id` - Patient record the account belongs to, for patients.
///
/// # Returns
///
/// The ID of the new account.
///
/// # Errors
///
/// Returns [`HospitalError::Validation`] if the username is blank or taken,
/// and an error if hashing or the insert fails.
///
/// # Side Effects
///
/// Adds a row to the `users` table.
pub fn create_user(
    conn: &Connection,
    username: &str,
    password: &str,
    role: UserRole,
    staff_id: Option<i64>,
    patient_id: Option<i64>,
) -> Result<i64> {
    let username = username.trim();
    if username.is_empty() {
        return Err(HospitalError::validation("Username cannot be empty"));
    }
    if username_exists(conn, username)? {
        return Err(HospitalError::validation(format!(
            "Username '{username}' is already taken"
        )));
    }

    let hashed_password = hash(password, HASH_COST)?;
    conn.execute(
        "INSERT INTO users (username, password_hash, role, staff_id, patient_id) VALUES (?, ?, ?, ?, ?)",
        params![username, hashed_password, role.as_str(), staff_id, patient_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Checks whether an account with `username` exists.
///
/// The comparison is exact; callers trim the name first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn username_exists(conn: &Connection, username: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?",
        params![username],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Verifies a username/password pair and returns the matching account.
///
/// The stored bcrypt hash is compared with `password`. An unknown username
/// and a wrong password produce the same error so that the login screen
/// does not reveal which accounts exist.
///
/// # Errors
///
/// Returns [`HospitalError::Unauthorized`] for bad credentials, and an error
/// if the query or hash verification fails.
pub fn authenticate_user(conn: &Connection, username: &str, password: &str) -> Result<User> {
    let found: Option<(User, String)> = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?"),
            params![username],
            |row| Ok((map_user(row)?, row.get(5)?)),
        )
        .optional()?;

    let (user, stored_hash) =
        found.ok_or_else(|| HospitalError::Unauthorized("Invalid credentials".into()))?;

    if verify(password, &stored_hash)? {
        Ok(user)
    } else {
        Err(HospitalError::Unauthorized("Invalid credentials".into()))
    }
}

/// Fetches an account by ID.
///
/// # Errors
///
/// Returns [`HospitalError::NotFound`] if no account has that ID.
pub fn get_user(conn: &Connection, user_id: i64) -> Result<User> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
        params![user_id],
        map_user,
    )
    .optional()?
    .ok_or_else(|| HospitalError::not_found("User", user_id))
}

/// Lists every account with `role`, oldest first.
///
/// Used to fan notifications out to a whole role.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_users_by_role(conn: &Connection, role: UserRole) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE role = ? ORDER BY id"
    ))?;
    let users = stmt
        .query_map(params![role.as_str()], map_user)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

/// Account linked to a patient record, if the patient has one.
///
/// # Errors
///
/// Returns an error if the query fails. A patient without an account is
/// `Ok(None)`.
pub fn find_user_for_patient(conn: &Connection, patient_id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE patient_id = ? LIMIT 1"),
            params![patient_id],
            map_user,
        )
        .optional()?;
    Ok(user)
}

/// Account linked to a staff record, if any.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find_user_for_staff(conn: &Connection, staff_id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE staff_id = ? LIMIT 1"),
            params![staff_id],
            map_user,
        )
        .optional()?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    #[test]
    fn root_user_is_created_once() {
        let conn = open_memory_database().unwrap();
        assert!(ensure_root_user(&conn).unwrap());
        assert!(!ensure_root_user(&conn).unwrap());

        let admins = list_users_by_role(&conn, UserRole::Admin).unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].username, "root");
    }

    #[test]
    fn authenticate_checks_password() {
        let conn = open_memory_database().unwrap();
        let id = create_user(&conn, "frontdesk", "s3cret", UserRole::Receptionist, None, None)
            .unwrap();

        let user = authenticate_user(&conn, "frontdesk", "s3cret").unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, UserRole::Receptionist);

        let wrong = authenticate_user(&conn, "frontdesk", "nope").unwrap_err();
        assert!(matches!(wrong, HospitalError::Unauthorized(_)));
        let missing = authenticate_user(&conn, "ghost", "s3cret").unwrap_err();
        assert!(matches!(missing, HospitalError::Unauthorized(_)));
    }

    #[test]
    fn duplicate_usernames_are_rejected() {
        let conn = open_memory_database().unwrap();
        create_user(&conn, "nurse1", "pw", UserRole::Nurse, None, None).unwrap();
        let err = create_user(&conn, "nurse1", "pw", UserRole::Nurse, None, None).unwrap_err();
        assert!(matches!(err, HospitalError::Validation(_)));
    }

    #[test]
    fn get_user_reports_missing_accounts() {
        let conn = open_memory_database().unwrap();
        let err = get_user(&conn, 99).unwrap_err();
        assert!(matches!(err, HospitalError::NotFound { .. }));
    }
}
