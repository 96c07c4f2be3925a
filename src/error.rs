//! Error types shared by the persistence and service layers.

use thiserror::Error;

/// Errors raised by CareDesk's domain and database code.
#[derive(Error, Debug)]
pub enum HospitalError {
    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidEnum { field: &'static str, value: String },

    #[error("{0}")]
    Validation(String),

    #[error("Slot {date} {time} is not available for doctor {doctor_id}")]
    SlotUnavailable {
        doctor_id: i64,
        date: String,
        time: String,
    },

    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Bed {bed_id} is not available")]
    BedUnavailable { bed_id: i64 },

    #[error("Not permitted: {0}")]
    Unauthorized(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HospitalError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, HospitalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = HospitalError::not_found("Patient", 42);
        assert_eq!(err.to_string(), "Patient not found: 42");
    }

    #[test]
    fn sqlite_errors_convert() {
        let err: HospitalError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, HospitalError::Database(_)));
    }
}
