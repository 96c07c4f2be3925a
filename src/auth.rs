//! Login, self-registration and role permissions.

use crate::db::{self, patients, users};
use crate::error::{HospitalError, Result};
use crate::models::{Patient, User, UserRole};
use rusqlite::Connection;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// The signed-in user. Every service call is made on behalf of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub role: UserRole,
    pub staff_id: Option<i64>,
    pub patient_id: Option<i64>,
}

impl From<User> for Session {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            role: user.role,
            staff_id: user.staff_id,
            patient_id: user.patient_id,
        }
    }
}

/// Actions that are gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadPatients,
    WritePatients,
    DeletePatients,
    ManageStaff,
    ReadAppointments,
    BookAppointments,
    UpdateAppointments,
    RecordVisits,
    ManageAdmissions,
    ManageBeds,
    ManageBilling,
    ManageInventory,
    ViewReports,
    /// Patients acting on their own appointments and invoices.
    SelfService,
}

impl Permission {
    fn describe(&self) -> &'static str {
        match self {
            Permission::ReadPatients => "view patients",
            Permission::WritePatients => "edit patients",
            Permission::DeletePatients => "delete patients",
            Permission::ManageStaff => "manage staff",
            Permission::ReadAppointments => "view appointments",
            Permission::BookAppointments => "book appointments",
            Permission::UpdateAppointments => "update appointments",
            Permission::RecordVisits => "record visits",
            Permission::ManageAdmissions => "admit or discharge patients",
            Permission::ManageBeds => "manage beds",
            Permission::ManageBilling => "manage billing",
            Permission::ManageInventory => "manage inventory",
            Permission::ViewReports => "view reports",
            Permission::SelfService => "use patient self-service",
        }
    }
}

pub fn role_allows(role: UserRole, permission: Permission) -> bool {
    use Permission::*;
    match role {
        UserRole::Admin => permission != SelfService,
        UserRole::Doctor => matches!(
            permission,
            ReadPatients
                | WritePatients
                | ReadAppointments
                | BookAppointments
                | UpdateAppointments
                | RecordVisits
                | ManageAdmissions
        ),
        UserRole::Nurse => matches!(
            permission,
            ReadPatients | ReadAppointments | RecordVisits | ManageAdmissions | ManageBeds
        ),
        UserRole::Receptionist => matches!(
            permission,
            ReadPatients
                | WritePatients
                | DeletePatients
                | ReadAppointments
                | BookAppointments
                | UpdateAppointments
                | ManageBilling
        ),
        UserRole::Patient => permission == SelfService,
    }
}

impl Session {
    pub fn can(&self, permission: Permission) -> bool {
        role_allows(self.role, permission)
    }

    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.can(permission) {
            Ok(())
        } else {
            tracing::warn!(user = %self.username, role = %self.role, ?permission, "Permission denied");
            Err(HospitalError::Unauthorized(format!(
                "{} cannot {}",
                self.role,
                permission.describe()
            )))
        }
    }

    /// Staff holding `permission`, or the patient who owns the record.
    pub fn require_staff_or_owner(&self, permission: Permission, patient_id: i64) -> Result<()> {
        if self.can(permission) || self.owns_patient(patient_id) {
            Ok(())
        } else {
            self.require(permission)
        }
    }

    pub fn owns_patient(&self, patient_id: i64) -> bool {
        self.role == UserRole::Patient && self.patient_id == Some(patient_id)
    }
}

pub fn login(conn: &Connection, credentials: &Credentials) -> Result<Session> {
    let user = users::authenticate_user(conn, &credentials.username, &credentials.password)?;
    tracing::info!(user = %user.username, role = %user.role, "User logged in");
    Ok(Session::from(user))
}

/// Creates a patient record and a patient account for it in one step.
///
/// Self-registered accounts always get the patient role.
pub fn register_patient_account(
    conn: &Connection,
    credentials: &Credentials,
    patient: &Patient,
) -> Result<Session> {
    if credentials.password.len() < 4 {
        return Err(HospitalError::validation(
            "Password must be at least 4 characters",
        ));
    }
    crate::service::validate_patient(patient)?;

    let user_id = db::with_immediate_transaction(conn, |tx| {
        let patient_id = patients::create_patient(tx, patient)?;
        users::create_user(
            tx,
            &credentials.username,
            &credentials.password,
            UserRole::Patient,
            None,
            Some(patient_id),
        )
    })?;
    tracing::info!(user = %credentials.username, "Registered patient account");
    Ok(Session::from(users::get_user(conn, user_id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::patients::tests::sample_patient;

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn root_can_log_in() {
        let conn = open_memory_database().unwrap();
        users::ensure_root_user(&conn).unwrap();
        let session = login(&conn, &credentials("root", "root")).unwrap();
        assert_eq!(session.role, UserRole::Admin);
        assert!(login(&conn, &credentials("root", "wrong")).is_err());
    }

    #[test]
    fn registration_creates_a_patient_session() {
        let conn = open_memory_database().unwrap();
        let session = register_patient_account(
            &conn,
            &credentials("grace", "secret"),
            &sample_patient("Grace", "Hopper"),
        )
        .unwrap();
        assert_eq!(session.role, UserRole::Patient);
        let patient_id = session.patient_id.unwrap();
        assert!(session.owns_patient(patient_id));
        assert!(!session.owns_patient(patient_id + 1));

        let again = login(&conn, &credentials("grace", "secret")).unwrap();
        assert_eq!(again, session);
    }

    #[test]
    fn duplicate_username_leaves_no_orphan_patient() {
        let conn = open_memory_database().unwrap();
        users::ensure_root_user(&conn).unwrap();
        let result = register_patient_account(
            &conn,
            &credentials("root", "secret"),
            &sample_patient("Grace", "Hopper"),
        );
        assert!(result.is_err());
        assert!(patients::get_all_patients(&conn).unwrap().is_empty());
    }

    #[test]
    fn permissions_follow_roles() {
        assert!(role_allows(UserRole::Admin, Permission::ManageStaff));
        assert!(!role_allows(UserRole::Admin, Permission::SelfService));
        assert!(role_allows(UserRole::Doctor, Permission::RecordVisits));
        assert!(!role_allows(UserRole::Doctor, Permission::DeletePatients));
        assert!(role_allows(UserRole::Nurse, Permission::ManageBeds));
        assert!(!role_allows(UserRole::Nurse, Permission::WritePatients));
        assert!(role_allows(UserRole::Receptionist, Permission::ManageBilling));
        assert!(!role_allows(UserRole::Receptionist, Permission::ViewReports));
        assert!(!role_allows(UserRole::Patient, Permission::ReadPatients));
    }

    #[test]
    fn require_reports_the_denied_action() {
        let session = Session {
            user_id: 9,
            username: "nina".into(),
            role: UserRole::Nurse,
            staff_id: None,
            patient_id: None,
        };
        let err = session.require(Permission::ManageBilling).unwrap_err();
        assert_eq!(err.to_string(), "Not permitted: nurse cannot manage billing");
        assert!(session
            .require_staff_or_owner(Permission::ReadAppointments, 4)
            .is_ok());
    }
}
