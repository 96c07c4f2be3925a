//! Data models for CareDesk.

use crate::error::HospitalError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::{Date, Duration, PrimitiveDateTime, Time, Weekday};

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum stored
/// as text. A leading `listed` also adds an `ALL` listing for pickers.
macro_rules! text_enum {
    (listed $name:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        text_enum!($name, $field, { $($variant => $text),+ });
    };
    ($name:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = HospitalError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(HospitalError::InvalidEnum {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Role of an account; decides which dashboard the user gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Doctor,
    Nurse,
    Receptionist,
    Patient,
}

text_enum!(UserRole, "role", {
    Admin => "admin",
    Doctor => "doctor",
    Nurse => "nurse",
    Receptionist => "receptionist",
    Patient => "patient",
});

/// A login account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    /// Linked staff record for staff accounts.
    pub staff_id: Option<i64>,
    /// Linked patient record for patient accounts.
    pub patient_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

text_enum!(listed Gender, "gender", {
    Male => "male",
    Female => "female",
    Other => "other",
});

/// Represents a patient in the hospital management system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Date,
    pub gender: Gender,
    pub address: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub blood_group: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub current_medications: Option<String>,
    pub registered_on: Date,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on `today`.
    pub fn age_on(&self, today: Date) -> i32 {
        let mut age = today.year() - self.date_of_birth.year();
        if (today.month() as u8, today.day())
            < (self.date_of_birth.month() as u8, self.date_of_birth.day())
        {
            age -= 1;
        }
        age.max(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Doctor,
    Nurse,
    Receptionist,
    Admin,
    Technician,
}

text_enum!(listed StaffRole, "staff role", {
    Doctor => "doctor",
    Nurse => "nurse",
    Receptionist => "receptionist",
    Admin => "admin",
    Technician => "technician",
});

impl StaffRole {
    /// Prefix used in generated employee codes.
    pub fn code_prefix(&self) -> &'static str {
        match self {
            StaffRole::Doctor => "DOC",
            StaffRole::Nurse => "NUR",
            StaffRole::Receptionist => "REC",
            StaffRole::Admin => "ADM",
            StaffRole::Technician => "TEC",
        }
    }

    /// Account role granted to a staff member of this kind.
    pub fn user_role(&self) -> UserRole {
        match self {
            StaffRole::Doctor => UserRole::Doctor,
            StaffRole::Nurse => UserRole::Nurse,
            StaffRole::Receptionist | StaffRole::Technician => UserRole::Receptionist,
            StaffRole::Admin => UserRole::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffStatus {
    Active,
    OnLeave,
    Inactive,
}

text_enum!(StaffStatus, "staff status", {
    Active => "active",
    OnLeave => "on_leave",
    Inactive => "inactive",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Morning,
    Afternoon,
    Night,
}

text_enum!(listed Shift, "shift", {
    Morning => "morning",
    Afternoon => "afternoon",
    Night => "night",
});

/// A member of the hospital staff, with role-specific optional fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: i64,
    pub employee_code: String,
    pub name: String,
    pub role: StaffRole,
    pub department: Option<String>,
    pub phone_number: String,
    pub email: String,
    pub address: String,
    pub status: StaffStatus,
    pub joined_on: Date,
    // Doctors
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub consultation_fee: Option<f64>,
    // Nurses
    pub shift: Option<Shift>,
    pub wards: Vec<String>,
}

impl StaffMember {
    pub fn is_active_doctor(&self) -> bool {
        self.role == StaffRole::Doctor && self.status == StaffStatus::Active
    }
}

/// A shift assigned to a staff member on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftAssignment {
    pub staff_id: i64,
    pub date: Date,
    pub shift: Shift,
}

/// A doctor's working hours for one weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorSchedule {
    pub doctor_id: i64,
    pub weekday: Weekday,
    pub start_time: Time,
    pub end_time: Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

text_enum!(listed AppointmentStatus, "appointment status", {
    Scheduled => "scheduled",
    Confirmed => "confirmed",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

impl AppointmentStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Scheduled, Confirmed)
                | (Scheduled, InProgress)
                | (Scheduled, Cancelled)
                | (Scheduled, NoShow)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
                | (InProgress, Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    /// Whether an appointment in this status still holds its time slot.
    pub fn occupies_slot(&self) -> bool {
        *self != AppointmentStatus::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: Date,
    pub start_time: Time,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub reason: String,
    pub notes: Option<String>,
    pub created_at: PrimitiveDateTime,
}

impl Appointment {
    pub fn end_time(&self) -> Time {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// Fields needed to book an appointment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: Date,
    pub start_time: Time,
    pub duration_minutes: u32,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitType {
    Opd,
    Ipd,
}

text_enum!(VisitType, "visit type", {
    Opd => "opd",
    Ipd => "ipd",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescribedMedicine {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: u32,
}

/// An outpatient consultation or an inpatient admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_id: Option<i64>,
    pub visit_type: VisitType,
    pub visit_date: Date,
    pub symptoms: Option<String>,
    pub diagnosis: String,
    pub prescribed_medicines: Vec<PrescribedMedicine>,
    pub doctor_notes: Option<String>,
    pub nurse_notes: Option<String>,
    pub follow_up_date: Option<Date>,
    pub bed_id: Option<i64>,
    pub admission_date: Option<Date>,
    pub discharge_date: Option<Date>,
}

impl Visit {
    /// An inpatient stay that has not been discharged yet.
    pub fn is_active_admission(&self) -> bool {
        self.visit_type == VisitType::Ipd && self.discharge_date.is_none()
    }

    /// Nights spent for an admission, counting the admission day when
    /// discharged the same day.
    pub fn length_of_stay(&self, today: Date) -> Option<i64> {
        let admitted = self.admission_date?;
        let until = self.discharge_date.unwrap_or(today);
        Some((until - admitted).whole_days().max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedType {
    General,
    Private,
    Icu,
    Emergency,
}

text_enum!(listed BedType, "bed type", {
    General => "general",
    Private => "private",
    Icu => "icu",
    Emergency => "emergency",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedStatus {
    Available,
    Occupied,
    Maintenance,
    Reserved,
}

text_enum!(BedStatus, "bed status", {
    Available => "available",
    Occupied => "occupied",
    Maintenance => "maintenance",
    Reserved => "reserved",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bed {
    pub id: i64,
    pub bed_number: String,
    pub room_number: String,
    pub ward: String,
    pub bed_type: BedType,
    pub status: BedStatus,
    pub patient_id: Option<i64>,
    pub daily_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl InvoiceItem {
    pub fn line_total(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
}

text_enum!(InvoiceStatus, "invoice status", {
    Pending => "pending",
    Paid => "paid",
    Overdue => "overdue",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub patient_id: i64,
    pub visit_id: Option<i64>,
    pub items: Vec<InvoiceItem>,
    pub discount_percent: f64,
    pub tax_percent: f64,
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub amount_paid: f64,
    pub balance: f64,
    pub status: InvoiceStatus,
    pub issued_on: Date,
    pub due_date: Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Insurance,
    Online,
}

text_enum!(listed PaymentMethod, "payment method", {
    Cash => "cash",
    Card => "card",
    Insurance => "insurance",
    Online => "online",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub invoice_id: i64,
    pub amount: f64,
    pub method: PaymentMethod,
    pub paid_on: Date,
}

/// Represents a stocked item such as a drug or consumable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub reorder_level: u32,
    pub unit: String,
    pub unit_price: f64,
    pub expiry_date: Option<Date>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Appointment,
    Billing,
    Inventory,
    Admission,
    System,
}

text_enum!(NotificationKind, "notification kind", {
    Appointment => "appointment",
    Billing => "billing",
    Inventory => "inventory",
    Admission => "admission",
    System => "system",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: PrimitiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, time};

    #[test]
    fn enums_round_trip_through_text() {
        for status in AppointmentStatus::ALL {
            assert_eq!(status.as_str().parse::<AppointmentStatus>().unwrap(), *status);
        }
        assert_eq!("on_leave".parse::<StaffStatus>().unwrap(), StaffStatus::OnLeave);
    }

    #[test]
    fn unknown_enum_text_is_rejected() {
        let err = "surgeon".parse::<StaffRole>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for staff role: surgeon");
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&AppointmentStatus::NoShow).unwrap();
        assert_eq!(json, "\"no_show\"");
    }

    #[test]
    fn appointment_lifecycle() {
        use AppointmentStatus::*;
        assert!(Scheduled.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Scheduled));
        assert!(!Scheduled.can_transition_to(Completed));
        assert!(NoShow.is_terminal());
        assert!(!Cancelled.occupies_slot());
        assert!(NoShow.occupies_slot());
    }

    #[test]
    fn appointment_end_time() {
        let appt = Appointment {
            id: 1,
            patient_id: 1,
            doctor_id: 1,
            date: date!(2026 - 03 - 02),
            start_time: time!(10:00),
            duration_minutes: 45,
            status: AppointmentStatus::Scheduled,
            reason: "Checkup".into(),
            notes: None,
            created_at: datetime!(2026-03-01 12:00),
        };
        assert_eq!(appt.end_time(), time!(10:45));
    }

    #[test]
    fn patient_age_accounts_for_birthday() {
        let patient = Patient {
            id: 1,
            first_name: "Ada".into(),
            last_name: "Byron".into(),
            date_of_birth: date!(1990 - 06 - 15),
            gender: Gender::Female,
            address: "1 Main St".into(),
            phone_number: "555".into(),
            email: None,
            blood_group: None,
            medical_history: None,
            allergies: None,
            current_medications: None,
            registered_on: date!(2026 - 01 - 01),
        };
        assert_eq!(patient.age_on(date!(2026 - 06 - 14)), 35);
        assert_eq!(patient.age_on(date!(2026 - 06 - 15)), 36);
        assert_eq!(patient.full_name(), "Ada Byron");
    }

    #[test]
    fn length_of_stay_counts_at_least_one_day() {
        let visit = Visit {
            id: 1,
            patient_id: 1,
            doctor_id: 1,
            appointment_id: None,
            visit_type: VisitType::Ipd,
            visit_date: date!(2026 - 03 - 01),
            symptoms: None,
            diagnosis: "Observation".into(),
            prescribed_medicines: Vec::new(),
            doctor_notes: None,
            nurse_notes: None,
            follow_up_date: None,
            bed_id: Some(1),
            admission_date: Some(date!(2026 - 03 - 01)),
            discharge_date: None,
        };
        assert!(visit.is_active_admission());
        assert_eq!(visit.length_of_stay(date!(2026 - 03 - 01)), Some(1));
        assert_eq!(visit.length_of_stay(date!(2026 - 03 - 04)), Some(3));
    }

    #[test]
    fn staff_role_maps_to_account_role() {
        assert_eq!(StaffRole::Doctor.user_role(), UserRole::Doctor);
        assert_eq!(StaffRole::Technician.user_role(), UserRole::Receptionist);
        assert_eq!(StaffRole::Nurse.code_prefix(), "NUR");
    }
}
