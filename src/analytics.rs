//! Dashboard figures and the per-role dashboard layout.

use crate::billing::format_currency;
use crate::models::{
    Appointment, AppointmentStatus, Bed, BedStatus, Invoice, InvoiceStatus, InventoryItem,
    Payment, UserRole,
};
use crate::utils::month_start;
use serde::Serialize;
use std::collections::BTreeMap;
use time::{Date, Duration};

/// Headline numbers for the home screen.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DashboardKpis {
    pub todays_appointments: usize,
    /// Today's appointments not yet started, completed or cancelled.
    pub pending_today: usize,
    pub revenue_today: f64,
    pub revenue_month: f64,
    pub outstanding: f64,
    pub occupancy_rate: f64,
    pub low_stock: usize,
}

impl DashboardKpis {
    pub fn compute(
        today: Date,
        appointments: &[Appointment],
        invoices: &[Invoice],
        payments: &[Payment],
        beds: &[Bed],
        inventory: &[InventoryItem],
    ) -> Self {
        let todays = appointments.iter().filter(|a| a.date == today);
        let (todays_appointments, pending_today) = todays.fold((0, 0), |(all, pending), a| {
            let waiting = matches!(
                a.status,
                AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
            );
            (all + 1, pending + usize::from(waiting))
        });

        let first_of_month = month_start(today);
        let revenue_today = payments
            .iter()
            .filter(|p| p.paid_on == today)
            .map(|p| p.amount)
            .sum();
        let revenue_month = payments
            .iter()
            .filter(|p| p.paid_on >= first_of_month && p.paid_on <= today)
            .map(|p| p.amount)
            .sum();

        let outstanding = invoices
            .iter()
            .filter(|i| i.status != InvoiceStatus::Paid)
            .map(|i| i.balance.max(0.0))
            .sum();

        Self {
            todays_appointments,
            pending_today,
            revenue_today,
            revenue_month,
            outstanding,
            occupancy_rate: occupancy_rate(beds),
            low_stock: inventory
                .iter()
                .filter(|i| crate::inventory::is_low_stock(i))
                .count(),
        }
    }
}

/// Occupied beds as a percentage of all beds; zero when there are none.
pub fn occupancy_rate(beds: &[Bed]) -> f64 {
    if beds.is_empty() {
        return 0.0;
    }
    let occupied = beds
        .iter()
        .filter(|b| b.status == BedStatus::Occupied)
        .count();
    occupied as f64 / beds.len() as f64 * 100.0
}

/// Count of appointments in every status, including zero counts.
pub fn appointments_by_status(appointments: &[Appointment]) -> Vec<(AppointmentStatus, usize)> {
    AppointmentStatus::ALL
        .iter()
        .map(|status| {
            let count = appointments.iter().filter(|a| a.status == *status).count();
            (*status, count)
        })
        .collect()
}

/// Payments received per day for `days` days starting at `from`.
pub fn revenue_by_day(payments: &[Payment], from: Date, days: u32) -> Vec<(Date, f64)> {
    (0..i64::from(days))
        .filter_map(|offset| from.checked_add(Duration::days(offset)))
        .map(|day| {
            let total = payments
                .iter()
                .filter(|p| p.paid_on == day)
                .map(|p| p.amount)
                .sum();
            (day, total)
        })
        .collect()
}

/// Live appointments per doctor between `from` and `to` inclusive, keyed by
/// doctor ID.
pub fn doctor_workload(appointments: &[Appointment], from: Date, to: Date) -> Vec<(i64, usize)> {
    let mut workload = BTreeMap::new();
    for appointment in appointments
        .iter()
        .filter(|a| (from..=to).contains(&a.date) && a.status.occupies_slot())
    {
        *workload.entry(appointment.doctor_id).or_insert(0) += 1;
    }
    workload.into_iter().collect()
}

/// One figure shown on the home dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpiTile {
    TodaysAppointments,
    PendingToday,
    RevenueToday,
    RevenueMonth,
    Outstanding,
    Occupancy,
    LowStock,
}

impl KpiTile {
    pub fn label(&self) -> &'static str {
        match self {
            KpiTile::TodaysAppointments => "Appointments today",
            KpiTile::PendingToday => "Waiting today",
            KpiTile::RevenueToday => "Revenue today",
            KpiTile::RevenueMonth => "Revenue this month",
            KpiTile::Outstanding => "Outstanding",
            KpiTile::Occupancy => "Bed occupancy",
            KpiTile::LowStock => "Low stock items",
        }
    }

    pub fn value(&self, kpis: &DashboardKpis, currency: &str) -> String {
        match self {
            KpiTile::TodaysAppointments => kpis.todays_appointments.to_string(),
            KpiTile::PendingToday => kpis.pending_today.to_string(),
            KpiTile::RevenueToday => format_currency(kpis.revenue_today, currency),
            KpiTile::RevenueMonth => format_currency(kpis.revenue_month, currency),
            KpiTile::Outstanding => format_currency(kpis.outstanding, currency),
            KpiTile::Occupancy => format!("{:.1}%", kpis.occupancy_rate),
            KpiTile::LowStock => kpis.low_stock.to_string(),
        }
    }
}

/// A screen reachable from the home menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Patients,
    Staff,
    Appointments,
    Records,
    Billing,
    Wards,
    Inventory,
    Reports,
    Notifications,
}

impl Feature {
    pub fn title(&self) -> &'static str {
        match self {
            Feature::Patients => "Patients",
            Feature::Staff => "Staff",
            Feature::Appointments => "Appointments",
            Feature::Records => "Visit Records",
            Feature::Billing => "Billing",
            Feature::Wards => "Wards & Beds",
            Feature::Inventory => "Inventory",
            Feature::Reports => "Reports",
            Feature::Notifications => "Notifications",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Feature::Patients => "Register, search and maintain patient files",
            Feature::Staff => "Manage staff members, shifts and schedules",
            Feature::Appointments => "Book appointments and track their status",
            Feature::Records => "Record consultations and review visit history",
            Feature::Billing => "Issue invoices and record payments",
            Feature::Wards => "Admit and discharge patients, manage beds",
            Feature::Inventory => "Track stock levels and expiry dates",
            Feature::Reports => "Generate and export summary reports",
            Feature::Notifications => "Read your notifications",
        }
    }
}

/// What a role sees on its home screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardLayout {
    pub tiles: &'static [KpiTile],
    pub features: &'static [Feature],
}

pub fn dashboard_for(role: UserRole) -> DashboardLayout {
    use Feature::*;
    use KpiTile::*;
    match role {
        UserRole::Admin => DashboardLayout {
            tiles: &[
                TodaysAppointments,
                RevenueToday,
                RevenueMonth,
                Outstanding,
                Occupancy,
                LowStock,
            ],
            features: &[
                Patients,
                Staff,
                Appointments,
                Records,
                Billing,
                Wards,
                Inventory,
                Reports,
                Notifications,
            ],
        },
        UserRole::Doctor => DashboardLayout {
            tiles: &[TodaysAppointments, PendingToday, Occupancy],
            features: &[Appointments, Patients, Records, Wards, Notifications],
        },
        UserRole::Nurse => DashboardLayout {
            tiles: &[TodaysAppointments, Occupancy],
            features: &[Wards, Records, Patients, Notifications],
        },
        UserRole::Receptionist => DashboardLayout {
            tiles: &[TodaysAppointments, PendingToday, RevenueToday, Outstanding],
            features: &[Patients, Appointments, Billing, Notifications],
        },
        UserRole::Patient => DashboardLayout {
            tiles: &[],
            features: &[Appointments, Billing, Notifications],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BedType, PaymentMethod};
    use time::macros::{date, datetime, time};

    fn appointment(doctor_id: i64, date: Date, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: 0,
            patient_id: 1,
            doctor_id,
            date,
            start_time: time!(10:00),
            duration_minutes: 30,
            status,
            reason: "Checkup".into(),
            notes: None,
            created_at: datetime!(2026-03-01 09:00),
        }
    }

    fn payment(amount: f64, paid_on: Date) -> Payment {
        Payment {
            id: 0,
            invoice_id: 1,
            amount,
            method: PaymentMethod::Cash,
            paid_on,
        }
    }

    fn bed(status: BedStatus) -> Bed {
        Bed {
            id: 0,
            bed_number: "B".into(),
            room_number: "1".into(),
            ward: "General".into(),
            bed_type: BedType::General,
            status,
            patient_id: None,
            daily_rate: 100.0,
        }
    }

    fn invoice(balance: f64, status: InvoiceStatus) -> Invoice {
        Invoice {
            id: 0,
            invoice_number: "INV".into(),
            patient_id: 1,
            visit_id: None,
            items: Vec::new(),
            discount_percent: 0.0,
            tax_percent: 0.0,
            subtotal: 0.0,
            discount_amount: 0.0,
            tax_amount: 0.0,
            total: balance,
            amount_paid: 0.0,
            balance,
            status,
            issued_on: date!(2026 - 03 - 01),
            due_date: date!(2026 - 03 - 31),
        }
    }

    fn stock(quantity: u32, reorder_level: u32) -> InventoryItem {
        InventoryItem {
            id: 0,
            name: "Gauze".into(),
            category: "consumable".into(),
            quantity,
            reorder_level,
            unit: "pack".into(),
            unit_price: 1.0,
            expiry_date: None,
        }
    }

    #[test]
    fn kpis_summarise_the_day() {
        let today = date!(2026 - 03 - 10);
        let appointments = [
            appointment(1, today, AppointmentStatus::Scheduled),
            appointment(1, today, AppointmentStatus::Completed),
            appointment(2, today, AppointmentStatus::Confirmed),
            appointment(2, date!(2026 - 03 - 11), AppointmentStatus::Scheduled),
        ];
        let payments = [
            payment(100.0, today),
            payment(50.0, date!(2026 - 03 - 02)),
            payment(70.0, date!(2026 - 02 - 27)),
        ];
        let invoices = [
            invoice(40.0, InvoiceStatus::Pending),
            invoice(0.0, InvoiceStatus::Paid),
            invoice(25.0, InvoiceStatus::Overdue),
        ];
        let beds = [
            bed(BedStatus::Occupied),
            bed(BedStatus::Available),
            bed(BedStatus::Maintenance),
            bed(BedStatus::Occupied),
        ];
        let inventory = [stock(5, 10), stock(10, 10), stock(50, 10)];

        let kpis =
            DashboardKpis::compute(today, &appointments, &invoices, &payments, &beds, &inventory);
        assert_eq!(kpis.todays_appointments, 3);
        assert_eq!(kpis.pending_today, 2);
        assert_eq!(kpis.revenue_today, 100.0);
        assert_eq!(kpis.revenue_month, 150.0);
        assert_eq!(kpis.outstanding, 65.0);
        assert_eq!(kpis.occupancy_rate, 50.0);
        assert_eq!(kpis.low_stock, 2);
    }

    #[test]
    fn occupancy_without_beds_is_zero() {
        assert_eq!(occupancy_rate(&[]), 0.0);
    }

    #[test]
    fn status_breakdown_lists_every_status() {
        let today = date!(2026 - 03 - 10);
        let breakdown = appointments_by_status(&[
            appointment(1, today, AppointmentStatus::Cancelled),
            appointment(1, today, AppointmentStatus::Cancelled),
        ]);
        assert_eq!(breakdown.len(), AppointmentStatus::ALL.len());
        assert!(breakdown.contains(&(AppointmentStatus::Cancelled, 2)));
        assert!(breakdown.contains(&(AppointmentStatus::Scheduled, 0)));
    }

    #[test]
    fn revenue_is_bucketed_per_day() {
        let from = date!(2026 - 03 - 01);
        let series = revenue_by_day(
            &[payment(10.0, from), payment(5.0, from), payment(7.0, date!(2026 - 03 - 03))],
            from,
            3,
        );
        assert_eq!(
            series,
            vec![
                (date!(2026 - 03 - 01), 15.0),
                (date!(2026 - 03 - 02), 0.0),
                (date!(2026 - 03 - 03), 7.0)
            ]
        );
    }

    #[test]
    fn workload_ignores_cancelled() {
        let day = date!(2026 - 03 - 10);
        let workload = doctor_workload(
            &[
                appointment(2, day, AppointmentStatus::Scheduled),
                appointment(1, day, AppointmentStatus::Completed),
                appointment(1, day, AppointmentStatus::Cancelled),
                appointment(1, date!(2026 - 03 - 09), AppointmentStatus::Scheduled),
            ],
            day,
            day,
        );
        assert_eq!(workload, vec![(1, 1), (2, 1)]);
    }

    #[test]
    fn dashboards_are_role_specific() {
        assert!(dashboard_for(UserRole::Admin).features.contains(&Feature::Staff));
        assert!(!dashboard_for(UserRole::Receptionist)
            .features
            .contains(&Feature::Staff));
        assert!(dashboard_for(UserRole::Patient).tiles.is_empty());
        assert_eq!(
            KpiTile::Occupancy.value(
                &DashboardKpis {
                    occupancy_rate: 37.5,
                    ..Default::default()
                },
                "$"
            ),
            "37.5%"
        );
    }
}
