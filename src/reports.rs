//! Summary reports over a date range, exportable as JSON.

use crate::analytics::{appointments_by_status, doctor_workload, occupancy_rate, revenue_by_day};
use crate::error::{HospitalError, Result};
use crate::inventory::{expiring_within, is_low_stock};
use crate::models::{
    Appointment, AppointmentStatus, Bed, BedStatus, InventoryItem, Payment, StaffMember, Visit,
    VisitType,
};
use crate::utils::format_date;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use time::{Date, PrimitiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Appointments,
    Revenue,
    Occupancy,
    Inventory,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        ReportKind::Appointments,
        ReportKind::Revenue,
        ReportKind::Occupancy,
        ReportKind::Inventory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Appointments => "appointments",
            ReportKind::Revenue => "revenue",
            ReportKind::Occupancy => "occupancy",
            ReportKind::Inventory => "inventory",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::Appointments => "Appointment Summary",
            ReportKind::Revenue => "Revenue Report",
            ReportKind::Occupancy => "Bed Occupancy Report",
            ReportKind::Inventory => "Inventory Status Report",
        }
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: Date,
    pub to: Date,
}

impl DateRange {
    pub fn new(from: Date, to: Date) -> Result<Self> {
        if from > to {
            return Err(HospitalError::validation(
                "Report range must not end before it starts",
            ));
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, date: Date) -> bool {
        self.from <= date && date <= self.to
    }

    pub fn days(&self) -> u32 {
        u32::try_from((self.to - self.from).whole_days() + 1).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub label: String,
    pub value: f64,
}

impl ReportRow {
    fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub kind: ReportKind,
    pub title: String,
    pub range: DateRange,
    pub generated_at: PrimitiveDateTime,
    pub rows: Vec<ReportRow>,
    pub summary: Vec<ReportRow>,
}

/// Records a report is computed from.
#[derive(Debug, Clone, Copy)]
pub struct ReportData<'a> {
    pub appointments: &'a [Appointment],
    pub payments: &'a [Payment],
    pub visits: &'a [Visit],
    pub beds: &'a [Bed],
    pub inventory: &'a [InventoryItem],
    /// Names the per-doctor rows of the appointment summary.
    pub doctors: &'a [StaffMember],
}

pub fn generate(
    kind: ReportKind,
    range: DateRange,
    data: ReportData<'_>,
    generated_at: PrimitiveDateTime,
) -> Report {
    let (rows, summary) = match kind {
        ReportKind::Appointments => appointment_rows(range, data.appointments, data.doctors),
        ReportKind::Revenue => revenue_rows(range, data.payments),
        ReportKind::Occupancy => occupancy_rows(range, data.beds, data.visits),
        ReportKind::Inventory => inventory_rows(range, data.inventory),
    };
    Report {
        kind,
        title: kind.title().to_string(),
        range,
        generated_at,
        rows,
        summary,
    }
}

fn appointment_rows(
    range: DateRange,
    appointments: &[Appointment],
    doctors: &[StaffMember],
) -> (Vec<ReportRow>, Vec<ReportRow>) {
    let in_range: Vec<Appointment> = appointments
        .iter()
        .filter(|a| range.contains(a.date))
        .cloned()
        .collect();
    let rows = appointments_by_status(&in_range)
        .into_iter()
        .map(|(status, count)| ReportRow::new(status.as_str(), count as f64))
        .collect();

    let total = in_range.len();
    let completed = in_range
        .iter()
        .filter(|a| a.status == AppointmentStatus::Completed)
        .count();
    let completion_rate = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    };
    let mut summary = vec![
        ReportRow::new("Total appointments", total as f64),
        ReportRow::new("Completion rate (%)", completion_rate),
    ];
    for (doctor_id, count) in doctor_workload(&in_range, range.from, range.to) {
        let name = doctors
            .iter()
            .find(|d| d.id == doctor_id)
            .map_or_else(|| format!("Doctor #{doctor_id}"), |d| d.name.clone());
        summary.push(ReportRow::new(format!("{name} booked"), count as f64));
    }
    (rows, summary)
}

fn revenue_rows(range: DateRange, payments: &[Payment]) -> (Vec<ReportRow>, Vec<ReportRow>) {
    let series = revenue_by_day(payments, range.from, range.days());
    let total: f64 = series.iter().map(|(_, amount)| amount).sum();
    let average = if series.is_empty() {
        0.0
    } else {
        total / series.len() as f64
    };
    let payment_count = payments.iter().filter(|p| range.contains(p.paid_on)).count();

    let rows = series
        .into_iter()
        .map(|(day, amount)| ReportRow::new(format_date(day), amount))
        .collect();
    let summary = vec![
        ReportRow::new("Total revenue", total),
        ReportRow::new("Average per day", average),
        ReportRow::new("Payments received", payment_count as f64),
    ];
    (rows, summary)
}

fn occupancy_rows(
    range: DateRange,
    beds: &[Bed],
    visits: &[Visit],
) -> (Vec<ReportRow>, Vec<ReportRow>) {
    let mut wards: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for bed in beds {
        let entry = wards.entry(bed.ward.as_str()).or_insert((0, 0));
        entry.1 += 1;
        if bed.status == BedStatus::Occupied {
            entry.0 += 1;
        }
    }
    let rows = wards
        .into_iter()
        .map(|(ward, (occupied, total))| {
            ReportRow::new(
                format!("{ward} ({occupied}/{total})"),
                occupied as f64 / total as f64 * 100.0,
            )
        })
        .collect();

    let admissions = visits
        .iter()
        .filter(|v| v.visit_type == VisitType::Ipd)
        .filter(|v| v.admission_date.is_some_and(|d| range.contains(d)))
        .count();
    let discharges = visits
        .iter()
        .filter(|v| v.discharge_date.is_some_and(|d| range.contains(d)))
        .count();
    let summary = vec![
        ReportRow::new("Occupancy rate (%)", occupancy_rate(beds)),
        ReportRow::new("Admissions", admissions as f64),
        ReportRow::new("Discharges", discharges as f64),
    ];
    (rows, summary)
}

fn inventory_rows(range: DateRange, items: &[InventoryItem]) -> (Vec<ReportRow>, Vec<ReportRow>) {
    let rows = items
        .iter()
        .map(|item| {
            let flag = if is_low_stock(item) { " [low]" } else { "" };
            ReportRow::new(format!("{}{flag}", item.name), f64::from(item.quantity))
        })
        .collect();

    let stock_value: f64 = items
        .iter()
        .map(|item| f64::from(item.quantity) * item.unit_price)
        .sum();
    let horizon = (range.to - range.from).whole_days();
    let summary = vec![
        ReportRow::new("Stock value", stock_value),
        ReportRow::new("Low stock items", items.iter().filter(|i| is_low_stock(i)).count() as f64),
        ReportRow::new(
            "Expiring by range end",
            expiring_within(items, range.from, horizon).len() as f64,
        ),
    ];
    (rows, summary)
}

/// Writes the report to `<dir>/<kind>-<from>-<to>.json` and returns the path.
pub fn export_json(report: &Report, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "{}-{}-{}.json",
        report.kind.as_str(),
        format_date(report.range.from),
        format_date(report.range.to)
    ));
    fs::write(&path, serde_json::to_string_pretty(report)?)?;
    tracing::info!(path = %path.display(), "Exported report");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::inventory::tests::sample_item;
    use crate::db::staff::tests::sample_doctor;
    use crate::models::{BedType, PaymentMethod};
    use time::macros::{date, datetime, time};

    fn range() -> DateRange {
        DateRange::new(date!(2026 - 03 - 01), date!(2026 - 03 - 03)).unwrap()
    }

    fn empty() -> ReportData<'static> {
        ReportData {
            appointments: &[],
            payments: &[],
            visits: &[],
            beds: &[],
            inventory: &[],
            doctors: &[],
        }
    }

    fn payment(amount: f64, paid_on: Date) -> Payment {
        Payment {
            id: 0,
            invoice_id: 1,
            amount,
            method: PaymentMethod::Online,
            paid_on,
        }
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(DateRange::new(date!(2026 - 03 - 05), date!(2026 - 03 - 01)).is_err());
        assert_eq!(range().days(), 3);
    }

    #[test]
    fn revenue_report_totals_payments_in_range() {
        let payments = [
            payment(100.0, date!(2026 - 03 - 01)),
            payment(50.0, date!(2026 - 03 - 03)),
            payment(999.0, date!(2026 - 03 - 04)),
        ];
        let data = ReportData {
            payments: &payments,
            ..empty()
        };
        let report = generate(ReportKind::Revenue, range(), data, datetime!(2026-03-04 08:00));
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.rows[0], ReportRow::new("2026-03-01", 100.0));
        assert_eq!(report.summary[0], ReportRow::new("Total revenue", 150.0));
        assert_eq!(report.summary[1], ReportRow::new("Average per day", 50.0));
        assert_eq!(report.summary[2], ReportRow::new("Payments received", 2.0));
    }

    #[test]
    fn appointment_report_filters_by_date() {
        let make = |date: Date, status: AppointmentStatus| Appointment {
            id: 0,
            patient_id: 1,
            doctor_id: 1,
            date,
            start_time: time!(09:00),
            duration_minutes: 30,
            status,
            reason: "Checkup".into(),
            notes: None,
            created_at: datetime!(2026-02-28 09:00),
        };
        let appointments = [
            make(date!(2026 - 03 - 01), AppointmentStatus::Completed),
            make(date!(2026 - 03 - 02), AppointmentStatus::Scheduled),
            make(date!(2026 - 04 - 01), AppointmentStatus::Completed),
        ];
        let mut house = sample_doctor("DOC-1", "Dr. House");
        house.id = 1;
        let doctors = [house];
        let data = ReportData {
            appointments: &appointments,
            doctors: &doctors,
            ..empty()
        };
        let report = generate(ReportKind::Appointments, range(), data, datetime!(2026-03-04 08:00));
        assert_eq!(report.summary[0].value, 2.0);
        assert_eq!(report.summary[1].value, 50.0);
        assert_eq!(report.summary[2], ReportRow::new("Dr. House booked", 2.0));
        assert_eq!(report.summary.len(), 3);
        assert!(report.rows.contains(&ReportRow::new("completed", 1.0)));
    }

    #[test]
    fn occupancy_report_groups_by_ward() {
        let bed = |ward: &str, status: BedStatus| Bed {
            id: 0,
            bed_number: "x".into(),
            room_number: "1".into(),
            ward: ward.into(),
            bed_type: BedType::General,
            status,
            patient_id: None,
            daily_rate: 0.0,
        };
        let beds = [
            bed("ICU", BedStatus::Occupied),
            bed("ICU", BedStatus::Available),
            bed("General", BedStatus::Available),
        ];
        let data = ReportData {
            beds: &beds,
            ..empty()
        };
        let report = generate(ReportKind::Occupancy, range(), data, datetime!(2026-03-04 08:00));
        assert_eq!(report.rows[0], ReportRow::new("General (0/1)", 0.0));
        assert_eq!(report.rows[1], ReportRow::new("ICU (1/2)", 50.0));
    }

    #[test]
    fn export_writes_named_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let items = [sample_item("Gauze", 2, 5)];
        let data = ReportData {
            inventory: &items,
            ..empty()
        };
        let report = generate(ReportKind::Inventory, range(), data, datetime!(2026-03-04 08:00));
        let path = export_json(&report, &dir.path().join("out")).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "inventory-2026-03-01-2026-03-03.json"
        );
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["kind"], "inventory");
        assert_eq!(json["rows"][0]["label"], "Gauze [low]");
    }
}
