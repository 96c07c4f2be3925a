//! Appointment slot generation and conflict detection.
//!
//! A doctor's day is cut into fixed-length slots inside their working window.
//! Intervals are half-open: an appointment `[start, end)` blocks every slot it
//! overlaps, and back-to-back bookings never collide.

use crate::error::{HospitalError, Result};
use crate::models::{Appointment, DoctorSchedule};
use crate::utils::{format_time, minutes_of_day, time_from_minutes};
use serde::Serialize;
use time::{Date, PrimitiveDateTime, Time, Weekday};

/// Working hours on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingWindow {
    pub start: Time,
    pub end: Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub start: Time,
    pub end: Time,
    pub available: bool,
}

impl TimeSlot {
    pub fn label(&self) -> String {
        format_time(self.start)
    }
}

/// The doctor's window for `weekday`, or `default` when no schedule covers it.
pub fn working_window(
    schedules: &[DoctorSchedule],
    weekday: Weekday,
    default: WorkingWindow,
) -> WorkingWindow {
    schedules
        .iter()
        .find(|s| s.weekday == weekday)
        .map(|s| WorkingWindow {
            start: s.start_time,
            end: s.end_time,
        })
        .unwrap_or(default)
}

/// Slot starts `window.start + k * slot_minutes` that lie before `window.end`.
pub fn generate_slots(window: WorkingWindow, slot_minutes: u32) -> Vec<Time> {
    if slot_minutes == 0 {
        return Vec::new();
    }
    let end = minutes_of_day(window.end);
    (minutes_of_day(window.start)..end)
        .step_by(slot_minutes as usize)
        .filter_map(time_from_minutes)
        .collect()
}

fn interval(start: Time, duration_minutes: u32) -> (u32, u32) {
    let from = minutes_of_day(start);
    (from, from + duration_minutes)
}

fn overlaps(a: (u32, u32), b: (u32, u32)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

fn blocking_interval(appointment: &Appointment) -> Option<(u32, u32)> {
    appointment
        .status
        .occupies_slot()
        .then(|| interval(appointment.start_time, appointment.duration_minutes))
}

/// Pairs each slot with its availability against the day's appointments.
pub fn mark_availability(
    slots: &[Time],
    slot_minutes: u32,
    appointments: &[Appointment],
) -> Vec<TimeSlot> {
    let booked: Vec<(u32, u32)> = appointments.iter().filter_map(blocking_interval).collect();

    slots
        .iter()
        .map(|&start| {
            let span = interval(start, slot_minutes);
            TimeSlot {
                start,
                end: time_from_minutes(span.1).unwrap_or(Time::MIDNIGHT),
                available: !booked.iter().any(|b| overlaps(span, *b)),
            }
        })
        .collect()
}

/// Whether a slot on `date` starting at `start` has already begun at `now`.
pub fn has_started(date: Date, start: Time, now: PrimitiveDateTime) -> bool {
    PrimitiveDateTime::new(date, start) < now
}

/// Marks slots that have already begun as unavailable.
pub fn close_elapsed(slots: &mut [TimeSlot], date: Date, now: PrimitiveDateTime) {
    for slot in slots.iter_mut().filter(|s| has_started(date, s.start, now)) {
        slot.available = false;
    }
}

/// First live appointment overlapping `[start, start + duration)`.
///
/// `exclude_id` skips the appointment being rescheduled.
pub fn find_conflict<'a>(
    appointments: &'a [Appointment],
    start: Time,
    duration_minutes: u32,
    exclude_id: Option<i64>,
) -> Option<&'a Appointment> {
    let proposed = interval(start, duration_minutes);
    appointments.iter().find(|a| {
        Some(a.id) != exclude_id
            && blocking_interval(a).is_some_and(|existing| overlaps(proposed, existing))
    })
}

/// Checks that a booking fits entirely inside the working window.
pub fn validate_within_window(
    window: WorkingWindow,
    start: Time,
    duration_minutes: u32,
) -> Result<()> {
    if duration_minutes == 0 {
        return Err(HospitalError::validation(
            "Appointment duration must be positive",
        ));
    }
    let (from, to) = interval(start, duration_minutes);
    if from < minutes_of_day(window.start) || to > minutes_of_day(window.end) {
        return Err(HospitalError::validation(format!(
            "Appointment must fall within working hours {}-{}",
            format_time(window.start),
            format_time(window.end)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use time::macros::{date, datetime, time};

    const NINE_TO_FIVE: WorkingWindow = WorkingWindow {
        start: time!(09:00),
        end: time!(17:00),
    };

    fn booked(id: i64, start: Time, minutes: u32, status: AppointmentStatus) -> Appointment {
        Appointment {
            id,
            patient_id: 1,
            doctor_id: 1,
            date: date!(2026 - 03 - 02),
            start_time: start,
            duration_minutes: minutes,
            status,
            reason: "Checkup".into(),
            notes: None,
            created_at: datetime!(2026-03-01 09:00),
        }
    }

    fn slot_at(slots: &[TimeSlot], at: Time) -> TimeSlot {
        *slots.iter().find(|s| s.start == at).unwrap()
    }

    #[test]
    fn elapsed_slots_close_only_on_the_same_day() {
        let day = date!(2026 - 03 - 02);
        let mut slots = mark_availability(&generate_slots(NINE_TO_FIVE, 60), 60, &[]);
        close_elapsed(&mut slots, day, datetime!(2026-03-02 11:15));
        assert!(!slot_at(&slots, time!(09:00)).available);
        assert!(!slot_at(&slots, time!(11:00)).available);
        assert!(slot_at(&slots, time!(12:00)).available);

        let mut tomorrow = mark_availability(&generate_slots(NINE_TO_FIVE, 60), 60, &[]);
        close_elapsed(&mut tomorrow, date!(2026 - 03 - 03), datetime!(2026-03-02 11:15));
        assert!(tomorrow.iter().all(|s| s.available));
        assert!(has_started(day, time!(10:00), datetime!(2026-03-03 08:00)));
    }

    #[test]
    fn slots_cover_the_window() {
        let slots = generate_slots(NINE_TO_FIVE, 30);
        assert_eq!(slots.len(), 16);
        assert_eq!(slots[0], time!(09:00));
        assert_eq!(*slots.last().unwrap(), time!(16:30));
    }

    #[test]
    fn partial_last_slot_still_starts_before_end() {
        let window = WorkingWindow {
            start: time!(09:00),
            end: time!(10:10),
        };
        let slots = generate_slots(window, 30);
        assert_eq!(slots, vec![time!(09:00), time!(09:30), time!(10:00)]);
        assert!(generate_slots(window, 0).is_empty());
    }

    #[test]
    fn booked_slot_is_unavailable() {
        let slots = generate_slots(NINE_TO_FIVE, 30);
        let day = [booked(1, time!(10:00), 30, AppointmentStatus::Scheduled)];
        let marked = mark_availability(&slots, 30, &day);

        assert!(!slot_at(&marked, time!(10:00)).available);
        assert!(slot_at(&marked, time!(09:30)).available);
        assert!(slot_at(&marked, time!(10:30)).available);
        assert_eq!(slot_at(&marked, time!(10:00)).end, time!(10:30));
    }

    #[test]
    fn long_appointment_blocks_every_overlapped_slot() {
        let slots = generate_slots(NINE_TO_FIVE, 30);
        let day = [booked(1, time!(10:15), 45, AppointmentStatus::Confirmed)];
        let marked = mark_availability(&slots, 30, &day);

        assert!(slot_at(&marked, time!(09:30)).available);
        assert!(!slot_at(&marked, time!(10:00)).available);
        assert!(!slot_at(&marked, time!(10:30)).available);
        assert!(slot_at(&marked, time!(11:00)).available);
    }

    #[test]
    fn cancelled_appointments_free_their_slot() {
        let slots = generate_slots(NINE_TO_FIVE, 30);
        let day = [
            booked(1, time!(10:00), 30, AppointmentStatus::Cancelled),
            booked(2, time!(11:00), 30, AppointmentStatus::NoShow),
        ];
        let marked = mark_availability(&slots, 30, &day);
        assert!(slot_at(&marked, time!(10:00)).available);
        assert!(!slot_at(&marked, time!(11:00)).available);
    }

    #[test]
    fn conflicts_respect_half_open_intervals() {
        let day = [booked(7, time!(10:00), 30, AppointmentStatus::Scheduled)];
        assert!(find_conflict(&day, time!(10:30), 30, None).is_none());
        assert!(find_conflict(&day, time!(09:30), 30, None).is_none());
        assert_eq!(find_conflict(&day, time!(10:15), 30, None).map(|a| a.id), Some(7));
        assert!(find_conflict(&day, time!(10:00), 30, Some(7)).is_none());
    }

    #[test]
    fn window_bounds_are_enforced() {
        assert!(validate_within_window(NINE_TO_FIVE, time!(09:00), 30).is_ok());
        assert!(validate_within_window(NINE_TO_FIVE, time!(16:30), 30).is_ok());
        assert!(validate_within_window(NINE_TO_FIVE, time!(16:45), 30).is_err());
        assert!(validate_within_window(NINE_TO_FIVE, time!(08:30), 30).is_err());
        assert!(validate_within_window(NINE_TO_FIVE, time!(10:00), 0).is_err());
    }

    #[test]
    fn schedule_overrides_default_window() {
        let schedules = [DoctorSchedule {
            doctor_id: 1,
            weekday: Weekday::Saturday,
            start_time: time!(10:00),
            end_time: time!(13:00),
        }];
        let saturday = working_window(&schedules, Weekday::Saturday, NINE_TO_FIVE);
        assert_eq!(saturday.start, time!(10:00));
        assert_eq!(working_window(&schedules, Weekday::Monday, NINE_TO_FIVE), NINE_TO_FIVE);
    }
}
