//! Availability checks
//!
//! Intervals are half-open `[start, end)` in Unix millis: an appointment
//! ending at 10:30 does not conflict with one starting at 10:30.

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use shared::models::TimeSlot;

use crate::utils::time::{MINUTE_MS, date_time_to_millis, format_local};

/// A busy period on a barber's calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
    /// Appointment occupying the interval; None for blocks
    pub appointment_id: Option<i64>,
}

impl Interval {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            appointment_id: None,
        }
    }

    pub fn appointment(id: i64, start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            appointment_id: Some(id),
        }
    }
}

/// `s1 < e2 && s2 < e1`
pub fn overlaps(a: &Interval, b: &Interval) -> bool {
    a.start < b.end && b.start < a.end
}

/// First busy interval overlapping the candidate, if any
pub fn first_conflict<'a>(candidate: &Interval, busy: &'a [Interval]) -> Option<&'a Interval> {
    busy.iter().find(|b| overlaps(candidate, b))
}

/// Slot grid for one local day between opening and closing time.
///
/// A slot that would run past closing time is not offered.
pub fn slot_grid(
    date: NaiveDate,
    tz: Tz,
    opening: NaiveTime,
    closing: NaiveTime,
    slot_minutes: i64,
    busy: &[Interval],
) -> Vec<TimeSlot> {
    let open_ms = date_time_to_millis(date, opening, tz);
    let close_ms = date_time_to_millis(date, closing, tz);
    let step = slot_minutes.max(1) * MINUTE_MS;

    let mut slots = Vec::new();
    let mut start = open_ms;
    while start + step <= close_ms {
        let candidate = Interval::new(start, start + step);
        let conflict = first_conflict(&candidate, busy);
        slots.push(TimeSlot {
            time: format_local(start, tz, "%H:%M"),
            start_at: start,
            end_at: start + step,
            available: conflict.is_none(),
            appointment_id: conflict.and_then(|c| c.appointment_id),
        });
        start += step;
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    const M: i64 = MINUTE_MS;

    fn at(minutes: i64) -> i64 {
        minutes * M
    }

    #[test]
    fn test_overlap_iff_intervals_intersect() {
        let existing = Interval::new(at(615), at(645)); // 10:15-10:45
        // every candidate start on a 5 minute grid around it, 30 minutes long
        for s in (540..=720).step_by(5) {
            let candidate = Interval::new(at(s), at(s + 30));
            let expected = existing.start < candidate.end && candidate.start < existing.end;
            assert_eq!(overlaps(&existing, &candidate), expected, "start={s}");
            assert_eq!(overlaps(&candidate, &existing), expected, "symmetric start={s}");
        }
    }

    #[test]
    fn test_adjacent_intervals_do_not_overlap() {
        let a = Interval::new(at(600), at(630));
        let b = Interval::new(at(630), at(660));
        assert!(!overlaps(&a, &b));
        assert!(first_conflict(&b, &[a]).is_none());
    }

    #[test]
    fn test_first_conflict_reports_blocking_appointment() {
        let busy = [
            Interval::appointment(7, at(540), at(570)),
            Interval::appointment(8, at(615), at(645)),
        ];
        let candidate = Interval::new(at(600), at(630)); // 10:00-10:30
        assert_eq!(first_conflict(&candidate, &busy).and_then(|c| c.appointment_id), Some(8));
    }

    #[test]
    fn test_slot_grid_default_day() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 21).unwrap();
        let tz = chrono_tz::UTC;
        let open = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let close = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        let day = date_time_to_millis(date, NaiveTime::MIN, tz);
        let busy = [Interval::appointment(3, day + at(615), day + at(645))];

        let slots = slot_grid(date, tz, open, close, 30, &busy);
        assert_eq!(slots.len(), 20);
        assert_eq!(slots[0].time, "08:00");
        assert_eq!(slots[19].time, "17:30");

        let ten = slots.iter().find(|s| s.time == "10:00").unwrap();
        let ten_thirty = slots.iter().find(|s| s.time == "10:30").unwrap();
        let eleven = slots.iter().find(|s| s.time == "11:00").unwrap();
        assert!(!ten.available);
        assert_eq!(ten.appointment_id, Some(3));
        assert!(!ten_thirty.available);
        assert!(eleven.available);
        assert_eq!(eleven.appointment_id, None);
    }

    #[test]
    fn test_blocks_make_slots_unavailable_without_appointment_id() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 21).unwrap();
        let tz = chrono_tz::UTC;
        let open = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let close = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let day = date_time_to_millis(date, NaiveTime::MIN, tz);
        let lunch = [Interval::new(day + at(480), day + at(540))];

        let slots = slot_grid(date, tz, open, close, 30, &lunch);
        assert_eq!(slots.len(), 4);
        assert!(!slots[0].available && !slots[1].available);
        assert!(slots[2].available && slots[3].available);
        assert!(slots.iter().all(|s| s.appointment_id.is_none()));
    }
}
