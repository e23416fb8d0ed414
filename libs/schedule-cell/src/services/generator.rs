use chrono::{Duration, NaiveDate, NaiveTime, Timelike};

use crate::models::{CandidateSlot, ScheduleSettings};

pub struct SlotGenerator;

impl SlotGenerator {
    /// Candidate slots for every working day in `[start_date, end_date]`,
    /// ordered by date then time. Steps that would overlap lunch are skipped
    /// whole; a slot never runs past the end of the workday.
    pub fn generate(
        settings: &ScheduleSettings,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Vec<CandidateSlot> {
        let pattern = &settings.pattern;
        // Minute arithmetic in i64 so oversized durations cannot overflow.
        let slot = i64::from(pattern.slot_duration_minutes);
        let step = slot + i64::from(pattern.break_duration_minutes.max(0));

        if slot <= 0 || step <= 0 || start_date > end_date {
            return Vec::new();
        }

        let day_start = minutes_of(pattern.work_day_start);
        let day_end = minutes_of(pattern.work_day_end);
        let lunch = pattern
            .lunch_window()
            .map(|(start, end)| (minutes_of(start), minutes_of(end)));

        // Offsets are the same for every working day.
        let mut day_offsets = Vec::new();
        let mut cursor = day_start;
        while cursor + slot <= day_end {
            let overlaps_lunch = lunch
                .map(|(lunch_start, lunch_end)| cursor < lunch_end && cursor + slot > lunch_start)
                .unwrap_or(false);

            if !overlaps_lunch {
                day_offsets.push(cursor);
            }
            cursor += step;
        }

        let mut candidates = Vec::new();
        let mut date = start_date;
        while date <= end_date {
            if pattern.works_on(date) {
                candidates.extend(day_offsets.iter().map(|&minutes| CandidateSlot {
                    doctor_id: settings.doctor_id,
                    hospital_id: pattern.hospital_id,
                    slot_date: date,
                    start_time: time_of(minutes),
                    duration_minutes: pattern.slot_duration_minutes,
                }));
            }
            date += Duration::days(1);
        }

        candidates
    }
}

fn minutes_of(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight() / 60)
}

fn time_of(minutes: i64) -> NaiveTime {
    NaiveTime::MIN + Duration::minutes(minutes)
}
