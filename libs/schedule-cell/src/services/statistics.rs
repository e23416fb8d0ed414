use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::TimeSlot;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayOccupancy {
    pub total_slots: usize,
    pub booked_slots: usize,
    pub available_slots: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStatistics {
    pub doctor_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_slots: usize,
    pub booked_slots: usize,
    pub available_slots: usize,
    pub booked_minutes: i64,
    pub occupancy_rate: f64,
    /// 0 = Sunday. `None` when nothing is booked.
    pub busiest_weekday: Option<u32>,
    pub by_date: BTreeMap<NaiveDate, DayOccupancy>,
}

pub struct StatisticsProjector;

impl StatisticsProjector {
    pub fn project(
        doctor_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        slots: &[TimeSlot],
    ) -> ScheduleStatistics {
        let mut by_date: BTreeMap<NaiveDate, DayOccupancy> = BTreeMap::new();
        let mut booked_by_weekday = [0usize; 7];
        let mut booked_minutes = 0i64;

        let in_range = slots.iter().filter(|slot| {
            slot.doctor_id == doctor_id && slot.slot_date >= start_date && slot.slot_date <= end_date
        });

        for slot in in_range {
            let day = by_date.entry(slot.slot_date).or_default();
            day.total_slots += 1;
            if slot.is_booked() {
                day.booked_slots += 1;
                booked_minutes += slot.duration_minutes as i64;
                booked_by_weekday[slot.slot_date.weekday().num_days_from_sunday() as usize] += 1;
            } else {
                day.available_slots += 1;
            }
        }

        let total_slots: usize = by_date.values().map(|d| d.total_slots).sum();
        let booked_slots: usize = by_date.values().map(|d| d.booked_slots).sum();

        let occupancy_rate = if total_slots == 0 {
            0.0
        } else {
            booked_slots as f64 / total_slots as f64
        };

        // Ties go to the earliest weekday.
        let busiest_weekday = booked_by_weekday
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(weekday, _)| weekday as u32);

        ScheduleStatistics {
            doctor_id,
            start_date,
            end_date,
            total_slots,
            booked_slots,
            available_slots: total_slots - booked_slots,
            booked_minutes,
            occupancy_rate,
            busiest_weekday,
            by_date,
        }
    }
}
