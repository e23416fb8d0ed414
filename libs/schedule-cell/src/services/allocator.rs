use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::models::{CandidateSlot, NewTimeSlot, SlotKey, TimeSlot};

/// What to write for one doctor after diffing candidates against storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcilePlan {
    pub to_create: Vec<NewTimeSlot>,
    pub to_delete: Vec<Uuid>,
    pub to_skip: Vec<CandidateSlot>,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}

/// Decision-only reconciliation. Never performs I/O; the caller persists
/// the plan.
pub struct SlotAllocator;

impl SlotAllocator {
    /// Booked slots are always skipped and never deleted. Available slots are
    /// skipped unless `clear_existing` is set or their duration no longer
    /// matches, in which case they are deleted and recreated.
    pub fn reconcile(
        doctor_id: Uuid,
        candidates: &[CandidateSlot],
        existing: &[TimeSlot],
        clear_existing: bool,
    ) -> Result<ReconcilePlan, ScheduleError> {
        let lookup = Self::index_existing(doctor_id, existing)?;

        let mut plan = ReconcilePlan::default();
        let mut seen: HashSet<SlotKey> = HashSet::with_capacity(candidates.len());

        for candidate in candidates {
            if candidate.doctor_id != doctor_id {
                return Err(ScheduleError::InvariantViolation(format!(
                    "Candidate at {} {} belongs to doctor {}, not {}",
                    candidate.slot_date, candidate.start_time, candidate.doctor_id, doctor_id
                )));
            }
            if !seen.insert(candidate.key()) {
                return Err(ScheduleError::InvariantViolation(format!(
                    "Duplicate candidate slot at {} {} for doctor {}",
                    candidate.slot_date, candidate.start_time, doctor_id
                )));
            }

            match lookup.get(&candidate.key()) {
                None => plan.to_create.push(candidate.to_new_slot()),
                Some(slot) if slot.is_booked() => plan.to_skip.push(candidate.clone()),
                Some(slot) => {
                    let duration_changed = slot.duration_minutes != candidate.duration_minutes;
                    if clear_existing || duration_changed {
                        plan.to_delete.push(slot.id);
                        plan.to_create.push(candidate.to_new_slot());
                    } else {
                        plan.to_skip.push(candidate.clone());
                    }
                }
            }
        }

        Ok(plan)
    }

    /// Ids of available slots dated within `[start_date, end_date]`.
    pub fn plan_clear(existing: &[TimeSlot], start_date: NaiveDate, end_date: NaiveDate) -> Vec<Uuid> {
        existing
            .iter()
            .filter(|slot| slot.is_available)
            .filter(|slot| slot.slot_date >= start_date && slot.slot_date <= end_date)
            .map(|slot| slot.id)
            .collect()
    }

    /// Available slots with no matching candidate, i.e. leftovers of an
    /// older pattern.
    pub fn orphaned_available(candidates: &[CandidateSlot], existing: &[TimeSlot]) -> Vec<Uuid> {
        let keys: HashSet<SlotKey> = candidates.iter().map(|c| c.key()).collect();
        existing
            .iter()
            .filter(|slot| slot.is_available && !keys.contains(&slot.key()))
            .map(|slot| slot.id)
            .collect()
    }

    fn index_existing(
        doctor_id: Uuid,
        existing: &[TimeSlot],
    ) -> Result<HashMap<SlotKey, &TimeSlot>, ScheduleError> {
        let mut lookup: HashMap<SlotKey, &TimeSlot> = HashMap::with_capacity(existing.len());

        for slot in existing {
            if slot.doctor_id != doctor_id {
                return Err(ScheduleError::InvariantViolation(format!(
                    "Existing slot {} belongs to doctor {}, not {}",
                    slot.id, slot.doctor_id, doctor_id
                )));
            }

            // Two rows on one key means the store already broke the identity
            // invariant. Keep the booked one so it can never be touched.
            match lookup.get(&slot.key()) {
                Some(current) if current.is_booked() => {}
                _ => {
                    lookup.insert(slot.key(), slot);
                }
            }
        }

        Ok(lookup)
    }
}
