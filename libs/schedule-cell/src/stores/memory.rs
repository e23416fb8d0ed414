use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::models::{
    AutoGenerationSettings, GenerationScope, NewTimeSlot, ScheduleSettings, SlotKey, TimeSlot,
};
use crate::store::{AutoGenerationSettingsStore, DoctorDirectory, DoctorSettingsStore, TimeSlotStore};

/// Directory entry: ids only, no live references.
#[derive(Debug, Clone, PartialEq)]
pub struct DoctorRecord {
    pub id: Uuid,
    pub hospital_id: Option<Uuid>,
    pub speciality_id: Option<Uuid>,
}

/// Process-local implementation of every store. Backs local runs without
/// Supabase and the test suites.
#[derive(Default)]
pub struct InMemoryScheduleStore {
    doctors: RwLock<Vec<DoctorRecord>>,
    settings: RwLock<HashMap<Uuid, ScheduleSettings>>,
    slots: RwLock<HashMap<Uuid, TimeSlot>>,
    auto_settings: RwLock<HashMap<Uuid, AutoGenerationSettings>>,
    failing_doctors: RwLock<HashSet<Uuid>>,
    writes: AtomicUsize,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_doctor(&self, record: DoctorRecord) {
        write(&self.doctors).push(record);
    }

    pub fn put_settings(&self, settings: ScheduleSettings) {
        write(&self.settings).insert(settings.doctor_id, settings);
    }

    pub fn remove_settings(&self, doctor_id: Uuid) -> bool {
        write(&self.settings).remove(&doctor_id).is_some()
    }

    /// Seeds a slot directly, bypassing the identity check.
    pub fn insert_slot(&self, slot: TimeSlot) {
        write(&self.slots).insert(slot.id, slot);
    }

    /// Stand-in for the appointment flow claiming a slot.
    pub fn book_slot(&self, slot_id: Uuid) -> bool {
        match write(&self.slots).get_mut(&slot_id) {
            Some(slot) => {
                slot.is_available = false;
                true
            }
            None => false,
        }
    }

    pub fn slots_for(&self, doctor_id: Uuid) -> Vec<TimeSlot> {
        let mut slots: Vec<TimeSlot> = read(&self.slots)
            .values()
            .filter(|slot| slot.doctor_id == doctor_id)
            .cloned()
            .collect();
        slots.sort_by_key(|slot| slot.key());
        slots
    }

    pub fn slot_count(&self) -> usize {
        read(&self.slots).len()
    }

    /// Makes every slot write touching `doctor_id` fail.
    pub fn fail_writes_for(&self, doctor_id: Uuid) {
        write(&self.failing_doctors).insert(doctor_id);
    }

    /// Number of mutating slot-store calls that reached storage.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self, doctor_ids: impl IntoIterator<Item = Uuid>) -> Result<()> {
        let failing = read(&self.failing_doctors);
        for doctor_id in doctor_ids {
            if failing.contains(&doctor_id) {
                bail!("simulated write failure for doctor {}", doctor_id);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DoctorSettingsStore for InMemoryScheduleStore {
    async fn get_schedule_settings(&self, doctor_id: Uuid) -> Result<Option<ScheduleSettings>> {
        Ok(read(&self.settings).get(&doctor_id).cloned())
    }

    async fn settings_exist(&self, doctor_id: Uuid) -> Result<bool> {
        Ok(read(&self.settings).contains_key(&doctor_id))
    }
}

#[async_trait]
impl TimeSlotStore for InMemoryScheduleStore {
    async fn get_slots_for_doctor_in_range(
        &self,
        doctor_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<TimeSlot>> {
        let mut slots: Vec<TimeSlot> = read(&self.slots)
            .values()
            .filter(|slot| {
                slot.doctor_id == doctor_id
                    && slot.slot_date >= start_date
                    && slot.slot_date <= end_date
            })
            .cloned()
            .collect();
        slots.sort_by_key(|slot| slot.key());
        Ok(slots)
    }

    async fn bulk_create(&self, new_slots: &[NewTimeSlot]) -> Result<()> {
        if new_slots.is_empty() {
            return Ok(());
        }
        self.check_writable(new_slots.iter().map(|slot| slot.doctor_id))?;

        let mut slots = write(&self.slots);

        let mut taken: HashSet<(Uuid, SlotKey)> = slots
            .values()
            .map(|slot| (slot.doctor_id, slot.key()))
            .collect();
        for new_slot in new_slots {
            if !taken.insert((new_slot.doctor_id, new_slot.key())) {
                bail!(
                    "duplicate slot for doctor {} at {} {}",
                    new_slot.doctor_id, new_slot.slot_date, new_slot.start_time
                );
            }
        }

        let now = Utc::now();
        for new_slot in new_slots {
            let slot = TimeSlot {
                id: Uuid::new_v4(),
                doctor_id: new_slot.doctor_id,
                hospital_id: new_slot.hospital_id,
                slot_date: new_slot.slot_date,
                start_time: new_slot.start_time,
                duration_minutes: new_slot.duration_minutes,
                is_available: new_slot.is_available,
                created_at: now,
            };
            slots.insert(slot.id, slot);
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!("Inserted {} slots", new_slots.len());
        Ok(())
    }

    async fn bulk_delete(&self, slot_ids: &[Uuid]) -> Result<()> {
        if slot_ids.is_empty() {
            return Ok(());
        }

        let mut slots = write(&self.slots);

        let mut doctors = Vec::with_capacity(slot_ids.len());
        for id in slot_ids {
            let slot = slots
                .get(id)
                .ok_or_else(|| anyhow!("slot {} not found", id))?;
            if slot.is_booked() {
                return Err(ScheduleError::InvariantViolation(format!(
                    "slot {} was booked before it could be deleted",
                    id
                ))
                .into());
            }
            doctors.push(slot.doctor_id);
        }
        self.check_writable(doctors)?;

        for id in slot_ids {
            slots.remove(id);
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!("Deleted {} slots", slot_ids.len());
        Ok(())
    }

    async fn delete_available_slots_in_range(
        &self,
        doctor_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<usize> {
        self.check_writable([doctor_id])?;

        let mut slots = write(&self.slots);
        let before = slots.len();
        slots.retain(|_, slot| {
            !(slot.doctor_id == doctor_id
                && slot.is_available
                && slot.slot_date >= start_date
                && slot.slot_date <= end_date)
        });

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(before - slots.len())
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryScheduleStore {
    async fn resolve_doctors(&self, scope: &GenerationScope) -> Result<Vec<Uuid>> {
        let doctors = read(&self.doctors);

        let ids = doctors
            .iter()
            .filter(|doctor| match scope {
                GenerationScope::AllHospitals => true,
                GenerationScope::SelectedHospital { hospital_id } => {
                    doctor.hospital_id == Some(*hospital_id)
                }
                GenerationScope::SelectedSpeciality {
                    speciality_id,
                    hospital_id,
                } => {
                    doctor.speciality_id == Some(*speciality_id)
                        && hospital_id.map_or(true, |h| doctor.hospital_id == Some(h))
                }
                GenerationScope::SelectedDoctor { doctor_id } => doctor.id == *doctor_id,
            })
            .map(|doctor| doctor.id)
            .collect();

        Ok(ids)
    }
}

#[async_trait]
impl AutoGenerationSettingsStore for InMemoryScheduleStore {
    async fn get_due_settings(&self, now: DateTime<Utc>) -> Result<Vec<AutoGenerationSettings>> {
        let mut due: Vec<AutoGenerationSettings> = read(&self.auto_settings)
            .values()
            .filter(|settings| settings.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|settings| settings.next_generation_date);
        Ok(due)
    }

    async fn update_next_generation_date(&self, id: Uuid, next: DateTime<Utc>) -> Result<bool> {
        match write(&self.auto_settings).get_mut(&id) {
            Some(settings) => {
                settings.next_generation_date = next;
                settings.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<AutoGenerationSettings>> {
        let mut all: Vec<AutoGenerationSettings> =
            read(&self.auto_settings).values().cloned().collect();
        all.sort_by_key(|settings| settings.created_at);
        Ok(all)
    }

    async fn get(&self, id: Uuid) -> Result<Option<AutoGenerationSettings>> {
        Ok(read(&self.auto_settings).get(&id).cloned())
    }

    async fn create(&self, settings: &AutoGenerationSettings) -> Result<AutoGenerationSettings> {
        let mut all = write(&self.auto_settings);
        if all.contains_key(&settings.id) {
            bail!("auto-generation settings {} already exist", settings.id);
        }
        all.insert(settings.id, settings.clone());
        Ok(settings.clone())
    }

    async fn update(&self, settings: &AutoGenerationSettings) -> Result<AutoGenerationSettings> {
        let mut all = write(&self.auto_settings);
        match all.get_mut(&settings.id) {
            Some(current) => {
                *current = settings.clone();
                Ok(settings.clone())
            }
            None => Err(anyhow!("auto-generation settings {} not found", settings.id)),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(write(&self.auto_settings).remove(&id).is_some())
    }
}
