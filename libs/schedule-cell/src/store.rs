//! Capability interfaces the engine consumes. Implementations live in
//! `crate::stores`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{AutoGenerationSettings, GenerationScope, NewTimeSlot, ScheduleSettings, TimeSlot};

#[async_trait]
pub trait DoctorSettingsStore: Send + Sync {
    async fn get_schedule_settings(&self, doctor_id: Uuid) -> Result<Option<ScheduleSettings>>;

    async fn settings_exist(&self, doctor_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait TimeSlotStore: Send + Sync {
    /// Slots with `start_date <= slot_date <= end_date`, ordered by date then time.
    async fn get_slots_for_doctor_in_range(
        &self,
        doctor_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<TimeSlot>>;

    /// Inserts the whole batch or nothing.
    async fn bulk_create(&self, slots: &[NewTimeSlot]) -> Result<()>;

    async fn bulk_delete(&self, slot_ids: &[Uuid]) -> Result<()>;

    /// Deletes available slots only; booked slots in the range stay.
    /// Returns the number of slots removed.
    async fn delete_available_slots_in_range(
        &self,
        doctor_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<usize>;
}

#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn resolve_doctors(&self, scope: &GenerationScope) -> Result<Vec<Uuid>>;
}

#[async_trait]
pub trait AutoGenerationSettingsStore: Send + Sync {
    /// Enabled settings whose next generation date is at or before `now`.
    async fn get_due_settings(&self, now: DateTime<Utc>) -> Result<Vec<AutoGenerationSettings>>;

    async fn update_next_generation_date(&self, id: Uuid, next: DateTime<Utc>) -> Result<bool>;

    async fn list(&self) -> Result<Vec<AutoGenerationSettings>>;

    async fn get(&self, id: Uuid) -> Result<Option<AutoGenerationSettings>>;

    async fn create(&self, settings: &AutoGenerationSettings) -> Result<AutoGenerationSettings>;

    async fn update(&self, settings: &AutoGenerationSettings) -> Result<AutoGenerationSettings>;

    async fn delete(&self, id: Uuid) -> Result<bool>;
}
