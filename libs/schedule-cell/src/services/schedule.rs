use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{ScheduleError, ScheduleResult};
use crate::models::{
    AutoGenerationSettings, DoctorGenerationOutcome, GenerateScheduleRequest, GenerationRequest,
    GenerationResult, GenerationScope, MAX_GENERATION_DAYS,
};
use crate::services::allocator::{ReconcilePlan, SlotAllocator};
use crate::services::generator::SlotGenerator;
use crate::services::statistics::{ScheduleStatistics, StatisticsProjector};
use crate::store::{AutoGenerationSettingsStore, DoctorDirectory, DoctorSettingsStore, TimeSlotStore};

/// The four collaborators the engine talks to.
#[derive(Clone)]
pub struct ScheduleStores {
    pub settings: Arc<dyn DoctorSettingsStore>,
    pub slots: Arc<dyn TimeSlotStore>,
    pub directory: Arc<dyn DoctorDirectory>,
    pub auto_generation: Arc<dyn AutoGenerationSettingsStore>,
}

impl ScheduleStores {
    /// All four capabilities served by one backing object.
    pub fn from_single<S>(store: Arc<S>) -> Self
    where
        S: DoctorSettingsStore + TimeSlotStore + DoctorDirectory + AutoGenerationSettingsStore + 'static,
    {
        Self {
            settings: store.clone(),
            slots: store.clone(),
            directory: store.clone(),
            auto_generation: store,
        }
    }
}

/// Per-doctor critical sections for read-existing → decide → write.
#[derive(Default)]
struct DoctorLocks {
    inner: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl DoctorLocks {
    const PRUNE_THRESHOLD: usize = 1024;

    fn lock_for(&self, doctor_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if locks.len() > Self::PRUNE_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        locks.entry(doctor_id).or_default().clone()
    }
}

/// Names the failed write; typed errors raised by the store pass through.
fn write_failure(operation: &str, doctor_id: Uuid, err: anyhow::Error) -> ScheduleError {
    match ScheduleError::from(err) {
        ScheduleError::StoreFailure(message) => {
            ScheduleError::StoreFailure(format!("{} for doctor {} failed: {}", operation, doctor_id, message))
        }
        other => other,
    }
}

pub struct ScheduleService {
    stores: ScheduleStores,
    doctor_locks: DoctorLocks,
    concurrency: usize,
}

impl ScheduleService {
    pub fn new(stores: ScheduleStores, concurrency: usize) -> Self {
        Self {
            stores,
            doctor_locks: DoctorLocks::default(),
            concurrency: concurrency.max(1),
        }
    }

    /// Generate-now entry point for loosely typed request bodies. A bad
    /// scope is rejected before any store is touched.
    pub async fn generate_from_request(&self, body: GenerateScheduleRequest) -> ScheduleResult<GenerationResult> {
        let request = GenerationRequest::try_from(body)?;
        self.generate_schedule(&request).await
    }

    #[instrument(
        skip(self, request),
        fields(scope = %request.scope, start = %request.start_date, end = %request.end_date)
    )]
    pub async fn generate_schedule(&self, request: &GenerationRequest) -> ScheduleResult<GenerationResult> {
        request.validate()?;

        let doctor_ids = self.resolve_scope(&request.scope).await?;
        info!("Generating schedules for {} doctor(s)", doctor_ids.len());

        let tasks: Vec<_> = doctor_ids
            .into_iter()
            .map(|doctor_id| async move {
                let outcome = self.generate_for_doctor(doctor_id, request).await;
                (doctor_id, outcome)
            })
            .collect();

        let outcomes: BTreeMap<Uuid, DoctorGenerationOutcome> = stream::iter(tasks)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let result = GenerationResult::from_outcomes(request.start_date, request.end_date, outcomes);
        info!(
            "Generation finished: {} created, {} deleted, {} skipped, {}/{} doctors failed",
            result.total_created,
            result.total_deleted,
            result.total_skipped,
            result.doctors_failed,
            result.doctors_processed
        );

        Ok(result)
    }

    async fn resolve_scope(&self, scope: &GenerationScope) -> ScheduleResult<Vec<Uuid>> {
        let mut doctor_ids = self.stores.directory.resolve_doctors(scope).await?;
        doctor_ids.sort();
        doctor_ids.dedup();

        if doctor_ids.is_empty() {
            return Err(ScheduleError::NotFound(format!("No doctors found for {}", scope)));
        }

        Ok(doctor_ids)
    }

    async fn generate_for_doctor(&self, doctor_id: Uuid, request: &GenerationRequest) -> DoctorGenerationOutcome {
        match self.try_generate_for_doctor(doctor_id, request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Schedule generation failed for doctor {}: {}", doctor_id, e);
                DoctorGenerationOutcome::failed(&e)
            }
        }
    }

    async fn try_generate_for_doctor(
        &self,
        doctor_id: Uuid,
        request: &GenerationRequest,
    ) -> ScheduleResult<DoctorGenerationOutcome> {
        let settings = match self.stores.settings.get_schedule_settings(doctor_id).await? {
            Some(settings) => settings,
            None => match &request.settings_override {
                Some(pattern) => pattern.for_doctor(doctor_id),
                None => return Err(ScheduleError::NoSettings(doctor_id)),
            },
        };
        settings.validate()?;

        let candidates = SlotGenerator::generate(&settings, request.start_date, request.end_date);

        let lock = self.doctor_locks.lock_for(doctor_id);
        let _guard = lock.lock().await;

        let existing = self
            .stores
            .slots
            .get_slots_for_doctor_in_range(doctor_id, request.start_date, request.end_date)
            .await?;

        let mut plan = SlotAllocator::reconcile(doctor_id, &candidates, &existing, request.clear_existing)?;
        if request.clear_existing {
            plan.to_delete.extend(SlotAllocator::orphaned_available(&candidates, &existing));
        }

        self.persist(doctor_id, &plan).await?;

        debug!(
            "Doctor {}: {} candidates, {} created, {} deleted, {} skipped",
            doctor_id,
            candidates.len(),
            plan.to_create.len(),
            plan.to_delete.len(),
            plan.to_skip.len()
        );

        Ok(DoctorGenerationOutcome::succeeded(
            plan.to_create.len(),
            plan.to_delete.len(),
            plan.to_skip.len(),
        ))
    }

    /// One bulk delete then one bulk create. Deletes go first so recreated
    /// slots never collide with the rows they replace.
    async fn persist(&self, doctor_id: Uuid, plan: &ReconcilePlan) -> ScheduleResult<()> {
        if plan.is_noop() {
            return Ok(());
        }

        if !plan.to_delete.is_empty() {
            self.stores
                .slots
                .bulk_delete(&plan.to_delete)
                .await
                .map_err(|e| write_failure("bulk delete", doctor_id, e))?;
        }

        if !plan.to_create.is_empty() {
            self.stores
                .slots
                .bulk_create(&plan.to_create)
                .await
                .map_err(|e| write_failure("bulk create", doctor_id, e))?;
        }

        Ok(())
    }

    /// Removes a doctor's available slots in the range. Booked slots stay.
    #[instrument(skip(self))]
    pub async fn clear_schedule(
        &self,
        doctor_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ScheduleResult<usize> {
        if start_date > end_date {
            return Err(ScheduleError::Validation(
                "Start date must not be after end date".to_string(),
            ));
        }

        let lock = self.doctor_locks.lock_for(doctor_id);
        let _guard = lock.lock().await;

        let removed = self
            .stores
            .slots
            .delete_available_slots_in_range(doctor_id, start_date, end_date)
            .await?;

        info!("Cleared {} available slot(s) for doctor {}", removed, doctor_id);
        Ok(removed)
    }

    /// Cleanup after a doctor's schedule settings were deleted: drops the
    /// doctor's future available slots from `from_date` on.
    #[instrument(skip(self))]
    pub async fn cleanup_removed_settings(&self, doctor_id: Uuid, from_date: NaiveDate) -> ScheduleResult<usize> {
        if self.stores.settings.settings_exist(doctor_id).await? {
            return Err(ScheduleError::Validation(format!(
                "Doctor {} still has schedule settings",
                doctor_id
            )));
        }

        let until = from_date + Duration::days(MAX_GENERATION_DAYS);
        self.clear_schedule(doctor_id, from_date, until).await
    }

    pub async fn doctor_statistics(
        &self,
        doctor_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ScheduleResult<ScheduleStatistics> {
        if start_date > end_date {
            return Err(ScheduleError::Validation(
                "Start date must not be after end date".to_string(),
            ));
        }

        let slots = self
            .stores
            .slots
            .get_slots_for_doctor_in_range(doctor_id, start_date, end_date)
            .await?;

        Ok(StatisticsProjector::project(doctor_id, start_date, end_date, &slots))
    }

    /// Runs every enabled setting whose next generation date has arrived
    /// and advances the ones that succeeded. Failed entries keep their date
    /// and are picked up again on the next poll.
    #[instrument(skip(self))]
    pub async fn process_due_generations(&self, now: DateTime<Utc>) -> ScheduleResult<usize> {
        let due = self.stores.auto_generation.get_due_settings(now).await?;
        if due.is_empty() {
            debug!("No auto-generation settings due");
            return Ok(0);
        }

        info!("{} auto-generation setting(s) due", due.len());
        let today = now.date_naive();
        let mut processed = 0;

        for settings in due.iter().filter(|settings| settings.is_due(now)) {
            match self.run_auto_generation(settings, today).await {
                Ok(result) => {
                    let next = settings.advanced_next_date(today);
                    match self.stores.auto_generation.update_next_generation_date(settings.id, next).await {
                        Ok(true) => {
                            info!(
                                "Auto-generation {} done ({} slots created), next run {}",
                                settings.id, result.total_created, next
                            );
                            processed += 1;
                        }
                        Ok(false) => {
                            warn!("Auto-generation {} disappeared before it could be advanced", settings.id);
                        }
                        Err(e) => {
                            error!("Failed to advance auto-generation {}: {:#}", settings.id, e);
                        }
                    }
                }
                Err(e) => {
                    warn!("Auto-generation {} failed, will retry on next poll: {}", settings.id, e);
                }
            }
        }

        Ok(processed)
    }

    async fn run_auto_generation(
        &self,
        settings: &AutoGenerationSettings,
        today: NaiveDate,
    ) -> ScheduleResult<GenerationResult> {
        let pattern = settings.work_pattern()?;
        let (start_date, end_date) = settings.generation_range(today);

        let request = GenerationRequest {
            scope: settings.scope.clone(),
            start_date,
            end_date,
            settings_override: Some(pattern),
            clear_existing: false,
        };

        self.generate_schedule(&request).await
    }
}
