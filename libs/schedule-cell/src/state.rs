use std::sync::Arc;

use tracing::{info, warn};

use shared_config::AppConfig;

use crate::services::{
    AutoGenerationScheduler, AutoGenerationSettingsService, ScheduleService, ScheduleStores, SchedulerConfig,
};
use crate::stores::{InMemoryScheduleStore, SupabaseScheduleStore};

/// Shared handler state for the schedule routes.
pub struct ScheduleState {
    pub service: Arc<ScheduleService>,
    pub auto_settings: AutoGenerationSettingsService,
    pub scheduler: Arc<AutoGenerationScheduler>,
}

impl ScheduleState {
    /// Wires Supabase-backed stores when the connection settings are
    /// present, otherwise an empty in-memory store.
    pub fn from_config(config: &AppConfig) -> Self {
        let stores = if config.is_configured() {
            info!("Using Supabase schedule stores at {}", config.supabase_url);
            ScheduleStores::from_single(Arc::new(SupabaseScheduleStore::new(config)))
        } else {
            warn!("Supabase is not configured, falling back to in-memory schedule stores");
            ScheduleStores::from_single(Arc::new(InMemoryScheduleStore::new()))
        };

        Self::with_stores(stores, config.generation_concurrency, SchedulerConfig::from(config))
    }

    pub fn with_stores(stores: ScheduleStores, concurrency: usize, scheduler_config: SchedulerConfig) -> Self {
        let auto_settings = AutoGenerationSettingsService::new(stores.auto_generation.clone());
        let service = Arc::new(ScheduleService::new(stores, concurrency));
        let scheduler = Arc::new(AutoGenerationScheduler::new(service.clone(), scheduler_config));

        Self {
            service,
            auto_settings,
            scheduler,
        }
    }
}
