use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ScheduleError, ScheduleResult};
use crate::models::{
    AutoGenerationSettings, CreateAutoGenerationRequest, GenerationScope, UpdateAutoGenerationRequest,
};
use crate::store::AutoGenerationSettingsStore;

/// Administrator-facing management of auto-generation settings.
#[derive(Clone)]
pub struct AutoGenerationSettingsService {
    store: Arc<dyn AutoGenerationSettingsStore>,
}

impl AutoGenerationSettingsService {
    pub fn new(store: Arc<dyn AutoGenerationSettingsStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> ScheduleResult<Vec<AutoGenerationSettings>> {
        Ok(self.store.list().await?)
    }

    pub async fn get(&self, id: Uuid) -> ScheduleResult<AutoGenerationSettings> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ScheduleError::NotFound(format!("Auto-generation settings {} not found", id)))
    }

    pub async fn create(&self, request: CreateAutoGenerationRequest) -> ScheduleResult<AutoGenerationSettings> {
        let scope = GenerationScope::from_parts(
            &request.scope,
            request.hospital_id,
            request.speciality_id,
            request.doctor_id,
        )?;
        request.settings.validate()?;

        let now = Utc::now();
        let settings = AutoGenerationSettings {
            id: Uuid::new_v4(),
            is_enabled: request.is_enabled.unwrap_or(true),
            scope,
            period_type: request.period_type,
            next_generation_date: request.next_generation_date.unwrap_or(now),
            settings_payload: serde_json::to_value(&request.settings)
                .map_err(|e| ScheduleError::Validation(e.to_string()))?,
            created_by: request.created_by,
            created_at: now,
            updated_at: now,
        };

        let created = self.store.create(&settings).await?;
        info!("Created auto-generation settings {} for {}", created.id, created.scope);
        Ok(created)
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateAutoGenerationRequest,
    ) -> ScheduleResult<AutoGenerationSettings> {
        let mut settings = self.get(id).await?;

        if let Some(kind) = &request.scope {
            settings.scope = GenerationScope::from_parts(
                kind,
                request.hospital_id,
                request.speciality_id,
                request.doctor_id,
            )?;
        } else if request.hospital_id.is_some() || request.speciality_id.is_some() || request.doctor_id.is_some() {
            return Err(ScheduleError::InvalidScope(
                "Scope ids can only be changed together with the scope".to_string(),
            ));
        }

        if let Some(pattern) = &request.settings {
            pattern.validate()?;
            settings.settings_payload = serde_json::to_value(pattern)
                .map_err(|e| ScheduleError::Validation(e.to_string()))?;
        }
        if let Some(is_enabled) = request.is_enabled {
            settings.is_enabled = is_enabled;
        }
        if let Some(period_type) = request.period_type {
            settings.period_type = period_type;
        }
        if let Some(next) = request.next_generation_date {
            settings.next_generation_date = next;
        }
        settings.updated_at = Utc::now();

        let updated = self.store.update(&settings).await?;
        debug!("Updated auto-generation settings {}", id);
        Ok(updated)
    }

    /// Disabling takes an entry out of the due set without touching its
    /// next generation date.
    pub async fn set_enabled(&self, id: Uuid, is_enabled: bool) -> ScheduleResult<AutoGenerationSettings> {
        self.update(
            id,
            UpdateAutoGenerationRequest {
                is_enabled: Some(is_enabled),
                ..UpdateAutoGenerationRequest::default()
            },
        )
        .await
    }

    pub async fn delete(&self, id: Uuid) -> ScheduleResult<()> {
        if !self.store.delete(id).await? {
            return Err(ScheduleError::NotFound(format!("Auto-generation settings {} not found", id)));
        }
        info!("Deleted auto-generation settings {}", id);
        Ok(())
    }
}
