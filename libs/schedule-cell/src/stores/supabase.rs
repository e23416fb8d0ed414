use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::ScheduleError;
use crate::models::{
    AutoGenerationSettings, GenerationScope, NewTimeSlot, PeriodType, ScheduleSettings, TimeSlot,
};
use crate::store::{AutoGenerationSettingsStore, DoctorDirectory, DoctorSettingsStore, TimeSlotStore};

const SETTINGS_TABLE: &str = "/rest/v1/doctor_schedule_settings";
const SLOTS_TABLE: &str = "/rest/v1/time_slots";
const DOCTORS_TABLE: &str = "/rest/v1/doctors";
const AUTO_GENERATION_TABLE: &str = "/rest/v1/auto_generation_settings";

/// Keeps `id=in.(...)` filters within sane URL lengths.
const DELETE_CHUNK_SIZE: usize = 100;

/// Matches PostgREST's default `max-rows`; a shorter page is the last one.
const SLOT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Deserialize)]
struct IdRow {
    id: Uuid,
}

fn representation_headers() -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));
    headers
}

/// PostgREST-backed implementation of every store, authorised with the
/// service-role key.
#[derive(Clone)]
pub struct SupabaseScheduleStore {
    supabase: SupabaseClient,
}

impl SupabaseScheduleStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl DoctorSettingsStore for SupabaseScheduleStore {
    async fn get_schedule_settings(&self, doctor_id: Uuid) -> Result<Option<ScheduleSettings>> {
        let path = format!("{}?doctor_id=eq.{}&limit=1", SETTINGS_TABLE, doctor_id);
        let rows: Vec<ScheduleSettings> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn settings_exist(&self, doctor_id: Uuid) -> Result<bool> {
        let path = format!("{}?doctor_id=eq.{}&select=doctor_id&limit=1", SETTINGS_TABLE, doctor_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(!rows.is_empty())
    }
}

#[async_trait]
impl TimeSlotStore for SupabaseScheduleStore {
    async fn get_slots_for_doctor_in_range(
        &self,
        doctor_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<TimeSlot>> {
        let filter = format!(
            "{}?doctor_id=eq.{}&slot_date=gte.{}&slot_date=lte.{}",
            SLOTS_TABLE, doctor_id, start_date, end_date
        );
        let mut slots = Vec::new();

        loop {
            let path = format!(
                "{}&order=slot_date.asc,start_time.asc,id.asc&limit={}&offset={}",
                filter,
                SLOT_PAGE_SIZE,
                slots.len()
            );
            let page: Vec<TimeSlot> = self.supabase.request(Method::GET, &path, None, None).await?;

            let last_page = page.len() < SLOT_PAGE_SIZE;
            slots.extend(page);
            if last_page {
                break;
            }
        }

        debug!("Read {} time slots for doctor {}", slots.len(), doctor_id);
        Ok(slots)
    }

    async fn bulk_create(&self, slots: &[NewTimeSlot]) -> Result<()> {
        if slots.is_empty() {
            return Ok(());
        }

        // A single array insert runs in one transaction.
        let body = serde_json::to_value(slots)?;
        self.supabase.execute(Method::POST, SLOTS_TABLE, None, Some(body)).await?;

        debug!("Inserted {} time slots", slots.len());
        Ok(())
    }

    async fn bulk_delete(&self, slot_ids: &[Uuid]) -> Result<()> {
        for chunk in slot_ids.chunks(DELETE_CHUNK_SIZE) {
            let ids = chunk
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");

            // The availability filter keeps booked rows out of reach; a row
            // booked since the read comes back missing from the result.
            let path = format!("{}?id=in.({})&is_available=eq.true&select=id", SLOTS_TABLE, ids);
            let removed: Vec<IdRow> = self
                .supabase
                .request_with_headers(Method::DELETE, &path, None, None, Some(representation_headers()))
                .await?;

            if removed.len() != chunk.len() {
                return Err(ScheduleError::InvariantViolation(format!(
                    "deleted {} of {} time slots; the rest were booked or removed since they were read",
                    removed.len(),
                    chunk.len()
                ))
                .into());
            }
        }

        debug!("Deleted {} time slots", slot_ids.len());
        Ok(())
    }

    async fn delete_available_slots_in_range(
        &self,
        doctor_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<usize> {
        let path = format!(
            "{}?doctor_id=eq.{}&is_available=eq.true&slot_date=gte.{}&slot_date=lte.{}&select=id",
            SLOTS_TABLE, doctor_id, start_date, end_date
        );

        let removed: Vec<IdRow> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, None, None, Some(representation_headers()))
            .await?;

        Ok(removed.len())
    }
}

#[async_trait]
impl DoctorDirectory for SupabaseScheduleStore {
    async fn resolve_doctors(&self, scope: &GenerationScope) -> Result<Vec<Uuid>> {
        let filter = match scope {
            GenerationScope::AllHospitals => String::new(),
            GenerationScope::SelectedHospital { hospital_id } => {
                format!("&hospital_id=eq.{}", hospital_id)
            }
            GenerationScope::SelectedSpeciality { speciality_id, hospital_id } => {
                let mut filter = format!("&speciality_id=eq.{}", speciality_id);
                if let Some(hospital_id) = hospital_id {
                    filter.push_str(&format!("&hospital_id=eq.{}", hospital_id));
                }
                filter
            }
            GenerationScope::SelectedDoctor { doctor_id } => format!("&id=eq.{}", doctor_id),
        };

        let path = format!("{}?select=id{}&order=id.asc", DOCTORS_TABLE, filter);
        let rows: Vec<IdRow> = self.supabase.request(Method::GET, &path, None, None).await?;

        Ok(rows.into_iter().map(|row| row.id).collect())
    }
}

/// Flat row shape of `auto_generation_settings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoGenerationRow {
    pub id: Uuid,
    pub is_enabled: bool,
    pub scope: String,
    pub hospital_id: Option<Uuid>,
    pub speciality_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub period_type: String,
    pub next_generation_date: DateTime<Utc>,
    pub settings_payload: Value,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AutoGenerationRow> for AutoGenerationSettings {
    type Error = ScheduleError;

    fn try_from(row: AutoGenerationRow) -> Result<Self, Self::Error> {
        let scope = GenerationScope::from_parts(&row.scope, row.hospital_id, row.speciality_id, row.doctor_id)?;
        let period_type: PeriodType = row.period_type.parse()?;

        Ok(AutoGenerationSettings {
            id: row.id,
            is_enabled: row.is_enabled,
            scope,
            period_type,
            next_generation_date: row.next_generation_date,
            settings_payload: row.settings_payload,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&AutoGenerationSettings> for AutoGenerationRow {
    fn from(settings: &AutoGenerationSettings) -> Self {
        let (scope, hospital_id, speciality_id, doctor_id) = settings.scope.to_parts();
        Self {
            id: settings.id,
            is_enabled: settings.is_enabled,
            scope: scope.to_string(),
            hospital_id,
            speciality_id,
            doctor_id,
            period_type: settings.period_type.as_str().to_string(),
            next_generation_date: settings.next_generation_date,
            settings_payload: settings.settings_payload.clone(),
            created_by: settings.created_by,
            created_at: settings.created_at,
            updated_at: settings.updated_at,
        }
    }
}

/// Rows that do not convert are logged and left alone, so they stay due and
/// never advance until someone fixes them.
fn convert_rows(rows: Vec<AutoGenerationRow>) -> Vec<AutoGenerationSettings> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            match AutoGenerationSettings::try_from(row) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    warn!("Skipping malformed auto-generation settings {}: {}", id, e);
                    None
                }
            }
        })
        .collect()
}

fn convert_single(rows: Vec<AutoGenerationRow>) -> Result<AutoGenerationSettings> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Supabase returned no auto-generation settings row"))?;
    AutoGenerationSettings::try_from(row).map_err(|e| anyhow!(e))
}

#[async_trait]
impl AutoGenerationSettingsStore for SupabaseScheduleStore {
    async fn get_due_settings(&self, now: DateTime<Utc>) -> Result<Vec<AutoGenerationSettings>> {
        let path = format!(
            "{}?is_enabled=eq.true&next_generation_date=lte.{}&order=next_generation_date.asc",
            AUTO_GENERATION_TABLE,
            urlencoding::encode(&now.to_rfc3339())
        );
        let rows: Vec<AutoGenerationRow> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(convert_rows(rows))
    }

    async fn update_next_generation_date(&self, id: Uuid, next: DateTime<Utc>) -> Result<bool> {
        let path = format!("{}?id=eq.{}", AUTO_GENERATION_TABLE, id);
        let body = json!({
            "next_generation_date": next.to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, None, Some(body), Some(representation_headers()))
            .await?;

        Ok(!rows.is_empty())
    }

    async fn list(&self) -> Result<Vec<AutoGenerationSettings>> {
        let path = format!("{}?order=created_at.asc", AUTO_GENERATION_TABLE);
        let rows: Vec<AutoGenerationRow> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(convert_rows(rows))
    }

    async fn get(&self, id: Uuid) -> Result<Option<AutoGenerationSettings>> {
        let path = format!("{}?id=eq.{}&limit=1", AUTO_GENERATION_TABLE, id);
        let rows: Vec<AutoGenerationRow> = self.supabase.request(Method::GET, &path, None, None).await?;

        match rows.into_iter().next() {
            Some(row) => Ok(Some(AutoGenerationSettings::try_from(row).map_err(|e| anyhow!(e))?)),
            None => Ok(None),
        }
    }

    async fn create(&self, settings: &AutoGenerationSettings) -> Result<AutoGenerationSettings> {
        let body = serde_json::to_value(AutoGenerationRow::from(settings))?;
        let rows: Vec<AutoGenerationRow> = self
            .supabase
            .request_with_headers(
                Method::POST,
                AUTO_GENERATION_TABLE,
                None,
                Some(body),
                Some(representation_headers()),
            )
            .await?;

        convert_single(rows)
    }

    async fn update(&self, settings: &AutoGenerationSettings) -> Result<AutoGenerationSettings> {
        let path = format!("{}?id=eq.{}", AUTO_GENERATION_TABLE, settings.id);
        let body = serde_json::to_value(AutoGenerationRow::from(settings))?;
        let rows: Vec<AutoGenerationRow> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, None, Some(body), Some(representation_headers()))
            .await?;

        convert_single(rows)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let path = format!("{}?id=eq.{}", AUTO_GENERATION_TABLE, id);
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, None, None, Some(representation_headers()))
            .await?;

        Ok(!rows.is_empty())
    }
}
