use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScheduleError;

/// Longest range a single generation call may cover.
pub const MAX_GENERATION_DAYS: i64 = 366;

/// Upper bound for slot and break durations.
pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// (date, time-of-day) identity of a slot within one doctor's calendar.
pub type SlotKey = (NaiveDate, NaiveTime);

// ==============================================================================
// WORK PATTERN / SCHEDULE SETTINGS
// ==============================================================================

/// Recurring work pattern without a doctor attached. Used as the request
/// override and as the payload stored on auto-generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPattern {
    pub work_day_start: NaiveTime,
    pub work_day_end: NaiveTime,
    pub slot_duration_minutes: i32,
    #[serde(default)]
    pub break_duration_minutes: i32,
    pub work_days: Vec<i32>, // 0 = Sunday, 1 = Monday, etc.
    #[serde(default)]
    pub lunch_start: Option<NaiveTime>,
    #[serde(default)]
    pub lunch_end: Option<NaiveTime>,
    #[serde(default)]
    pub hospital_id: Option<Uuid>,
}

impl WorkPattern {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.slot_duration_minutes <= 0 {
            return Err(ScheduleError::Validation(
                "Slot duration must be greater than zero".to_string(),
            ));
        }
        if self.break_duration_minutes < 0 {
            return Err(ScheduleError::Validation(
                "Break duration cannot be negative".to_string(),
            ));
        }
        if self.slot_duration_minutes > MINUTES_PER_DAY || self.break_duration_minutes > MINUTES_PER_DAY {
            return Err(ScheduleError::Validation(format!(
                "Slot and break durations must not exceed {} minutes",
                MINUTES_PER_DAY
            )));
        }
        if self.work_day_start >= self.work_day_end {
            return Err(ScheduleError::Validation(
                "Workday start must be before workday end".to_string(),
            ));
        }
        if let Some(day) = self.work_days.iter().find(|d| !(0..=6).contains(*d)) {
            return Err(ScheduleError::Validation(format!(
                "Work day {} out of range, expected 0 (Sunday) to 6 (Saturday)",
                day
            )));
        }

        match (self.lunch_start, self.lunch_end) {
            (None, None) => {}
            (Some(lunch_start), Some(lunch_end)) => {
                if lunch_start >= lunch_end {
                    return Err(ScheduleError::Validation(
                        "Lunch start must be before lunch end".to_string(),
                    ));
                }
                if lunch_start < self.work_day_start || lunch_end > self.work_day_end {
                    return Err(ScheduleError::Validation(
                        "Lunch break must fall within the workday".to_string(),
                    ));
                }
            }
            _ => {
                return Err(ScheduleError::Validation(
                    "Lunch start and lunch end must be set together".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn works_on(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday().num_days_from_sunday() as i32;
        self.work_days.contains(&weekday)
    }

    pub fn lunch_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        match (self.lunch_start, self.lunch_end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    pub fn for_doctor(&self, doctor_id: Uuid) -> ScheduleSettings {
        ScheduleSettings {
            doctor_id,
            pattern: self.clone(),
        }
    }

    /// Parses a stored JSON payload and validates it.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, ScheduleError> {
        let pattern: WorkPattern = serde_json::from_value(payload.clone()).map_err(|e| {
            ScheduleError::Validation(format!("Invalid schedule settings payload: {}", e))
        })?;
        pattern.validate()?;
        Ok(pattern)
    }
}

/// Per-doctor schedule settings as kept by the doctor settings store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    pub doctor_id: Uuid,
    #[serde(flatten)]
    pub pattern: WorkPattern,
}

impl ScheduleSettings {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        self.pattern.validate()
    }
}

// ==============================================================================
// TIME SLOTS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub hospital_id: Option<Uuid>,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

impl TimeSlot {
    pub fn key(&self) -> SlotKey {
        (self.slot_date, self.start_time)
    }

    pub fn end_time(&self) -> NaiveTime {
        self.start_time + Duration::minutes(self.duration_minutes as i64)
    }

    pub fn is_booked(&self) -> bool {
        !self.is_available
    }
}

/// Insert payload for the time slot store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTimeSlot {
    pub doctor_id: Uuid,
    pub hospital_id: Option<Uuid>,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
    pub is_available: bool,
}

impl NewTimeSlot {
    pub fn key(&self) -> SlotKey {
        (self.slot_date, self.start_time)
    }
}

/// A slot computed from a work pattern, not yet reconciled against storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub doctor_id: Uuid,
    pub hospital_id: Option<Uuid>,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
}

impl CandidateSlot {
    pub fn key(&self) -> SlotKey {
        (self.slot_date, self.start_time)
    }

    pub fn end_time(&self) -> NaiveTime {
        self.start_time + Duration::minutes(self.duration_minutes as i64)
    }

    pub fn to_new_slot(&self) -> NewTimeSlot {
        NewTimeSlot {
            doctor_id: self.doctor_id,
            hospital_id: self.hospital_id,
            slot_date: self.slot_date,
            start_time: self.start_time,
            duration_minutes: self.duration_minutes,
            is_available: true,
        }
    }
}

// ==============================================================================
// SCOPE / PERIOD
// ==============================================================================

/// Which doctors a generation run applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GenerationScope {
    AllHospitals,
    SelectedHospital {
        hospital_id: Uuid,
    },
    SelectedSpeciality {
        speciality_id: Uuid,
        hospital_id: Option<Uuid>,
    },
    SelectedDoctor {
        doctor_id: Uuid,
    },
}

impl GenerationScope {
    pub const ALL_HOSPITALS: &'static str = "AllHospitals";
    pub const SELECTED_HOSPITAL: &'static str = "SelectedHospital";
    pub const SELECTED_SPECIALITY: &'static str = "SelectedSpeciality";
    pub const SELECTED_DOCTOR: &'static str = "SelectedDoctor";

    /// Builds a scope from loosely typed fields (request bodies, store rows).
    /// Fails when the kind is unknown, the id the kind needs is missing, or
    /// an id that does not belong to the kind is populated.
    pub fn from_parts(
        kind: &str,
        hospital_id: Option<Uuid>,
        speciality_id: Option<Uuid>,
        doctor_id: Option<Uuid>,
    ) -> Result<Self, ScheduleError> {
        let normalized: String = kind
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        let unexpected = |field: &str| {
            ScheduleError::InvalidScope(format!("{} must not be set for scope {}", field, kind))
        };
        let missing = |field: &str| {
            ScheduleError::InvalidScope(format!("{} is required for scope {}", field, kind))
        };

        match normalized.as_str() {
            "allhospitals" => {
                if hospital_id.is_some() {
                    return Err(unexpected("hospital_id"));
                }
                if speciality_id.is_some() {
                    return Err(unexpected("speciality_id"));
                }
                if doctor_id.is_some() {
                    return Err(unexpected("doctor_id"));
                }
                Ok(GenerationScope::AllHospitals)
            }
            "selectedhospital" => {
                if speciality_id.is_some() {
                    return Err(unexpected("speciality_id"));
                }
                if doctor_id.is_some() {
                    return Err(unexpected("doctor_id"));
                }
                let hospital_id = hospital_id.ok_or_else(|| missing("hospital_id"))?;
                Ok(GenerationScope::SelectedHospital { hospital_id })
            }
            "selectedspeciality" | "selectedspecialty" => {
                if doctor_id.is_some() {
                    return Err(unexpected("doctor_id"));
                }
                let speciality_id = speciality_id.ok_or_else(|| missing("speciality_id"))?;
                Ok(GenerationScope::SelectedSpeciality {
                    speciality_id,
                    hospital_id,
                })
            }
            "selecteddoctor" => {
                if hospital_id.is_some() {
                    return Err(unexpected("hospital_id"));
                }
                if speciality_id.is_some() {
                    return Err(unexpected("speciality_id"));
                }
                let doctor_id = doctor_id.ok_or_else(|| missing("doctor_id"))?;
                Ok(GenerationScope::SelectedDoctor { doctor_id })
            }
            _ => Err(ScheduleError::InvalidScope(format!(
                "Unknown scope '{}'",
                kind
            ))),
        }
    }

    /// Inverse of `from_parts`: (kind, hospital_id, speciality_id, doctor_id).
    pub fn to_parts(&self) -> (&'static str, Option<Uuid>, Option<Uuid>, Option<Uuid>) {
        match self {
            GenerationScope::AllHospitals => (Self::ALL_HOSPITALS, None, None, None),
            GenerationScope::SelectedHospital { hospital_id } => {
                (Self::SELECTED_HOSPITAL, Some(*hospital_id), None, None)
            }
            GenerationScope::SelectedSpeciality {
                speciality_id,
                hospital_id,
            } => (Self::SELECTED_SPECIALITY, *hospital_id, Some(*speciality_id), None),
            GenerationScope::SelectedDoctor { doctor_id } => {
                (Self::SELECTED_DOCTOR, None, None, Some(*doctor_id))
            }
        }
    }
}

impl fmt::Display for GenerationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationScope::AllHospitals => write!(f, "all hospitals"),
            GenerationScope::SelectedHospital { hospital_id } => {
                write!(f, "hospital {}", hospital_id)
            }
            GenerationScope::SelectedSpeciality {
                speciality_id,
                hospital_id: Some(hospital_id),
            } => write!(f, "speciality {} at hospital {}", speciality_id, hospital_id),
            GenerationScope::SelectedSpeciality { speciality_id, .. } => {
                write!(f, "speciality {}", speciality_id)
            }
            GenerationScope::SelectedDoctor { doctor_id } => write!(f, "doctor {}", doctor_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Week,
    Month,
    Year,
}

impl PeriodType {
    /// How many days one run generates, and how far the next run moves.
    pub fn days(&self) -> i64 {
        match self {
            PeriodType::Week => 7,
            PeriodType::Month => 30,
            PeriodType::Year => 365,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Week => "week",
            PeriodType::Month => "month",
            PeriodType::Year => "year",
        }
    }
}

impl FromStr for PeriodType {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(PeriodType::Week),
            "month" => Ok(PeriodType::Month),
            "year" => Ok(PeriodType::Year),
            other => Err(ScheduleError::Validation(format!(
                "Unknown period type '{}'",
                other
            ))),
        }
    }
}

// ==============================================================================
// AUTO-GENERATION SETTINGS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoGenerationSettings {
    pub id: Uuid,
    pub is_enabled: bool,
    pub scope: GenerationScope,
    pub period_type: PeriodType,
    pub next_generation_date: DateTime<Utc>,
    pub settings_payload: serde_json::Value,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AutoGenerationSettings {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_enabled && self.next_generation_date <= now
    }

    pub fn work_pattern(&self) -> Result<WorkPattern, ScheduleError> {
        WorkPattern::from_payload(&self.settings_payload)
    }

    /// Inclusive date range a run starting on `today` covers.
    pub fn generation_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (today, today + Duration::days(self.period_type.days() - 1))
    }

    /// Next run date after a successful run on `today`, keeping the
    /// configured time of day.
    pub fn advanced_next_date(&self, today: NaiveDate) -> DateTime<Utc> {
        let next_day = today + Duration::days(self.period_type.days());
        next_day
            .and_time(self.next_generation_date.time())
            .and_utc()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAutoGenerationRequest {
    pub is_enabled: Option<bool>,
    pub scope: String,
    pub hospital_id: Option<Uuid>,
    pub speciality_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub period_type: PeriodType,
    pub next_generation_date: Option<DateTime<Utc>>,
    pub settings: WorkPattern,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAutoGenerationRequest {
    pub is_enabled: Option<bool>,
    pub scope: Option<String>,
    pub hospital_id: Option<Uuid>,
    pub speciality_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub period_type: Option<PeriodType>,
    pub next_generation_date: Option<DateTime<Utc>>,
    pub settings: Option<WorkPattern>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetEnabledRequest {
    pub is_enabled: bool,
}

// ==============================================================================
// GENERATION REQUEST / RESULT
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub scope: GenerationScope,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub settings_override: Option<WorkPattern>,
    pub clear_existing: bool,
}

impl GenerationRequest {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.start_date > self.end_date {
            return Err(ScheduleError::Validation(
                "Start date must not be after end date".to_string(),
            ));
        }

        let days = (self.end_date - self.start_date).num_days() + 1;
        if days > MAX_GENERATION_DAYS {
            return Err(ScheduleError::Validation(format!(
                "Date range covers {} days, at most {} allowed",
                days, MAX_GENERATION_DAYS
            )));
        }

        if let Some(pattern) = &self.settings_override {
            pattern.validate()?;
        }

        Ok(())
    }
}

/// Body of the generate-now endpoint, scope fields still loose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateScheduleRequest {
    pub scope: String,
    pub hospital_id: Option<Uuid>,
    pub speciality_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub settings: Option<WorkPattern>,
    #[serde(default)]
    pub clear_existing: bool,
}

impl TryFrom<GenerateScheduleRequest> for GenerationRequest {
    type Error = ScheduleError;

    fn try_from(body: GenerateScheduleRequest) -> Result<Self, Self::Error> {
        let scope = GenerationScope::from_parts(
            &body.scope,
            body.hospital_id,
            body.speciality_id,
            body.doctor_id,
        )?;

        Ok(GenerationRequest {
            scope,
            start_date: body.start_date,
            end_date: body.end_date,
            settings_override: body.settings,
            clear_existing: body.clear_existing,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoctorGenerationOutcome {
    pub created: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: bool,
    pub error: Option<String>,
}

impl DoctorGenerationOutcome {
    pub fn succeeded(created: usize, deleted: usize, skipped: usize) -> Self {
        Self {
            created,
            deleted,
            skipped,
            failed: false,
            error: None,
        }
    }

    pub fn failed(error: &ScheduleError) -> Self {
        Self {
            failed: true,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub doctors_processed: usize,
    pub doctors_failed: usize,
    pub total_created: usize,
    pub total_deleted: usize,
    pub total_skipped: usize,
    pub outcomes: BTreeMap<Uuid, DoctorGenerationOutcome>,
}

impl GenerationResult {
    pub fn from_outcomes(
        start_date: NaiveDate,
        end_date: NaiveDate,
        outcomes: BTreeMap<Uuid, DoctorGenerationOutcome>,
    ) -> Self {
        Self {
            start_date,
            end_date,
            doctors_processed: outcomes.len(),
            doctors_failed: outcomes.values().filter(|o| o.failed).count(),
            total_created: outcomes.values().map(|o| o.created).sum(),
            total_deleted: outcomes.values().map(|o| o.deleted).sum(),
            total_skipped: outcomes.values().map(|o| o.skipped).sum(),
            outcomes,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.doctors_failed > 0 && self.doctors_failed < self.doctors_processed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRangeQuery {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.start_date > self.end_date {
            return Err(ScheduleError::Validation(
                "Start date must not be after end date".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn pattern() -> WorkPattern {
        WorkPattern {
            work_day_start: time(9, 0),
            work_day_end: time(17, 0),
            slot_duration_minutes: 30,
            break_duration_minutes: 0,
            work_days: vec![1, 2, 3, 4, 5],
            lunch_start: Some(time(12, 0)),
            lunch_end: Some(time(13, 0)),
            hospital_id: None,
        }
    }

    #[test]
    fn test_valid_pattern() {
        assert!(pattern().validate().is_ok());
    }

    #[test]
    fn test_pattern_rejects_half_lunch() {
        let mut p = pattern();
        p.lunch_end = None;
        assert!(matches!(p.validate(), Err(ScheduleError::Validation(_))));
    }

    #[test]
    fn test_pattern_rejects_durations_longer_than_a_day() {
        let mut p = pattern();
        p.break_duration_minutes = i32::MAX;
        assert!(matches!(p.validate(), Err(ScheduleError::Validation(_))));

        let mut p = pattern();
        p.slot_duration_minutes = i32::MAX;
        assert!(matches!(p.validate(), Err(ScheduleError::Validation(_))));

        let mut p = pattern();
        p.slot_duration_minutes = MINUTES_PER_DAY + 1;
        assert!(p.validate().is_err());

        let mut p = pattern();
        p.break_duration_minutes = MINUTES_PER_DAY;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_pattern_rejects_lunch_outside_workday() {
        let mut p = pattern();
        p.lunch_start = Some(time(8, 0));
        assert!(p.validate().is_err());

        let mut p = pattern();
        p.lunch_end = Some(time(17, 30));
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_pattern_rejects_bad_durations_and_days() {
        let mut p = pattern();
        p.slot_duration_minutes = 0;
        assert!(p.validate().is_err());

        let mut p = pattern();
        p.break_duration_minutes = -5;
        assert!(p.validate().is_err());

        let mut p = pattern();
        p.work_days = vec![1, 7];
        assert!(p.validate().is_err());

        let mut p = pattern();
        p.work_day_end = p.work_day_start;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_works_on_uses_sunday_zero() {
        let p = pattern();
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert!(p.works_on(monday));
        assert!(!p.works_on(sunday));
    }

    #[test]
    fn test_settings_flatten_roundtrip_from_row() {
        let doctor_id = Uuid::new_v4();
        let row = serde_json::json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "work_day_start": "09:00:00",
            "work_day_end": "12:00:00",
            "slot_duration_minutes": 30,
            "break_duration_minutes": 0,
            "work_days": [1, 2, 3, 4, 5],
            "lunch_start": null,
            "lunch_end": null,
            "hospital_id": null
        });
        let settings: ScheduleSettings = serde_json::from_value(row).unwrap();
        assert_eq!(settings.doctor_id, doctor_id);
        assert_eq!(settings.pattern.work_day_end, time(12, 0));
        assert!(settings.pattern.lunch_window().is_none());
    }

    #[test]
    fn test_scope_from_parts() {
        let id = Uuid::new_v4();
        assert_eq!(
            GenerationScope::from_parts("AllHospitals", None, None, None).unwrap(),
            GenerationScope::AllHospitals
        );
        assert_eq!(
            GenerationScope::from_parts("selected_hospital", Some(id), None, None).unwrap(),
            GenerationScope::SelectedHospital { hospital_id: id }
        );
        assert_eq!(
            GenerationScope::from_parts("SelectedSpecialty", Some(id), Some(id), None).unwrap(),
            GenerationScope::SelectedSpeciality {
                speciality_id: id,
                hospital_id: Some(id)
            }
        );
        assert_eq!(
            GenerationScope::from_parts("SelectedDoctor", None, None, Some(id)).unwrap(),
            GenerationScope::SelectedDoctor { doctor_id: id }
        );
    }

    #[test]
    fn test_scope_from_parts_rejects_inconsistent_ids() {
        let id = Uuid::new_v4();
        for (kind, h, s, d) in [
            ("SelectedHospital", None, None, None),
            ("SelectedSpeciality", Some(id), None, None),
            ("SelectedDoctor", None, None, None),
            ("SelectedDoctor", Some(id), None, Some(id)),
            ("AllHospitals", Some(id), None, None),
            ("Everything", None, None, None),
        ] {
            let result = GenerationScope::from_parts(kind, h, s, d);
            assert!(
                matches!(result, Err(ScheduleError::InvalidScope(_))),
                "{} should be rejected",
                kind
            );
        }
    }

    #[test]
    fn test_scope_parts_are_inverse() {
        let scope = GenerationScope::SelectedSpeciality {
            speciality_id: Uuid::new_v4(),
            hospital_id: None,
        };
        let (kind, h, s, d) = scope.to_parts();
        assert_eq!(GenerationScope::from_parts(kind, h, s, d).unwrap(), scope);
    }

    #[test]
    fn test_period_type_parse() {
        assert_eq!("Week".parse::<PeriodType>().unwrap(), PeriodType::Week);
        assert_eq!(" month ".parse::<PeriodType>().unwrap().days(), 30);
        assert!("fortnight".parse::<PeriodType>().is_err());
    }

    #[test]
    fn test_advanced_next_date_keeps_time_of_day() {
        let now = Utc::now();
        let settings = AutoGenerationSettings {
            id: Uuid::new_v4(),
            is_enabled: true,
            scope: GenerationScope::AllHospitals,
            period_type: PeriodType::Week,
            next_generation_date: NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_opt(2, 30, 0)
                .unwrap()
                .and_utc(),
            settings_payload: serde_json::to_value(pattern()).unwrap(),
            created_by: None,
            created_at: now,
            updated_at: now,
        };

        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let next = settings.advanced_next_date(today);
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        assert_eq!(next.time(), time(2, 30));

        let (start, end) = settings.generation_range(today);
        assert_eq!(start, today);
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
    }

    #[test]
    fn test_generation_request_range_validation() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut request = GenerationRequest {
            scope: GenerationScope::AllHospitals,
            start_date: start,
            end_date: start,
            settings_override: None,
            clear_existing: false,
        };
        assert!(request.validate().is_ok());

        request.end_date = start - Duration::days(1);
        assert!(request.validate().is_err());

        request.end_date = start + Duration::days(MAX_GENERATION_DAYS);
        assert!(request.validate().is_err());
    }
}
