use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::{self, Body},
    extract::{Path, Query, State},
    http::{Method, Request, StatusCode},
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Value};
use tokio_test::assert_ok;
use tower::ServiceExt;
use uuid::Uuid;

use schedule_cell::handlers;
use schedule_cell::models::*;
use schedule_cell::router::schedule_routes;
use schedule_cell::services::{ScheduleStores, SchedulerConfig};
use schedule_cell::stores::{DoctorRecord, InMemoryScheduleStore};
use schedule_cell::ScheduleState;
use shared_models::error::AppError;

struct TestApp {
    store: Arc<InMemoryScheduleStore>,
    state: Arc<ScheduleState>,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(InMemoryScheduleStore::new());
        let state = Arc::new(ScheduleState::with_stores(
            ScheduleStores::from_single(store.clone()),
            2,
            SchedulerConfig {
                enabled: false,
                poll_interval_seconds: 3600,
            },
        ));
        Self { store, state }
    }

    fn router(&self) -> Router {
        Router::new().nest("/schedule", schedule_routes(self.state.clone()))
    }

    fn doctor(&self) -> Uuid {
        let doctor_id = Uuid::new_v4();
        self.store.add_doctor(DoctorRecord {
            id: doctor_id,
            hospital_id: None,
            speciality_id: None,
        });
        self.store.put_settings(pattern().for_doctor(doctor_id));
        doctor_id
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

fn pattern() -> WorkPattern {
    WorkPattern {
        work_day_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        work_day_end: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        slot_duration_minutes: 30,
        break_duration_minutes: 0,
        work_days: vec![1, 2, 3, 4, 5],
        lunch_start: None,
        lunch_end: None,
        hospital_id: None,
    }
}

fn pattern_json() -> Value {
    json!({
        "work_day_start": "09:00:00",
        "work_day_end": "12:00:00",
        "slot_duration_minutes": 30,
        "work_days": [1, 2, 3, 4, 5]
    })
}

// ==============================================================================
// GENERATION ENDPOINTS
// ==============================================================================

#[tokio::test]
async fn generate_endpoint_returns_the_result() {
    let app = TestApp::new();
    let doctor_id = app.doctor();

    let (status, body) = app
        .call(
            Method::POST,
            "/schedule/generate",
            Some(json!({
                "scope": "SelectedDoctor",
                "doctor_id": doctor_id,
                "start_date": "2024-06-03",
                "end_date": "2024-06-04"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["result"]["total_created"], json!(12));
    assert_eq!(app.store.slots_for(doctor_id).len(), 12);
}

#[tokio::test]
async fn generate_endpoint_rejects_incomplete_scope() {
    let app = TestApp::new();
    app.doctor();

    let (status, body) = app
        .call(
            Method::POST,
            "/schedule/generate",
            Some(json!({
                "scope": "SelectedHospital",
                "start_date": "2024-06-03",
                "end_date": "2024-06-04"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("hospital_id"));
    assert_eq!(app.store.write_count(), 0);
}

#[tokio::test]
async fn generate_endpoint_maps_unknown_doctor_to_404() {
    let app = TestApp::new();

    let (status, _) = app
        .call(
            Method::POST,
            "/schedule/generate",
            Some(json!({
                "scope": "SelectedDoctor",
                "doctor_id": Uuid::new_v4(),
                "start_date": "2024-06-03",
                "end_date": "2024-06-03"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn clear_and_statistics_endpoints() {
    let app = TestApp::new();
    let doctor_id = app.doctor();

    let (status, _) = app
        .call(
            Method::POST,
            "/schedule/generate",
            Some(json!({
                "scope": "SelectedDoctor",
                "doctor_id": doctor_id,
                "start_date": "2024-06-03",
                "end_date": "2024-06-03"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let first = app.store.slots_for(doctor_id)[0].id;
    app.store.book_slot(first);

    let uri = format!(
        "/schedule/doctors/{}/statistics?start_date=2024-06-03&end_date=2024-06-03",
        doctor_id
    );
    let (status, stats) = app.call(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_slots"], json!(6));
    assert_eq!(stats["booked_slots"], json!(1));
    assert_eq!(stats["busiest_weekday"], json!(1));

    let uri = format!("/schedule/doctors/{}/slots?start_date=2024-06-03&end_date=2024-06-03", doctor_id);
    let (status, cleared) = app.call(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["deleted"], json!(5));
    assert_eq!(app.store.slots_for(doctor_id).len(), 1);
}

#[tokio::test]
async fn inverted_range_is_a_bad_request() {
    let app = TestApp::new();
    let uri = format!(
        "/schedule/doctors/{}/statistics?start_date=2024-06-09&end_date=2024-06-03",
        Uuid::new_v4()
    );

    let (status, _) = app.call(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ==============================================================================
// AUTO-GENERATION SETTINGS ENDPOINTS
// ==============================================================================

#[tokio::test]
async fn auto_generation_settings_lifecycle() {
    let app = TestApp::new();
    let doctor_id = app.doctor();

    let (status, created) = app
        .call(
            Method::POST,
            "/schedule/auto-generation",
            Some(json!({
                "scope": "SelectedDoctor",
                "doctor_id": doctor_id,
                "period_type": "week",
                "next_generation_date": "2024-06-04T08:00:00Z",
                "settings": pattern_json()
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["is_enabled"], json!(true));
    let id = created["id"].as_str().unwrap().to_string();

    let (status, listed) = app.call(Method::GET, "/schedule/auto-generation", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], json!(1));

    let (status, updated) = app
        .call(
            Method::PUT,
            &format!("/schedule/auto-generation/{}", id),
            Some(json!({ "period_type": "month" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["period_type"], json!("month"));

    let (status, disabled) = app
        .call(
            Method::PATCH,
            &format!("/schedule/auto-generation/{}/enabled", id),
            Some(json!({ "is_enabled": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(disabled["is_enabled"], json!(false));
    assert_eq!(disabled["next_generation_date"], created["next_generation_date"]);

    let (status, _) = app
        .call(Method::DELETE, &format!("/schedule/auto-generation/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::GET, &format!("/schedule/auto-generation/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn creating_settings_with_bad_scope_fails() {
    let app = TestApp::new();

    let (status, _) = app
        .call(
            Method::POST,
            "/schedule/auto-generation",
            Some(json!({
                "scope": "AllHospitals",
                "doctor_id": Uuid::new_v4(),
                "period_type": "week",
                "settings": pattern_json()
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = app.call(Method::GET, "/schedule/auto-generation", None).await;
    assert_eq!(listed["total"], json!(0));
}

#[tokio::test]
async fn process_endpoint_runs_due_settings() {
    let app = TestApp::new();
    let doctor_id = app.doctor();

    let (status, _) = app
        .call(
            Method::POST,
            "/schedule/auto-generation",
            Some(json!({
                "scope": "SelectedDoctor",
                "doctor_id": doctor_id,
                "period_type": "week",
                "settings": pattern_json()
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.call(Method::POST, "/schedule/auto-generation/process", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], json!(1));
    assert!(!app.store.slots_for(doctor_id).is_empty());

    let (_, status_body) = app.call(Method::GET, "/schedule/scheduler/status", None).await;
    assert_eq!(status_body["ticks"], json!(1));
    assert_eq!(status_body["last_processed"], json!(1));
}

// ==============================================================================
// SCHEDULER LIFECYCLE ENDPOINTS
// ==============================================================================

#[tokio::test]
async fn scheduler_start_and_stop_endpoints() {
    let app = TestApp::new();

    let (_, status_body) = app.call(Method::GET, "/schedule/scheduler/status", None).await;
    assert_eq!(status_body["running"], json!(false));

    let (status, started) = app.call(Method::POST, "/schedule/scheduler/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["started"], json!(true));
    assert_eq!(started["running"], json!(true));

    let (_, again) = app.call(Method::POST, "/schedule/scheduler/start", None).await;
    assert_eq!(again["started"], json!(false));

    let (status, stopped) = app.call(Method::POST, "/schedule/scheduler/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["stopped"], json!(true));
    assert_eq!(stopped["running"], json!(false));
}

// ==============================================================================
// DIRECT HANDLER CALLS
// ==============================================================================

#[tokio::test]
async fn handlers_can_be_called_directly() {
    let app = TestApp::new();
    let doctor_id = app.doctor();

    let request = GenerateScheduleRequest {
        scope: GenerationScope::SELECTED_DOCTOR.to_string(),
        hospital_id: None,
        speciality_id: None,
        doctor_id: Some(doctor_id),
        start_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        settings: None,
        clear_existing: false,
    };

    let Json(body) = assert_ok!(handlers::generate_schedule(State(app.state.clone()), Json(request)).await);
    assert_eq!(body["result"]["total_created"], json!(6));

    let missing = handlers::get_auto_generation_settings(State(app.state.clone()), Path(Uuid::new_v4())).await;
    assert_matches!(missing, Err(AppError::NotFound(_)));

    let inverted = handlers::clear_doctor_slots(
        State(app.state.clone()),
        Path(doctor_id),
        Query(DateRangeQuery {
            start_date: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        }),
    )
    .await;
    assert_matches!(inverted, Err(AppError::ValidationError(_)));
    assert_eq!(app.store.slots_for(doctor_id).len(), 6);
}
