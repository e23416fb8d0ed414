use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use schedule_cell::router::schedule_routes;
use schedule_cell::ScheduleState;

pub fn create_router(state: Arc<ScheduleState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic Schedule API is running!" }))
        .nest("/schedule", schedule_routes(state))
}
