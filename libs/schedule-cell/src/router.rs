use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::handlers;
use crate::state::ScheduleState;

pub fn schedule_routes(state: Arc<ScheduleState>) -> Router {
    let generation_routes = Router::new()
        .route("/generate", post(handlers::generate_schedule))
        .route("/doctors/{doctor_id}/slots", delete(handlers::clear_doctor_slots))
        .route("/doctors/{doctor_id}/statistics", get(handlers::get_doctor_statistics));

    let auto_generation_routes = Router::new()
        .route(
            "/auto-generation",
            get(handlers::list_auto_generation_settings).post(handlers::create_auto_generation_settings),
        )
        .route("/auto-generation/process", post(handlers::process_due_generations))
        .route(
            "/auto-generation/{settings_id}",
            get(handlers::get_auto_generation_settings)
                .put(handlers::update_auto_generation_settings)
                .delete(handlers::delete_auto_generation_settings),
        )
        .route("/auto-generation/{settings_id}/enabled", patch(handlers::set_auto_generation_enabled))

        // Background scheduler lifecycle
        .route("/scheduler/status", get(handlers::get_scheduler_status))
        .route("/scheduler/start", post(handlers::start_scheduler))
        .route("/scheduler/stop", post(handlers::stop_scheduler));

    Router::new()
        .merge(generation_routes)
        .merge(auto_generation_routes)
        .with_state(state)
}
