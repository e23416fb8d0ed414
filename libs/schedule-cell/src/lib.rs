pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;
pub mod store;
pub mod stores;

pub use error::{ScheduleError, ScheduleResult};
pub use models::*;
pub use services::*;
pub use state::ScheduleState;
