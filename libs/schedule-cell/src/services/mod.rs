pub mod allocator;
pub mod auto_generation;
pub mod auto_settings;
pub mod generator;
pub mod schedule;
pub mod statistics;

pub use allocator::{ReconcilePlan, SlotAllocator};
pub use auto_generation::{AutoGenerationScheduler, SchedulerConfig, SchedulerStatus, TickOutcome};
pub use auto_settings::AutoGenerationSettingsService;
pub use generator::SlotGenerator;
pub use schedule::{ScheduleService, ScheduleStores};
pub use statistics::{DayOccupancy, ScheduleStatistics, StatisticsProjector};
