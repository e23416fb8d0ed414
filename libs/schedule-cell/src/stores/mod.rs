pub mod memory;
pub mod supabase;

pub use memory::{DoctorRecord, InMemoryScheduleStore};
pub use supabase::SupabaseScheduleStore;
