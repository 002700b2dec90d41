pub mod memory;
pub mod store;
pub mod supabase;

pub use memory::InMemoryStore;
pub use store::{ClinicStore, DynStore, StoreError, StoreResult};
pub use supabase::{DatabaseError, SupabaseClient, SupabaseStore};
