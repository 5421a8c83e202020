//! Profile boundary: application-level user records and their store

mod memory;
mod postgrest;
mod store;
mod types;

pub use memory::MemoryProfileStore;
pub use postgrest::PostgrestProfileStore;
pub use store::ProfileStore;
pub use types::{Household, Profile, Role};
