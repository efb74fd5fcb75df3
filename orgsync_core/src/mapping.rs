//! Identity mapping between directory units and catalog units
//!
//! The mapping is loaded in full before a pass, mutated in memory by the
//! orchestrator and written back atomically. Only units confirmed to exist in
//! the catalog have an entry.

mod record;
mod store;

pub use record::{MappingEntry, MappingRecord};
pub use store::{MappingStore, MappingStoreConfig};
