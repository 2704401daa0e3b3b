//! Recalculation run registry

mod in_memory_repository;

pub use in_memory_repository::{InMemoryRecalcRunRepository, DEFAULT_RUN_RETENTION};
