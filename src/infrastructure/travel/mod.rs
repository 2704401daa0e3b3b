//! Travel persistence adapters

mod in_memory_repository;
mod postgres_repository;

pub use in_memory_repository::InMemoryTravelRepository;
pub use postgres_repository::PostgresTravelRepository;
