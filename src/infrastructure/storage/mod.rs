//! Storage infrastructure - PostgreSQL pool and schema migrations

pub mod migrations;
mod postgres;

pub use migrations::{engine_migrations, run_migrations, Migration};
pub use postgres::{connect_pool, DatabaseConfig};
