//! Geo Travel Engine
//!
//! Geocoding and distance lookups against Google Maps behind a three-tier
//! cache (in-process, Redis, PostgreSQL), travel cost pricing for
//! professionals and bulk recomputation of stored travel info when an
//! address changes.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod infrastructure;

pub use config::AppConfig;
pub use engine::{EngineParts, GeoEngine};
