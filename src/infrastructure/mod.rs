//! Infrastructure layer - External service implementations

pub mod cache;
pub mod credentials;
pub mod geo;
pub mod logging;
pub mod observability;
pub mod recalculation;
pub mod services;
pub mod storage;
pub mod travel;
