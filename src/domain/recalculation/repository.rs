//! Recalculation run registry trait

use std::fmt::Debug;

use async_trait::async_trait;

use super::entity::{RecalcRun, RecalcRunId};
use crate::domain::DomainError;

/// Keeps recent runs so their status can be queried
#[async_trait]
pub trait RecalcRunRepository: Send + Sync + Debug {
    async fn get(&self, id: &RecalcRunId) -> Result<Option<RecalcRun>, DomainError>;

    /// Inserts or replaces a run
    async fn save(&self, run: &RecalcRun) -> Result<(), DomainError>;

    /// Most recently saved runs first
    async fn list_recent(&self, limit: usize) -> Result<Vec<RecalcRun>, DomainError>;
}
