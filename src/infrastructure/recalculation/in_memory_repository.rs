//! In-memory recalculation run registry with bounded retention

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::error::DomainError;
use crate::domain::recalculation::{RecalcRun, RecalcRunId, RecalcRunRepository};

/// Runs kept when no explicit retention is configured
pub const DEFAULT_RUN_RETENTION: usize = 500;

#[derive(Debug, Default)]
struct Registry {
    runs: HashMap<String, RecalcRun>,
    /// Insertion order, oldest first
    order: VecDeque<String>,
}

/// Keeps the most recent runs; the oldest is evicted once `capacity` is reached
#[derive(Debug)]
pub struct InMemoryRecalcRunRepository {
    registry: Arc<RwLock<Registry>>,
    capacity: usize,
}

impl InMemoryRecalcRunRepository {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RUN_RETENTION)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            capacity: capacity.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.registry.read().await.runs.len()
    }
}

impl Default for InMemoryRecalcRunRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecalcRunRepository for InMemoryRecalcRunRepository {
    async fn get(&self, id: &RecalcRunId) -> Result<Option<RecalcRun>, DomainError> {
        let registry = self.registry.read().await;
        Ok(registry.runs.get(id.as_str()).cloned())
    }

    async fn save(&self, run: &RecalcRun) -> Result<(), DomainError> {
        let mut registry = self.registry.write().await;
        let id = run.id.as_str().to_string();

        if registry.runs.insert(id.clone(), run.clone()).is_none() {
            registry.order.push_back(id);

            while registry.order.len() > self.capacity {
                if let Some(oldest) = registry.order.pop_front() {
                    registry.runs.remove(&oldest);
                }
            }
        }

        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<RecalcRun>, DomainError> {
        let registry = self.registry.read().await;

        Ok(registry
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| registry.runs.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recalculation::{RecalcState, RecalcTrigger};
    use chrono::Utc;

    fn run(professional: &str) -> RecalcRun {
        RecalcRun::new(RecalcTrigger::Manual {
            professional_id: professional.to_string(),
        })
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let repo = InMemoryRecalcRunRepository::new();
        let mut run = run("p1");

        repo.save(&run).await.unwrap();
        run.start(Utc::now()).unwrap();
        repo.save(&run).await.unwrap();

        let stored = repo.get(&run.id).await.unwrap().unwrap();
        assert_eq!(stored.state, RecalcState::Running);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_oldest_run_evicted() {
        let repo = InMemoryRecalcRunRepository::with_capacity(2);
        let first = run("p1");
        let second = run("p2");
        let third = run("p3");

        for r in [&first, &second, &third] {
            repo.save(r).await.unwrap();
        }

        assert!(repo.get(&first.id).await.unwrap().is_none());
        assert!(repo.get(&third.id).await.unwrap().is_some());
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let repo = InMemoryRecalcRunRepository::new();
        let first = run("p1");
        let second = run("p2");
        repo.save(&first).await.unwrap();
        repo.save(&second).await.unwrap();

        let recent = repo.list_recent(1).await.unwrap();

        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, second.id);
    }
}
