//! Cache statistics and cleanup reports

use serde::{Deserialize, Serialize};

use super::repository::TierKind;

/// Cost of one paid upstream call in euros, used to estimate savings
pub const UPSTREAM_CALL_COST_EUR: f64 = 0.007;

/// Hits per tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBreakdown {
    pub memory: u64,
    pub shared: u64,
    pub durable: u64,
}

impl TierBreakdown {
    pub fn total(&self) -> u64 {
        self.memory + self.shared + self.durable
    }

    pub fn get(&self, tier: TierKind) -> u64 {
        match tier {
            TierKind::Memory => self.memory,
            TierKind::Shared => self.shared,
            TierKind::Durable => self.durable,
        }
    }
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_operations: u64,
    pub hits: TierBreakdown,
    pub misses: u64,
    /// Hits over lookups, in `[0, 1]`
    pub hit_rate: f64,
    /// Euros not spent on upstream calls thanks to hits
    pub estimated_api_savings: f64,
    /// Tier failures swallowed since start
    pub tier_errors: u64,
    /// Entries currently held in memory
    pub memory_entries: u64,
}

impl CacheStats {
    pub fn new(hits: TierBreakdown, misses: u64, tier_errors: u64, memory_entries: u64) -> Self {
        let total_hits = hits.total();
        let total_operations = total_hits + misses;
        let hit_rate = if total_operations == 0 {
            0.0
        } else {
            total_hits as f64 / total_operations as f64
        };

        Self {
            total_operations,
            hits,
            misses,
            hit_rate,
            estimated_api_savings: total_hits as f64 * UPSTREAM_CALL_COST_EUR,
            tier_errors,
            memory_entries,
        }
    }
}

/// Per-tier outcome of a cleanup pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCleanup {
    pub tier: TierKind,
    pub items_removed: u64,
    pub bytes_freed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of purging expired entries from the slower tiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub items_removed: u64,
    pub bytes_freed: u64,
    pub tiers: Vec<TierCleanup>,
}

impl CleanupReport {
    pub fn record(&mut self, tier: TierCleanup) {
        self.items_removed += tier.items_removed;
        self.bytes_freed += tier.bytes_freed;
        self.tiers.push(tier);
    }

    pub fn errors(&self) -> Vec<String> {
        self.tiers
            .iter()
            .filter_map(|t| t.error.as_ref().map(|e| format!("{}: {}", t.tier, e)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_hit_rate_and_savings() {
        let hits = TierBreakdown {
            memory: 6,
            shared: 2,
            durable: 0,
        };
        let stats = CacheStats::new(hits, 2, 0, 6);

        assert_eq!(stats.total_operations, 10);
        assert!((stats.hit_rate - 0.8).abs() < f64::EPSILON);
        assert!((stats.estimated_api_savings - 0.056).abs() < 1e-9);
    }

    #[test]
    fn test_empty_stats() {
        let stats = CacheStats::new(TierBreakdown::default(), 0, 0, 0);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn test_cleanup_report_aggregates() {
        let mut report = CleanupReport::default();
        report.record(TierCleanup {
            tier: TierKind::Shared,
            items_removed: 3,
            bytes_freed: 120,
            error: None,
        });
        report.record(TierCleanup {
            tier: TierKind::Durable,
            items_removed: 0,
            bytes_freed: 0,
            error: Some("connection refused".to_string()),
        });

        assert_eq!(report.items_removed, 3);
        assert_eq!(report.bytes_freed, 120);
        assert_eq!(report.errors(), vec!["durable: connection refused".to_string()]);
    }
}
