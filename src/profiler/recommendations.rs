//! Rule-based optimization recommendations.
//!
//! Fixed thresholds evaluated against aggregated session metrics. Each rule
//! is independent and may fire zero or one recommendation; this is a simple
//! expert-system pattern, not a learned model.

use crate::profiler::metrics::ProfileMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum compilation-cache hit ratio before suggesting kernel caching work.
const CACHE_HIT_THRESHOLD: f64 = 0.8;

/// Minimum memory-pool hit ratio before suggesting pooling work.
const POOL_HIT_THRESHOLD: f64 = 0.7;

/// Minimum accelerator utilization (percent) before suggesting batching work.
const UTILIZATION_THRESHOLD: f64 = 50.0;

/// Utilization (percent) below which the recommendation escalates.
const UTILIZATION_CRITICAL: f64 = 20.0;

/// Area a recommendation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationKind {
    KernelOptimization,
    MemoryOptimization,
    ResourceUtilization,
}

impl fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationKind::KernelOptimization => write!(f, "KernelOptimization"),
            RecommendationKind::MemoryOptimization => write!(f, "MemoryOptimization"),
            RecommendationKind::ResourceUtilization => write!(f, "ResourceUtilization"),
        }
    }
}

/// How urgent a recommendation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// One generated recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub severity: Severity,
    pub message: String,
    pub estimated_impact: String,
}

/// Evaluate every rule against the session metrics.
pub fn generate_recommendations(metrics: &ProfileMetrics) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if metrics.kernels.total_kernels > 0 && metrics.kernels.cache_hit_ratio < CACHE_HIT_THRESHOLD {
        recommendations.push(Recommendation {
            kind: RecommendationKind::KernelOptimization,
            severity: Severity::Warning,
            message: format!(
                "Compilation cache hit ratio is {:.0}% (target {:.0}%). \
                 Reuse compiled kernels across launches or pre-warm the cache.",
                metrics.kernels.cache_hit_ratio * 100.0,
                CACHE_HIT_THRESHOLD * 100.0
            ),
            estimated_impact: format!(
                "up to {:.1} ms of compilation time per session",
                metrics.kernels.total_compilation_time.as_secs_f64() * 1000.0
            ),
        });
    }

    if metrics.memory.total_operations > 0 && metrics.memory.pool_hit_ratio < POOL_HIT_THRESHOLD {
        recommendations.push(Recommendation {
            kind: RecommendationKind::MemoryOptimization,
            severity: Severity::Warning,
            message: format!(
                "Memory pool hit ratio is {:.0}% (target {:.0}%). \
                 Route transient allocations through the pool.",
                metrics.memory.pool_hit_ratio * 100.0,
                POOL_HIT_THRESHOLD * 100.0
            ),
            estimated_impact: "reduced allocation latency and fragmentation".to_string(),
        });
    }

    if metrics.kernels.total_kernels > 0
        && metrics.accelerator.utilization_percent < UTILIZATION_THRESHOLD
    {
        let severity = if metrics.accelerator.utilization_percent < UTILIZATION_CRITICAL {
            Severity::Critical
        } else {
            Severity::Warning
        };
        recommendations.push(Recommendation {
            kind: RecommendationKind::ResourceUtilization,
            severity,
            message: format!(
                "Accelerator utilization is {:.0}% (target {:.0}%). \
                 Batch work or overlap transfers with compute.",
                metrics.accelerator.utilization_percent, UTILIZATION_THRESHOLD
            ),
            estimated_impact: "higher throughput for the same hardware".to_string(),
        });
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::metrics::{AcceleratorMetrics, KernelMetrics, MemoryMetrics};
    use std::time::Duration;

    fn metrics_with(
        kernels: usize,
        cache_hit: f64,
        mem_ops: usize,
        pool_hit: f64,
        utilization: f64,
    ) -> ProfileMetrics {
        ProfileMetrics {
            kernels: KernelMetrics {
                total_kernels: kernels,
                cache_hit_ratio: cache_hit,
                total_compilation_time: Duration::from_millis(40),
                ..Default::default()
            },
            memory: MemoryMetrics {
                total_operations: mem_ops,
                pool_hit_ratio: pool_hit,
                ..Default::default()
            },
            accelerator: AcceleratorMetrics {
                busy_time: Duration::ZERO,
                utilization_percent: utilization,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_healthy_session_no_recommendations() {
        let metrics = metrics_with(10, 0.95, 5, 0.9, 80.0);
        assert!(generate_recommendations(&metrics).is_empty());
    }

    #[test]
    fn test_low_cache_hit_fires_kernel_rule() {
        let metrics = metrics_with(10, 0.5, 0, 0.0, 80.0);
        let recs = generate_recommendations(&metrics);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationKind::KernelOptimization);
        assert_eq!(recs[0].severity, Severity::Warning);
        assert!(recs[0].message.contains("50%"));
    }

    #[test]
    fn test_low_pool_hit_fires_memory_rule() {
        let metrics = metrics_with(0, 0.0, 4, 0.25, 80.0);
        let recs = generate_recommendations(&metrics);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationKind::MemoryOptimization);
    }

    #[test]
    fn test_low_utilization_escalates_severity() {
        let warning = generate_recommendations(&metrics_with(5, 1.0, 0, 0.0, 35.0));
        assert_eq!(warning.len(), 1);
        assert_eq!(warning[0].severity, Severity::Warning);

        let critical = generate_recommendations(&metrics_with(5, 1.0, 0, 0.0, 5.0));
        assert_eq!(critical[0].severity, Severity::Critical);
    }

    #[test]
    fn test_rules_fire_independently() {
        let metrics = metrics_with(10, 0.1, 10, 0.1, 10.0);
        let recs = generate_recommendations(&metrics);
        assert_eq!(recs.len(), 3);
    }

    #[test]
    fn test_empty_session_is_quiet() {
        // no kernels and no memory ops: ratios are zero but no rules fire
        let metrics = metrics_with(0, 0.0, 0, 0.0, 0.0);
        assert!(generate_recommendations(&metrics).is_empty());
    }
}
