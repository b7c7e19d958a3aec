//! Default factor definitions for each tier.
//!
//! Breakpoints are operational heuristics, kept here so they can be overridden per
//! deployment through the configuration file. Weights within each layer add up to 100.

use super::FactorSpec;
use crate::evaluation::curve::CurveDirection::{HigherIsBetter, HigherIsWorse};
use crate::evaluation::curve::ScoringCurve;
use crate::models::{FactorCategory, FactorSignal};

fn factor(
    id: &str,
    name: &str,
    weight: f64,
    category: FactorCategory,
    signal: Option<FactorSignal>,
    unit: &str,
    curve: ScoringCurve,
) -> FactorSpec {
    FactorSpec {
        id: id.to_string(),
        name: name.to_string(),
        weight,
        category,
        signal,
        unit: unit.to_string(),
        curve,
    }
}

pub fn client_factors() -> Vec<FactorSpec> {
    vec![
        factor(
            "client.page_load_time",
            "Page load time",
            30.0,
            FactorCategory::Performance,
            Some(FactorSignal::Latency),
            "ms",
            ScoringCurve::step(
                HigherIsWorse,
                &[
                    (5000.0, 20.0, "Audit bundle size and enable CDN caching for static assets"),
                    (3000.0, 50.0, "Defer non-critical scripts and compress assets"),
                    (1500.0, 80.0, "Review render-blocking resources"),
                ],
            ),
        ),
        factor(
            "client.js_error_rate",
            "Script error rate",
            25.0,
            FactorCategory::Business,
            Some(FactorSignal::ErrorRate),
            "%",
            ScoringCurve::step(
                HigherIsWorse,
                &[
                    (5.0, 0.0, "Roll back the latest frontend release and triage top errors"),
                    (2.0, 50.0, "Triage the most frequent client-side errors"),
                    (0.5, 80.0, ""),
                ],
            ),
        ),
        factor(
            "client.api_success_rate",
            "API call success rate",
            30.0,
            FactorCategory::Business,
            Some(FactorSignal::ErrorRate),
            "%",
            ScoringCurve::step(
                HigherIsBetter,
                &[
                    (90.0, 0.0, "Client requests are failing broadly; check service availability"),
                    (95.0, 50.0, "Inspect failing API routes and retry behaviour"),
                    (99.0, 80.0, ""),
                ],
            ),
        ),
        factor(
            "client.connection_drop_rate",
            "Realtime connection drop rate",
            15.0,
            FactorCategory::Performance,
            None,
            "%",
            ScoringCurve::step(
                HigherIsWorse,
                &[
                    (10.0, 30.0, "Check load balancer idle timeouts and websocket gateways"),
                    (5.0, 70.0, ""),
                ],
            ),
        ),
    ]
}

pub fn service_factors() -> Vec<FactorSpec> {
    vec![
        factor(
            "service.response_time",
            "Response time (p95)",
            25.0,
            FactorCategory::Performance,
            Some(FactorSignal::Latency),
            "ms",
            ScoringCurve::step(
                HigherIsWorse,
                &[
                    (2000.0, 0.0, "Shed load or scale out the service tier"),
                    (1000.0, 40.0, "Profile slow endpoints and downstream calls"),
                    (500.0, 70.0, "Review recent latency regressions"),
                ],
            ),
        ),
        factor(
            "service.error_rate",
            "Request error rate",
            25.0,
            FactorCategory::Business,
            Some(FactorSignal::ErrorRate),
            "%",
            ScoringCurve::step(
                HigherIsWorse,
                &[
                    (5.0, 0.0, "Error rate is severe; consider rolling back the last deploy"),
                    (1.0, 50.0, "Investigate the dominant error classes"),
                    (0.1, 85.0, ""),
                ],
            ),
        ),
        factor(
            "service.throughput_ratio",
            "Throughput vs expected",
            15.0,
            FactorCategory::Business,
            None,
            "%",
            ScoringCurve::step(
                HigherIsBetter,
                &[
                    (50.0, 30.0, "Throughput collapsed; check upstream traffic and queue backlogs"),
                    (80.0, 70.0, ""),
                ],
            ),
        ),
        factor(
            "service.cpu_utilization",
            "CPU utilization",
            10.0,
            FactorCategory::Performance,
            None,
            "%",
            ScoringCurve::step(
                HigherIsWorse,
                &[
                    (90.0, 0.0, "Add capacity or reduce hot-path work"),
                    (70.0, 60.0, ""),
                ],
            ),
        ),
        factor(
            "service.memory_utilization",
            "Heap utilization",
            10.0,
            FactorCategory::Performance,
            Some(FactorSignal::Memory),
            "%",
            ScoringCurve::step(
                HigherIsWorse,
                &[
                    (90.0, 0.0, "Heap nearly exhausted; capture a heap dump and restart gracefully"),
                    (80.0, 40.0, "Review cache sizes and retained objects"),
                    (70.0, 70.0, ""),
                ],
            ),
        ),
        factor(
            "service.gc_pressure",
            "Garbage collection time",
            5.0,
            FactorCategory::Performance,
            Some(FactorSignal::GcPressure),
            "%",
            ScoringCurve::step(
                HigherIsWorse,
                &[
                    (20.0, 0.0, "Collector is thrashing; check for unbounded allocations"),
                    (10.0, 50.0, "Tune collector settings or allocation rate"),
                    (5.0, 80.0, ""),
                ],
            ),
        ),
        factor(
            "service.worker_saturation",
            "Worker pool saturation",
            10.0,
            FactorCategory::Performance,
            Some(FactorSignal::Concurrency),
            "%",
            ScoringCurve::step(
                HigherIsWorse,
                &[
                    (95.0, 0.0, "Workers are exhausted; look for blocked or long-held tasks"),
                    (80.0, 40.0, "Raise worker limits or reduce per-request blocking"),
                    (60.0, 75.0, ""),
                ],
            ),
        ),
    ]
}

pub fn storage_factors() -> Vec<FactorSpec> {
    vec![
        factor(
            "storage.connection_pool_utilization",
            "Connection pool utilization",
            30.0,
            FactorCategory::Performance,
            Some(FactorSignal::Concurrency),
            "%",
            ScoringCurve::step(
                HigherIsWorse,
                &[
                    (90.0, 0.0, "Connection pool exhausted; check for leaked or long transactions"),
                    (70.0, 60.0, "Increase pool size or shorten transaction scope"),
                ],
            ),
        ),
        factor(
            "storage.query_latency",
            "Query latency (p95)",
            30.0,
            FactorCategory::Performance,
            Some(FactorSignal::Latency),
            "ms",
            ScoringCurve::step(
                HigherIsWorse,
                &[
                    (1000.0, 0.0, "Queries are stalling; inspect locks and the slow query log"),
                    (500.0, 40.0, "Add indexes for the slowest statements"),
                    (200.0, 75.0, ""),
                ],
            ),
        ),
        factor(
            "storage.slow_query_rate",
            "Slow query ratio",
            15.0,
            FactorCategory::Performance,
            None,
            "%",
            ScoringCurve::step(
                HigherIsWorse,
                &[
                    (10.0, 20.0, "Review query plans for the most frequent slow statements"),
                    (5.0, 50.0, ""),
                    (1.0, 80.0, ""),
                ],
            ),
        ),
        factor(
            "storage.cache_hit_ratio",
            "Cache hit ratio",
            15.0,
            FactorCategory::Performance,
            None,
            "%",
            ScoringCurve::step(
                HigherIsBetter,
                &[
                    (50.0, 20.0, "Cache is ineffective; check eviction policy and key design"),
                    (80.0, 60.0, "Warm the cache or increase its memory budget"),
                    (90.0, 85.0, ""),
                ],
            ),
        ),
        factor(
            "storage.replication_lag",
            "Replication lag",
            10.0,
            FactorCategory::Business,
            None,
            "s",
            ScoringCurve::step(
                HigherIsWorse,
                &[
                    (60.0, 0.0, "Replicas are far behind; route reads to the primary"),
                    (10.0, 50.0, "Check replica IO and network throughput"),
                    (2.0, 85.0, ""),
                ],
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_curves_are_valid() {
        for factor_spec in client_factors()
            .into_iter()
            .chain(service_factors())
            .chain(storage_factors())
        {
            assert!(factor_spec.curve.validate().is_ok(), "{} has an invalid curve", factor_spec.id);
        }
    }

    #[test]
    fn test_catalog_ids_are_unique() {
        let mut ids: Vec<String> = client_factors()
            .into_iter()
            .chain(service_factors())
            .chain(storage_factors())
            .map(|f| f.id)
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_pool_utilization_breakpoints() {
        let pool = storage_factors()
            .into_iter()
            .find(|f| f.id == "storage.connection_pool_utilization")
            .unwrap();
        assert_eq!(pool.curve.apply(95.0).score, 0.0);
        assert_eq!(pool.curve.apply(85.0).score, 60.0);
        assert_eq!(pool.curve.apply(40.0).score, 100.0);
    }
}
