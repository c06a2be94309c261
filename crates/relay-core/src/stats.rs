//! Running execution statistics.

use std::sync::{Arc, Mutex, MutexGuard};

use log::warn;

use crate::{models::PlanExecutionStats, store::PlanStore};

/// Maintains [`PlanExecutionStats`] and mirrors them to the store after every
/// change.
pub struct StatsAggregator {
    stats: Mutex<PlanExecutionStats>,
    store: Arc<dyn PlanStore>,
}

impl StatsAggregator {
    pub fn new(initial: PlanExecutionStats, store: Arc<dyn PlanStore>) -> Self {
        Self {
            stats: Mutex::new(initial),
            store,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlanExecutionStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current counters.
    pub fn snapshot(&self) -> PlanExecutionStats {
        self.lock().clone()
    }

    pub fn record_created(&self) {
        self.update(|stats| stats.total_plans += 1);
    }

    pub fn record_step_executed(&self) {
        self.update(|stats| stats.total_steps_executed += 1);
    }

    /// Count a completed plan and fold its duration into the mean.
    pub fn record_completed(&self, duration_ms: u64) {
        self.update(|stats| {
            stats.completed_plans += 1;
            let n = stats.completed_plans as f64;
            stats.avg_duration_ms = (stats.avg_duration_ms * (n - 1.0) + duration_ms as f64) / n;
            Self::recompute_success_rate(stats);
        });
    }

    /// Count a failed plan. Its duration does not enter the mean.
    pub fn record_failed(&self) {
        self.update(|stats| {
            stats.failed_plans += 1;
            Self::recompute_success_rate(stats);
        });
    }

    fn recompute_success_rate(stats: &mut PlanExecutionStats) {
        let finished = stats.completed_plans + stats.failed_plans;
        stats.success_rate = if finished == 0 {
            0.0
        } else {
            stats.completed_plans as f64 / finished as f64
        };
    }

    /// Applies `f` and saves the result. The guard is held across the save so
    /// concurrent updates reach the store in the order they were applied.
    fn update(&self, f: impl FnOnce(&mut PlanExecutionStats)) {
        let mut stats = self.lock();
        f(&mut stats);
        if let Err(e) = self.store.save_stats(&stats) {
            warn!("Failed to persist execution stats: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::store::JsonFileStore;

    fn aggregator() -> (TempDir, Arc<JsonFileStore>, StatsAggregator) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(JsonFileStore::new(temp_dir.path()).unwrap());
        let stats = StatsAggregator::new(PlanExecutionStats::default(), store.clone());
        (temp_dir, store, stats)
    }

    #[test]
    fn test_average_counts_completed_plans_only() {
        let (_temp_dir, _store, stats) = aggregator();

        stats.record_completed(1_000);
        stats.record_failed();
        stats.record_completed(3_000);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.completed_plans, 2);
        assert_eq!(snapshot.failed_plans, 1);
        assert!((snapshot.avg_duration_ms - 2_000.0).abs() < f64::EPSILON);
        assert!((snapshot.success_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_success_rate_zero_before_any_terminal_plan() {
        let (_temp_dir, _store, stats) = aggregator();
        stats.record_created();
        stats.record_step_executed();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_plans, 1);
        assert_eq!(snapshot.total_steps_executed, 1);
        assert_eq!(snapshot.success_rate, 0.0);
    }

    #[test]
    fn test_every_change_is_persisted() {
        let (_temp_dir, store, stats) = aggregator();
        stats.record_created();
        stats.record_failed();

        let saved = store.load_stats().unwrap().expect("Stats should be saved");
        assert_eq!(saved, stats.snapshot());
    }

    #[test]
    fn test_concurrent_updates_persist_latest_counters() {
        let (_temp_dir, store, stats) = aggregator();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..20 {
                        stats.record_created();
                        stats.record_step_executed();
                    }
                });
            }
        });

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_plans, 160);
        assert_eq!(snapshot.total_steps_executed, 160);
        let saved = store.load_stats().unwrap().expect("Stats should be saved");
        assert_eq!(saved, snapshot);
    }
}
