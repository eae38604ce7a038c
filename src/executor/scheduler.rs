//! Parallel unit scheduling
//!
//! Dispatches units onto a bounded pool of workers. A unit only starts once
//! a worker is free and the [`LockCoordinator`] grants its blocker group;
//! the [`HeartbeatMonitor`] watches everything that runs.

use futures::future::join_all;
use futures::FutureExt;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::lock::LockCoordinator;
use super::monitor::HeartbeatMonitor;
use crate::feeder::DataStorage;
use crate::models::{ExecutionUnit, Outcome, Resolution, TaskHandle, UnitError, UnitId};
use crate::results::BatchReport;
use crate::tests::{TestClass, TestRegistry, UnitContext};

/// Errors that stop a batch before or while dispatching
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Duplicate execution unit: {0}")]
    DuplicateUnit(UnitId),

    #[error("No test class registered as {0}")]
    UnknownClass(String),

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error("Worker pool closed")]
    PoolClosed,

    #[error("Heartbeat monitor failed: {0}")]
    Monitor(#[from] tokio::task::JoinError),
}

/// Scheduler tuning
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub max_workers: usize,
    pub tick_interval: Duration,
    /// How long to wait for workers that ignored cancellation once every
    /// unit is resolved
    pub join_grace: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            tick_interval: Duration::from_secs(1),
            join_grace: Duration::from_secs(5),
        }
    }
}

/// Runs a finite batch of units to completion
pub struct Scheduler {
    config: SchedulerConfig,
    registry: Arc<TestRegistry>,
    storage: DataStorage,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, registry: TestRegistry, storage: DataStorage) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
            storage,
        }
    }

    /// Run every unit and report once all are resolved
    pub async fn run(&self, units: Vec<ExecutionUnit>) -> Result<BatchReport, SchedulerError> {
        let start = Instant::now();
        self.validate(&units)?;

        let units: Vec<Arc<ExecutionUnit>> = units.into_iter().map(Arc::new).collect();
        info!(
            "Running {} units on {} workers (tick {:?})",
            units.len(),
            self.config.max_workers,
            self.config.tick_interval
        );

        let coordinator = Arc::new(LockCoordinator::new());
        for unit in &units {
            coordinator.register(unit);
        }

        let monitor = HeartbeatMonitor::new(
            self.config.tick_interval,
            units.clone(),
            coordinator.clone(),
        )
        .spawn();

        let workers = match self.dispatch_all(&units, &coordinator).await {
            Ok(workers) => workers,
            Err(e) => {
                monitor.abort();
                return Err(e);
            }
        };

        let timed_out = monitor.await?;
        if !timed_out.is_empty() {
            warn!("{} unit(s) timed out", timed_out.len());
        }
        self.join_workers(workers, &units).await;

        let report = BatchReport::collect(&units, start.elapsed());
        info!(
            "Batch completed in {}ms - {}",
            report.elapsed_ms, report.aggregate
        );
        Ok(report)
    }

    fn validate(&self, units: &[ExecutionUnit]) -> Result<(), SchedulerError> {
        let mut seen = HashSet::new();
        for unit in units {
            if !seen.insert(unit.id()) {
                return Err(SchedulerError::DuplicateUnit(unit.id().clone()));
            }
            if !self.registry.contains(unit.class_name()) {
                return Err(SchedulerError::UnknownClass(unit.class_name().to_string()));
            }
        }
        Ok(())
    }

    async fn dispatch_all(
        &self,
        units: &[Arc<ExecutionUnit>],
        coordinator: &Arc<LockCoordinator>,
    ) -> Result<Vec<JoinHandle<()>>, SchedulerError> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let mut pending: Vec<Arc<ExecutionUnit>> = units.to_vec();
        let mut workers = Vec::with_capacity(units.len());

        while !pending.is_empty() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| SchedulerError::PoolClosed)?;

            let granted = pending
                .iter()
                .position(|unit| coordinator.try_acquire(unit).is_granted());

            match granted {
                Some(index) => {
                    let unit = pending.remove(index);
                    workers.push(self.dispatch(unit, permit, coordinator.clone())?);
                }
                None => {
                    drop(permit);
                    debug!("{} unit(s) waiting for a blocker group", pending.len());
                    coordinator.wait_for_release().await;
                }
            }
        }

        Ok(workers)
    }

    fn dispatch(
        &self,
        unit: Arc<ExecutionUnit>,
        permit: OwnedSemaphorePermit,
        coordinator: Arc<LockCoordinator>,
    ) -> Result<JoinHandle<()>, SchedulerError> {
        let class = self
            .registry
            .get(unit.class_name())
            .ok_or_else(|| SchedulerError::UnknownClass(unit.class_name().to_string()))?;

        unit.acquire_lock()?;
        let (handle, signal) = TaskHandle::new();
        unit.attach_task(handle);
        let ctx = UnitContext::new(unit.clone(), signal.clone(), self.storage.clone());

        info!("Starting {}", unit);
        Ok(tokio::spawn(async move {
            let _permit = permit;
            let resolution = execute(class, ctx).await;
            let summary = resolution.to_string();
            match unit.resolve_with(resolution) {
                Ok(()) => info!("  {} {}", unit.id(), summary),
                Err(e) => debug!("{}", e),
            }
            if let Err(e) = unit.mark_executed() {
                debug!("{}", e);
            }
            coordinator.release(&unit);
            signal.finish();
        }))
    }

    async fn join_workers(&self, workers: Vec<JoinHandle<()>>, units: &[Arc<ExecutionUnit>]) {
        match tokio::time::timeout(self.config.join_grace, join_all(workers)).await {
            Ok(results) => {
                for result in results.into_iter().filter_map(Result::err) {
                    error!("Worker task failed: {}", result);
                }
            }
            Err(_) => {
                let stuck: Vec<String> = units
                    .iter()
                    .filter(|u| u.is_running())
                    .map(|u| u.id().to_string())
                    .collect();
                warn!(
                    "Abandoning {} worker(s) that ignored cancellation: {}",
                    stuck.len(),
                    stuck.join(", ")
                );
            }
        }
    }
}

/// Run the test class, mapping a panic to a failure
///
/// `run` itself is called inside the guarded future so a class that panics
/// before returning its future is caught too.
async fn execute(class: Arc<dyn TestClass>, ctx: UnitContext) -> Resolution {
    let name = class.name();
    match AssertUnwindSafe(async move { class.run(ctx).await })
        .catch_unwind()
        .await
    {
        Ok(outcome) => Resolution::new(outcome),
        Err(panic) => {
            let message = panic
                .downcast_ref::<String>()
                .cloned()
                .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("Test class {} panicked: {}", name, message);
            Resolution::new(Outcome::Failed).with_message(format!("worker fault: {message}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeder::FeederRegistry;
    use crate::models::ParameterRow;
    use crate::plan::{BatchPlan, ClassPlan};
    use futures::future::BoxFuture;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records start order and the highest concurrency seen per group
    #[derive(Default)]
    struct Tracker {
        active: Mutex<std::collections::HashMap<String, usize>>,
        max_overlap: AtomicUsize,
        started: Mutex<Vec<UnitId>>,
    }

    struct TrackerTest(Arc<Tracker>);

    impl TestClass for TrackerTest {
        fn name(&self) -> &'static str {
            "tracker"
        }

        fn description(&self) -> &'static str {
            "Tracks overlapping units per blocker group"
        }

        fn run(&self, mut ctx: UnitContext) -> BoxFuture<'_, Outcome> {
            let tracker = self.0.clone();
            Box::pin(async move {
                let group = ctx.unit().blocker().unwrap_or("").to_string();
                tracker.started.lock().push(ctx.unit().id().clone());
                {
                    let mut active = tracker.active.lock();
                    let count = active.entry(group.clone()).or_default();
                    *count += 1;
                    tracker.max_overlap.fetch_max(*count, Ordering::SeqCst);
                }
                let _ = ctx.sleep(Duration::from_millis(20)).await;
                *tracker.active.lock().entry(group).or_default() -= 1;
                ctx.log("done");
                Outcome::Passed
            })
        }
    }

    /// Panics while building its future, before any await
    struct EagerPanicTest;

    impl TestClass for EagerPanicTest {
        fn name(&self) -> &'static str {
            "eager.panic"
        }

        fn description(&self) -> &'static str {
            "Parses its first parameter before starting"
        }

        fn run(&self, ctx: UnitContext) -> BoxFuture<'_, Outcome> {
            let count: u32 = ctx.param(0).unwrap_or("").parse().unwrap();
            Box::pin(async move {
                ctx.log(format!("count {count}"));
                Outcome::Passed
            })
        }
    }

    fn config(workers: usize) -> SchedulerConfig {
        SchedulerConfig {
            max_workers: workers,
            tick_interval: Duration::from_millis(20),
            join_grace: Duration::from_millis(500),
        }
    }

    fn scheduler(workers: usize) -> Scheduler {
        Scheduler::new(
            config(workers),
            TestRegistry::with_builtins(),
            DataStorage::new(),
        )
    }

    fn unit(class: &str, row: usize, params: &[&str]) -> ExecutionUnit {
        ExecutionUnit::new(
            class,
            row,
            ParameterRow::new(params.iter().copied()),
            Duration::from_secs(5),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_runs_every_row() {
        let units = vec![
            unit("demo.scripted", 0, &["pass", "10"]),
            unit("demo.scripted", 1, &["fail", "20"]),
            unit("demo.scripted", 2, &["dummy"]),
        ];
        let report = scheduler(2).run(units).await.unwrap();

        assert_eq!(report.aggregate.runned, 2);
        assert_eq!(report.aggregate.passed, 1);
        assert_eq!(report.aggregate.failed, 1);
        assert_eq!(report.aggregate.dummy, 1);
        assert_eq!(report.aggregate.unresolved, 0);
        assert!(report.units.iter().all(|u| u.resolution.is_some()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_self_enabled_blocker_runs_first() {
        let tracker = Arc::new(Tracker::default());
        let registry = TestRegistry::new().register(TrackerTest(tracker.clone()));
        let scheduler = Scheduler::new(config(4), registry, DataStorage::new());

        let u2 = unit("tracker", 0, &[]).with_blocker("G", false);
        let u1 = unit("tracker", 1, &[]).with_blocker("G", true);
        let first = u1.id().clone();
        scheduler.run(vec![u2, u1]).await.unwrap();

        assert_eq!(tracker.started.lock()[0], first);
        assert_eq!(tracker.max_overlap.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_blocker_groups_never_overlap() {
        let tracker = Arc::new(Tracker::default());
        let registry = TestRegistry::new().register(TrackerTest(tracker.clone()));
        let scheduler = Scheduler::new(config(8), registry, DataStorage::new());

        let mut units = Vec::new();
        for group in 0..3 {
            for member in 0..4 {
                units.push(
                    unit("tracker", group * 4 + member, &[])
                        .with_blocker(format!("G{group}"), member == 3),
                );
            }
        }
        let report = scheduler.run(units).await.unwrap();

        assert_eq!(report.aggregate.passed, 12);
        assert_eq!(tracker.max_overlap.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_silent_unit_times_out() {
        let silent = unit("demo.silent", 0, &["60000"]).with_timeout(Duration::from_millis(100));
        let id = silent.id().clone();
        let report = tokio::time::timeout(Duration::from_secs(10), scheduler(2).run(vec![silent]))
            .await
            .expect("batch should finish")
            .unwrap();

        let unit = report.unit(&id).unwrap();
        let resolution = unit.resolution.clone().unwrap();
        assert_eq!(resolution.outcome, Outcome::Failed);
        assert!(resolution.timed_out);
        assert!(unit.output.contains("Execution timed out"));
        assert_eq!(report.aggregate.timed_out, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_timed_out_unit_frees_its_group() {
        let stuck = unit("demo.silent", 0, &["60000", "ignore"])
            .with_blocker("G", false)
            .with_timeout(Duration::from_millis(100));
        let next = unit("demo.scripted", 1, &["pass"]).with_blocker("G", false);
        let next_id = next.id().clone();

        let report = tokio::time::timeout(
            Duration::from_secs(10),
            scheduler(2).run(vec![stuck, next]),
        )
        .await
        .expect("batch should finish")
        .unwrap();

        assert_eq!(report.aggregate.failed, 1);
        assert_eq!(report.aggregate.passed, 1);
        let next = report.unit(&next_id).unwrap();
        assert_eq!(next.resolution.as_ref().unwrap().outcome, Outcome::Passed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_heartbeats_prevent_timeout() {
        let chatty = unit("demo.scripted", 0, &["pass", "400", "20"])
            .with_timeout(Duration::from_millis(100));
        let report = scheduler(1).run(vec![chatty]).await.unwrap();

        assert_eq!(report.aggregate.passed, 1);
        assert_eq!(report.aggregate.timed_out, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_panic_becomes_failure() {
        let units = vec![
            unit("demo.scripted", 0, &["panic"]),
            unit("demo.scripted", 1, &["pass"]),
        ];
        let report = scheduler(2).run(units).await.unwrap();

        assert_eq!(report.aggregate.failed, 1);
        assert_eq!(report.aggregate.passed, 1);
        let failed = report
            .units
            .iter()
            .find_map(|u| u.resolution.clone().filter(|r| r.outcome == Outcome::Failed))
            .unwrap();
        assert!(failed.message.unwrap().contains("worker fault"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_worker_serializes() {
        let tracker = Arc::new(Tracker::default());
        let registry = TestRegistry::new().register(TrackerTest(tracker.clone()));
        let scheduler = Scheduler::new(config(1), registry, DataStorage::new());

        let units = (0..5).map(|row| unit("tracker", row, &[])).collect();
        let report = scheduler.run(units).await.unwrap();

        assert_eq!(report.aggregate.passed, 5);
        assert_eq!(tracker.max_overlap.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejects_duplicates_and_unknown_classes() {
        let dup = vec![unit("demo.scripted", 0, &[]), unit("demo.scripted", 0, &[])];
        assert!(matches!(
            scheduler(1).run(dup).await,
            Err(SchedulerError::DuplicateUnit(_))
        ));

        let unknown = vec![unit("nope", 0, &[])];
        assert!(matches!(
            scheduler(1).run(unknown).await,
            Err(SchedulerError::UnknownClass(name)) if name == "nope"
        ));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let report = scheduler(1).run(Vec::new()).await.unwrap();
        assert_eq!(report.aggregate.total(), 0);
        assert!(report.units.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_mixed_blockers_all_resolve() {
        let units = (0..6)
            .map(|row| unit("demo.scripted", row, &["pass", "5"]).with_blocker("G", row % 2 == 0))
            .collect::<Vec<_>>();
        let ids: Vec<_> = units.iter().map(|u| u.id().clone()).collect();
        let report = scheduler(3).run(units).await.unwrap();

        for id in ids {
            assert!(report.unit(&id).unwrap().resolution.is_some());
        }
        assert_eq!(report.aggregate.passed, 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_panic_before_future_is_a_worker_fault() {
        let registry = TestRegistry::with_builtins().register(EagerPanicTest);
        let scheduler = Scheduler::new(config(2), registry, DataStorage::new());

        let broken = unit("eager.panic", 0, &["not a number"]).with_blocker("G", false);
        let broken_id = broken.id().clone();
        let next = unit("demo.scripted", 1, &["pass"]).with_blocker("G", false);

        let started = Instant::now();
        let report = tokio::time::timeout(Duration::from_secs(3), scheduler.run(vec![broken, next]))
            .await
            .expect("batch should finish well before the unit timeout")
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(3));
        let resolution = report.unit(&broken_id).unwrap().resolution.clone().unwrap();
        assert_eq!(resolution.outcome, Outcome::Failed);
        assert!(!resolution.timed_out);
        assert!(resolution.message.unwrap().starts_with("worker fault"));
        assert_eq!(report.aggregate.passed, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fake_feeder_value_reaches_test_class() {
        let storage = DataStorage::new();
        let feeders = FeederRegistry::with_builtins(storage.clone());
        let units = BatchPlan::new(vec![ClassPlan::new("demo.scripted")
            .with_rows(vec![vec!["pass"], vec!["pass"]])
            .with_feeder("fake", "endpoint=local")])
        .expand(&feeders, Duration::from_secs(5))
        .unwrap();

        let scheduler = Scheduler::new(config(2), TestRegistry::with_builtins(), storage);
        let report = scheduler.run(units).await.unwrap();

        assert_eq!(report.aggregate.passed, 2);
        assert!(report
            .units
            .iter()
            .all(|u| u.output.contains("fake parameter: endpoint=local")));
    }
}
