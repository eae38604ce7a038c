//! Test class implementations
//!
//! A test class is run once per execution unit with a [`UnitContext`] that
//! exposes the unit's parameter row, its output buffer and the cancellation
//! signal. Classes are looked up by name in the [`TestRegistry`].
//!
//! ## Built-in classes
//!
//! - `demo.scripted` - outcome and run time from the data row
//! - `demo.silent` - runs without output, to exercise timeouts
//! - `demo.after_before` - forced outcomes in before/after phases

mod after_before;

pub use after_before::AfterBeforeSample;
pub use context::UnitContext;
pub use scripted::ScriptedTest;
pub use silent::SilentTest;

use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::Outcome;

/// A runnable test class
pub trait TestClass: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Execute one unit and report its terminal outcome
    fn run(&self, ctx: UnitContext) -> BoxFuture<'_, Outcome>;
}

/// Test classes by name
#[derive(Clone, Default)]
pub struct TestRegistry {
    classes: BTreeMap<String, Arc<dyn TestClass>>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in demo classes
    pub fn with_builtins() -> Self {
        Self::new()
            .register(ScriptedTest)
            .register(SilentTest)
            .register(AfterBeforeSample)
    }

    pub fn register(mut self, class: impl TestClass + 'static) -> Self {
        self.classes.insert(class.name().to_string(), Arc::new(class));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TestClass>> {
        self.classes.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn list(&self) -> Vec<(&str, &'static str)> {
        self.classes
            .iter()
            .map(|(name, class)| (name.as_str(), class.description()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeder::{DataStorage, FakeDataFeeder};
    use crate::models::{ExecutionUnit, ParameterRow, TaskHandle};
    use std::time::Duration;

    fn context(class: &str, params: &[&str]) -> (UnitContext, Arc<ExecutionUnit>, TaskHandle) {
        context_with_storage(class, params, DataStorage::new())
    }

    fn context_with_storage(
        class: &str,
        params: &[&str],
        storage: DataStorage,
    ) -> (UnitContext, Arc<ExecutionUnit>, TaskHandle) {
        let unit = Arc::new(ExecutionUnit::new(
            class,
            0,
            ParameterRow::new(params.iter().copied()),
            Duration::from_secs(10),
        ));
        let (handle, signal) = TaskHandle::new();
        let ctx = UnitContext::new(unit.clone(), signal, storage);
        (ctx, unit, handle)
    }

    #[test]
    fn test_builtin_classes() {
        let registry = TestRegistry::with_builtins();
        let names: Vec<_> = registry.list().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["demo.after_before", "demo.scripted", "demo.silent"]
        );
        assert!(registry.get("demo.missing").is_none());
    }

    #[tokio::test]
    async fn test_scripted_outcomes() {
        for (word, expected) in [
            ("pass", Outcome::Passed),
            ("fail", Outcome::Failed),
            ("na", Outcome::NotApplicable),
            ("dummy", Outcome::Dummy),
            ("garbage", Outcome::Failed),
        ] {
            let (ctx, _unit, _handle) = context("demo.scripted", &[word, "0"]);
            assert_eq!(ScriptedTest.run(ctx).await, expected, "word {word}");
        }
    }

    #[tokio::test]
    async fn test_scripted_emits_heartbeats() {
        let (ctx, unit, _handle) = context("demo.scripted", &["pass", "50", "10"]);
        assert_eq!(ScriptedTest.run(ctx).await, Outcome::Passed);

        let output = unit.drain_output();
        assert!(output.lines().filter(|l| l.starts_with("heartbeat")).count() >= 5);
    }

    #[tokio::test]
    async fn test_silent_honours_cancel() {
        let (ctx, unit, handle) = context("demo.silent", &["60000"]);
        handle.cancel();
        assert_eq!(SilentTest.run(ctx).await, Outcome::Failed);
        assert_eq!(unit.drain_output(), "");
    }

    #[tokio::test]
    async fn test_after_before_phases() {
        let cases = [
            (["false", "false", "false", "false"], Outcome::Passed),
            (["true", "false", "false", "false"], Outcome::Failed),
            (["false", "true", "false", "false"], Outcome::NotApplicable),
            (["false", "false", "true", "false"], Outcome::Failed),
            (["false", "false", "false", "true"], Outcome::NotApplicable),
        ];
        for (params, expected) in cases {
            let (ctx, _unit, _handle) = context("demo.after_before", &params);
            assert_eq!(AfterBeforeSample.run(ctx).await, expected, "{params:?}");
        }
    }

    #[test]
    fn test_context_reads_fake_parameter() {
        let storage = DataStorage::new();
        storage.put(FakeDataFeeder::storage_key("demo.scripted"), "hello");
        let (ctx, _unit, _handle) = context_with_storage("demo.scripted", &[], storage);
        assert_eq!(ctx.fake_parameter(), Some("hello".to_string()));

        let (ctx, _unit, _handle) = context("demo.silent", &[]);
        assert_eq!(ctx.fake_parameter(), None);
    }

    #[tokio::test]
    async fn test_scripted_logs_fake_parameter() {
        let storage = DataStorage::new();
        storage.put(FakeDataFeeder::storage_key("demo.scripted"), "token=42");
        let (ctx, unit, _handle) = context_with_storage("demo.scripted", &["pass"], storage);

        assert_eq!(ScriptedTest.run(ctx).await, Outcome::Passed);
        assert!(unit.drain_output().contains("fake parameter: token=42"));
    }

    #[tokio::test]
    async fn test_after_before_stops_when_cancelled() {
        let (ctx, unit, handle) = context("demo.after_before", &["false", "false", "false", "false"]);
        handle.cancel();
        assert_eq!(AfterBeforeSample.run(ctx).await, Outcome::Failed);
        assert!(unit.drain_output().contains("cancelled before the main phase"));
    }
}
