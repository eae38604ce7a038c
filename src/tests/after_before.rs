//! Basic after/before sample
//!
//! Boolean parameters force an outcome in the surrounding phases:
//! - 0: fail in the before phase
//! - 1: N/A in the before phase
//! - 2: fail in the after phase
//! - 3: N/A in the after phase
//!
//! The first phase forcing an outcome decides the unit. A cancellation
//! seen after the before phase fails the unit.

use futures::future::BoxFuture;

use super::{TestClass, UnitContext};
use crate::models::Outcome;

#[derive(Debug, Default)]
pub struct AfterBeforeSample;

impl AfterBeforeSample {
    fn phase(ctx: &UnitContext, phase: &str, fail_flag: usize, na_flag: usize) -> Option<Outcome> {
        if ctx.flag(fail_flag) {
            ctx.log(format!("forced fail at {phase}"));
            return Some(Outcome::Failed);
        }
        if ctx.flag(na_flag) {
            ctx.log(format!("forced N/A at {phase}"));
            return Some(Outcome::NotApplicable);
        }
        None
    }

    async fn execute(ctx: UnitContext) -> Outcome {
        if let Some(outcome) = Self::phase(&ctx, "before", 0, 1) {
            return outcome;
        }

        if ctx.check().is_err() {
            ctx.log("cancelled before the main phase");
            return Outcome::Failed;
        }

        let params = ctx.parameters();
        ctx.log(format!(
            "Par0:{}, Par1:{}, Par2:{}, Par3:{}",
            params.get(0).unwrap_or(""),
            params.get(1).unwrap_or(""),
            params.get(2).unwrap_or(""),
            params.get(3).unwrap_or("")
        ));

        Self::phase(&ctx, "after", 2, 3).unwrap_or(Outcome::Passed)
    }
}

impl TestClass for AfterBeforeSample {
    fn name(&self) -> &'static str {
        "demo.after_before"
    }

    fn description(&self) -> &'static str {
        "Forced fail / N/A in the before and after phases"
    }

    fn run(&self, ctx: UnitContext) -> BoxFuture<'_, Outcome> {
        Box::pin(Self::execute(ctx))
    }
}
