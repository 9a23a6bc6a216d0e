//! Run planning and unit execution.

pub mod planner;
pub mod runner;

pub use planner::{plan, plan_excluding, RunPlan, ALL_TOKEN, LIVE_TOKEN};
pub use runner::{is_unit_output, Orchestrator, UnitOutcome, UnitReport};
