//! Agents backed by the reasoning capability.

mod planner;
mod risk_assessor;

pub use planner::{ResponsePlanner, CANONICAL_STEP_IDS, DEFAULT_GOAL};
pub use risk_assessor::RiskAssessor;
