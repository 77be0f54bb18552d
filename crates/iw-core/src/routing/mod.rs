//! Agent routing: the agent registry, route plans, the guard and the router.

mod guard;
mod plan;
mod registry;
mod router;

pub use guard::RoutingGuard;
pub use plan::{ContextKind, Phase, RoutePlan, RouteStep, RoutingContext};
pub use registry::{AgentKind, AgentMeta, AgentRegistry, RegistryError};
pub use router::Router;

use crate::reasoning::ReasoningError;
use thiserror::Error;

/// Errors from producing a route plan.
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("Reasoning error: {0}")]
    Reasoning(#[from] ReasoningError),

    #[error("Invalid route plan: {0}")]
    InvalidPlan(String),
}
