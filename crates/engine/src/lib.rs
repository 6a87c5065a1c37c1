//! # Planforge Engine
//!
//! The external-knowledge acquisition engine: given a user intent, the
//! request context, and a token limit, either executes a previously approved
//! plan (compressing the result into the token budget) or asks the planner
//! for a new plan under a classified retry policy and returns it for
//! approval.
//!
//! The engine consumes its collaborators — capability registry, planner
//! client, plan executor — as injected read-only dependencies. Each
//! acquisition call owns its own retry budget and working plan; no state is
//! shared across concurrent calls.

pub mod executor;
pub mod extract;
pub mod optimizer;
pub mod orchestrator;
pub mod shape;
pub mod token;

pub use executor::{PlanExecutor, RegistryExecutor};
pub use optimizer::{Provenance, ResultOptimizer};
pub use orchestrator::{Acquisition, OrchestrationEngine};
pub use shape::{ResponseShape, ShapeRegistry};
