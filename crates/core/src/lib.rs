//! # Planforge Core
//!
//! Domain types, traits, and error definitions for the planforge plan
//! orchestration engine. This crate carries no runtime or service framework
//! dependencies — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator the engine consumes is defined as a trait here or in
//! the planner crate. Implementations live in their respective crates (or in
//! the host application). This enables:
//! - Swapping planner/executor implementations via configuration
//! - Easy testing with scripted mock implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod capability;
pub mod context;
pub mod error;
pub mod plan;

// Re-export key types at crate root for ergonomics
pub use capability::{Capability, CapabilityFunction, CapabilityRegistry};
pub use context::{ContextVariables, ExecutionContext, RequestContext, RESERVED_INPUT};
pub use error::{CapabilityError, Error, ExecutorError, PlannerError, Result};
pub use plan::{Plan, PlanKind, PlanState, PlanStep, ProposedPlan};
