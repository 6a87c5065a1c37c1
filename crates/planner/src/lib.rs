//! Planner client contract and retry policy.
//!
//! The planner itself is an external collaborator: something that turns a
//! natural-language goal into an executable [`Plan`] over the registered
//! capabilities, or fails with a classified [`PlannerError`]. This crate
//! defines that contract plus the per-call retry policy the orchestration
//! engine drives: a budget derived once per acquisition call and a pure
//! decision function over the error classification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use planforge_core::{Plan, PlanKind, PlannerError};

/// The planner collaborator contract.
///
/// Implementations wrap an LLM (or anything else) that can produce a plan
/// from a goal. Errors must use the [`PlannerError`] classification; anything
/// the engine can't classify as invalid-plan or missing-function is fatal
/// for the current acquisition call.
#[async_trait]
pub trait PlannerClient: Send + Sync {
    /// A human-readable name for this planner (e.g., "action", "sequential").
    fn name(&self) -> &str;

    /// Produce a plan for the given goal text.
    async fn create_plan(&self, goal: &str) -> std::result::Result<Plan, PlannerError>;
}

/// Retry configuration for the missing-function error class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MissingFunctionRetryOptions {
    /// Whether missing-function errors may be retried at all
    #[serde(default = "default_true")]
    pub allow_retries: bool,

    /// How many missing-function retries one acquisition call may consume
    #[serde(default = "default_max_retries")]
    pub max_retries_allowed: u32,
}

fn default_true() -> bool {
    true
}
fn default_max_retries() -> u32 {
    3
}

impl Default for MissingFunctionRetryOptions {
    fn default() -> Self {
        Self {
            allow_retries: true,
            max_retries_allowed: default_max_retries(),
        }
    }
}

/// Per-request planner configuration, supplied by the host or defaulted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlannerOptions {
    /// Which kind of plan to request
    #[serde(default = "default_kind")]
    pub kind: PlanKind,

    /// Whether an invalid-plan error may be retried (at most once per call)
    #[serde(default = "default_true")]
    pub allow_retries_on_invalid_plan: bool,

    /// Missing-function retry configuration
    #[serde(default)]
    pub missing_function: MissingFunctionRetryOptions,
}

fn default_kind() -> PlanKind {
    PlanKind::Action
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            allow_retries_on_invalid_plan: true,
            missing_function: MissingFunctionRetryOptions::default(),
        }
    }
}

/// The retry budget for one acquisition call.
///
/// Derived once from [`PlannerOptions`], never persisted. The shared counter
/// follows the documented derivation: the missing-function allowance when
/// those retries are enabled, otherwise a single unit if invalid-plan
/// retries are enabled, otherwise zero. An invalid-plan retry is additionally
/// one-shot: once consumed it is never granted again within the same call,
/// even if the shared counter still has budget left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    remaining: u32,
    invalid_plan_available: bool,
    missing_function_allowed: bool,
}

impl RetryBudget {
    /// Derive the budget for one acquisition call.
    pub fn from_options(options: &PlannerOptions) -> Self {
        let remaining = if options.missing_function.allow_retries {
            options.missing_function.max_retries_allowed
        } else if options.allow_retries_on_invalid_plan {
            1
        } else {
            0
        };
        Self {
            remaining,
            invalid_plan_available: options.allow_retries_on_invalid_plan,
            missing_function_allowed: options.missing_function.allow_retries,
        }
    }

    /// Units left in the shared counter.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Pure retry decision: given a classified planner error, returns whether
    /// to retry and the updated budget. Fatal errors never retry.
    pub fn decide(self, error: &PlannerError) -> (bool, Self) {
        match error {
            PlannerError::InvalidPlan(_) => {
                if self.invalid_plan_available && self.remaining > 0 {
                    (
                        true,
                        Self {
                            remaining: self.remaining - 1,
                            invalid_plan_available: false,
                            ..self
                        },
                    )
                } else {
                    (false, self)
                }
            }
            PlannerError::MissingFunction { .. } => {
                if self.missing_function_allowed && self.remaining > 0 {
                    (
                        true,
                        Self {
                            remaining: self.remaining - 1,
                            ..self
                        },
                    )
                } else {
                    (false, self)
                }
            }
            PlannerError::Fatal(_) => (false, self),
        }
    }
}

/// Build the fixed goal text handed to the planner: the rendered context
/// block followed by the user intent.
pub fn build_goal(context_block: &str, user_intent: &str) -> String {
    let goal = if context_block.is_empty() {
        format!(
            "Given the conversation so far, accomplish the user intent.\n\
             User intent: {user_intent}"
        )
    } else {
        format!(
            "Given the following context, accomplish the user intent.\n\
             Context:\n{context_block}\n\
             User intent: {user_intent}"
        )
    };
    debug!(goal_len = goal.len(), "Built planner goal");
    goal
}
