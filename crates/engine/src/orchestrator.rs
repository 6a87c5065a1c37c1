//! The orchestration engine: propose-or-execute workflow for external
//! knowledge acquisition.
//!
//! One acquisition call either executes a previously approved plan (then
//! compresses the result into the caller's token budget and wraps it in the
//! delimited block the conversation pipeline expects), or asks the planner
//! for a new plan under the retry policy and returns it for approval. When
//! only proposing, nothing is injected into the current turn.

use std::sync::Arc;
use tracing::{debug, info, warn};

use planforge_core::{
    CapabilityRegistry, Error, ExecutionContext, ProposedPlan, RequestContext, Result,
};
use planforge_planner::{build_goal, PlannerClient, PlannerOptions, RetryBudget};

use crate::executor::{PlanExecutor, RegistryExecutor};
use crate::extract::extract_json_payload;
use crate::optimizer::{Provenance, ResultOptimizer};
use crate::shape::ShapeRegistry;
use crate::token::estimate_tokens;

/// Opening delimiter of the annotated result block.
pub const RELATED_START: &str = "[RELATED START]";

/// Closing delimiter of the annotated result block.
pub const RELATED_END: &str = "[RELATED END]";

const FUNCTIONS_PREFIX: &str = "FUNCTIONS EXECUTED: ";
const RESULT_HEADER: &str = "RESULT: ";

/// The name under which the host stores the user intent in context
/// variables; excluded when variables are rendered into planner goal text.
pub const USER_INTENT_VARIABLE: &str = "userIntent";

/// The outcome of one acquisition call.
///
/// `text` is what gets injected into the current conversation turn (empty
/// when only a proposal was made, or when there was nothing to do).
/// `proposed_plan` is the engine's output slot: a freshly proposed plan for
/// the host to surface for approval, consumed after the call.
#[derive(Debug, Clone, Default)]
pub struct Acquisition {
    pub text: String,
    pub proposed_plan: Option<ProposedPlan>,
}

impl Acquisition {
    fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.proposed_plan.is_none()
    }
}

/// Ties planner, executor, registry, and optimizer together.
///
/// All collaborators are injected read-only; the engine itself holds no
/// per-request state, so one instance serves concurrent acquisition calls
/// without locks.
pub struct OrchestrationEngine {
    registry: Arc<CapabilityRegistry>,
    planner: Arc<dyn PlannerClient>,
    executor: Arc<dyn PlanExecutor>,
    optimizer: ResultOptimizer,
    options: PlannerOptions,
}

impl OrchestrationEngine {
    /// Create an engine with the default registry-backed executor and no
    /// registered response shapes.
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        planner: Arc<dyn PlannerClient>,
        options: PlannerOptions,
    ) -> Self {
        Self {
            registry,
            planner,
            executor: Arc::new(RegistryExecutor::new()),
            optimizer: ResultOptimizer::new(Arc::new(ShapeRegistry::new())),
            options,
        }
    }

    /// Replace the plan executor.
    pub fn with_executor(mut self, executor: Arc<dyn PlanExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Attach host-registered response shapes for result projection.
    pub fn with_shapes(mut self, shapes: Arc<ShapeRegistry>) -> Self {
        self.optimizer = ResultOptimizer::new(shapes);
        self
    }

    /// Acquire external information for one conversation turn.
    ///
    /// Executes the approved plan from the request context if there is one,
    /// otherwise plans anew and returns the proposal in the outcome. The
    /// request context is never mutated.
    pub async fn acquire(
        &self,
        user_intent: &str,
        context: &RequestContext,
        token_limit: usize,
    ) -> Result<Acquisition> {
        // Fast path: nothing registered means nothing to plan against
        if !self.registry.has_any() {
            debug!("No capabilities registered, skipping acquisition");
            return Ok(Acquisition::empty());
        }

        // Absence or garbage in the slot is "no plan", never an error
        let proposed = context.proposed_plan_json.as_deref().and_then(|json| {
            ProposedPlan::from_json(json)
                .map_err(|e| debug!(error = %e, "Ignoring undeserializable proposed plan"))
                .ok()
        });

        match proposed {
            Some(plan) if plan.is_approved() => self.execute_approved(plan, token_limit).await,
            _ => self.propose(user_intent, context).await,
        }
    }

    /// Execute an approved plan against a fresh execution context and wrap
    /// the budget-trimmed result in the delimited block.
    async fn execute_approved(
        &self,
        proposed: ProposedPlan,
        token_limit: usize,
    ) -> Result<Acquisition> {
        info!(
            plan_id = %proposed.id,
            steps = proposed.plan.steps.len(),
            "Executing approved plan"
        );

        // Approved plans always run against a fresh context bound to the
        // full registry, never the context they were planned in.
        let mut execution = ExecutionContext::new(self.registry.clone());
        let raw = self
            .executor
            .invoke(&proposed.plan, &mut execution)
            .await?;

        let functions_line = format!(
            "{FUNCTIONS_PREFIX}{}.",
            proposed.plan.function_names().join(", ")
        );

        let budget = token_limit
            .saturating_sub(estimate_tokens(RELATED_START))
            .saturating_sub(estimate_tokens(RELATED_END))
            .saturating_sub(estimate_tokens(&functions_line))
            .saturating_sub(estimate_tokens(RESULT_HEADER));

        let trimmed = match extract_json_payload(&raw) {
            Some(json) => {
                let provenance = match proposed.plan.steps.last() {
                    Some(step) => Provenance {
                        last_capability: step.capability.clone(),
                        last_function: step.function.clone(),
                        plan_kind: proposed.kind,
                    },
                    None => Provenance {
                        last_capability: String::new(),
                        last_function: String::new(),
                        plan_kind: proposed.kind,
                    },
                };
                self.optimizer.optimize(&json, budget, &provenance)
            }
            // Free text is used unmodified; this core does not truncate it
            None => raw,
        };

        let text = format!(
            "{RELATED_START}\n{functions_line}\n{RESULT_HEADER}{}\n{RELATED_END}",
            trimmed.trim()
        );
        Ok(Acquisition {
            text,
            proposed_plan: None,
        })
    }

    /// Ask the planner for a new plan under the retry policy and return it
    /// for approval.
    async fn propose(&self, user_intent: &str, context: &RequestContext) -> Result<Acquisition> {
        let context_block = render_variables(context);
        let goal = build_goal(&context_block, user_intent);

        let mut budget = RetryBudget::from_options(&self.options);
        let mut plan = loop {
            match self.planner.create_plan(&goal).await {
                Ok(plan) => break plan,
                Err(error) => {
                    let (retry, next) = budget.decide(&error);
                    if retry {
                        warn!(
                            error = %error,
                            remaining = next.remaining(),
                            "Planner failed, retrying"
                        );
                        budget = next;
                    } else {
                        return Err(Error::Planner(error));
                    }
                }
            }
        };

        // Nothing to approve
        if !plan.has_steps() {
            debug!("Planner returned an empty plan, nothing to propose");
            return Ok(Acquisition::empty());
        }

        plan.merge_variables(self.options.kind, &context.variables);
        let proposed = ProposedPlan::new(plan, self.options.kind);
        info!(
            plan_id = %proposed.id,
            steps = proposed.plan.steps.len(),
            kind = ?proposed.kind,
            "Proposed plan awaiting approval"
        );

        // Only proposing: nothing is injected into the current turn
        Ok(Acquisition {
            text: String::new(),
            proposed_plan: Some(proposed),
        })
    }
}

/// Render context variables as `key: value` lines in insertion order,
/// excluding the user intent.
fn render_variables(context: &RequestContext) -> String {
    context
        .variables
        .iter()
        .filter(|(name, _)| *name != USER_INTENT_VARIABLE)
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}
