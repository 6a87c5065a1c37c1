//! Plan types — the executable output of a planner.
//!
//! A plan is an ordered sequence of steps, each invoking one function of one
//! registered capability with named parameters. Plans are strongly typed in
//! memory and serialized to JSON only at the request-context boundary, where
//! they travel between conversation turns (proposed in turn N, approved and
//! executed in turn N+1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::context::{ContextVariables, RESERVED_INPUT};

/// One step of a plan: a single capability function invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Name of the capability to invoke (e.g., "web_search")
    pub capability: String,

    /// Name of the function within the capability (e.g., "search")
    pub function: String,

    /// Named parameters for this step
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, String>,
}

impl PlanStep {
    pub fn new(capability: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            function: function.into(),
            parameters: HashMap::new(),
        }
    }

    /// Add a parameter (builder style).
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// The human-readable `capability.function` identifier of this step.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.capability, self.function)
    }
}

/// An executable plan: ordered steps plus a top-level parameter map.
///
/// The top-level parameters are used when the whole plan is treated as a
/// single unit of execution ([`PlanKind::Action`]); sequential plans carry
/// parameters on each step instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Ordered steps
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<PlanStep>,

    /// Top-level parameters (Action plans)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, String>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step (builder style).
    pub fn with_step(mut self, step: PlanStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Add a top-level parameter (builder style).
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Whether this plan has anything to execute.
    pub fn has_steps(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Ordered `capability.function` identifiers for every step in the plan.
    ///
    /// Used for human-readable provenance, independent of whether each step
    /// actually ran.
    pub fn function_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.qualified_name()).collect()
    }

    /// Merge context variables into the plan's declared parameters.
    ///
    /// The merge target depends on the plan kind: top-level parameters for
    /// [`PlanKind::Action`], every step's parameters for
    /// [`PlanKind::Sequential`]. For each parameter the plan already declares
    /// (except the reserved whole-input name, compared case-insensitively),
    /// an identically-named context variable overwrites the plan's value.
    /// Parameters absent from context are left untouched; parameters not
    /// declared by the plan are never added.
    pub fn merge_variables(&mut self, kind: PlanKind, variables: &ContextVariables) {
        match kind {
            PlanKind::Action => merge_into(&mut self.parameters, variables),
            PlanKind::Sequential => {
                for step in &mut self.steps {
                    merge_into(&mut step.parameters, variables);
                }
            }
        }
    }
}

fn merge_into(parameters: &mut HashMap<String, String>, variables: &ContextVariables) {
    for (name, value) in parameters.iter_mut() {
        if name.eq_ignore_ascii_case(RESERVED_INPUT) {
            continue;
        }
        if let Some(replacement) = variables.get(name) {
            *value = replacement.to_string();
        }
    }
}

/// Whether a plan executes as a single action or as a step sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// Single-step; parameters live at the plan's top level
    Action,
    /// Multi-step; parameters live at each step
    Sequential,
}

/// Approval state of a proposed plan.
///
/// `NoOp` → `Approved` → (consumed by execution). Rejection and expiry are
/// host concerns and are not tracked here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    /// Just proposed, awaiting a decision
    NoOp,
    /// User confirmed; eligible for execution
    Approved,
}

/// A plan awaiting external (user) approval before execution.
///
/// Serialized into the host's request context between turns. A plan with
/// zero steps is never wrapped as a proposal — there is nothing to approve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedPlan {
    /// Unique proposal ID
    pub id: Uuid,

    /// The plan itself
    pub plan: Plan,

    /// How the plan executes
    pub kind: PlanKind,

    /// Approval state
    pub state: PlanState,

    /// When this plan was proposed
    pub proposed_at: DateTime<Utc>,
}

impl ProposedPlan {
    /// Wrap a freshly planned `Plan` as a proposal awaiting approval.
    pub fn new(plan: Plan, kind: PlanKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            plan,
            kind,
            state: PlanState::NoOp,
            proposed_at: Utc::now(),
        }
    }

    /// Mark the proposal as user-approved.
    pub fn approve(&mut self) {
        self.state = PlanState::Approved;
    }

    pub fn is_approved(&self) -> bool {
        self.state == PlanState::Approved
    }

    /// Serialize for the request-context slot.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from the request-context slot.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> Plan {
        Plan::new()
            .with_step(
                PlanStep::new("web_search", "search")
                    .with_parameter("query", "original")
                    .with_parameter("count", "3"),
            )
            .with_parameter("query", "original")
            .with_parameter("count", "3")
    }

    #[test]
    fn qualified_names_preserve_step_order() {
        let plan = Plan::new()
            .with_step(PlanStep::new("github", "list_pulls"))
            .with_step(PlanStep::new("jira", "get_issue"));
        assert_eq!(
            plan.function_names(),
            vec!["github.list_pulls", "jira.get_issue"]
        );
    }

    #[test]
    fn merge_overwrites_declared_parameters_action() {
        let mut plan = sample_plan();
        let mut vars = ContextVariables::new();
        vars.set("query", "rust release notes");
        vars.set("undeclared", "never added");

        plan.merge_variables(PlanKind::Action, &vars);
        assert_eq!(plan.parameters["query"], "rust release notes");
        assert_eq!(plan.parameters["count"], "3"); // untouched
        assert!(!plan.parameters.contains_key("undeclared"));
        // Action merge leaves step parameters alone
        assert_eq!(plan.steps[0].parameters["query"], "original");
    }

    #[test]
    fn merge_overwrites_declared_parameters_sequential() {
        let mut plan = sample_plan();
        let mut vars = ContextVariables::new();
        vars.set("query", "rust release notes");

        plan.merge_variables(PlanKind::Sequential, &vars);
        assert_eq!(plan.steps[0].parameters["query"], "rust release notes");
        assert_eq!(plan.steps[0].parameters["count"], "3");
        // Sequential merge leaves top-level parameters alone
        assert_eq!(plan.parameters["query"], "original");
    }

    #[test]
    fn merge_skips_reserved_input_case_insensitively() {
        let mut plan = Plan::new().with_parameter("INPUT", "whole input");
        let mut vars = ContextVariables::new();
        vars.set("INPUT", "clobbered");

        plan.merge_variables(PlanKind::Action, &vars);
        assert_eq!(plan.parameters["INPUT"], "whole input");
    }

    #[test]
    fn proposed_plan_round_trips_through_json() {
        let proposed = ProposedPlan::new(sample_plan(), PlanKind::Sequential);
        let json = proposed.to_json().unwrap();
        let restored = ProposedPlan::from_json(&json).unwrap();

        assert_eq!(restored.id, proposed.id);
        assert_eq!(restored.kind, PlanKind::Sequential);
        assert_eq!(restored.state, PlanState::NoOp);
        assert_eq!(restored.plan.steps.len(), 1);
        assert_eq!(restored.plan.steps[0].qualified_name(), "web_search.search");
    }

    #[test]
    fn approval_transitions() {
        let mut proposed = ProposedPlan::new(sample_plan(), PlanKind::Action);
        assert!(!proposed.is_approved());
        proposed.approve();
        assert!(proposed.is_approved());
    }

    #[test]
    fn malformed_slot_is_an_error_not_a_panic() {
        assert!(ProposedPlan::from_json("{not json").is_err());
        assert!(ProposedPlan::from_json("{\"unexpected\": true}").is_err());
    }
}
