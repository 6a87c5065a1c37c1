//! Plan execution against the capability registry.
//!
//! The executor is a collaborator contract: hosts may inject their own, and
//! [`RegistryExecutor`] is the default — it runs the plan's steps in order
//! against the registry, chaining each step's output into the reserved
//! `input` variable so later steps can consume it.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

use planforge_core::{ExecutionContext, ExecutorError, Plan, RESERVED_INPUT};

/// The plan executor contract.
///
/// Runs a plan's steps against the registry bound to the execution context
/// and returns a single text result. Failures propagate as fatal; the
/// engine never retries execution.
#[async_trait]
pub trait PlanExecutor: Send + Sync {
    async fn invoke(
        &self,
        plan: &Plan,
        context: &mut ExecutionContext,
    ) -> std::result::Result<String, ExecutorError>;
}

/// Default executor: sequential step execution against the registry.
///
/// Parameter resolution per step, in precedence order: the step's own
/// parameters, then the plan's top-level parameters, then execution-context
/// variables (which is where the previous step's output lives under
/// `input`). The last step's output is the plan result.
#[derive(Debug, Default)]
pub struct RegistryExecutor;

impl RegistryExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PlanExecutor for RegistryExecutor {
    async fn invoke(
        &self,
        plan: &Plan,
        context: &mut ExecutionContext,
    ) -> std::result::Result<String, ExecutorError> {
        if !plan.has_steps() {
            return Err(ExecutorError::EmptyPlan);
        }

        let mut output = String::new();
        for (index, step) in plan.steps.iter().enumerate() {
            let capability = context.registry.get(&step.capability).ok_or_else(|| {
                ExecutorError::StepFailed {
                    index,
                    source: planforge_core::CapabilityError::NotFound(step.capability.clone()),
                }
            })?;

            let mut parameters: HashMap<String, String> = step.parameters.clone();
            for (name, value) in &plan.parameters {
                parameters
                    .entry(name.clone())
                    .or_insert_with(|| value.clone());
            }
            for (name, value) in context.variables.iter() {
                parameters
                    .entry(name.to_string())
                    .or_insert_with(|| value.to_string());
            }

            debug!(
                step = index,
                function = %step.qualified_name(),
                "Executing plan step"
            );

            output = capability
                .invoke(&step.function, &parameters)
                .await
                .map_err(|source| ExecutorError::StepFailed { index, source })?;

            // Chain this step's output into the next one
            context.variables.set(RESERVED_INPUT, output.clone());
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planforge_core::{
        Capability, CapabilityError, CapabilityFunction, CapabilityRegistry, PlanStep,
    };
    use std::sync::Arc;

    /// Uppercases the `input` parameter.
    struct UppercaseCapability;

    #[async_trait]
    impl Capability for UppercaseCapability {
        fn name(&self) -> &str {
            "text"
        }
        fn description(&self) -> &str {
            "Text transformations"
        }
        fn functions(&self) -> Vec<CapabilityFunction> {
            vec![CapabilityFunction::new("uppercase", "Uppercase the input")]
        }
        async fn invoke(
            &self,
            _function: &str,
            parameters: &HashMap<String, String>,
        ) -> std::result::Result<String, CapabilityError> {
            Ok(parameters
                .get(RESERVED_INPUT)
                .cloned()
                .unwrap_or_default()
                .to_uppercase())
        }
    }

    /// Returns a fixed lookup result for the `query` parameter.
    struct LookupCapability;

    #[async_trait]
    impl Capability for LookupCapability {
        fn name(&self) -> &str {
            "lookup"
        }
        fn description(&self) -> &str {
            "Looks things up"
        }
        fn functions(&self) -> Vec<CapabilityFunction> {
            vec![CapabilityFunction::new("find", "Find by query")]
        }
        async fn invoke(
            &self,
            _function: &str,
            parameters: &HashMap<String, String>,
        ) -> std::result::Result<String, CapabilityError> {
            let query = parameters.get("query").cloned().unwrap_or_default();
            Ok(format!("result for {query}"))
        }
    }

    fn registry() -> Arc<CapabilityRegistry> {
        let mut registry = CapabilityRegistry::new();
        registry.register(Box::new(UppercaseCapability));
        registry.register(Box::new(LookupCapability));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn steps_chain_output_through_input() {
        let plan = Plan::new()
            .with_step(PlanStep::new("lookup", "find").with_parameter("query", "rust"))
            .with_step(PlanStep::new("text", "uppercase"));

        let mut ctx = ExecutionContext::new(registry());
        let output = RegistryExecutor::new().invoke(&plan, &mut ctx).await.unwrap();
        assert_eq!(output, "RESULT FOR RUST");
    }

    #[tokio::test]
    async fn top_level_parameters_fill_step_gaps() {
        let plan = Plan::new()
            .with_step(PlanStep::new("lookup", "find"))
            .with_parameter("query", "from plan");

        let mut ctx = ExecutionContext::new(registry());
        let output = RegistryExecutor::new().invoke(&plan, &mut ctx).await.unwrap();
        assert_eq!(output, "result for from plan");
    }

    #[tokio::test]
    async fn step_parameters_win_over_plan_parameters() {
        let plan = Plan::new()
            .with_step(PlanStep::new("lookup", "find").with_parameter("query", "from step"))
            .with_parameter("query", "from plan");

        let mut ctx = ExecutionContext::new(registry());
        let output = RegistryExecutor::new().invoke(&plan, &mut ctx).await.unwrap();
        assert_eq!(output, "result for from step");
    }

    #[tokio::test]
    async fn empty_plan_is_rejected() {
        let mut ctx = ExecutionContext::new(registry());
        let err = RegistryExecutor::new()
            .invoke(&Plan::new(), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::EmptyPlan));
    }

    #[tokio::test]
    async fn unknown_capability_fails_with_step_index() {
        let plan = Plan::new().with_step(PlanStep::new("missing", "whatever"));
        let mut ctx = ExecutionContext::new(registry());
        let err = RegistryExecutor::new()
            .invoke(&plan, &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::StepFailed { index: 0, .. }));
    }
}
