//! Request and execution contexts.
//!
//! `ContextVariables` is an insertion-ordered set of named string variables —
//! rendering order matters when variables are turned into planner goal text,
//! so a plain `HashMap` won't do. `RequestContext` is what the host hands the
//! engine for one acquisition call; `ExecutionContext` is built fresh for
//! every plan execution and never shared with planning.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::capability::CapabilityRegistry;

/// The reserved "whole input" parameter name. Compared case-insensitively:
/// the parameter merge never overwrites it, and the executor chains each
/// step's output through it.
pub const RESERVED_INPUT: &str = "input";

/// Named string variables with stable insertion order.
///
/// Setting an existing name updates it in place; new names append.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextVariables {
    entries: Vec<(String, String)>,
}

impl ContextVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, preserving its original position if it already exists.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<S: Into<String>, V: Into<String>> FromIterator<(S, V)> for ContextVariables {
    fn from_iter<T: IntoIterator<Item = (S, V)>>(iter: T) -> Self {
        let mut vars = ContextVariables::new();
        for (name, value) in iter {
            vars.set(name, value);
        }
        vars
    }
}

/// What the host supplies for one acquisition call: the conversation's named
/// variables and an optional serialized proposed plan from a previous turn.
///
/// The engine never mutates the request context it is handed.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Named context variables (includes the user intent under its own name)
    pub variables: ContextVariables,

    /// Serialized `ProposedPlan` slot, if a previous turn proposed one.
    /// Absence or garbage here means "no plan", never an error.
    pub proposed_plan_json: Option<String>,
}

impl RequestContext {
    pub fn new(variables: ContextVariables) -> Self {
        Self {
            variables,
            proposed_plan_json: None,
        }
    }

    /// Attach a serialized proposed plan (builder style).
    pub fn with_proposed_plan(mut self, json: impl Into<String>) -> Self {
        self.proposed_plan_json = Some(json.into());
        self
    }
}

/// A fresh context for executing an approved plan.
///
/// Bound to the full capability registry; approved plans are always
/// re-executed against a fresh execution context, never the context that
/// was live when they were planned.
pub struct ExecutionContext {
    /// Working variables, mutated as steps chain output through
    /// [`RESERVED_INPUT`]
    pub variables: ContextVariables,

    /// The capability registry steps execute against
    pub registry: Arc<CapabilityRegistry>,
}

impl ExecutionContext {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            variables: ContextVariables::new(),
            registry,
        }
    }
}
