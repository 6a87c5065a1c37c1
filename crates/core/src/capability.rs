//! Capability trait — the abstraction over registered external tools.
//!
//! A capability is an opaque integration (web search, ticketing, calendars,
//! a document store) identified by name and exposing one or more callable
//! functions. The engine never knows what a capability does internally; it
//! plans against the registry's names and invokes through this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::CapabilityError;

/// A callable function within a capability, as advertised to the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityFunction {
    /// The function name (e.g., "search")
    pub name: String,

    /// Description of what the function does (surfaced to the planner)
    pub description: String,
}

impl CapabilityFunction {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// The core Capability trait.
///
/// Hosts implement this per integration and register instances in the
/// [`CapabilityRegistry`]. Implementations must be thread-safe; the registry
/// is shared read-only across acquisition calls.
#[async_trait]
pub trait Capability: Send + Sync {
    /// The unique name of this capability (e.g., "web_search").
    fn name(&self) -> &str;

    /// A description of what this capability does.
    fn description(&self) -> &str;

    /// The functions this capability exposes.
    fn functions(&self) -> Vec<CapabilityFunction>;

    /// Invoke one function with named string parameters.
    async fn invoke(
        &self,
        function: &str,
        parameters: &HashMap<String, String>,
    ) -> std::result::Result<String, CapabilityError>;
}

/// A registry of available capabilities, supplied by the host.
///
/// Read-only from the engine's perspective: the engine enumerates names for
/// planning and looks capabilities up for execution, but registration happens
/// before the registry is handed over.
#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Box<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability. Replaces any existing capability with the same name.
    pub fn register(&mut self, capability: Box<dyn Capability>) {
        let name = capability.name().to_string();
        self.capabilities.insert(name, capability);
    }

    /// Get a capability by name.
    pub fn get(&self, name: &str) -> Option<&dyn Capability> {
        self.capabilities.get(name).map(|c| c.as_ref())
    }

    /// Whether any capability is registered at all.
    pub fn has_any(&self) -> bool {
        !self.capabilities.is_empty()
    }

    /// Whether a specific `capability.function` pair is callable.
    pub fn has_function(&self, capability: &str, function: &str) -> bool {
        self.get(capability)
            .map(|c| c.functions().iter().any(|f| f.name == function))
            .unwrap_or(false)
    }

    /// List all registered capability names.
    pub fn names(&self) -> Vec<&str> {
        self.capabilities.keys().map(|s| s.as_str()).collect()
    }

    /// All callable `capability.function` identifiers, for planning purposes.
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .capabilities
            .values()
            .flat_map(|c| {
                c.functions()
                    .into_iter()
                    .map(|f| format!("{}.{}", c.name(), f.name))
            })
            .collect();
        names.sort();
        names
    }
}
