//! Capability response shapes — lossy structural projection.
//!
//! Hosts can register a known response shape per capability (optionally per
//! function). Before the optimizer starts trimming, the raw JSON is
//! projected against the registered shape: every field the shape does not
//! name is discarded permanently. New integrations register a shape here
//! instead of adding branches to the optimizer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A projection schema for a JSON response.
///
/// Projection keeps structure and names intact — it only prunes. Where the
/// shape and the value disagree on container kind, the value passes through
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// An object keeping only the named fields, each projected recursively
    Object(HashMap<String, ResponseShape>),
    /// An array whose elements all share one shape
    Array(Box<ResponseShape>),
    /// Keep the value as-is (scalars, or subtrees the host doesn't trim)
    Any,
}

impl ResponseShape {
    /// Convenience constructor for a flat object shape keeping scalar fields.
    pub fn object_with_fields(fields: &[&str]) -> Self {
        ResponseShape::Object(
            fields
                .iter()
                .map(|f| (f.to_string(), ResponseShape::Any))
                .collect(),
        )
    }

    /// Project a value against this shape, dropping unknown fields.
    pub fn project(&self, value: &Value) -> Value {
        match (self, value) {
            (ResponseShape::Object(fields), Value::Object(map)) => {
                let mut projected = serde_json::Map::new();
                // Preserve the value's own field order
                for (name, field_value) in map {
                    if let Some(field_shape) = fields.get(name) {
                        projected.insert(name.clone(), field_shape.project(field_value));
                    }
                }
                Value::Object(projected)
            }
            (ResponseShape::Array(inner), Value::Array(items)) => {
                Value::Array(items.iter().map(|i| inner.project(i)).collect())
            }
            // Kind mismatch or Any: pass through
            _ => value.clone(),
        }
    }
}

/// Registry mapping capability (and optionally function) to a response shape.
///
/// Resolution prefers the `capability.function` entry, then falls back to
/// the capability-wide entry. Absence is a valid "no projection" answer.
#[derive(Debug, Clone, Default)]
pub struct ShapeRegistry {
    by_capability: HashMap<String, ResponseShape>,
    by_function: HashMap<(String, String), ResponseShape>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shape for every function of a capability.
    pub fn register(&mut self, capability: impl Into<String>, shape: ResponseShape) {
        self.by_capability.insert(capability.into(), shape);
    }

    /// Register a shape for one specific function of a capability.
    pub fn register_function(
        &mut self,
        capability: impl Into<String>,
        function: impl Into<String>,
        shape: ResponseShape,
    ) {
        self.by_function
            .insert((capability.into(), function.into()), shape);
    }

    /// Resolve the shape for a capability/function pair, if any.
    pub fn resolve(&self, capability: &str, function: &str) -> Option<&ResponseShape> {
        self.by_function
            .get(&(capability.to_string(), function.to_string()))
            .or_else(|| self.by_capability.get(capability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projection_drops_unknown_fields() {
        let shape = ResponseShape::object_with_fields(&["title", "url"]);
        let value = json!({
            "title": "Rust 1.80",
            "url": "https://example.com",
            "internal_id": 42,
            "tracking": {"pixel": true}
        });

        let projected = shape.project(&value);
        assert_eq!(
            projected,
            json!({"title": "Rust 1.80", "url": "https://example.com"})
        );
    }

    #[test]
    fn projection_recurses_into_arrays() {
        let shape = ResponseShape::Object(HashMap::from([(
            "results".to_string(),
            ResponseShape::Array(Box::new(ResponseShape::object_with_fields(&["name"]))),
        )]));
        let value = json!({
            "results": [
                {"name": "a", "noise": 1},
                {"name": "b", "noise": 2}
            ],
            "page": 1
        });

        let projected = shape.project(&value);
        assert_eq!(projected, json!({"results": [{"name": "a"}, {"name": "b"}]}));
    }

    #[test]
    fn kind_mismatch_passes_through() {
        let shape = ResponseShape::object_with_fields(&["title"]);
        let value = json!([1, 2, 3]);
        assert_eq!(shape.project(&value), value);
    }

    #[test]
    fn function_entry_wins_over_capability_entry() {
        let mut registry = ShapeRegistry::new();
        registry.register("github", ResponseShape::object_with_fields(&["wide"]));
        registry.register_function(
            "github",
            "list_pulls",
            ResponseShape::object_with_fields(&["narrow"]),
        );

        let shape = registry.resolve("github", "list_pulls").unwrap();
        assert!(matches!(shape, ResponseShape::Object(f) if f.contains_key("narrow")));

        let shape = registry.resolve("github", "get_issue").unwrap();
        assert!(matches!(shape, ResponseShape::Object(f) if f.contains_key("wide")));
    }

    #[test]
    fn unregistered_capability_resolves_to_none() {
        let registry = ShapeRegistry::new();
        assert!(registry.resolve("unknown", "anything").is_none());
    }
}
