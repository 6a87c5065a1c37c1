//! Result optimizer — deterministic, budget-aware compression of a plan
//! execution result.
//!
//! The optimizer is intentionally greedy and order-preserving: items are
//! accumulated in declaration order until the first one that would exceed
//! the budget, then iteration stops. No reordering by size, no best-fit —
//! determinism and debuggability over packing efficiency.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use planforge_core::PlanKind;

use crate::shape::ShapeRegistry;
use crate::token::estimate_tokens;

/// Where the result came from, for projection lookup and the fallback
/// message.
#[derive(Debug, Clone)]
pub struct Provenance {
    /// Capability of the last step in the plan
    pub last_capability: String,

    /// Function of the last step in the plan
    pub last_function: String,

    /// How the plan executed
    pub plan_kind: PlanKind,
}

/// Budget-aware JSON result compression.
pub struct ResultOptimizer {
    shapes: Arc<ShapeRegistry>,
}

impl ResultOptimizer {
    pub fn new(shapes: Arc<ShapeRegistry>) -> Self {
        Self { shapes }
    }

    /// Compress `json_text` into `token_limit` tokens.
    ///
    /// 1. Strip line breaks and surrounding whitespace; parse as JSON.
    /// 2. If a response shape is registered for the provenance, project the
    ///    value against it (lossy: unknown fields are gone for good).
    /// 3. Under budget → return unchanged.
    /// 4. An object with exactly one property unwraps to that property's
    ///    value; the property name becomes a `name: ` prefix whose token
    ///    cost is subtracted from the budget.
    /// 5. Greedy bounded accumulation over object properties or array
    ///    elements, in declaration order, stopping at the first overflow.
    /// 6. Nothing accumulated → a fixed fallback message naming the source.
    ///
    /// Never errors, never underflows: budget arithmetic saturates at zero.
    pub fn optimize(&self, json_text: &str, token_limit: usize, provenance: &Provenance) -> String {
        let compact: String = json_text
            .trim()
            .chars()
            .filter(|c| *c != '\n' && *c != '\r')
            .collect();

        let parsed: Option<Value> = serde_json::from_str(&compact).ok();

        // Typed projection, when the host registered a shape for this source
        let (mut working, text) = match parsed {
            Some(value) => {
                match self
                    .shapes
                    .resolve(&provenance.last_capability, &provenance.last_function)
                {
                    Some(shape) => {
                        let projected = shape.project(&value);
                        let reencoded =
                            serde_json::to_string(&projected).unwrap_or_else(|_| compact.clone());
                        debug!(
                            capability = %provenance.last_capability,
                            before = compact.len(),
                            after = reencoded.len(),
                            "Projected result against registered response shape"
                        );
                        (Some(projected), reencoded)
                    }
                    None => (Some(value), compact),
                }
            }
            None => (None, compact),
        };

        // Under budget: nothing to trim
        if estimate_tokens(&text) < token_limit {
            return text;
        }

        let mut budget = token_limit;

        // Single-property unwrap: {"results": [...]} works on the inner value
        let mut descriptor = String::new();
        let unwrapped = match &working {
            Some(Value::Object(map)) if map.len() == 1 => map
                .iter()
                .next()
                .map(|(name, inner)| (name.clone(), inner.clone())),
            _ => None,
        };
        if let Some((name, inner)) = unwrapped {
            descriptor = format!("{name}: ");
            budget = budget.saturating_sub(estimate_tokens(&descriptor));
            working = Some(inner);
        }

        // Greedy bounded accumulation, first overflow stops
        let mut kept: Vec<Value> = Vec::new();
        match &working {
            Some(Value::Object(map)) => {
                for (name, value) in map {
                    let item = Value::Object(serde_json::Map::from_iter([(
                        name.clone(),
                        value.clone(),
                    )]));
                    if !try_keep(&item, &mut budget, &mut kept) {
                        break;
                    }
                }
            }
            Some(Value::Array(items)) => {
                for item in items {
                    if !try_keep(item, &mut budget, &mut kept) {
                        break;
                    }
                }
            }
            // Scalars and unparseable text can't be trimmed item-wise
            _ => {}
        }

        if kept.is_empty() {
            let source = match provenance.plan_kind {
                PlanKind::Sequential => "plan",
                PlanKind::Action => provenance.last_capability.as_str(),
            };
            debug!(source, "Nothing fit the token budget, returning fallback message");
            return format!(
                "The {source} response was too large to use in the conversation. \
                 Try a more specific request."
            );
        }

        let serialized = serde_json::to_string(&Value::Array(kept)).unwrap_or_default();
        format!("{descriptor}{serialized}")
    }
}

/// Keep `item` if its token cost still fits, shrinking the budget; returns
/// false on the first item that does not fit.
fn try_keep(item: &Value, budget: &mut usize, kept: &mut Vec<Value>) -> bool {
    let serialized = serde_json::to_string(item).unwrap_or_default();
    let cost = estimate_tokens(&serialized);
    if *budget > cost {
        *budget -= cost;
        kept.push(item.clone());
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ResponseShape;

    fn optimizer() -> ResultOptimizer {
        ResultOptimizer::new(Arc::new(ShapeRegistry::new()))
    }

    fn action_provenance() -> Provenance {
        Provenance {
            last_capability: "web_search".into(),
            last_function: "search".into(),
            plan_kind: PlanKind::Action,
        }
    }

    fn sequential_provenance() -> Provenance {
        Provenance {
            plan_kind: PlanKind::Sequential,
            ..action_provenance()
        }
    }

    #[test]
    fn under_budget_returns_input_unchanged() {
        let json = r#"{"a":1,"b":2}"#;
        let out = optimizer().optimize(json, 100, &action_provenance());
        assert_eq!(out, json);
    }

    #[test]
    fn optimize_is_idempotent_under_budget() {
        let json = r#"{"a":1,"b":2}"#;
        let opt = optimizer();
        let once = opt.optimize(json, 100, &action_provenance());
        let twice = opt.optimize(&once, 100, &action_provenance());
        assert_eq!(once, twice);
    }

    #[test]
    fn line_breaks_and_whitespace_are_stripped() {
        let json = "  {\"a\": 1,\r\n \"b\": 2}  \n";
        let out = optimizer().optimize(json, 100, &action_provenance());
        assert!(!out.contains('\n'));
        assert!(!out.starts_with(' '));
    }

    #[test]
    fn greedy_accumulation_stops_at_first_overflow() {
        // "aaaaaaaa" → 3 tokens, "bbbb" → 2, "c" → 1 (serialized with quotes).
        // Limit 4: a fits, b overflows and stops iteration — c is never
        // considered even though it alone would fit.
        let json = r#"["aaaaaaaa","bbbb","c"]"#;
        let out = optimizer().optimize(json, 4, &action_provenance());
        assert_eq!(out, r#"["aaaaaaaa"]"#);
    }

    #[test]
    fn single_property_unwrap_prefixes_descriptor() {
        // 26 chars → 7 tokens, so limit 7 is not "under budget"; the
        // descriptor costs 3 tokens and each element 1, so all three fit.
        let json = r#"{"results": [100,200,300]}"#;
        let out = optimizer().optimize(json, 7, &action_provenance());
        assert_eq!(out, "results: [100,200,300]");
    }

    #[test]
    fn unwrap_then_greedy_truncation() {
        let json = r#"{"results": ["aaaaaaaa","bbbb","c"]}"#;
        // descriptor "results: " → 3 tokens; limit 7 leaves 4 for elements:
        // first element (3 tokens) fits, second (2) overflows and stops.
        let out = optimizer().optimize(json, 7, &action_provenance());
        assert_eq!(out, r#"results: ["aaaaaaaa"]"#);
    }

    #[test]
    fn object_properties_accumulate_in_declaration_order() {
        let json = r#"{"first":"aaaaaaaaaaaa","second":"bb","third":"cc"}"#;
        // Whole doc: 51 chars → 13 tokens; limit 12 forces trimming.
        // {"first":"aaaaaaaaaaaa"} → 24 chars → 6 tokens: fits (12 > 6), 6 left.
        // {"second":"bb"} → 15 chars → 4 tokens: fits (6 > 4), 2 left.
        // {"third":"cc"} → 14 chars → 4 tokens: overflow, stop.
        let out = optimizer().optimize(json, 12, &action_provenance());
        assert_eq!(out, r#"[{"first":"aaaaaaaaaaaa"},{"second":"bb"}]"#);
    }

    #[test]
    fn fallback_names_the_plan_for_sequential() {
        let json = format!("\"{}\"", "x".repeat(400));
        let out = optimizer().optimize(&json, 5, &sequential_provenance());
        assert!(out.contains("The plan response was too large"));
    }

    #[test]
    fn fallback_names_the_capability_for_action() {
        let json = format!("\"{}\"", "x".repeat(400));
        let out = optimizer().optimize(&json, 5, &action_provenance());
        assert!(out.contains("The web_search response was too large"));
    }

    #[test]
    fn scalar_under_budget_passes_through() {
        let out = optimizer().optimize("42", 10, &action_provenance());
        assert_eq!(out, "42");
    }

    #[test]
    fn zero_budget_still_terminates_with_fallback() {
        let out = optimizer().optimize(r#"{"a":1}"#, 0, &action_provenance());
        assert!(out.contains("too large"));
    }

    #[test]
    fn registered_shape_projects_before_budgeting() {
        let mut shapes = ShapeRegistry::new();
        shapes.register(
            "web_search",
            ResponseShape::object_with_fields(&["title"]),
        );
        let opt = ResultOptimizer::new(Arc::new(shapes));

        let json = r#"{"title": "Rust", "tracking_blob": "zzzzzzzzzzzzzzzzzzzzzzzz"}"#;
        let out = opt.optimize(json, 100, &action_provenance());
        assert_eq!(out, r#"{"title":"Rust"}"#);
    }

    #[test]
    fn unregistered_capability_skips_projection() {
        let json = r#"{"title":"Rust","extra":1}"#;
        let out = optimizer().optimize(json, 100, &action_provenance());
        assert_eq!(out, json);
    }
}
