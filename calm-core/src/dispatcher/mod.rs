//! Tool registry / dispatcher (spec.md §4, component 12; §9 "Dynamic
//! dispatch").
//!
//! A single dispatcher validates input, routes to a handler, and normalizes
//! errors into the `{"error": {"type", "message"}}` envelope from spec.md
//! §6.1 — every tool is a first-class registered record, never a subclass.
//! `ToolSchema::enum_fields` and the validator's accepted set are read from
//! the *same* `&'static [&'static str]` slice (each enum's own `VARIANTS`),
//! so schema and validation cannot drift apart (spec.md §8 invariant 9).
//! [`tools::default_tools`] registers every public operation — the GHAP
//! state machine, searcher, context assembler, gate-pass verifier, and
//! memory store — behind this one validate→route→normalize path, and each
//! registration's `response_bound` enforces spec.md §4.5's response-size
//! contract on the handler's own output, not just the caller's input.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};

pub mod tools;

pub use tools::default_tools;

/// One field's accepted enum values, named so a schema can be inspected by
/// a caller without re-deriving it from the Rust type.
pub struct EnumField {
    pub name: &'static str,
    pub variants: &'static [&'static str],
}

/// Declarative shape of a tool's input, independent of its handler.
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub required: &'static [&'static str],
    pub enum_fields: &'static [EnumField],
    /// The response-size contract the handler's own output must satisfy
    /// (spec.md §4.5), or `None` for tools the size-discipline taxonomy
    /// doesn't name (e.g. context assembly, which already self-bounds by
    /// `max_tokens`).
    pub response_bound: Option<ResponseBound>,
}

/// A byte-size contract a tool's response must satisfy (spec.md §4.5
/// "response size discipline... these are contracts, not suggestions").
/// Violating one is an implementation defect, not a caller input error, so
/// it surfaces as [`Error::Internal`].
#[derive(Debug, Clone, Copy)]
pub enum ResponseBound {
    /// The entire serialized response must fit within `n` bytes (store
    /// operations, simple GHAP operations, active-GHAP-with-history).
    Flat(usize),
    /// The response must be a JSON array, each of whose elements must fit
    /// within `n` bytes (list/search responses).
    PerEntry(usize),
}

impl ResponseBound {
    fn check(self, response: &Value) -> Result<()> {
        match self {
            ResponseBound::Flat(limit) => {
                let len = encoded_len(response);
                if len > limit {
                    return Err(Error::Internal(format!(
                        "response of {len} bytes exceeds the {limit}-byte response-size contract"
                    )));
                }
            }
            ResponseBound::PerEntry(limit) => {
                let entries = response.as_array().ok_or_else(|| {
                    Error::Internal("per-entry response bound requires a JSON array response".to_string())
                })?;
                for entry in entries {
                    let len = encoded_len(entry);
                    if len > limit {
                        return Err(Error::Internal(format!(
                            "entry of {len} bytes exceeds the {limit}-byte-per-entry response-size contract"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn encoded_len(value: &Value) -> usize {
    serde_json::to_vec(value).map(|bytes| bytes.len()).unwrap_or(usize::MAX)
}

/// A tool's executable behavior, isolated from routing/validation.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, input: Value) -> Result<Value>;
}

/// A registered tool: schema plus handler, added by registration rather
/// than inheritance (spec.md §9).
pub struct ToolDefinition {
    pub schema: ToolSchema,
    pub handler: Arc<dyn ToolHandler>,
}

/// Validates `input` against `schema`: every required field must be
/// present and non-null, and every enum field, if present, must be one of
/// its declared variants (spec.md §6.1, "every enum field documents the
/// exact accepted set in its error message").
///
/// # Errors
/// [`Error::Validation`] naming the missing field or, for an enum field,
/// quoting every accepted variant.
pub fn validate(schema: &ToolSchema, input: &Value) -> Result<()> {
    for field in schema.required {
        if input.get(field).is_none_or(Value::is_null) {
            return Err(Error::validation(format!(
                "tool '{}' requires field '{field}'",
                schema.name
            )));
        }
    }
    for enum_field in schema.enum_fields {
        let Some(value) = input.get(enum_field.name).and_then(Value::as_str) else {
            continue;
        };
        if !enum_field.variants.contains(&value) {
            return Err(Error::validation(format!(
                "invalid {} '{}': expected one of {}",
                enum_field.name,
                value,
                enum_field.variants.join(", "),
            )));
        }
    }
    Ok(())
}

/// Owns every registered tool and performs validate → route → normalize.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, ToolDefinition>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool. Re-registering the same name replaces it.
    pub fn register(&mut self, definition: ToolDefinition) {
        self.tools.insert(definition.schema.name, definition);
    }

    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&ToolSchema> {
        self.tools.get(name).map(|d| &d.schema)
    }

    /// Validates and dispatches `input` to the named tool, always
    /// returning a well-formed envelope: the handler's result on success,
    /// or `{"error": {...}}` on any failure — validation, routing, or
    /// handler (spec.md §6.1, §7 "no partial success states").
    pub async fn dispatch(&self, name: &str, input: Value) -> Value {
        let Some(definition) = self.tools.get(name) else {
            return Error::NotFound(format!("no tool named '{name}'")).to_envelope();
        };
        if let Err(e) = validate(&definition.schema, &input) {
            return e.to_envelope();
        }
        let result = match definition.handler.handle(input).await {
            Ok(result) => result,
            Err(e) => return e.to_envelope(),
        };
        if let Some(bound) = definition.schema.response_bound {
            if let Err(e) = bound.check(&result) {
                return e.to_envelope();
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn handle(&self, input: Value) -> Result<Value> {
            Ok(json!({"echoed": input}))
        }
    }

    const DOMAIN_FIELD: EnumField = EnumField {
        name: "domain",
        variants: &["debugging", "refactoring"],
    };

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(ToolDefinition {
            schema: ToolSchema {
                name: "echo",
                description: "echoes input",
                required: &["goal"],
                enum_fields: &[DOMAIN_FIELD],
                response_bound: None,
            },
            handler: Arc::new(Echo),
        });
        registry
    }

    struct Oversized;

    #[async_trait]
    impl ToolHandler for Oversized {
        async fn handle(&self, _input: Value) -> Result<Value> {
            Ok(json!({"padding": "x".repeat(100)}))
        }
    }

    struct NotAnArray;

    #[async_trait]
    impl ToolHandler for NotAnArray {
        async fn handle(&self, _input: Value) -> Result<Value> {
            Ok(json!({"not": "an array"}))
        }
    }

    #[tokio::test]
    async fn response_exceeding_its_flat_bound_becomes_an_internal_error() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolDefinition {
            schema: ToolSchema {
                name: "oversized",
                description: "always returns too much",
                required: &[],
                enum_fields: &[],
                response_bound: Some(ResponseBound::Flat(10)),
            },
            handler: Arc::new(Oversized),
        });
        let result = registry.dispatch("oversized", json!({})).await;
        assert_eq!(result["error"]["type"], "internal_error");
    }

    #[tokio::test]
    async fn response_within_its_flat_bound_passes_through() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolDefinition {
            schema: ToolSchema {
                name: "oversized",
                description: "always returns too much",
                required: &[],
                enum_fields: &[],
                response_bound: Some(ResponseBound::Flat(1000)),
            },
            handler: Arc::new(Oversized),
        });
        let result = registry.dispatch("oversized", json!({})).await;
        assert!(result.get("error").is_none());
    }

    #[tokio::test]
    async fn per_entry_bound_on_a_non_array_response_is_an_internal_error() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolDefinition {
            schema: ToolSchema {
                name: "not-a-list",
                description: "violates its own contract shape",
                required: &[],
                enum_fields: &[],
                response_bound: Some(ResponseBound::PerEntry(500)),
            },
            handler: Arc::new(NotAnArray),
        });
        let result = registry.dispatch("not-a-list", json!({})).await;
        assert_eq!(result["error"]["type"], "internal_error");
    }

    #[tokio::test]
    async fn unknown_tool_returns_not_found_envelope() {
        let registry = registry();
        let result = registry.dispatch("nonexistent", json!({})).await;
        assert_eq!(result["error"]["type"], "not_found");
    }

    #[tokio::test]
    async fn missing_required_field_returns_validation_envelope() {
        let registry = registry();
        let result = registry.dispatch("echo", json!({})).await;
        assert_eq!(result["error"]["type"], "validation_error");
    }

    #[tokio::test]
    async fn invalid_enum_value_lists_every_variant() {
        let registry = registry();
        let result = registry
            .dispatch("echo", json!({"goal": "g", "domain": "not-a-domain"}))
            .await;
        let message = result["error"]["message"].as_str().unwrap();
        assert!(message.contains("debugging"));
        assert!(message.contains("refactoring"));
    }

    #[tokio::test]
    async fn valid_input_reaches_the_handler() {
        let registry = registry();
        let result = registry
            .dispatch("echo", json!({"goal": "g", "domain": "debugging"}))
            .await;
        assert_eq!(result["echoed"]["goal"], "g");
    }
}
