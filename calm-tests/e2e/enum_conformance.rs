//! Bidirectional enum conformance (spec.md §8 invariant 9): every closed
//! enum's accepted set round-trips through `as_str`/`FromStr`, and the
//! dispatcher's validator — wired from the very same `VARIANTS` slice —
//! accepts exactly that set and names every variant on rejection.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use calm_core::dispatcher::{EnumField, ToolDefinition, ToolHandler, ToolRegistry, ToolSchema};
use calm_core::error::Result;
use calm_core::types::{Domain, GatedTransition, OutcomeStatus, Strategy};
use serde_json::{json, Value};

struct Noop;

#[async_trait]
impl ToolHandler for Noop {
    async fn handle(&self, input: Value) -> Result<Value> {
        Ok(json!({"ok": true, "received": input}))
    }
}

fn registry_with_domain_field() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(ToolDefinition {
        schema: ToolSchema {
            name: "start_ghap",
            description: "starts a GHAP entry",
            required: &["domain"],
            enum_fields: &[EnumField {
                name: "domain",
                variants: Domain::VARIANTS,
            }],
            response_bound: None,
        },
        handler: Arc::new(Noop),
    });
    registry
}

#[test]
fn every_domain_variant_round_trips_through_as_str_and_from_str() {
    for label in Domain::VARIANTS {
        let parsed = Domain::from_str(label).unwrap();
        assert_eq!(parsed.as_str(), *label);
    }
}

#[test]
fn every_strategy_and_gated_transition_variant_round_trips() {
    for label in Strategy::VARIANTS {
        assert_eq!(Strategy::from_str(label).unwrap().as_str(), *label);
    }
    for label in GatedTransition::VARIANTS {
        assert_eq!(GatedTransition::from_str(label).unwrap().as_str(), *label);
    }
    for label in OutcomeStatus::VARIANTS {
        assert_eq!(OutcomeStatus::from_str(label).unwrap().as_str(), *label);
    }
}

#[tokio::test]
async fn the_dispatcher_accepts_every_declared_domain_variant() {
    let registry = registry_with_domain_field();
    for label in Domain::VARIANTS {
        let result = registry.dispatch("start_ghap", json!({"domain": label})).await;
        assert!(result.get("error").is_none(), "rejected valid variant '{label}': {result}");
    }
}

#[tokio::test]
async fn the_dispatcher_rejects_an_undeclared_variant_and_names_every_accepted_one() {
    let registry = registry_with_domain_field();
    let result = registry
        .dispatch("start_ghap", json!({"domain": "not-a-real-domain"}))
        .await;
    let message = result["error"]["message"].as_str().unwrap();
    for label in Domain::VARIANTS {
        assert!(message.contains(label), "message missing variant '{label}': {message}");
    }
}
