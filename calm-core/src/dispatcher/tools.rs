//! Production tool registrations: one [`ToolHandler`] per public operation,
//! wired behind the validate→route→normalize dispatcher in [`super`].
//!
//! Each tool's `response_bound` is drawn from spec.md §4.5's size-discipline
//! taxonomy by operation kind: `start_ghap`/`update_ghap` are simple GHAP
//! operations (≤ 500 B), `resolve_ghap` carries the full lifecycle outcome
//! so it's treated as active-GHAP-with-history (≤ 2 000 B), the five
//! `search_*` tools are list responses (≤ 500 B/entry), and `store_memory`
//! is a store operation (≤ 500 B) — and, per spec.md §8 scenario 6, its
//! response never echoes back the stored `content`. Gate-pass and context
//! assembly aren't named by the taxonomy, so they register with no bound;
//! context assembly already self-bounds via its own `max_tokens` budget.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::context::{ContextAssembler, ContextTypes};
use crate::embeddings::Embedder;
use crate::error::{Error, Result};
use crate::gatepass::GatePassVerifier;
use crate::ghap::GhapStateMachine;
use crate::memory_store::MemoryStore;
use crate::metadata_store::MetadataStore;
use crate::search::Searcher;
use crate::types::{Axis, Domain, GHAPStatus, MemoryCategory, SearchMode, Strategy};
use crate::vector_store::VectorStore;

use super::{EnumField, ResponseBound, ToolDefinition, ToolHandler, ToolRegistry, ToolSchema};

fn required_str<'a>(input: &'a Value, name: &str) -> Result<&'a str> {
    input
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::validation(format!("field '{name}' must be a string")))
}

fn optional_str<'a>(input: &'a Value, name: &str) -> Option<&'a str> {
    input.get(name).and_then(Value::as_str)
}

fn optional_string(input: &Value, name: &str) -> Option<String> {
    optional_str(input, name).map(str::to_string)
}

fn optional_usize(input: &Value, name: &str) -> Option<usize> {
    input.get(name).and_then(Value::as_u64).map(|n| n as usize)
}

fn required_f32(input: &Value, name: &str) -> Result<f32> {
    input
        .get(name)
        .and_then(Value::as_f64)
        .map(|n| n as f32)
        .ok_or_else(|| Error::validation(format!("field '{name}' must be a number")))
}

fn optional_tags(input: &Value, name: &str) -> Vec<String> {
    input
        .get(name)
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(|t| t.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn required_enum<T: FromStr<Err = String>>(input: &Value, name: &str) -> Result<T> {
    T::from_str(required_str(input, name)?).map_err(Error::validation)
}

fn optional_enum<T: FromStr<Err = String>>(input: &Value, name: &str) -> Result<Option<T>> {
    match optional_str(input, name) {
        Some(s) => T::from_str(s).map(Some).map_err(Error::validation),
        None => Ok(None),
    }
}

fn mode_field(input: &Value) -> Result<SearchMode> {
    optional_enum::<SearchMode>(input, "mode").map(|m| m.unwrap_or(SearchMode::Semantic))
}

fn optional_since(input: &Value, name: &str) -> Result<Option<DateTime<Utc>>> {
    match optional_str(input, name) {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| Error::validation(format!("field '{name}' is not a valid RFC3339 timestamp: {e}"))),
        None => Ok(None),
    }
}

const DOMAIN_FIELD: EnumField = EnumField { name: "domain", variants: Domain::VARIANTS };
const STRATEGY_FIELD: EnumField = EnumField { name: "strategy", variants: Strategy::VARIANTS };
const STATUS_FIELD: EnumField = EnumField { name: "status", variants: crate::types::OutcomeStatus::VARIANTS };
const MODE_FIELD: EnumField = EnumField { name: "mode", variants: SearchMode::VARIANTS };
const AXIS_FIELD: EnumField = EnumField { name: "axis", variants: Axis::VARIANTS };
const CATEGORY_FIELD: EnumField = EnumField { name: "category", variants: MemoryCategory::VARIANTS };

struct StartGhapHandler {
    machine: Arc<GhapStateMachine>,
}

#[async_trait]
impl ToolHandler for StartGhapHandler {
    async fn handle(&self, input: Value) -> Result<Value> {
        let session_id = required_str(&input, "session_id")?;
        let domain = required_enum::<Domain>(&input, "domain")?;
        let strategy = required_enum::<Strategy>(&input, "strategy")?;
        let goal = required_str(&input, "goal")?.to_string();
        let hypothesis = required_str(&input, "hypothesis")?.to_string();
        let action = required_str(&input, "action")?.to_string();
        let prediction = required_str(&input, "prediction")?.to_string();

        let started = self
            .machine
            .start(session_id, domain, strategy, goal, hypothesis, action, prediction)
            .await?;
        Ok(json!({ "id": started.id.to_string() }))
    }
}

struct UpdateGhapHandler {
    machine: Arc<GhapStateMachine>,
}

#[async_trait]
impl ToolHandler for UpdateGhapHandler {
    async fn handle(&self, input: Value) -> Result<Value> {
        let session_id = required_str(&input, "session_id")?;
        let hypothesis = optional_string(&input, "hypothesis");
        let action = optional_string(&input, "action");
        let prediction = optional_string(&input, "prediction");
        let strategy = optional_enum::<Strategy>(&input, "strategy")?;
        let note = optional_string(&input, "note");

        self.machine
            .update(session_id, hypothesis, action, prediction, strategy, note)
            .await?;
        Ok(json!({ "ok": true }))
    }
}

struct ResolveGhapHandler {
    machine: Arc<GhapStateMachine>,
}

#[async_trait]
impl ToolHandler for ResolveGhapHandler {
    async fn handle(&self, input: Value) -> Result<Value> {
        let session_id = required_str(&input, "session_id")?;
        let status = required_enum::<crate::types::OutcomeStatus>(&input, "status")?;
        let result = required_str(&input, "result")?.to_string();
        let surprise = optional_string(&input, "surprise");
        let root_cause = match input.get("root_cause") {
            Some(Value::Null) | None => None,
            Some(rc) => Some(crate::types::RootCause {
                category: required_enum::<crate::types::RootCauseCategory>(rc, "category")?,
                description: required_str(rc, "description")?.to_string(),
            }),
        };
        let lesson = match input.get("lesson") {
            Some(Value::Null) | None => None,
            Some(l) => Some(crate::types::Lesson {
                what_worked: optional_string(l, "what_worked"),
                takeaway: optional_string(l, "takeaway"),
            }),
        };

        let resolved = self.machine.resolve(session_id, status, result, surprise, root_cause, lesson).await?;

        // The response summarizes the outcome rather than echoing the
        // entry's free-text fields back, so it stays within the
        // active-GHAP-with-history bound regardless of how long the
        // stored goal/hypothesis/action/prediction text is.
        Ok(json!({
            "id": resolved.id.to_string(),
            "status": match resolved.status { GHAPStatus::Active => "active", GHAPStatus::Terminal => "terminal" },
            "outcome_status": resolved.outcome.as_ref().map(|o| o.status.as_str()),
            "confidence_tier": resolved.confidence_tier.map(|t| t.as_str()),
            "iteration_count": resolved.iteration_count,
        }))
    }
}

struct SearchMemoriesHandler {
    searcher: Arc<Searcher>,
}

#[async_trait]
impl ToolHandler for SearchMemoriesHandler {
    async fn handle(&self, input: Value) -> Result<Value> {
        let query = required_str(&input, "query")?;
        let limit = optional_usize(&input, "limit");
        let mode = mode_field(&input)?;
        let category = optional_str(&input, "category");
        let since = optional_since(&input, "since")?;

        let hits = self.searcher.search_memories(query, limit, mode, category, since).await?;
        Ok(json!(hits
            .into_iter()
            .map(|h| json!({
                "id": h.id,
                "content": h.content,
                "category": h.category,
                "importance": h.importance,
                "score": h.score,
                "created_at": h.created_at.map(|d| d.to_rfc3339()),
            }))
            .collect::<Vec<_>>()))
    }
}

struct SearchCodeHandler {
    searcher: Arc<Searcher>,
}

#[async_trait]
impl ToolHandler for SearchCodeHandler {
    async fn handle(&self, input: Value) -> Result<Value> {
        let query = required_str(&input, "query")?;
        let limit = optional_usize(&input, "limit");
        let mode = mode_field(&input)?;
        let language = optional_str(&input, "language");

        let hits = self.searcher.search_code(query, limit, mode, language).await?;
        Ok(json!(hits
            .into_iter()
            .map(|h| json!({
                "id": h.id,
                "path": h.path,
                "language": h.language,
                "snippet": h.snippet,
                "score": h.score,
            }))
            .collect::<Vec<_>>()))
    }
}

struct SearchExperiencesHandler {
    searcher: Arc<Searcher>,
}

#[async_trait]
impl ToolHandler for SearchExperiencesHandler {
    async fn handle(&self, input: Value) -> Result<Value> {
        let query = required_str(&input, "query")?;
        let axis = required_enum::<Axis>(&input, "axis")?;
        let limit = optional_usize(&input, "limit");
        let mode = mode_field(&input)?;
        let domain = optional_enum::<Domain>(&input, "domain")?;
        let since = optional_since(&input, "since")?;

        let hits = self.searcher.search_experiences(query, axis, limit, mode, domain, since).await?;
        Ok(json!(hits
            .into_iter()
            .map(|h| json!({
                "ghap_id": h.ghap_id,
                "axis": h.axis.as_str(),
                "text": h.text,
                "domain": h.domain.map(|d| d.as_str()),
                "strategy": h.strategy.map(|s| s.as_str()),
                "outcome_status": h.outcome_status.map(|s| s.as_str()),
                "confidence_tier": h.confidence_tier.map(|t| t.as_str()),
                "score": h.score,
            }))
            .collect::<Vec<_>>()))
    }
}

struct SearchValuesHandler {
    searcher: Arc<Searcher>,
}

#[async_trait]
impl ToolHandler for SearchValuesHandler {
    async fn handle(&self, input: Value) -> Result<Value> {
        let query = required_str(&input, "query")?;
        let limit = optional_usize(&input, "limit");
        let mode = mode_field(&input)?;
        let axis = optional_enum::<Axis>(&input, "axis")?;

        let hits = self.searcher.search_values(query, limit, mode, axis).await?;
        Ok(json!(hits
            .into_iter()
            .map(|h| json!({
                "id": h.id,
                "text": h.text,
                "cluster_id": h.cluster_id,
                "axis": h.axis.map(|a| a.as_str()),
                "score": h.score,
            }))
            .collect::<Vec<_>>()))
    }
}

struct SearchCommitsHandler {
    searcher: Arc<Searcher>,
}

#[async_trait]
impl ToolHandler for SearchCommitsHandler {
    async fn handle(&self, input: Value) -> Result<Value> {
        let query = required_str(&input, "query")?;
        let limit = optional_usize(&input, "limit");
        let mode = mode_field(&input)?;
        let since = optional_since(&input, "since")?;

        let hits = self.searcher.search_commits(query, limit, mode, since).await?;
        Ok(json!(hits
            .into_iter()
            .map(|h| json!({
                "sha": h.sha,
                "message": h.message,
                "score": h.score,
                "committed_at": h.committed_at.map(|d| d.to_rfc3339()),
            }))
            .collect::<Vec<_>>()))
    }
}

struct AssembleContextHandler {
    assembler: Arc<ContextAssembler>,
}

#[async_trait]
impl ToolHandler for AssembleContextHandler {
    async fn handle(&self, input: Value) -> Result<Value> {
        let query = required_str(&input, "query")?;
        let limit = optional_usize(&input, "limit").unwrap_or(10);
        let max_tokens = optional_usize(&input, "max_tokens").unwrap_or(2000);

        let assembled = self.assembler.assemble(query, ContextTypes::all(), limit, max_tokens).await?;
        Ok(json!({
            "markdown": assembled.markdown,
            "total_tokens": assembled.total_tokens,
        }))
    }
}

struct RecordGatePassHandler {
    verifier: Arc<GatePassVerifier>,
}

#[async_trait]
impl ToolHandler for RecordGatePassHandler {
    async fn handle(&self, input: Value) -> Result<Value> {
        let task_id = required_str(&input, "task_id")?;
        let transition = required_str(&input, "transition")?;
        let commit_sha = required_str(&input, "commit_sha")?;

        self.verifier.record_gate_pass(task_id, transition, commit_sha).await?;
        Ok(json!({ "ok": true }))
    }
}

struct VerifyGatePassHandler {
    verifier: Arc<GatePassVerifier>,
}

#[async_trait]
impl ToolHandler for VerifyGatePassHandler {
    async fn handle(&self, input: Value) -> Result<Value> {
        let task_id = required_str(&input, "task_id")?;
        let transition = required_str(&input, "transition")?;
        let current_sha = required_str(&input, "current_sha")?;

        self.verifier.verify_gate_pass(task_id, transition, current_sha).await?;
        Ok(json!({ "ok": true }))
    }
}

struct StoreMemoryHandler {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl ToolHandler for StoreMemoryHandler {
    async fn handle(&self, input: Value) -> Result<Value> {
        let content = required_str(&input, "content")?.to_string();
        let category = required_enum::<MemoryCategory>(&input, "category")?;
        let importance = required_f32(&input, "importance")?;
        let tags = optional_tags(&input, "tags");

        let memory = self.store.store(content, category, importance, tags).await?;
        // Never echoes `content` back (spec.md §8 scenario 6).
        Ok(json!({
            "id": memory.id.to_string(),
            "category": memory.category.as_str(),
            "importance": memory.importance,
            "tags": memory.tags,
            "created_at": memory.created_at.to_rfc3339(),
        }))
    }
}

/// Builds the production tool registry: every public operation, registered
/// by name, with its dispatcher-enforced response-size contract attached.
#[must_use]
pub fn default_tools(
    metadata: Arc<dyn MetadataStore>,
    fast_embedder: Arc<dyn Embedder>,
    quality_embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
) -> ToolRegistry {
    let ghap = Arc::new(GhapStateMachine::new(metadata.clone()));
    let searcher = Arc::new(Searcher::new(fast_embedder, quality_embedder.clone(), vector_store.clone()));
    let context = Arc::new(ContextAssembler::new(searcher.clone()));
    let gatepass = Arc::new(GatePassVerifier::new(metadata));
    let memory_store = Arc::new(MemoryStore::new(quality_embedder, vector_store));

    let mut registry = ToolRegistry::new();

    registry.register(ToolDefinition {
        schema: ToolSchema {
            name: "start_ghap",
            description: "starts a new active GHAP entry for a session",
            required: &["session_id", "domain", "strategy", "goal", "hypothesis", "action", "prediction"],
            enum_fields: &[DOMAIN_FIELD, STRATEGY_FIELD],
            response_bound: Some(ResponseBound::Flat(500)),
        },
        handler: Arc::new(StartGhapHandler { machine: ghap.clone() }),
    });

    registry.register(ToolDefinition {
        schema: ToolSchema {
            name: "update_ghap",
            description: "applies a partial update to a session's active GHAP entry",
            required: &["session_id"],
            enum_fields: &[STRATEGY_FIELD],
            response_bound: Some(ResponseBound::Flat(500)),
        },
        handler: Arc::new(UpdateGhapHandler { machine: ghap.clone() }),
    });

    registry.register(ToolDefinition {
        schema: ToolSchema {
            name: "resolve_ghap",
            description: "resolves a session's active GHAP entry to terminal",
            required: &["session_id", "status", "result"],
            enum_fields: &[STATUS_FIELD],
            response_bound: Some(ResponseBound::Flat(2000)),
        },
        handler: Arc::new(ResolveGhapHandler { machine: ghap }),
    });

    registry.register(ToolDefinition {
        schema: ToolSchema {
            name: "search_memories",
            description: "searches the memories collection",
            required: &["query"],
            enum_fields: &[MODE_FIELD, CATEGORY_FIELD],
            response_bound: Some(ResponseBound::PerEntry(500)),
        },
        handler: Arc::new(SearchMemoriesHandler { searcher: searcher.clone() }),
    });

    registry.register(ToolDefinition {
        schema: ToolSchema {
            name: "search_code",
            description: "searches the code_units collection with the fast embedder",
            required: &["query"],
            enum_fields: &[MODE_FIELD],
            response_bound: Some(ResponseBound::PerEntry(500)),
        },
        handler: Arc::new(SearchCodeHandler { searcher: searcher.clone() }),
    });

    registry.register(ToolDefinition {
        schema: ToolSchema {
            name: "search_experiences",
            description: "searches one axis of the GHAP experience projections",
            required: &["query", "axis"],
            enum_fields: &[MODE_FIELD, AXIS_FIELD, DOMAIN_FIELD],
            response_bound: Some(ResponseBound::PerEntry(500)),
        },
        handler: Arc::new(SearchExperiencesHandler { searcher: searcher.clone() }),
    });

    registry.register(ToolDefinition {
        schema: ToolSchema {
            name: "search_values",
            description: "searches the values collection",
            required: &["query"],
            enum_fields: &[MODE_FIELD, AXIS_FIELD],
            response_bound: Some(ResponseBound::PerEntry(500)),
        },
        handler: Arc::new(SearchValuesHandler { searcher: searcher.clone() }),
    });

    registry.register(ToolDefinition {
        schema: ToolSchema {
            name: "search_commits",
            description: "searches the commits collection",
            required: &["query"],
            enum_fields: &[MODE_FIELD],
            response_bound: Some(ResponseBound::PerEntry(500)),
        },
        handler: Arc::new(SearchCommitsHandler { searcher }),
    });

    registry.register(ToolDefinition {
        schema: ToolSchema {
            name: "assemble_context",
            description: "composes retrieved values, experiences, and memories into a token-bounded markdown fragment",
            required: &["query"],
            enum_fields: &[],
            response_bound: None,
        },
        handler: Arc::new(AssembleContextHandler { assembler: context }),
    });

    registry.register(ToolDefinition {
        schema: ToolSchema {
            name: "record_gate_pass",
            description: "records that a gated phase transition's automated checks passed at a commit",
            required: &["task_id", "transition", "commit_sha"],
            enum_fields: &[],
            response_bound: None,
        },
        handler: Arc::new(RecordGatePassHandler { verifier: gatepass.clone() }),
    });

    registry.register(ToolDefinition {
        schema: ToolSchema {
            name: "verify_gate_pass",
            description: "verifies a gated phase transition has a recorded pass against the current commit",
            required: &["task_id", "transition", "current_sha"],
            enum_fields: &[],
            response_bound: None,
        },
        handler: Arc::new(VerifyGatePassHandler { verifier: gatepass }),
    });

    registry.register(ToolDefinition {
        schema: ToolSchema {
            name: "store_memory",
            description: "embeds and stores a freestanding memory assertion",
            required: &["content", "category", "importance"],
            enum_fields: &[CATEGORY_FIELD],
            response_bound: Some(ResponseBound::Flat(500)),
        },
        handler: Arc::new(StoreMemoryHandler { store: memory_store }),
    });

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbedder;
    use crate::metadata_store::InMemoryMetadataStore;
    use crate::vector_store::InMemoryVectorStore;
    use serde_json::json;

    fn registry() -> ToolRegistry {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let fast: Arc<dyn Embedder> = Arc::new(MockEmbedder::fast());
        let quality: Arc<dyn Embedder> = Arc::new(MockEmbedder::quality());
        let vector_store = Arc::new(InMemoryVectorStore::new());
        default_tools(metadata, fast, quality, vector_store)
    }

    #[tokio::test]
    async fn start_update_resolve_round_trip_through_the_dispatcher() {
        let registry = registry();

        let started = registry
            .dispatch(
                "start_ghap",
                json!({
                    "session_id": "s1",
                    "domain": "debugging",
                    "strategy": "systematic-elimination",
                    "goal": "fix the leak",
                    "hypothesis": "socket not closed",
                    "action": "add drop guard",
                    "prediction": "no more leak",
                }),
            )
            .await;
        assert!(started.get("error").is_none(), "{started}");
        assert!(started["id"].as_str().is_some());

        let updated = registry
            .dispatch("update_ghap", json!({"session_id": "s1", "hypothesis": "actually it's the listener"}))
            .await;
        assert!(updated.get("error").is_none(), "{updated}");

        let resolved = registry
            .dispatch("resolve_ghap", json!({"session_id": "s1", "status": "confirmed", "result": "fixed"}))
            .await;
        assert!(resolved.get("error").is_none(), "{resolved}");
        assert_eq!(resolved["outcome_status"], "confirmed");
        assert!(resolved.get("goal").is_none(), "resolve_ghap must not echo the entry's free-text fields");
    }

    #[tokio::test]
    async fn unknown_domain_is_rejected_before_the_handler_runs() {
        let registry = registry();
        let result = registry
            .dispatch(
                "start_ghap",
                json!({
                    "session_id": "s1",
                    "domain": "not-a-domain",
                    "strategy": "systematic-elimination",
                    "goal": "g",
                    "hypothesis": "h",
                    "action": "a",
                    "prediction": "p",
                }),
            )
            .await;
        assert_eq!(result["error"]["type"], "validation_error");
    }

    #[tokio::test]
    async fn store_memory_response_stays_under_budget_and_never_echoes_content() {
        let registry = registry();
        let result = registry
            .dispatch("store_memory", json!({"content": "x", "category": "fact", "importance": 0.5}))
            .await;
        assert!(result.get("error").is_none(), "{result}");
        assert!(result.get("content").is_none());
        let len = serde_json::to_vec(&result).unwrap().len();
        assert!(len <= 500, "response was {len} bytes: {result}");
    }

    #[tokio::test]
    async fn search_memories_returns_an_empty_list_for_an_empty_query() {
        let registry = registry();
        let result = registry.dispatch("search_memories", json!({"query": ""})).await;
        assert!(result.get("error").is_none(), "{result}");
        assert_eq!(result.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn dispatch_routes_to_every_registered_tool_name() {
        let registry = registry();
        for name in [
            "start_ghap",
            "update_ghap",
            "resolve_ghap",
            "search_memories",
            "search_code",
            "search_experiences",
            "search_values",
            "search_commits",
            "assemble_context",
            "record_gate_pass",
            "verify_gate_pass",
            "store_memory",
        ] {
            assert!(registry.schema(name).is_some(), "tool '{name}' is not registered");
        }
    }
}
