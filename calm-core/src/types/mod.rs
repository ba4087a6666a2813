//! Core data model shared across the pipeline (spec.md §3).

mod context;
mod enums;
mod ghap;
mod journal;
mod memory;
mod value;

pub use context::ContextItem;
pub use enums::{
    Axis, ConfidenceTier, ContextSource, Domain, GatedTransition, MemoryCategory,
    OutcomeStatus, RootCauseCategory, SearchMode, Strategy,
};
pub use ghap::{
    GHAPEntry, GHAPStatus, Lesson, Outcome, RootCause, FIELD_MAX_LEN, RESULT_MAX_LEN,
    SURPRISE_MAX_LEN,
};
pub use journal::SessionJournalEntry;
pub use memory::Memory;
pub use value::{ClusterInfo, GatePass, Value, VALUE_TEXT_MAX_LEN};
