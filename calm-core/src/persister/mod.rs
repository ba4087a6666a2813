//! Multi-axis embedding persister (spec.md §4, component 5).

mod projection;
pub mod templates;

pub use projection::{applicable_axes, ObservationPersister};
