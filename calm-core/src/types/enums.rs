//! Closed enumerations used across GHAP entries, memories, and search.
//!
//! Every enum here is the single source of truth for its accepted set:
//! [`std::str::FromStr`] and [`std::fmt::Display`] round-trip exactly, and
//! `VARIANTS`/`as_str` lists are what [`crate::error::Error::Validation`]
//! messages quote so that enum-conformance is bidirectional by construction
//! (spec.md §8 invariant 9).

use serde::{Deserialize, Serialize};

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// All accepted string labels, in declaration order.
            pub const VARIANTS: &'static [&'static str] = &[$($label),+];

            /// The canonical string label for this variant.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(format!(
                        "invalid {} '{}': expected one of {}",
                        stringify!($name),
                        s,
                        Self::VARIANTS.join(", "),
                    )),
                }
            }
        }
    };
}

closed_enum! {
    /// Classification of the kind of work a GHAP entry records (spec.md §3).
    Domain {
        Debugging => "debugging",
        Refactoring => "refactoring",
        Feature => "feature",
        Testing => "testing",
        Performance => "performance",
        Documentation => "documentation",
        Investigation => "investigation",
        Other => "other",
    }
}

closed_enum! {
    /// The strategy an agent chose for a GHAP entry (spec.md §3).
    Strategy {
        SystematicElimination => "systematic-elimination",
        BinarySearch => "binary-search",
        TrialAndError => "trial-and-error",
        RootCauseAnalysis => "root-cause-analysis",
        Incremental => "incremental",
        Rewrite => "rewrite",
        Delegation => "delegation",
        Other => "other",
    }
}

closed_enum! {
    /// Terminal resolution of a GHAP entry (spec.md §3).
    OutcomeStatus {
        Confirmed => "confirmed",
        Falsified => "falsified",
        Abandoned => "abandoned",
    }
}

closed_enum! {
    /// Derived quality tier of a resolved GHAP entry (spec.md §3).
    ConfidenceTier {
        Gold => "gold",
        Silver => "silver",
        Bronze => "bronze",
        Abandoned => "abandoned",
    }
}

impl ConfidenceTier {
    /// The confidence-weighted-mean weight used by the clusterer's centroid
    /// computation (spec.md §3, §4.4).
    #[must_use]
    pub fn weight(&self) -> f32 {
        match self {
            ConfidenceTier::Gold => 1.0,
            ConfidenceTier::Silver => 0.7,
            ConfidenceTier::Bronze => 0.4,
            ConfidenceTier::Abandoned => 0.0,
        }
    }
}

closed_enum! {
    /// Category of a freestanding [`crate::memory::Memory`] assertion (spec.md §3).
    MemoryCategory {
        Preference => "preference",
        Fact => "fact",
        Event => "event",
        Workflow => "workflow",
        Context => "context",
        Error => "error",
        Decision => "decision",
    }
}

closed_enum! {
    /// Category of a root-cause explanation on a falsified GHAP entry.
    RootCauseCategory {
        EnvDrift => "env-drift",
        LogicError => "logic-error",
        MisunderstoodRequirement => "misunderstood-requirement",
        ToolingLimitation => "tooling-limitation",
        StaleAssumption => "stale-assumption",
        Other => "other",
    }
}

closed_enum! {
    /// One of the four semantic projections a resolved GHAP is rendered to
    /// (spec.md §4.2).
    Axis {
        Full => "full",
        Strategy => "strategy",
        Surprise => "surprise",
        RootCause => "root_cause",
    }
}

impl Axis {
    /// All axes, used when computing the full projection set for a GHAP.
    pub const ALL: [Axis; 4] = [Axis::Full, Axis::Strategy, Axis::Surprise, Axis::RootCause];

    /// The vector collection name this axis writes to (spec.md §4.2, §6.2).
    #[must_use]
    pub fn collection_name(&self) -> &'static str {
        match self {
            Axis::Full => "ghap_full",
            Axis::Strategy => "ghap_strategy",
            Axis::Surprise => "ghap_surprise",
            Axis::RootCause => "ghap_root_cause",
        }
    }
}

closed_enum! {
    /// Source of a retrieved [`crate::context::ContextItem`] (spec.md §4.5).
    ContextSource {
        Values => "values",
        Experiences => "experiences",
        Memories => "memories",
    }
}

closed_enum! {
    /// Search execution mode (spec.md §4.3).
    SearchMode {
        Semantic => "semantic",
        Keyword => "keyword",
        Hybrid => "hybrid",
    }
}

closed_enum! {
    /// Gated phase transitions that require a proven gate pass (spec.md §4.6).
    GatedTransition {
        ImplementToCodeReview => "IMPLEMENT-CODE_REVIEW",
        TestToIntegrate => "TEST-INTEGRATE",
        InvestigatedToFixed => "INVESTIGATED-FIXED",
        ReviewedToTested => "REVIEWED-TESTED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn domain_round_trips() {
        for label in Domain::VARIANTS {
            let parsed = Domain::from_str(label).unwrap();
            assert_eq!(parsed.as_str(), *label);
        }
    }

    #[test]
    fn strategy_round_trips() {
        for label in Strategy::VARIANTS {
            let parsed = Strategy::from_str(label).unwrap();
            assert_eq!(parsed.as_str(), *label);
        }
    }

    #[test]
    fn invalid_enum_message_lists_all_variants() {
        let err = Domain::from_str("bogus").unwrap_err();
        for label in Domain::VARIANTS {
            assert!(err.contains(label), "missing {label} in: {err}");
        }
    }

    #[test]
    fn confidence_tier_weights() {
        assert_eq!(ConfidenceTier::Gold.weight(), 1.0);
        assert_eq!(ConfidenceTier::Silver.weight(), 0.7);
        assert_eq!(ConfidenceTier::Bronze.weight(), 0.4);
        assert_eq!(ConfidenceTier::Abandoned.weight(), 0.0);
    }

    #[test]
    fn axis_collection_names_match_spec() {
        assert_eq!(Axis::Full.collection_name(), "ghap_full");
        assert_eq!(Axis::Strategy.collection_name(), "ghap_strategy");
        assert_eq!(Axis::Surprise.collection_name(), "ghap_surprise");
        assert_eq!(Axis::RootCause.collection_name(), "ghap_root_cause");
    }
}
