//! The GHAP entry: the primary learning record (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ConfidenceTier, Domain, OutcomeStatus, RootCauseCategory, Strategy};
use crate::error::{Error, Result};

/// Maximum length of `goal`, `hypothesis`, `action`, and `prediction`.
pub const FIELD_MAX_LEN: usize = 1_000;
/// Maximum length of `outcome.result`.
pub const RESULT_MAX_LEN: usize = 2_000;
/// Maximum length of `surprise`.
pub const SURPRISE_MAX_LEN: usize = 1_000;

/// Lifecycle status of a [`GHAPEntry`] (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GHAPStatus {
    /// The single mutable entry a session may hold.
    Active,
    /// Resolved; immutable; eligible for persistence.
    Terminal,
}

/// Root-cause explanation attached to a falsified entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootCause {
    pub category: RootCauseCategory,
    pub description: String,
}

/// Recovered lesson attached to a falsified entry with useful signal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Lesson {
    pub what_worked: Option<String>,
    pub takeaway: Option<String>,
}

impl Lesson {
    fn is_present(&self) -> bool {
        self.what_worked.as_ref().is_some_and(|s| !s.is_empty())
            || self.takeaway.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// Terminal resolution of a [`GHAPEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub status: OutcomeStatus,
    pub result: String,
    pub captured_at: DateTime<Utc>,
}

/// The primary learning record: Goal/Hypothesis/Action/Prediction (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GHAPEntry {
    pub id: Uuid,
    pub session_id: String,
    pub domain: Domain,
    pub strategy: Strategy,
    pub goal: String,
    pub hypothesis: String,
    pub action: String,
    pub prediction: String,
    pub status: GHAPStatus,
    pub iteration_count: u32,
    pub outcome: Option<Outcome>,
    pub surprise: Option<String>,
    pub root_cause: Option<RootCause>,
    pub lesson: Option<Lesson>,
    pub confidence_tier: Option<ConfidenceTier>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GHAPEntry {
    /// Validates the four required fields against `FIELD_MAX_LEN` (spec.md §3).
    pub fn validate_core_fields(
        goal: &str,
        hypothesis: &str,
        action: &str,
        prediction: &str,
    ) -> Result<()> {
        for (name, value) in [
            ("goal", goal),
            ("hypothesis", hypothesis),
            ("action", action),
            ("prediction", prediction),
        ] {
            if value.is_empty() {
                return Err(Error::validation(format!("{name} must not be empty")));
            }
            if value.chars().count() > FIELD_MAX_LEN {
                return Err(Error::validation(format!(
                    "{name} exceeds {FIELD_MAX_LEN} characters"
                )));
            }
        }
        Ok(())
    }

    /// Whether this entry is the active, mutable entry of its session.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == GHAPStatus::Active
    }

    /// Derives the confidence tier from `status × iteration_count × presence(lesson)`
    /// per spec.md §4.1.
    ///
    /// - gold: confirmed on the first try (`iteration_count == 0`).
    /// - silver: confirmed after at least one iteration.
    /// - bronze: falsified but a usable lesson was recovered.
    /// - abandoned: abandoned outright, or falsified with no recovered lesson.
    #[must_use]
    pub fn derive_confidence_tier(
        status: OutcomeStatus,
        iteration_count: u32,
        lesson: Option<&Lesson>,
    ) -> ConfidenceTier {
        match status {
            OutcomeStatus::Confirmed if iteration_count == 0 => ConfidenceTier::Gold,
            OutcomeStatus::Confirmed => ConfidenceTier::Silver,
            OutcomeStatus::Falsified if lesson.is_some_and(Lesson::is_present) => {
                ConfidenceTier::Bronze
            }
            OutcomeStatus::Falsified | OutcomeStatus::Abandoned => ConfidenceTier::Abandoned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_field() {
        let long = "x".repeat(FIELD_MAX_LEN + 1);
        let err = GHAPEntry::validate_core_fields(&long, "h", "a", "p").unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn rejects_empty_field() {
        let err = GHAPEntry::validate_core_fields("", "h", "a", "p").unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn confirmed_first_try_is_gold() {
        let tier = GHAPEntry::derive_confidence_tier(OutcomeStatus::Confirmed, 0, None);
        assert_eq!(tier, ConfidenceTier::Gold);
    }

    #[test]
    fn confirmed_after_iteration_is_silver() {
        let tier = GHAPEntry::derive_confidence_tier(OutcomeStatus::Confirmed, 2, None);
        assert_eq!(tier, ConfidenceTier::Silver);
    }

    #[test]
    fn falsified_with_lesson_is_bronze() {
        let lesson = Lesson {
            what_worked: Some("lsof -i :6334".into()),
            takeaway: None,
        };
        let tier = GHAPEntry::derive_confidence_tier(OutcomeStatus::Falsified, 1, Some(&lesson));
        assert_eq!(tier, ConfidenceTier::Bronze);
    }

    #[test]
    fn falsified_without_lesson_is_abandoned() {
        let tier = GHAPEntry::derive_confidence_tier(OutcomeStatus::Falsified, 1, None);
        assert_eq!(tier, ConfidenceTier::Abandoned);
    }

    #[test]
    fn abandoned_is_abandoned() {
        let tier = GHAPEntry::derive_confidence_tier(OutcomeStatus::Abandoned, 0, None);
        assert_eq!(tier, ConfidenceTier::Abandoned);
    }
}
