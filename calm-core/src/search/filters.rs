//! Filter translation: scalar parameters and datetime-since bounds into
//! [`Filter`] trees, ANDed together (spec.md §4.3).

use chrono::{DateTime, Utc};
use serde_json::Value as Json;

use crate::vector_store::Filter;

/// Accumulates equality and `since` constraints, producing `None` when
/// nothing was added (an unconstrained search) rather than an empty `And`.
#[derive(Debug, Default)]
pub struct FilterBuilder {
    clauses: Vec<Filter>,
}

impl FilterBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality constraint if `value` is present.
    #[must_use]
    pub fn eq_opt(mut self, field: &str, value: Option<Json>) -> Self {
        if let Some(value) = value {
            self.clauses.push(Filter::Eq {
                field: field.to_string(),
                value,
            });
        }
        self
    }

    /// Adds a `$gte` datetime-since constraint if `since` is present,
    /// rendered as RFC 3339 for comparison against stored ISO-8601 strings.
    #[must_use]
    pub fn since_opt(mut self, field: &str, since: Option<DateTime<Utc>>) -> Self {
        if let Some(since) = since {
            self.clauses.push(Filter::Gte {
                field: field.to_string(),
                value: Json::String(since.to_rfc3339()),
            });
        }
        self
    }

    /// Finalizes the filter; `None` if no clauses were added.
    #[must_use]
    pub fn build(self) -> Option<Filter> {
        match self.clauses.len() {
            0 => None,
            1 => self.clauses.into_iter().next(),
            _ => Some(Filter::And(self.clauses)),
        }
    }
}

/// Parses a datetime from a payload field that may be an epoch-seconds
/// number or an ISO-8601 string using either `+00:00` or `Z` suffix
/// (spec.md §4.3 result mapping).
#[must_use]
pub fn parse_payload_datetime(payload: &Json, field: &str) -> Option<DateTime<Utc>> {
    match payload.get(field)? {
        Json::Number(n) => {
            let secs = n.as_f64()?;
            DateTime::from_timestamp(secs as i64, 0)
        }
        Json::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}
