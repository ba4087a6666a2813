//! Freestanding factual assertions, independent of any GHAP entry (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::MemoryCategory;
use crate::error::{Error, Result};

/// Maximum length of [`Memory::content`].
pub const CONTENT_MAX_LEN: usize = 10_000;
/// Maximum number of tags.
pub const MAX_TAGS: usize = 20;
/// Maximum length of a single tag.
pub const TAG_MAX_LEN: usize = 50;

/// A freestanding factual assertion captured outside the GHAP lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,
    pub content: String,
    pub category: MemoryCategory,
    pub importance: f32,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Memory {
    /// Validates `content`, `importance`, and `tags` against spec.md §3 bounds.
    pub fn validate(content: &str, importance: f32, tags: &[String]) -> Result<()> {
        if content.is_empty() {
            return Err(Error::validation("content must not be empty"));
        }
        if content.chars().count() > CONTENT_MAX_LEN {
            return Err(Error::validation(format!(
                "content exceeds {CONTENT_MAX_LEN} characters"
            )));
        }
        if !(0.0..=1.0).contains(&importance) {
            return Err(Error::validation(format!(
                "importance must be within [0.0, 1.0], got {importance}"
            )));
        }
        if tags.len() > MAX_TAGS {
            return Err(Error::validation(format!(
                "at most {MAX_TAGS} tags are allowed, got {}",
                tags.len()
            )));
        }
        if let Some(tag) = tags.iter().find(|t| t.chars().count() > TAG_MAX_LEN) {
            return Err(Error::validation(format!(
                "tag '{tag}' exceeds {TAG_MAX_LEN} characters"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_importance_accepted() {
        assert!(Memory::validate("x", 0.0, &[]).is_ok());
        assert!(Memory::validate("x", 1.0, &[]).is_ok());
    }

    #[test]
    fn out_of_range_importance_rejected() {
        assert!(Memory::validate("x", -0.0001, &[]).is_err());
        assert!(Memory::validate("x", 1.0001, &[]).is_err());
    }

    #[test]
    fn too_many_tags_rejected() {
        let tags: Vec<String> = (0..MAX_TAGS + 1).map(|i| i.to_string()).collect();
        assert!(Memory::validate("x", 0.5, &tags).is_err());
    }
}
