//! Case-insensitive substring search over designated payload text fields
//! (spec.md §4.3 mode `keyword`).

use serde_json::Value as Json;

/// Counts case-insensitive occurrences of `query` across `fields` of
/// `payload`, normalized by the word count of the concatenated field text
/// so longer records don't win purely on length.
#[must_use]
pub fn keyword_score(payload: &Json, fields: &[&str], query: &str) -> f32 {
    if query.is_empty() {
        return 0.0;
    }
    let query_lower = query.to_lowercase();
    let mut matches = 0usize;
    let mut word_count = 0usize;

    for field in fields {
        let Some(Json::String(text)) = payload.get(*field) else {
            continue;
        };
        let lower = text.to_lowercase();
        matches += lower.matches(&query_lower).count();
        word_count += lower.split_whitespace().count();
    }

    if word_count == 0 {
        return 0.0;
    }
    matches as f32 / word_count as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_query_scores_zero() {
        let payload = json!({"text": "port collision"});
        assert_eq!(keyword_score(&payload, &["text"], ""), 0.0);
    }

    #[test]
    fn match_increases_score() {
        let payload = json!({"text": "the port was held by another process"});
        let hit = keyword_score(&payload, &["text"], "port");
        let miss = keyword_score(&payload, &["text"], "nonexistent");
        assert!(hit > miss);
        assert_eq!(miss, 0.0);
    }

    #[test]
    fn case_insensitive() {
        let payload = json!({"text": "PORT collision"});
        assert!(keyword_score(&payload, &["text"], "port") > 0.0);
    }
}
