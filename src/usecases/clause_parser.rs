//! Primary decode of clause-extraction replies.
//!
//! Models often wrap JSON in markdown fences or add sentences around it.
//! `sanitize_json` strips fences and leading prose; the decode then reads
//! only the first JSON value, so trailing prose never breaks it.

use crate::domain::{AiError, ClauseRecord};
use serde_json::Deserializer;

/// Strip markdown code fences, or drop any prose before the first `[`.
pub fn sanitize_json(raw_text: &str) -> String {
    let trimmed = raw_text.trim();

    // ```json ... ``` or ``` ... ```
    if let Some(rest) = trimmed.strip_prefix("```") {
        let without_prefix = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end_idx) = without_prefix.rfind("```") {
            return without_prefix[..end_idx].trim().to_string();
        }
        return without_prefix.trim().to_string();
    }

    match trimmed.find('[') {
        Some(start) => trimmed[start..].to_string(),
        None => trimmed.to_string(),
    }
}

/// Decode the leading JSON array of `text`, ignoring whatever follows it.
fn first_array(text: &str) -> Result<Vec<ClauseRecord>, serde_json::Error> {
    let mut stream = Deserializer::from_str(text).into_iter::<Vec<ClauseRecord>>();
    match stream.next() {
        Some(result) => result,
        None => serde_json::from_str(text),
    }
}

/// Parse a reply as a JSON array of clauses.
///
/// Tries the sanitized text first, then every later `[` in it, so a
/// bracketed aside before the array (`"see [1]: [...]"`) is skipped too.
/// Later candidates must be non-empty: a nested `"obligations": []` is not
/// the clause array.
pub fn parse_clause_reply(raw_text: &str) -> Result<Vec<ClauseRecord>, AiError> {
    let clean = sanitize_json(raw_text);
    let first_error = match first_array(&clean) {
        Ok(clauses) => return Ok(clauses),
        Err(e) => e,
    };

    clean
        .char_indices()
        .skip(1)
        .filter(|(_, c)| *c == '[')
        .find_map(|(i, _)| first_array(&clean[i..]).ok().filter(|c| !c.is_empty()))
        .ok_or_else(|| AiError::JsonParse(first_error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RiskLevel;

    const TWO_CLAUSES: &str = r#"[
        {"type": "Payment Terms", "content": "20% deposit", "risk_level": "low", "obligations": ["Pay deposit"]},
        {"type": "Termination", "content": "30 days notice", "risk_level": "medium", "obligations": []}
    ]"#;

    #[test]
    fn test_sanitize_json_clean() {
        let input = r#"[{"type": "x"}]"#;
        assert_eq!(sanitize_json(input), input);
    }

    #[test]
    fn test_sanitize_json_markdown() {
        let input = "```json\n[{\"type\": \"x\"}]\n```";
        assert_eq!(sanitize_json(input), r#"[{"type": "x"}]"#);
    }

    #[test]
    fn test_sanitize_json_markdown_no_lang() {
        let input = "```\n[]\n```";
        assert_eq!(sanitize_json(input), "[]");
    }

    #[test]
    fn test_sanitize_json_with_text() {
        let input = "Here are the clauses:\n[{\"type\": \"x\"}]";
        assert_eq!(sanitize_json(input), r#"[{"type": "x"}]"#);
    }

    #[test]
    fn test_parse_valid_array() {
        let clauses = parse_clause_reply(TWO_CLAUSES).unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].clause_type, "Payment Terms");
        assert_eq!(clauses[0].risk_level, RiskLevel::Low);
        assert_eq!(clauses[1].clause_type, "Termination");
    }

    #[test]
    fn test_parse_ignores_trailing_prose_with_brackets() {
        let reply = format!("Here you go:\n{}\nNote: see clause [3] for details.", TWO_CLAUSES);
        let clauses = parse_clause_reply(&reply).unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[1].clause_type, "Termination");
    }

    #[test]
    fn test_parse_skips_bracketed_aside_before_array() {
        let reply = format!("Per section [2.1] of the contract: {}", TWO_CLAUSES);
        let clauses = parse_clause_reply(&reply).unwrap();
        assert_eq!(clauses.len(), 2);
    }

    #[test]
    fn test_parse_rejects_prose() {
        let err = parse_clause_reply("Invalid JSON response from AI").unwrap_err();
        assert!(matches!(err, AiError::JsonParse(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_risk_level() {
        let reply = r#"[{"type": "x", "content": "y", "risk_level": "extreme", "obligations": []}]"#;
        assert!(parse_clause_reply(reply).is_err());
    }
}
