//! Best-effort salvage of clauses from a reply that failed to parse.
//!
//! Not a parser: at every `{` it tries to decode one `ClauseRecord` with a
//! streaming JSON reader and keeps the ones that decode on their own. After
//! a hit the scan resumes past that object, so braces inside its string
//! values are never revisited.

use crate::domain::ClauseRecord;
use serde_json::Deserializer;

/// Every object in `raw_text` that parses as a clause, in order.
pub fn recover_clauses(raw_text: &str) -> Vec<ClauseRecord> {
    let mut clauses = Vec::new();
    let mut pos = 0;

    while let Some(offset) = raw_text[pos..].find('{') {
        let start = pos + offset;
        let mut stream = Deserializer::from_str(&raw_text[start..]).into_iter::<ClauseRecord>();
        match stream.next() {
            Some(Ok(clause)) => {
                clauses.push(clause);
                pos = start + stream.byte_offset();
            }
            _ => pos = start + 1,
        }
    }

    clauses
}
