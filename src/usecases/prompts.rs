//! Fixed system instructions, one per operation.

use crate::domain::OperationKind;

const ANALYZE: &str = "You are a legal AI agent specialized in contract analysis. \
Given a contract text, identify clauses, detect potential risks, summarize obligations, \
and evaluate legal soundness. Highlight anything unusual, missing, or inconsistent. \
Respond clearly and concisely, suitable for both legal and non-legal readers.";

const EVALUATE: &str = "You are a legal AI responsible for evaluating the overall health of a contract. \
Given a full contract text, identify whether it meets standard legal expectations. \
Check for clarity, completeness of clauses, risk balance between parties, and enforceability. \
Then answer clearly if the contract should be APPROVED or NOT APPROVED, and explain your reasoning.";

const EXTRACT_CLAUSES: &str = r#"You are a legal AI that extracts clauses from contracts.

Return ONLY a JSON array. No markdown, no explanations outside JSON.
Each element must have exactly these fields:
{
  "type": "clause type label",
  "content": "the clause text or a faithful summary of it",
  "risk_level": "low" | "medium" | "high",
  "obligations": ["obligation 1", "obligation 2"]
}

Use one of these labels for "type" when it fits: Payment Terms, Termination,
Confidentiality, Liability, Indemnification, Intellectual Property,
Governing Law, Dispute Resolution, Force Majeure, Warranties, Non-Compete,
Assignment, Delivery, Term and Renewal. Otherwise use a short descriptive label.

If the text contains no clauses, return an empty array: []"#;

const CONNECTION_TEST: &str = "Reply with the single word: pong";

/// System instruction for `operation`.
pub fn system_prompt(operation: OperationKind) -> &'static str {
    match operation {
        OperationKind::Analyze => ANALYZE,
        OperationKind::Evaluate => EVALUATE,
        OperationKind::ExtractClauses => EXTRACT_CLAUSES,
        OperationKind::ConnectionTest => CONNECTION_TEST,
    }
}
