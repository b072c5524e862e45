//! Implements ReportPort by writing Markdown files.
//!
//! One file per review, written with the write-replace pattern so a crash
//! never leaves a half-written report behind.

use crate::domain::{ContractReview, DomainError};
use crate::ports::ReportPort;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Markdown review reports under a directory.
pub struct MarkdownReportWriter {
    reports_dir: PathBuf,
}

impl MarkdownReportWriter {
    pub fn new(reports_dir: impl AsRef<Path>) -> Self {
        Self {
            reports_dir: reports_dir.as_ref().to_path_buf(),
        }
    }

    /// File name from the title: lowercase alphanumerics, everything else `_`.
    fn file_name(review: &ContractReview) -> String {
        let slug: String = review
            .title
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        let slug = slug.trim_matches('_');
        let slug = if slug.is_empty() { "contract" } else { slug };
        format!("review_{}_{}.md", slug, review.reviewed_at)
    }

    fn render(review: &ContractReview) -> String {
        let timestamp = DateTime::<Utc>::from_timestamp(review.reviewed_at, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        let mut md = String::new();

        // Header
        md.push_str(&format!("# Contract Review: {}\n\n", review.title));
        md.push_str(&format!("**Reviewed:** {}\n\n", timestamp));
        md.push_str("---\n\n");

        // Verdict
        let verdict = if review.evaluation.approved {
            "✅ APPROVED"
        } else {
            "❌ NOT APPROVED"
        };
        md.push_str(&format!("## ⚖️ Verdict: {}\n\n", verdict));
        md.push_str(&review.evaluation.reasoning);
        md.push_str(&format!("\n\n*Model: {}*\n\n", review.evaluation.model_used));

        // Analysis
        md.push_str("## 📝 Analysis\n\n");
        md.push_str(&review.analysis.analysis);
        md.push_str(&format!("\n\n*Model: {}*\n\n", review.analysis.model_used));

        // Clauses
        md.push_str(&format!(
            "## 📑 Clauses ({})\n\n",
            review.clauses.clause_count
        ));
        if review.clauses.clauses.is_empty() {
            md.push_str("No clauses extracted.\n\n");
        } else {
            md.push_str("| Type | Risk | Content |\n");
            md.push_str("|------|------|---------|\n");
            for clause in &review.clauses.clauses {
                md.push_str(&format!(
                    "| {} | {} | {} |\n",
                    escape_cell(&clause.clause_type),
                    clause.risk_level,
                    escape_cell(&clause.content)
                ));
            }
            md.push('\n');

            for clause in review.clauses.clauses.iter().filter(|c| !c.obligations.is_empty()) {
                md.push_str(&format!("### {}\n\n", clause.clause_type));
                for obligation in &clause.obligations {
                    md.push_str(&format!("- [ ] {}\n", obligation));
                }
                md.push('\n');
            }
        }
        if let Some(error) = &review.clauses.error {
            md.push_str(&format!("> ⚠️ {}\n\n", error));
        }

        // Footer
        md.push_str("---\n");
        md.push_str("*Generated by contract-ai*\n");

        md
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[async_trait::async_trait]
impl ReportPort for MarkdownReportWriter {
    async fn write_review(&self, review: &ContractReview) -> Result<PathBuf, DomainError> {
        fs::create_dir_all(&self.reports_dir)
            .await
            .map_err(|e| DomainError::Report(format!("create reports dir: {}", e)))?;

        let path = self.reports_dir.join(Self::file_name(review));
        let md = Self::render(review);

        let temp_path = path.with_extension("md.tmp");
        let mut f = fs::File::create(&temp_path)
            .await
            .map_err(|e| DomainError::Report(format!("create temp file: {}", e)))?;
        f.write_all(md.as_bytes())
            .await
            .map_err(|e| DomainError::Report(format!("write temp file: {}", e)))?;
        f.sync_all()
            .await
            .map_err(|e| DomainError::Report(format!("sync temp file: {}", e)))?;
        drop(f);

        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| DomainError::Report(format!("atomic rename failed: {}", e)))?;

        info!(path = %path.display(), "review report written");
        Ok(path)
    }
}
