//! Implements InputPort. Inquire-based interactive menu.
//!
//! Reads a contract from a file path, runs the chosen operation and prints
//! the result envelope as JSON.

use crate::adapters::ui::progress::with_spinner;
use crate::domain::DomainError;
use crate::ports::{InputPort, ReportPort};
use crate::usecases::AnalysisService;
use async_trait::async_trait;
use inquire::error::InquireError;
use inquire::ui::{Attributes, Color, RenderConfig, StyleSheet, Styled};
use inquire::{Select, Text};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const NEON_PURPLE: Color = Color::Rgb {
    r: 0xbc,
    g: 0x13,
    b: 0xfe,
};
const CYBER_GREEN: Color = Color::Rgb {
    r: 0x0f,
    g: 0xf0,
    b: 0xfc,
};

/// Neon theme for every inquire prompt.
pub fn apply_theme() {
    let config = RenderConfig::default_colored()
        .with_prompt_prefix(Styled::new("❯").with_fg(NEON_PURPLE))
        .with_highlighted_option_prefix(Styled::new("➤").with_fg(CYBER_GREEN))
        .with_answer(
            StyleSheet::new()
                .with_fg(CYBER_GREEN)
                .with_attr(Attributes::BOLD),
        );
    inquire::set_global_render_config(config);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Analyze,
    Evaluate,
    ExtractClauses,
    FullReview,
    TestConnection,
    ShowMetrics,
    Quit,
}

impl MenuAction {
    const ALL: [MenuAction; 7] = [
        MenuAction::Analyze,
        MenuAction::Evaluate,
        MenuAction::ExtractClauses,
        MenuAction::FullReview,
        MenuAction::TestConnection,
        MenuAction::ShowMetrics,
        MenuAction::Quit,
    ];
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MenuAction::Analyze => "📝 Analyze contract",
            MenuAction::Evaluate => "⚖️  Evaluate contract",
            MenuAction::ExtractClauses => "📑 Extract clauses",
            MenuAction::FullReview => "📋 Full review (save Markdown report)",
            MenuAction::TestConnection => "🔌 Test API connection",
            MenuAction::ShowMetrics => "📊 Show metrics",
            MenuAction::Quit => "🚪 Quit",
        };
        f.write_str(label)
    }
}

/// Report title from the contract file name.
fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().replace(['_', '-'], " "))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "Contract".to_string())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => warn!(error = %e, "could not render result"),
    }
}

/// Esc and Ctrl+C leave the menu instead of failing the run.
fn is_cancel(e: &InquireError) -> bool {
    matches!(
        e,
        InquireError::OperationCanceled | InquireError::OperationInterrupted
    )
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    service: Arc<AnalysisService>,
    reports: Arc<dyn ReportPort>,
}

impl TuiInputPort {
    pub fn new(service: Arc<AnalysisService>, reports: Arc<dyn ReportPort>) -> Self {
        Self { service, reports }
    }

    /// Prompt for a path and read the contract. `None` when cancelled.
    async fn read_contract(&self) -> Result<Option<(String, String)>, DomainError> {
        let path = match Text::new("Path to contract file:").prompt() {
            Ok(p) => p,
            Err(e) if is_cancel(&e) => return Ok(None),
            Err(e) => return Err(DomainError::Input(e.to_string())),
        };
        let path = Path::new(path.trim());

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DomainError::Input(format!("read {}: {}", path.display(), e)))?;
        if text.trim().is_empty() {
            return Err(DomainError::Input(format!("{} is empty", path.display())));
        }

        info!(path = %path.display(), chars = text.chars().count(), "contract loaded");
        Ok(Some((title_from_path(path), text)))
    }

    async fn handle(&self, action: MenuAction) -> Result<(), DomainError> {
        match action {
            MenuAction::Analyze => {
                if let Some((_, text)) = self.read_contract().await? {
                    let result =
                        with_spinner("Analyzing contract...", self.service.analyze_contract(&text))
                            .await;
                    print_json(&result);
                }
            }
            MenuAction::Evaluate => {
                if let Some((_, text)) = self.read_contract().await? {
                    let result = with_spinner(
                        "Evaluating contract...",
                        self.service.evaluate_contract(&text),
                    )
                    .await;
                    print_json(&result);
                }
            }
            MenuAction::ExtractClauses => {
                if let Some((_, text)) = self.read_contract().await? {
                    let result =
                        with_spinner("Extracting clauses...", self.service.extract_clauses(&text))
                            .await;
                    print_json(&result);
                }
            }
            MenuAction::FullReview => {
                if let Some((title, text)) = self.read_contract().await? {
                    let review = with_spinner(
                        "Reviewing contract...",
                        self.service.review_contract(&title, &text),
                    )
                    .await;
                    let path = self.reports.write_review(&review).await?;
                    println!(
                        "{} | report saved to {}",
                        if review.evaluation.approved {
                            "✅ APPROVED"
                        } else {
                            "❌ NOT APPROVED"
                        },
                        path.display()
                    );
                }
            }
            MenuAction::TestConnection => {
                let ok =
                    with_spinner("Contacting AI service...", self.service.test_api_connection())
                        .await;
                if ok {
                    println!("✅ AI service reachable");
                } else {
                    println!("❌ AI service unreachable (see logs)");
                }
            }
            MenuAction::ShowMetrics => print_json(&self.service.metrics().snapshot()),
            MenuAction::Quit => {}
        }
        Ok(())
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let action = match Select::new("What do you want to do?", MenuAction::ALL.to_vec())
                .prompt()
            {
                Ok(a) => a,
                Err(e) if is_cancel(&e) => break,
                Err(e) => return Err(DomainError::Input(e.to_string())),
            };

            if action == MenuAction::Quit {
                break;
            }

            // A failed action is reported and the menu continues.
            if let Err(e) = self.handle(action).await {
                warn!(error = %e, "action failed");
                println!("⚠️  {}", e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_path() {
        assert_eq!(
            title_from_path(Path::new("/tmp/lease_agreement-2026.txt")),
            "lease agreement 2026"
        );
        assert_eq!(title_from_path(Path::new("/")), "Contract");
    }

    #[test]
    fn test_menu_ends_with_quit() {
        assert_eq!(MenuAction::ALL.last(), Some(&MenuAction::Quit));
        assert!(MenuAction::FullReview.to_string().contains("report"));
    }
}
