//! Persistence adapters: result cache and review reports.

pub mod markdown_report;
pub mod memory_cache;

pub use markdown_report::MarkdownReportWriter;
pub use memory_cache::InMemoryResultCache;
