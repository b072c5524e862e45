//! Application use cases. Orchestrate domain logic via ports.

pub mod aggregator;
pub mod analysis_service;
pub mod chunker;
pub mod clause_parser;
pub mod clause_recovery;
pub mod orchestrator;
pub mod prompts;

pub use analysis_service::AnalysisService;
pub use orchestrator::ChunkOrchestrator;
