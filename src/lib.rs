//! contract-ai: AI-assisted contract analysis with Hexagonal Architecture.
//!
//! Long contracts are split into chunks, analyzed concurrently by a remote
//! reasoning model, and merged back into one result.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
