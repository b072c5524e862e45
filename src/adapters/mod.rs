//! Infrastructure adapters. Implement outbound ports.
//!
//! Remote AI service, result cache, reports, terminal UI.

pub mod ai;
pub mod persistence;
pub mod ui;
