//! Infrastructure adapters. Implement outbound ports.
//!
//! AI providers, result cache, connectivity probe, terminal UI. Map errors to AnalysisError.

pub mod ai;
pub mod cache;
pub mod network;
pub mod ui;
