//! Application use cases. Orchestrate domain logic via ports.

pub mod network_monitor;
pub mod orchestrator;

pub use network_monitor::NetworkConditionMonitor;
pub use orchestrator::{AnalysisOrchestrator, AnalysisOutcome, ResultSource};
