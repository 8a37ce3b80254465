//! Inbound port. UI (adapter) calls into the application.

use crate::domain::AnalysisError;

/// Input port: CLI/UI drives an interactive analysis session.
#[async_trait::async_trait]
pub trait InputPort: Send + Sync {
    /// Collect a meal description (and optional photo), analyse it, show the result.
    async fn run(&self) -> Result<(), AnalysisError>;
}
