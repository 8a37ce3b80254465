//! Progress port. Fire-and-forget milestone events from the orchestrator.

use crate::domain::{ProviderId, Strategy};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Named milestone of one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    CheckingCache,
    CacheHit,
    OptimizingImage,
    SelectingStrategy(Strategy),
    SendingRequest(ProviderId),
    ParsingResponse(ProviderId),
    Completed,
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressStage::CheckingCache => f.write_str("checking cache"),
            ProgressStage::CacheHit => f.write_str("using cached analysis"),
            ProgressStage::OptimizingImage => f.write_str("optimizing image"),
            ProgressStage::SelectingStrategy(s) => write!(f, "selecting strategy ({})", s),
            ProgressStage::SendingRequest(p) => write!(f, "sending request to {}", p),
            ProgressStage::ParsingResponse(p) => write!(f, "parsing response from {}", p),
            ProgressStage::Completed => f.write_str("analysis complete"),
        }
    }
}

/// Receives progress events. Must not block.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, stage: ProgressStage);
}

impl ProgressSink for mpsc::UnboundedSender<ProgressStage> {
    fn emit(&self, stage: ProgressStage) {
        // Receiver gone means nobody is listening any more.
        let _ = self.send(stage);
    }
}

/// Optional sink handle. Cheap to clone into spawned attempts.
#[derive(Clone, Default)]
pub struct ProgressReporter(Option<Arc<dyn ProgressSink>>);

impl ProgressReporter {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self(Some(sink))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn emit(&self, stage: ProgressStage) {
        if let Some(sink) = &self.0 {
            sink.emit(stage);
        }
    }
}
