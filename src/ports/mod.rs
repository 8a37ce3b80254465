//! Port traits. API boundaries for the hexagon.
//!
//! - Inbound: Called by UI/adapter into the application
//! - Outbound: Called by application into infrastructure
//! - Progress: Fire-and-forget milestones from the application

pub mod inbound;
pub mod outbound;
pub mod progress;

pub use inbound::InputPort;
pub use outbound::{CachePort, ConnectivitySource, CredentialProvider, ProviderClient, RawResponse};
pub use progress::{ProgressReporter, ProgressSink, ProgressStage};
