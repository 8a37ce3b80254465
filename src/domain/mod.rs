//! Core domain layer. No network or filesystem I/O.
//!
//! Entities, provider table and pure rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod fingerprint;
pub mod network;
pub mod providers;
pub mod serving;

pub use entities::{
    AnalysisMode, AnalysisRequest, AnalysisResult, Confidence, FoodItem, ImageType, RequestKind,
    SuppliedTotals, MIN_SERVING_MULTIPLIER,
};
pub use errors::AnalysisError;
pub use fingerprint::Fingerprint;
pub use network::{NetworkClassification, NetworkQuality, Strategy, TransportKind};
pub use providers::{descriptor, ProviderDescriptor, ProviderId};
pub use serving::{normalize, rescale, ScaledItem, ScaledTotals};
