//! Connectivity adapters. Implement ConnectivitySource.

pub mod http_probe;

pub use http_probe::{HttpProbeSource, ProbeSettings};
