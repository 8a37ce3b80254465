//! meal-analyzer: multi-provider AI meal nutrition analysis with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
