//! Cross-cutting helpers: configuration and credentials.

pub mod config;
pub mod credentials;

pub use config::AppConfig;
pub use credentials::StaticCredentials;
