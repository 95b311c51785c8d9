//! Client for the external publishing provider.
//!
//! This crate wraps the provider's postpone API behind the [`Publish`]
//! trait: one scheduled post in, one receipt (or classified error) out.
//! Errors carry a transient/terminal classification that drives retry
//! decisions upstream.

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod wire;

// Re-export common types
pub use client::{PostReceipt, ProviderClient, Publish, SchedulePost};
pub use config::ProviderConfig;
pub use error::{ProviderError, ProviderResult};
