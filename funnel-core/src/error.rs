//! Error types for funnel-core

use thiserror::Error;

use crate::navigation::FunnelStep;

/// Top-level error type for funnel-core
#[derive(Error, Debug)]
pub enum FunnelError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Route graph error: {0}")]
    RouteGraph(#[from] RouteGraphError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by an [`EventStore`](crate::store::EventStore) implementation
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize records: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors detected while building a [`RouteGraph`](crate::navigation::RouteGraph)
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteGraphError {
    #[error("Step {0} lists itself as a predecessor")]
    SelfLoop(FunnelStep),

    #[error("Backward edge {from} -> {to} has no matching forward edge {to} -> {from}")]
    UnmirroredBackward { from: FunnelStep, to: FunnelStep },

    #[error("Step {0} is not reachable from the entry step")]
    Unreachable(FunnelStep),

    #[error("Entry step must not require a forward predecessor")]
    GuardedEntry,
}

/// Errors from loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown funnel step path: {0}")]
    UnknownStep(String),

    #[error("Unknown {kind}: {value}")]
    UnknownValue { kind: &'static str, value: String },
}
