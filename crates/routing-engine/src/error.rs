//! # Error Types for the Routing Engine
//!
//! The engine distinguishes between two kinds of failure:
//!
//! - **Lookups that miss** (unknown agent, visitor, request or call id). These are
//!   routine in a system where connections come and go at any moment, so the
//!   engine API reports them as `None`, an empty `Vec`, or `false`. They never
//!   surface as a [`RoutingError`].
//! - **Malformed input** (an invalid routing rule, a zero priority rank, a broken
//!   configuration file). These are rejected with a [`RoutingError`] before any
//!   state is touched.
//!
//! Capacity exhaustion ("no agent in any tier") is also not an error: the
//! scheduler returns `None` and the caller decides whether to queue, retry or
//! show the visitor an offline state.
//!
//! ```
//! use engage_routing::{RoutingError, Result};
//!
//! fn load() -> Result<()> {
//!     Err(RoutingError::configuration("staleness threshold must be positive"))
//! }
//!
//! match load() {
//!     Err(e) if e.is_configuration() => println!("bad config: {}", e),
//!     Err(e) => println!("other error: {}", e),
//!     Ok(()) => {}
//! }
//! ```

use thiserror::Error;

/// Errors raised by the routing engine and its configuration layer
#[derive(Error, Debug)]
pub enum RoutingError {
    /// Engine or scenario configuration failed validation
    ///
    /// # Examples
    /// - Zero default capacity
    /// - Empty request id prefix
    /// - Zero sweep interval
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller-supplied data failed validation
    ///
    /// # Examples
    /// - Pool membership with priority rank 0
    /// - `query_param` condition without a parameter name
    /// - Scenario agent definition with zero capacity
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A referenced entity does not exist
    ///
    /// Raised by [`RoutingScenario::require_organization`](crate::scenario::RoutingScenario::require_organization)
    /// when `routing-check` asks about an organization the scenario never defined.
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure while loading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal state
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RoutingError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error is a not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, RoutingError::NotFound(_))
    }

    /// Check if this error came from configuration validation or loading
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RoutingError::Configuration(_) | RoutingError::Serialization(_) | RoutingError::Io(_)
        )
    }
}

/// Result type alias for routing engine operations
pub type Result<T> = std::result::Result<T, RoutingError>;
