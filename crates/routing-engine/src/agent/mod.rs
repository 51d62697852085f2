//! Agent records for the routing engine
//!
//! An agent is a human operator connected through the dashboard. The engine
//! keeps one [`AgentRecord`] per agent identity for as long as the agent is
//! registered; reconnects replace the transport handle but keep the record.
//!
//! ## Agent Status
//!
//! - [`AgentStatus::Idle`]: connected, nothing assigned
//! - [`AgentStatus::InSimulation`]: presenting to one or more visitors
//! - [`AgentStatus::InCall`]: on a live call (never routable)
//! - [`AgentStatus::Away`]: temporarily unavailable (never routable)
//! - [`AgentStatus::Offline`]: logged out (never routable)
//!
//! ```
//! use engage_routing::agent::{AgentProfile, AgentStatus};
//!
//! let profile = AgentProfile::new("Alice", 3);
//! assert_eq!(profile.status, AgentStatus::Idle);
//! assert!(profile.status.is_routable());
//! ```

pub mod types;

pub use types::{AgentProfile, AgentRecord, AgentStatus};
