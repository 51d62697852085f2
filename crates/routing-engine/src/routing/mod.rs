//! # Visitor Routing Module
//!
//! This module decides which agent a website visitor is connected to. Routing
//! happens in two stages: the organization's URL rules pick a pool, then the
//! tiered scheduler picks an agent inside that pool.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Visitor page URL                         │
//! │  (organization, domain, path, query parameters)             │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//! ┌─────────────────────────▼───────────────────────────────────┐
//! │                  Rule Matcher                               │
//! │  - Conditions (AND-ed) or legacy domain/path patterns       │
//! │  - First match by descending priority                       │
//! │  - Organization default pool otherwise                      │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │ pool id (or none)
//! ┌─────────────────────────▼───────────────────────────────────┐
//! │                  Tiered Scheduler                           │
//! │  - Tiers by priority rank, rank 1 first                     │
//! │  - Round-robin among idle agents with no load               │
//! │  - Least connections once everyone carries load             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`rules`]: rule and condition types, per-organization configuration
//! - [`matcher`]: URL parsing and pattern evaluation
//! - [`pools`]: agent/pool membership with priority ranks
//! - [`scheduler`]: tier partitioning, round-robin ledger, agent selection
//!
//! ## Example
//!
//! ```rust
//! use engage_routing::routing::{matcher, OrganizationRoutingConfig, RoutingRule};
//! use engage_routing::PoolId;
//!
//! let config = OrganizationRoutingConfig::new(
//!     "acme",
//!     Some(PoolId::from("general")),
//!     vec![RoutingRule::with_patterns("docs", "*", "/docs/**", "support", 10)],
//! )?;
//!
//! assert_eq!(
//!     matcher::resolve(&config, "https://acme.com/docs/setup"),
//!     Some(PoolId::from("support"))
//! );
//! assert_eq!(
//!     matcher::resolve(&config, "https://acme.com/pricing"),
//!     Some(PoolId::from("general"))
//! );
//! # Ok::<(), engage_routing::RoutingError>(())
//! ```

pub mod matcher;
pub mod pools;
pub mod rules;
pub mod scheduler;

use serde::{Deserialize, Serialize};

use crate::agent::AgentRecord;
use crate::ids::PoolId;

pub use matcher::UrlContext;
pub use pools::{PoolMembership, PoolRegistry, DEFAULT_PRIORITY_RANK};
pub use rules::{ConditionTarget, MatchOperator, OrganizationRoutingConfig, RoutingCondition, RoutingRule};
pub use scheduler::AssignmentLedger;

/// Result of routing a visitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSelection {
    /// Snapshot of the selected agent at decision time
    pub agent: AgentRecord,

    /// Pool the agent was picked from; `None` when the global fallback was used
    pub pool_id: Option<PoolId>,
}
