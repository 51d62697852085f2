//! # Routing Engine Orchestration Module
//!
//! This module provides [`RoutingEngine`], the single owner of all routing
//! state for the process: connected agents and visitors, pool memberships,
//! round-robin history, pending call requests and live calls.
//!
//! ## Module Organization
//!
//! - **[`core`]**: the engine struct, its locked state and organization configs
//! - **[`agents`]**: agent registration, reconnects, status, heartbeats, pools
//! - **[`visitors`]**: visitor registration, navigation and manual assignment
//! - **[`routing`]**: pool resolution, agent selection and atomic routing
//! - **[`calls`]**: call request, accept/reject/cancel, end and reconnect
//! - **[`reassignment`]**: staleness detection and visitor evacuation
//! - **[`stats`]**: per-agent and engine-wide statistics
//!
//! ## Concurrency
//!
//! Every operation takes the state lock once and releases it before
//! returning, so read-modify-write sequences such as "check capacity, then
//! append the assignment" are atomic. Nothing under the lock performs I/O;
//! callers send notifications based on the returned values.
//!
//! ## Examples
//!
//! ### Tiered pool with overflow
//!
//! ```rust
//! use engage_routing::prelude::*;
//!
//! let engine = RoutingEngine::new(EngineConfig::default())?;
//! engine.register_agent("senior".into(), "s1".into(), AgentProfile::new("Senior", 1));
//! engine.register_agent("junior".into(), "s2".into(), AgentProfile::new("Junior", 1));
//! engine.set_membership(&"senior".into(), vec![PoolMembership::primary("sales")])?;
//! engine.set_membership(&"junior".into(), vec![PoolMembership::new("sales", 2)])?;
//!
//! let sales = PoolId::from("sales");
//! assert_eq!(engine.select_agent(Some(&sales), None).unwrap().agent_id, AgentId::from("senior"));
//!
//! engine.register_visitor("v1".into(), "s3".into(), "acme".into(), "/");
//! assert!(engine.assign_visitor(&"v1".into(), &"senior".into()));
//! assert_eq!(engine.select_agent(Some(&sales), None).unwrap().agent_id, AgentId::from("junior"));
//! # Ok::<(), engage_routing::RoutingError>(())
//! ```

pub mod agents;
pub mod calls;
pub mod core;
pub mod reassignment;
pub mod routing;
pub mod stats;
pub mod visitors;

pub use agents::AgentRegistration;
pub use self::core::RoutingEngine;
pub use reassignment::{ReassignmentOutcome, StaleAgentSweep};
pub use stats::{AgentPoolStats, EngineStats};
