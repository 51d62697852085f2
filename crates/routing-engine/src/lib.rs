//! # Engage Routing Engine
//!
//! Real-time routing and call dispatch for live video engagement: decides
//! which human agent a website visitor is connected to, tracks the call
//! request lifecycle, and repairs routing state when agents go silent.
//!
//! ## Overview
//!
//! - **URL Routing**: per-organization rules map a visitor's page URL to an agent pool
//! - **Tiered Dispatch**: priority tiers inside a pool, round-robin for idle
//!   agents, least connections once everyone is busy
//! - **Agent/Visitor Registry**: one in-memory record per connection, capacity enforced
//! - **Call Lifecycle**: request, accept/reject/cancel, end, and mid-call reconnect
//! - **Staleness Recovery**: silent agents are marked away and their visitors
//!   moved within the same pool
//!
//! ## Architecture
//!
//! ```text
//!            visitor connects                         agent connects
//!                   │                                       │
//!      ┌────────────▼────────────┐            ┌─────────────▼────────────┐
//!      │   Rule Matcher          │            │  Pool & Tier Registry    │
//!      │   url ─▶ pool           │            │  agent ◀─▶ pools + rank  │
//!      └────────────┬────────────┘            └─────────────┬────────────┘
//!                   └──────────────┬────────────────────────┘
//!                      ┌───────────▼───────────┐
//!                      │   Tiered Scheduler    │
//!                      └───────────┬───────────┘
//!                      ┌───────────▼───────────┐
//!                      │    RoutingEngine      │  agents │ visitors │ calls
//!                      └───────────┬───────────┘
//!                      ┌───────────▼───────────┐
//!                      │    RoutingServer      │  staleness sweep ─▶ events
//!                      └───────────────────────┘
//! ```
//!
//! The engine is process-local and holds no durable state. Routing rules and
//! pool memberships are pushed in by the persistence layer
//! ([`RoutingEngine::set_org_config`], [`RoutingEngine::set_membership`]);
//! everything else is rebuilt as agents and visitors reconnect.
//!
//! ## Quick Start
//!
//! ```
//! use engage_routing::prelude::*;
//!
//! let engine = RoutingEngine::new(EngineConfig::default())?;
//! engine.set_org_config(OrganizationRoutingConfig::new(
//!     "acme",
//!     Some(PoolId::from("general")),
//!     vec![RoutingRule::with_patterns("pricing", "*", "/pricing*", "sales", 10)],
//! )?)?;
//!
//! engine.register_agent("alice".into(), "a-sock".into(), AgentProfile::new("Alice", 3));
//! engine.set_membership(&"alice".into(), vec![PoolMembership::primary("sales")])?;
//!
//! engine.register_visitor("v1".into(), "v-sock".into(), "acme".into(), "https://acme.com/pricing");
//! let selection = engine.route_visitor(&"v1".into(), None).expect("alice is available");
//! assert_eq!(selection.pool_id, Some(PoolId::from("sales")));
//!
//! let request = engine
//!     .create_request(&"v1".into(), &"alice".into(), &"acme".into(), "https://acme.com/pricing")
//!     .expect("both parties are known");
//! let call = engine.accept_request(&request.request_id).expect("request is pending");
//! assert_eq!(engine.agent(&"alice".into()).unwrap().status(), AgentStatus::InCall);
//!
//! engine.end_call(&call.call_id);
//! # Ok::<(), engage_routing::RoutingError>(())
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod ids;

// Records
pub mod agent;
pub mod visitor;

// Routing and dispatch
pub mod calls;
pub mod orchestrator;
pub mod routing;

// Background work and notifications
pub mod monitoring;
pub mod scenario;
pub mod server;

pub use config::EngineConfig;
pub use error::{Result, RoutingError};
pub use ids::{AgentId, CallId, ConnectionId, OrganizationId, PoolId, RequestId, VisitorId};
pub use orchestrator::RoutingEngine;
pub use server::{RoutingServer, RoutingServerBuilder};

/// Prelude module for convenient imports
///
/// ```
/// use engage_routing::prelude::*;
/// ```
pub mod prelude {
    //! Commonly used types for embedding the routing engine

    pub use crate::{EngineConfig, Result, RoutingEngine, RoutingError};
    pub use crate::server::{RoutingServer, RoutingServerBuilder};

    pub use crate::ids::{AgentId, CallId, ConnectionId, OrganizationId, PoolId, RequestId, VisitorId};

    pub use crate::agent::{AgentProfile, AgentRecord, AgentStatus};
    pub use crate::visitor::{VisitorRecord, VisitorState};

    pub use crate::routing::{
        AgentSelection, ConditionTarget, MatchOperator, OrganizationRoutingConfig, PoolMembership,
        RoutingCondition, RoutingRule,
    };

    pub use crate::calls::{ActiveCall, CallRequest};
    pub use crate::orchestrator::{
        AgentPoolStats, AgentRegistration, EngineStats, ReassignmentOutcome, StaleAgentSweep,
    };

    pub use crate::monitoring::RoutingEvent;
    pub use crate::scenario::RoutingScenario;

    pub use chrono::{DateTime, Utc};
}
