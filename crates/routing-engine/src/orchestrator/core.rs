//! Core routing engine
//!
//! This module contains the [`RoutingEngine`] struct and the state it guards.
//! Every public operation lives in a sibling module (`agents`, `visitors`,
//! `routing`, `calls`, `reassignment`, `stats`) as a further `impl` block.
//!
//! All mutable state sits behind one mutex. Organization routing configs live
//! in a separate concurrent map; when both are needed the state lock is taken
//! first.

use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::agent::{AgentRecord, AgentStatus};
use crate::calls::CallBook;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::ids::{AgentId, OrganizationId, PoolId, VisitorId};
use crate::routing::{matcher, scheduler, AssignmentLedger, OrganizationRoutingConfig, PoolRegistry};
use crate::visitor::{VisitorRecord, VisitorState};

/// Everything the engine mutates, guarded by a single lock
#[derive(Debug, Default)]
pub(super) struct EngineState {
    /// Agents in registration order
    pub(super) agents: IndexMap<AgentId, AgentRecord>,
    /// Visitors in registration order
    pub(super) visitors: IndexMap<VisitorId, VisitorRecord>,
    pub(super) pools: PoolRegistry,
    pub(super) ledger: AssignmentLedger,
    pub(super) calls: CallBook,
}

/// In-memory routing and call-dispatch engine
///
/// # Examples
///
/// ```
/// use engage_routing::prelude::*;
///
/// let engine = RoutingEngine::new(EngineConfig::default())?;
/// engine.register_agent("alice".into(), "sock-1".into(), AgentProfile::new("Alice", 2));
/// engine.register_visitor("v1".into(), "sock-2".into(), "acme".into(), "https://acme.com/");
///
/// let selection = engine.route_visitor(&"v1".into(), None).expect("alice is free");
/// assert_eq!(selection.agent.agent_id, AgentId::from("alice"));
/// assert_eq!(
///     engine.visitor(&"v1".into()).unwrap().assigned_agent_id,
///     Some(AgentId::from("alice"))
/// );
/// # Ok::<(), engage_routing::RoutingError>(())
/// ```
pub struct RoutingEngine {
    pub(super) config: EngineConfig,
    pub(super) state: Mutex<EngineState>,
    pub(super) org_configs: DashMap<OrganizationId, Arc<OrganizationRoutingConfig>>,
}

impl RoutingEngine {
    /// Create an engine after validating its configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "🚀 Routing engine created (default capacity {}, staleness {}ms)",
            config.agents.default_max_concurrent_assignments, config.agents.staleness_threshold_ms
        );
        Ok(Self {
            config,
            state: Mutex::new(EngineState::default()),
            org_configs: DashMap::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Install (or replace) an organization's routing rules.
    ///
    /// Last write wins; rules are validated and put into evaluation order
    /// before they become visible.
    pub fn set_org_config(&self, config: OrganizationRoutingConfig) -> Result<()> {
        let config = config.normalized()?;
        info!(
            "📋 Routing config for org {}: {} active rules, default pool {:?}",
            config.organization_id,
            config.rules.len(),
            config.default_pool_id
        );
        self.org_configs
            .insert(config.organization_id.clone(), Arc::new(config));
        Ok(())
    }

    pub fn remove_org_config(&self, organization_id: &OrganizationId) -> bool {
        self.org_configs.remove(organization_id).is_some()
    }

    pub fn org_config(&self, organization_id: &OrganizationId) -> Option<OrganizationRoutingConfig> {
        self.org_configs
            .get(organization_id)
            .map(|entry| entry.value().as_ref().clone())
    }

    pub(super) fn org_config_arc(&self, organization_id: &OrganizationId) -> Option<Arc<OrganizationRoutingConfig>> {
        self.org_configs
            .get(organization_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Pool for a URL; `None` for unknown organizations or when nothing matches
    /// and there is no default pool
    pub(super) fn resolve_with(&self, organization_id: &OrganizationId, page_url: &str) -> Option<PoolId> {
        let config = self.org_config_arc(organization_id)?;
        matcher::resolve(&config, page_url)
    }
}

impl EngineState {
    pub(super) fn select(&self, pool_id: Option<&PoolId>, exclude: Option<&AgentId>) -> Option<&AgentRecord> {
        scheduler::select_agent(&self.agents, &self.pools, &self.ledger, pool_id, exclude)
    }

    /// Pool-restricted selection with a global fallback when the pool is empty
    /// or exhausted
    pub(super) fn select_with_fallback(
        &self,
        pool_id: Option<PoolId>,
        exclude: Option<&AgentId>,
    ) -> Option<(AgentId, Option<PoolId>)> {
        if let Some(pool) = pool_id {
            if let Some(agent) = self.select(Some(&pool), exclude) {
                return Some((agent.agent_id.clone(), Some(pool)));
            }
            debug!("🔁 Pool {} exhausted, falling back to any agent", pool);
        }
        self.select(None, exclude)
            .map(|agent| (agent.agent_id.clone(), None))
    }

    /// Route a visitor to an agent, moving it off any previous agent.
    ///
    /// Refuses when either side is unknown, the visitor is on a live call or
    /// the agent is at capacity. Re-assigning to the agent that already holds
    /// the visitor is a no-op.
    pub(super) fn assign(&mut self, visitor_id: &VisitorId, agent_id: &AgentId) -> bool {
        let Some(visitor) = self.visitors.get(visitor_id) else {
            return false;
        };
        if visitor.state == VisitorState::InCall || self.calls.call_for_visitor(visitor_id).is_some() {
            warn!("⚠️ Visitor {} is on a call, not routing it to agent {}", visitor_id, agent_id);
            return false;
        }
        let previous = visitor.assigned_agent_id.clone();
        let Some(agent) = self.agents.get(agent_id) else {
            return false;
        };

        if agent.has_assignment(visitor_id) {
            return true;
        }
        if agent.is_at_capacity() {
            warn!(
                "⚠️ Agent {} is at capacity ({}), not assigning visitor {}",
                agent_id, agent.profile.max_concurrent_assignments, visitor_id
            );
            return false;
        }

        if let Some(previous) = previous.filter(|prev| prev != agent_id) {
            self.detach(&previous, visitor_id);
        }

        if let Some(visitor) = self.visitors.get_mut(visitor_id) {
            visitor.assigned_agent_id = Some(agent_id.clone());
            visitor.transition(VisitorState::WatchingSimulation);
        }

        self.ledger.record(agent_id);
        if let Some(agent) = self.agents.get_mut(agent_id) {
            agent.current_assignments.push(visitor_id.clone());
            if agent.profile.status == AgentStatus::Idle {
                agent.profile.status = AgentStatus::InSimulation;
            }
            info!(
                "🎯 Assigned visitor {} to agent {} ({}/{} assignments)",
                visitor_id,
                agent_id,
                agent.load(),
                agent.profile.max_concurrent_assignments
            );
        }
        true
    }

    /// Take a visitor off an agent's assignment list; an emptied agent that
    /// was presenting goes back to idle. The visitor record is not touched.
    pub(super) fn detach(&mut self, agent_id: &AgentId, visitor_id: &VisitorId) -> bool {
        let Some(agent) = self.agents.get_mut(agent_id) else {
            return false;
        };
        let before = agent.current_assignments.len();
        agent.current_assignments.retain(|v| v != visitor_id);
        if agent.current_assignments.is_empty() && agent.profile.status == AgentStatus::InSimulation {
            agent.profile.status = AgentStatus::Idle;
        }
        agent.current_assignments.len() != before
    }

    /// Maintain `InCall <=> current_call_visitor_id.is_some()`
    pub(super) fn set_in_call(&mut self, agent_id: &AgentId, visitor_id: Option<VisitorId>) -> bool {
        let Some(agent) = self.agents.get_mut(agent_id) else {
            return false;
        };
        match visitor_id {
            Some(visitor_id) => {
                agent.current_call_visitor_id = Some(visitor_id);
                agent.profile.status = AgentStatus::InCall;
            }
            None => {
                agent.current_call_visitor_id = None;
                agent.profile.status = AgentStatus::Idle;
                agent.reconcile_status();
            }
        }
        true
    }

    /// Clear the agent link of every visitor that points at `agent_id`
    pub(super) fn orphan_visitors_of(&mut self, agent_id: &AgentId) -> Vec<VisitorId> {
        let mut orphaned = Vec::new();
        for visitor in self.visitors.values_mut() {
            if visitor.assigned_agent_id.as_ref() == Some(agent_id) {
                visitor.assigned_agent_id = None;
                orphaned.push(visitor.visitor_id.clone());
            }
        }
        orphaned
    }
}
