//! Staleness detection and visitor reassignment
//!
//! An idle agent that stops heartbeating is presumed gone. The periodic
//! driver (see [`RoutingServer`](crate::server::RoutingServer)) marks such
//! agents away and moves their visitors to other agents of the same pool.
//! Visitors are never moved across pools: when the pool has no room they are
//! reported as unassigned instead.

use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::agent::AgentStatus;
use crate::ids::{AgentId, OrganizationId, PoolId, VisitorId};

use super::core::{EngineState, RoutingEngine};

/// Where an evacuated agent's visitors ended up
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentOutcome {
    /// Visitor -> new agent, in the order they were moved
    pub reassigned: IndexMap<VisitorId, AgentId>,

    /// Visitors left without an agent
    pub unassigned: Vec<VisitorId>,
}

impl ReassignmentOutcome {
    pub fn is_empty(&self) -> bool {
        self.reassigned.is_empty() && self.unassigned.is_empty()
    }
}

/// One agent handled by [`RoutingEngine::sweep_stale_agents`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleAgentSweep {
    pub agent_id: AgentId,
    pub outcome: ReassignmentOutcome,
}

impl EngineState {
    fn stale_as_of(&self, threshold: Duration, now: DateTime<Utc>) -> Vec<AgentId> {
        self.agents
            .values()
            .filter(|agent| agent.profile.status == AgentStatus::Idle)
            .filter(|agent| {
                // A heartbeat from the future is not stale
                now.signed_duration_since(agent.last_activity_at)
                    .to_std()
                    .is_ok_and(|silent| silent > threshold)
            })
            .map(|agent| agent.agent_id.clone())
            .collect()
    }

    fn reassign_from<F>(
        &mut self,
        from: &AgentId,
        exclude_visitor: Option<&VisitorId>,
        resolve: F,
    ) -> ReassignmentOutcome
    where
        F: Fn(&OrganizationId, &str) -> Option<PoolId>,
    {
        let mut outcome = ReassignmentOutcome::default();
        let Some(agent) = self.agents.get(from) else {
            return outcome;
        };

        // Visitors on a live call stay where they are
        let (kept, to_move): (Vec<VisitorId>, Vec<VisitorId>) = agent
            .current_assignments
            .iter()
            .cloned()
            .partition(|v| Some(v) == exclude_visitor || self.calls.call_for_visitor(v).is_some());

        for visitor_id in to_move {
            let Some(visitor) = self.visitors.get(&visitor_id) else {
                self.detach(from, &visitor_id);
                continue;
            };
            let pool_id = resolve(&visitor.organization_id, &visitor.current_url);

            let target = self
                .select(pool_id.as_ref(), Some(from))
                .map(|agent| agent.agent_id.clone());

            match target {
                Some(target) if self.assign(&visitor_id, &target) => {
                    if let Some(visitor) = self.visitors.get_mut(&visitor_id) {
                        visitor.matched_pool_id = pool_id;
                    }
                    debug!("🔀 Visitor {} moved from {} to {}", visitor_id, from, target);
                    outcome.reassigned.insert(visitor_id, target);
                }
                _ => {
                    self.detach(from, &visitor_id);
                    if let Some(visitor) = self.visitors.get_mut(&visitor_id) {
                        visitor.assigned_agent_id = None;
                    }
                    debug!("⏳ Visitor {} left without an agent (pool {:?})", visitor_id, pool_id);
                    outcome.unassigned.push(visitor_id);
                }
            }
        }

        if let Some(agent) = self.agents.get_mut(from) {
            agent.current_assignments.retain(|v| kept.contains(v));
        }

        outcome
    }
}

impl RoutingEngine {
    /// Idle agents silent for longer than `threshold`.
    ///
    /// Read only. Agents in a call, away or offline are never reported.
    pub fn stale_agents(&self, threshold: Duration) -> Vec<AgentId> {
        self.stale_agents_as_of(threshold, Utc::now())
    }

    /// [`stale_agents`](Self::stale_agents) against an explicit clock
    pub fn stale_agents_as_of(&self, threshold: Duration, now: DateTime<Utc>) -> Vec<AgentId> {
        self.state.lock().stale_as_of(threshold, now)
    }

    /// Move every visitor of `from` (except `exclude_visitor`, typically the
    /// one on a call with it) to another agent of the visitor's pool.
    ///
    /// Each visitor's pool is resolved again from its current URL and the
    /// scheduler runs with `from` excluded. A visitor whose organization
    /// resolves to no pool is placed among all agents. Visitors that cannot
    /// be placed are unassigned and listed in the outcome.
    pub fn reassign_visitors(&self, from: &AgentId, exclude_visitor: Option<&VisitorId>) -> ReassignmentOutcome {
        let mut state = self.state.lock();
        let outcome = state.reassign_from(from, exclude_visitor, |org, url| self.resolve_with(org, url));
        if !outcome.is_empty() {
            info!(
                "🔀 Agent {}: reassigned {} visitors, {} now waiting",
                from,
                outcome.reassigned.len(),
                outcome.unassigned.len()
            );
        }
        outcome
    }

    /// Mark every stale agent away and reassign its visitors, all under one
    /// lock acquisition
    pub fn sweep_stale_agents(&self, threshold: Duration) -> Vec<StaleAgentSweep> {
        self.sweep_stale_agents_as_of(threshold, Utc::now())
    }

    /// [`sweep_stale_agents`](Self::sweep_stale_agents) against an explicit clock
    pub fn sweep_stale_agents_as_of(&self, threshold: Duration, now: DateTime<Utc>) -> Vec<StaleAgentSweep> {
        let mut state = self.state.lock();
        let stale = state.stale_as_of(threshold, now);

        // Everyone stale goes away first so no stale agent receives visitors
        for agent_id in &stale {
            if let Some(agent) = state.agents.get_mut(agent_id) {
                agent.profile.status = AgentStatus::Away;
            }
            warn!("💤 Agent {} is stale, marked away", agent_id);
        }

        stale
            .into_iter()
            .map(|agent_id| {
                let outcome = state.reassign_from(&agent_id, None, |org, url| self.resolve_with(org, url));
                StaleAgentSweep { agent_id, outcome }
            })
            .collect()
    }
}
