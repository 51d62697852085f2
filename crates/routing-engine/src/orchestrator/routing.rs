//! Routing decisions
//!
//! Pool resolution, agent selection and the atomic "select then assign" used
//! when a visitor arrives or an agent comes online.

use tracing::{debug, info, warn};

use crate::agent::AgentRecord;
use crate::ids::{AgentId, OrganizationId, PoolId, VisitorId};
use crate::routing::AgentSelection;
use crate::visitor::VisitorState;

use super::core::RoutingEngine;

impl RoutingEngine {
    /// Pool for a page URL under an organization's rules
    pub fn resolve_pool(&self, organization_id: &OrganizationId, page_url: &str) -> Option<PoolId> {
        self.resolve_with(organization_id, page_url)
    }

    /// Best available agent, restricted to `pool_id` when given.
    ///
    /// Read only: nothing is assigned.
    pub fn select_agent(&self, pool_id: Option<&PoolId>, exclude: Option<&AgentId>) -> Option<AgentRecord> {
        self.state.lock().select(pool_id, exclude).cloned()
    }

    /// Best agent for a visitor's page: the matched pool first, then any agent.
    ///
    /// Read only: nothing is assigned.
    pub fn select_agent_for_visitor(
        &self,
        organization_id: &OrganizationId,
        page_url: &str,
        exclude: Option<&AgentId>,
    ) -> Option<AgentSelection> {
        let state = self.state.lock();
        let pool_id = self.resolve_with(organization_id, page_url);
        let (agent_id, pool_id) = state.select_with_fallback(pool_id, exclude)?;
        let agent = state.agents.get(&agent_id)?.clone();
        Some(AgentSelection { agent, pool_id })
    }

    /// Select an agent for a registered visitor and assign it in one step.
    ///
    /// `exclude` keeps a rejecting agent from being offered the same visitor
    /// again. Returns `None` for unknown visitors and when no agent is
    /// available anywhere.
    pub fn route_visitor(&self, visitor_id: &VisitorId, exclude: Option<&AgentId>) -> Option<AgentSelection> {
        let mut state = self.state.lock();
        let (organization_id, page_url) = {
            let visitor = state.visitors.get(visitor_id)?;
            (visitor.organization_id.clone(), visitor.current_url.clone())
        };

        let pool_id = self.resolve_with(&organization_id, &page_url);
        let Some((agent_id, pool_id)) = state.select_with_fallback(pool_id, exclude) else {
            warn!("⚠️ No agent available for visitor {} ({})", visitor_id, page_url);
            return None;
        };

        if !state.assign(visitor_id, &agent_id) {
            return None;
        }
        if let Some(visitor) = state.visitors.get_mut(visitor_id) {
            visitor.matched_pool_id = pool_id.clone();
        }

        let agent = state.agents.get(&agent_id)?.clone();
        Some(AgentSelection { agent, pool_id })
    }

    /// Hand unassigned visitors to an agent that just became available.
    ///
    /// Every waiting visitor whose best match is `agent_id` is assigned to it,
    /// in visitor registration order, until the agent stops being the best
    /// match (typically because it filled up). Visitors on a live call are
    /// skipped.
    pub fn assign_waiting_visitors(&self, agent_id: &AgentId) -> Vec<(VisitorId, Option<PoolId>)> {
        let mut state = self.state.lock();
        if !state.agents.contains_key(agent_id) {
            return Vec::new();
        }

        let waiting: Vec<(VisitorId, OrganizationId, String)> = state
            .visitors
            .values()
            .filter(|v| v.assigned_agent_id.is_none() && v.state != VisitorState::InCall)
            .map(|v| (v.visitor_id.clone(), v.organization_id.clone(), v.current_url.clone()))
            .collect();

        let mut placed = Vec::new();
        for (visitor_id, organization_id, page_url) in waiting {
            let pool_id = self.resolve_with(&organization_id, &page_url);
            let Some((best, pool_id)) = state.select_with_fallback(pool_id, None) else {
                break;
            };
            if &best != agent_id {
                debug!("⏭️ Visitor {} is better served by {}", visitor_id, best);
                continue;
            }
            if state.assign(&visitor_id, agent_id) {
                if let Some(visitor) = state.visitors.get_mut(&visitor_id) {
                    visitor.matched_pool_id = pool_id.clone();
                }
                placed.push((visitor_id, pool_id));
            }
        }

        if !placed.is_empty() {
            info!("📥 Agent {} picked up {} waiting visitors", agent_id, placed.len());
        }
        placed
    }
}
