//! Call request and active call records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, CallId, OrganizationId, RequestId, VisitorId};

/// A visitor's pending request for a live call with a specific agent
///
/// Lives only between offer and accept, reject or cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    pub request_id: RequestId,
    pub visitor_id: VisitorId,
    pub agent_id: AgentId,
    pub organization_id: OrganizationId,
    pub page_url: String,
    pub requested_at: DateTime<Utc>,

    /// Engine-wide creation order; breaks ties between equal timestamps
    pub sequence: u64,
}

/// A live (or just ended) call between one visitor and one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCall {
    pub call_id: CallId,
    pub visitor_id: VisitorId,
    pub agent_id: AgentId,
    pub started_at: DateTime<Utc>,

    /// `None` while the call is live
    pub ended_at: Option<DateTime<Utc>>,
}

impl ActiveCall {
    pub fn is_live(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Length of an ended call
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|ended| ended - self.started_at)
    }
}
