//! Strongly-typed identifiers
//!
//! Every entity the engine tracks is keyed by an opaque string handed to us by
//! the connection layer or the persistence layer. Wrapping each kind in its own
//! newtype keeps an agent id from being passed where a visitor id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Borrow the underlying string
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Stable agent identity; survives reconnects
    AgentId
);
string_id!(
    /// Visitor identity as issued by the embedding widget
    VisitorId
);
string_id!(
    /// Transient transport connection handle; replaced on every reconnect
    ConnectionId
);
string_id!(
    /// Owning organization (tenant) of visitors and routing rules
    OrganizationId
);
string_id!(
    /// Named bucket of agents that URL rules route into
    PoolId
);
string_id!(
    /// Pending call request handle
    RequestId
);
string_id!(
    /// Active call handle
    CallId
);

impl RequestId {
    /// Allocate a fresh request id of the form `<prefix>_<uuid>`
    pub fn generate(prefix: &str) -> Self {
        RequestId(format!("{}_{}", prefix, Uuid::new_v4().simple()))
    }
}

impl CallId {
    /// Allocate a fresh call id of the form `<prefix>_<uuid>`
    pub fn generate(prefix: &str) -> Self {
        CallId(format!("{}_{}", prefix, Uuid::new_v4().simple()))
    }
}
