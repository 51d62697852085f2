use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoutingError};

/// Routing engine configuration
///
/// # Configuration Sections
///
/// - [`agents`](EngineConfig::agents): default capacity and staleness timing
/// - [`calls`](EngineConfig::calls): id prefixes for call requests and active calls
/// - [`events`](EngineConfig::events): outbound event channel sizing
///
/// Every section is optional in JSON; missing sections and fields fall back to
/// their defaults.
///
/// # Examples
///
/// ```
/// use engage_routing::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.agents.default_max_concurrent_assignments, 5);
/// assert_eq!(config.agents.staleness_threshold_ms, 120_000);
/// config.validate().expect("defaults are valid");
///
/// let config = EngineConfig::from_json_str(r#"{ "agents": { "staleness_threshold_ms": 30000 } }"#)?;
/// assert_eq!(config.staleness_threshold().as_secs(), 30);
/// assert_eq!(config.calls.request_id_prefix, "call");
/// # Ok::<(), engage_routing::RoutingError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub agents: AgentConfig,
    pub calls: CallConfig,
    pub events: EventConfig,
}

/// Agent management settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Capacity used when an agent definition does not carry its own
    pub default_max_concurrent_assignments: u32,

    /// An idle agent silent for longer than this is considered stale
    pub staleness_threshold_ms: u64,

    /// How often the server sweeps for stale agents
    pub staleness_sweep_interval_ms: u64,
}

/// Call lifecycle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Prefix of generated call request ids (`<prefix>_<uuid>`)
    pub request_id_prefix: String,

    /// Prefix of generated active call ids
    pub call_id_prefix: String,
}

/// Outbound event settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Broadcast channel capacity; slow subscribers lag past this many events
    pub channel_capacity: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            default_max_concurrent_assignments: 5,
            staleness_threshold_ms: 120_000, // 2 minutes
            staleness_sweep_interval_ms: 60_000,
        }
    }
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            request_id_prefix: "call".to_string(),
            call_id_prefix: "active".to_string(),
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self { channel_capacity: 256 }
    }
}

impl EngineConfig {
    /// Parse a JSON configuration and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.agents.default_max_concurrent_assignments == 0 {
            return Err(RoutingError::configuration(
                "default_max_concurrent_assignments must be greater than 0",
            ));
        }

        if self.agents.staleness_threshold_ms == 0 {
            return Err(RoutingError::configuration(
                "staleness_threshold_ms must be greater than 0",
            ));
        }

        if self.agents.staleness_sweep_interval_ms == 0 {
            return Err(RoutingError::configuration(
                "staleness_sweep_interval_ms must be greater than 0",
            ));
        }

        if self.calls.request_id_prefix.is_empty() {
            return Err(RoutingError::configuration("request_id_prefix cannot be empty"));
        }

        if self.calls.call_id_prefix.is_empty() {
            return Err(RoutingError::configuration("call_id_prefix cannot be empty"));
        }

        if self.events.channel_capacity == 0 {
            return Err(RoutingError::configuration(
                "channel_capacity must be greater than 0",
            ));
        }

        Ok(())
    }

    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_millis(self.agents.staleness_threshold_ms)
    }

    pub fn staleness_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.agents.staleness_sweep_interval_ms)
    }
}
