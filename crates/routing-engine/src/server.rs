//! # Routing Server
//!
//! This module wraps a shared [`RoutingEngine`] with the background work the
//! engine deliberately does not own: a periodic staleness sweep that marks
//! silent agents away, moves their visitors, and publishes what happened as
//! [`RoutingEvent`]s on a broadcast channel.
//!
//! ## Server Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   connection layer (agent / visitor)    │
//! ├─────────────────────────────────────────┤
//! │           RoutingServer                 │
//! │  sweep task ──▶ broadcast<RoutingEvent> │
//! ├─────────────────────────────────────────┤
//! │           RoutingEngine                 │
//! │  registry │ pools │ scheduler │ calls   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Examples
//!
//! ```rust
//! use engage_routing::server::RoutingServerBuilder;
//! use engage_routing::EngineConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = RoutingServerBuilder::new()
//!     .with_config(EngineConfig::default())
//!     .build()?;
//!
//! let mut events = server.subscribe();
//! server.start().await?;
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("📣 {:?}", event);
//!     }
//! });
//!
//! server.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{Result, RoutingError};
use crate::monitoring::RoutingEvent;
use crate::orchestrator::RoutingEngine;

/// Runs the staleness sweep for a shared engine and publishes its events
pub struct RoutingServer {
    /// The routing engine
    engine: Arc<RoutingEngine>,

    /// Outbound event channel
    events: broadcast::Sender<RoutingEvent>,

    /// Handle to the sweep task while running
    sweep_handle: Option<JoinHandle<()>>,
}

impl RoutingServer {
    /// Create a server around a new engine
    pub fn new(config: EngineConfig) -> Result<Self> {
        let engine = Arc::new(RoutingEngine::new(config)?);
        Ok(Self::with_engine(engine))
    }

    /// Create a server around an existing engine
    pub fn with_engine(engine: Arc<RoutingEngine>) -> Self {
        let (events, _) = broadcast::channel(engine.config().events.channel_capacity);
        Self {
            engine,
            events,
            sweep_handle: None,
        }
    }

    /// Start the periodic staleness sweep
    pub async fn start(&mut self) -> Result<()> {
        if self.sweep_handle.is_some() {
            return Err(RoutingError::internal("routing server already started"));
        }

        let period = self.engine.config().staleness_sweep_interval();
        let threshold = self.engine.config().staleness_threshold();
        let engine = Arc::clone(&self.engine);
        let events = self.events.clone();

        self.sweep_handle = Some(tokio::spawn(async move {
            Self::sweep_loop(engine, events, period, threshold).await;
        }));

        info!(
            "✅ Staleness sweep started (every {:?}, threshold {:?})",
            period, threshold
        );
        Ok(())
    }

    /// Stop the sweep task
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(handle) = self.sweep_handle.take() {
            handle.abort();
            let _ = handle.await;
            info!("🛑 Staleness sweep stopped");
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.sweep_handle.is_some()
    }

    /// Receive every event published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<RoutingEvent> {
        self.events.subscribe()
    }

    pub fn engine(&self) -> &Arc<RoutingEngine> {
        &self.engine
    }

    /// Run one sweep immediately and publish its events
    pub fn sweep_now(&self) -> Vec<RoutingEvent> {
        Self::sweep_once(&self.engine, &self.events, self.engine.config().staleness_threshold())
    }

    fn sweep_once(
        engine: &RoutingEngine,
        events: &broadcast::Sender<RoutingEvent>,
        threshold: Duration,
    ) -> Vec<RoutingEvent> {
        let published: Vec<RoutingEvent> = engine
            .sweep_stale_agents(threshold)
            .iter()
            .flat_map(RoutingEvent::from_sweep)
            .collect();

        for event in &published {
            // No subscribers is fine; the sweep still happened
            let _ = events.send(event.clone());
        }
        published
    }

    async fn sweep_loop(
        engine: Arc<RoutingEngine>,
        events: broadcast::Sender<RoutingEvent>,
        period: Duration,
        threshold: Duration,
    ) {
        info!("👀 Starting staleness sweep loop");
        let mut ticker = interval_at(Instant::now() + period, period);

        loop {
            ticker.tick().await;
            let published = Self::sweep_once(&engine, &events, threshold);
            if published.is_empty() {
                debug!("💤 Staleness sweep: nothing stale");
            } else {
                info!("📣 Staleness sweep published {} events", published.len());
            }
        }
    }
}

impl Drop for RoutingServer {
    fn drop(&mut self) {
        if let Some(handle) = self.sweep_handle.take() {
            handle.abort();
        }
    }
}

/// Builder for RoutingServer with fluent API
#[derive(Default)]
pub struct RoutingServerBuilder {
    config: Option<EngineConfig>,
    engine: Option<Arc<RoutingEngine>>,
}

impl RoutingServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration for a new engine
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share an existing engine instead of creating one
    pub fn with_engine(mut self, engine: Arc<RoutingEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn build(self) -> Result<RoutingServer> {
        if let Some(engine) = self.engine {
            return Ok(RoutingServer::with_engine(engine));
        }
        let config = self
            .config
            .ok_or_else(|| RoutingError::configuration("Configuration not provided"))?;
        RoutingServer::new(config)
    }
}
