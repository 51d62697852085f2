//! Monitoring and outbound notifications

pub mod events;

pub use events::RoutingEvent;
