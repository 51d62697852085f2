//! # Call Lifecycle
//!
//! A call starts as a [`CallRequest`] offered to one agent and either becomes
//! an [`ActiveCall`] (accept), disappears (reject, cancel), or is bypassed
//! entirely by a reconnect that resumes a call across a page navigation.
//!
//! ```text
//! requested ──accept──▶ active ──end──▶ ended
//!     │
//!     ├──reject──▶ (visitor stays call_requested, caller re-routes)
//!     └──cancel──▶ (visitor back to watching_simulation)
//!
//! reconnect ──────────▶ active   (keeps the original start time)
//! ```
//!
//! The state transitions of visitors and agents are applied by
//! [`RoutingEngine`](crate::RoutingEngine); [`CallBook`] only stores records.

pub mod book;
pub mod types;

pub use book::CallBook;
pub use types::{ActiveCall, CallRequest};
