//! Buffer pages around a moving focus position.
//!
//! # Overview
//!
//! The core of the module is the [Engine]. It is responsible for:
//! - Tracking a caller-driven focus position
//! - Fetching the pages inside the neighbor window of the focus
//! - Evicting pages that fall outside the window
//! - Notifying subscribers when every load for the window has settled
//!
//! # Details
//!
//! The engine keeps at most one fetch in flight per position. A response
//! that resolves after its position left the window is dropped without
//! touching the store, and a failed fetch simply returns the position to the
//! unloaded state (no retries). Records enter the store only through the
//! position protocol, so every materialized record is attributable to
//! exactly one loaded position.
//!
//! The [Mailbox] is used to make requests to the [Engine]: moving the focus,
//! reading the loaded state, subscribing to [crate::Event]s, and resetting
//! the cache.

mod config;
pub use config::Config;
mod engine;
pub use engine::Engine;
mod ingress;
pub use ingress::Mailbox;
pub(crate) use ingress::Message;
mod metrics;
mod window;

#[cfg(test)]
pub mod mocks;
