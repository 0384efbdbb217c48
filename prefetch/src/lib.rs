//! Prefetch and cache pages around a moving position.
//!
//! # Overview
//!
//! Remote data is often consumed as an ordered sequence of pages, only a few
//! of which are relevant at a time. The [windowed::Engine] keeps a sliding
//! window of materialized pages centered on a caller-driven focus position:
//! moving the focus issues fetches for newly entered neighbor positions and
//! evicts records for positions that fell out of the window, clamped to a
//! configurable position range.
//!
//! The engine composes over two external collaborators: a [Store] that
//! materializes fetched records and a [Fetcher] that retrieves the records
//! for a position. Callers drive the engine through its
//! [windowed::Mailbox] and observe progress as [Event]s.

use futures::channel::oneshot;
use std::future::Future;
use thiserror::Error;

pub mod windowed;

/// Identifies one page of the remote sequence.
pub type Position = u64;

/// Errors that can occur when interacting with the cache.
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("direct fetch is locked")]
    FetchLocked,
}

/// Notifications emitted by the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The focus moved to a new position.
    Position(Position),

    /// All outstanding loads for the window settled. Carries the positions
    /// currently materialized, in order.
    Drain(Vec<Position>),
}

/// The interface responsible for materializing fetched records.
///
/// The store is exclusively owned by the engine; every record it holds is
/// attributable to exactly one loaded position.
pub trait Store: Send + 'static {
    /// Type used to uniquely identify a record.
    type Id: Clone + Eq + Send + 'static;

    /// Type of record held by the store.
    type Record: Clone + Send + 'static;

    /// Insert records, returning the identifiers assigned to them (in order).
    fn insert(&mut self, records: Vec<Self::Record>) -> Vec<Self::Id>;

    /// Remove the records with the given identifiers.
    fn remove(&mut self, ids: &[Self::Id]);

    /// Return the records with the given identifiers, preserving order.
    fn get(&self, ids: &[Self::Id]) -> Vec<Self::Record>;

    /// Drop all records.
    fn clear(&mut self);
}

/// The interface responsible for fetching the records of a page.
pub trait Fetcher: Clone + Send + 'static {
    /// Type of record produced for a position.
    type Record: Clone + Send + 'static;

    /// Begin fetching the page at `position`.
    ///
    /// Returns a receiver that resolves with the fetched records. Dropping
    /// the sender is the failure channel: the fetch is abandoned and never
    /// retried by the engine. Retry and backoff, if any, are the fetcher's
    /// concern.
    fn fetch(
        &mut self,
        position: Position,
    ) -> impl Future<Output = oneshot::Receiver<Vec<Self::Record>>> + Send;
}
