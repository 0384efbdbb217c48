use super::{metrics::Metrics, window::Window, Config, Mailbox, Message};
use crate::{Event, Fetcher, Position, Store};
use commonware_macros::select;
use commonware_runtime::{Handle, Metrics as RuntimeMetrics, Spawner};
use futures::{
    channel::{mpsc, oneshot},
    future::{self, Either},
    stream::FuturesUnordered,
    StreamExt,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    future::Future,
    pin::Pin,
};
use tracing::{debug, error, trace};

/// Outcome of one in-flight fetch.
type Resolution<R> = (Position, Result<Vec<R>, oneshot::Canceled>);

/// Instance of the main engine for the module.
///
/// It is responsible for:
/// - Tracking the focus position and the neighbor window around it
/// - Issuing fetches for positions that enter the window (at most one in
///   flight per position)
/// - Evicting records for positions that leave the window
/// - Rejecting responses that resolve after their position left the window
/// - Notifying subscribers when the window settles
pub struct Engine<E, S, F>
where
    E: Spawner + RuntimeMetrics,
    S: Store,
    F: Fetcher<Record = S::Record>,
{
    context: E,

    /// Materializes loaded records
    store: S,

    /// Fetches the records for a position
    fetcher: F,

    /// Neighbor window around the focus
    window: Window,

    /// The mailbox for receiving messages
    mailbox: mpsc::Receiver<Message<S::Record>>,

    /// Current focus position
    position: Option<Position>,

    /// Record identifiers materialized for each loaded position
    index: BTreeMap<Position, Vec<S::Id>>,

    /// Positions with a fetch in flight
    pending: BTreeSet<Position>,

    /// Futures that resolve once the fetcher has produced (or abandoned)
    /// the records for a position
    inflight: FuturesUnordered<Pin<Box<dyn Future<Output = Resolution<S::Record>> + Send>>>,

    /// Observers of cache events
    subscribers: Vec<mpsc::UnboundedSender<Event>>,

    /// Metrics
    metrics: Metrics,
}

impl<E, S, F> Engine<E, S, F>
where
    E: Spawner + RuntimeMetrics,
    S: Store,
    F: Fetcher<Record = S::Record>,
{
    /// Creates a new engine with the given context and configuration.
    ///
    /// Returns the engine and a mailbox for sending messages to it.
    pub fn new(context: E, cfg: Config<S, F>) -> (Self, Mailbox<S::Record>) {
        let (sender, receiver) = mpsc::channel(cfg.mailbox_size);
        let metrics = Metrics::init(context.clone());
        (
            Self {
                context,
                store: cfg.store,
                fetcher: cfg.fetcher,
                window: Window::new(cfg.buffer, cfg.min, cfg.max),
                mailbox: receiver,
                position: None,
                index: BTreeMap::new(),
                pending: BTreeSet::new(),
                inflight: FuturesUnordered::new(),
                subscribers: Vec::new(),
                metrics,
            },
            Mailbox::new(sender),
        )
    }

    /// Starts the engine.
    ///
    /// Returns a handle that resolves when the engine stops.
    pub fn start(self) -> Handle<()> {
        self.context.clone().spawn(|_| self.run())
    }

    /// Inner run loop called by `start`.
    async fn run(mut self) {
        let mut shutdown = self.context.stopped();

        loop {
            // Drop subscribers that went away
            self.subscribers.retain(|subscriber| !subscriber.is_closed());

            // Wait on resolutions only while fetches are in flight
            let resolution = if self.inflight.is_empty() {
                Either::Right(future::pending())
            } else {
                Either::Left(self.inflight.next())
            };

            select! {
                // Handle shutdown signal
                _ = &mut shutdown => {
                    debug!("shutdown");
                    return;
                },

                // Handle mailbox messages
                msg = self.mailbox.next() => {
                    let Some(msg) = msg else {
                        error!("mailbox closed");
                        return;
                    };
                    match msg {
                        Message::Seek { position } => {
                            trace!(position, "mailbox: seek");
                            self.handle_seek(position);
                        }
                        Message::Position { responder } => {
                            let _ = responder.send(self.position);
                        }
                        Message::Records { position, responder } => {
                            let records = self
                                .index
                                .get(&position)
                                .map(|ids| self.store.get(ids));
                            let _ = responder.send(records);
                        }
                        Message::Loaded { responder } => {
                            let _ = responder.send(self.loaded());
                        }
                        Message::Subscribe { events } => {
                            self.subscribers.push(events);
                        }
                        Message::Reset => {
                            trace!("mailbox: reset");
                            self.handle_reset();
                        }
                    }
                },

                // Handle completed fetches
                resolved = resolution => {
                    let Some((position, result)) = resolved else {
                        continue;
                    };
                    self.handle_resolution(position, result);
                },
            }
        }
    }

    /// Handles a move of the focus to `position`.
    ///
    /// The focus load is initiated before stale neighbors are evicted or new
    /// neighbors loaded, so a single seek deterministically produces one load
    /// for the focus (if missing), loads for newly entered neighbors, and
    /// exactly the evictions for newly exited neighbors. No position is both
    /// loaded and unloaded within the same call.
    fn handle_seek(&mut self, position: Position) {
        if self.position == Some(position) {
            return;
        }
        self.position = Some(position);

        // Diff the window against what is already loaded or loading
        let neighbors = self.window.neighbors(position);
        let to_load: Vec<Position> = neighbors
            .iter()
            .copied()
            .filter(|p| !self.index.contains_key(p) && !self.pending.contains(p))
            .collect();
        let to_unload: Vec<Position> = self
            .index
            .keys()
            .copied()
            .filter(|p| *p != position && !neighbors.contains(p))
            .collect();

        // The focus is always loaded, regardless of the window
        if !self.index.contains_key(&position) && !self.pending.contains(&position) {
            self.load(position);
        }
        for stale in to_unload {
            self.unload(stale);
        }
        for neighbor in to_load {
            self.load(neighbor);
        }

        self.emit(Event::Position(position));
    }

    /// Issues a fetch for `position` unless one is already in flight.
    fn load(&mut self, position: Position) {
        if !self.pending.insert(position) {
            return;
        }
        self.metrics.fetches.inc();
        self.metrics.pending.set(self.pending.len() as i64);
        debug!(position, "load");

        let mut fetcher = self.fetcher.clone();
        self.inflight.push(Box::pin(async move {
            let receiver = fetcher.fetch(position).await;
            (position, receiver.await)
        }));
    }

    /// Evicts the records materialized for `position`. No-op if the position
    /// is not loaded.
    fn unload(&mut self, position: Position) {
        let Some(ids) = self.index.remove(&position) else {
            return;
        };
        self.store.remove(&ids);
        self.metrics.evictions.inc();
        self.metrics.cached.set(self.index.len() as i64);
        debug!(position, "unload");
    }

    /// Handles the outcome of one in-flight fetch.
    fn handle_resolution(
        &mut self,
        position: Position,
        result: Result<Vec<S::Record>, oneshot::Canceled>,
    ) {
        // A missing marker means the request was aborted by a reset
        if !self.pending.remove(&position) {
            self.metrics.stale.inc();
            debug!(position, "aborted response");
            return;
        }
        self.metrics.pending.set(self.pending.len() as i64);

        let records = match result {
            Ok(records) => records,
            Err(_) => {
                self.metrics.failures.inc();
                debug!(position, "fetch failed");
                return;
            }
        };

        // Reject the response if the window moved away while it was in flight
        let keep = self
            .position
            .is_some_and(|pos| self.window.contains(pos, position));
        if !keep {
            self.metrics.stale.inc();
            debug!(position, "stale response");
            return;
        }

        // Materialize the records
        let ids = self.store.insert(records);
        self.index.insert(position, ids);
        self.metrics.cached.set(self.index.len() as i64);

        // The window is settled once nothing remains in flight
        if self.pending.is_empty() {
            let loaded = self.loaded();
            self.metrics.drains.inc();
            debug!(?loaded, "drain");
            self.emit(Event::Drain(loaded));
        }
    }

    /// Evicts every tracked position and clears all window tracking state.
    ///
    /// The focus position is retained, so a later seek to the same value is
    /// still suppressed as a no-op. Responses for loads that were in flight
    /// at reset time are dropped when they resolve.
    fn handle_reset(&mut self) {
        let tracked: Vec<Position> = self.index.keys().copied().collect();
        for position in tracked {
            self.unload(position);
        }
        self.store.clear();
        self.pending.clear();
        self.metrics.pending.set(0);
        self.metrics.cached.set(0);
    }

    /// Returns the positions currently materialized, in order.
    fn loaded(&self) -> Vec<Position> {
        self.index.keys().copied().collect()
    }

    /// Delivers an event to every subscriber.
    fn emit(&mut self, event: Event) {
        for subscriber in &self.subscribers {
            let _ = subscriber.unbounded_send(event.clone());
        }
    }
}
