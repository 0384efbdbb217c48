//! Mock implementations for testing.

use crate::Position;
use commonware_runtime::{Clock, Spawner};
use futures::channel::oneshot;
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

/// Number of records in a generated page.
pub const PAGE_SIZE: u64 = 2;

/// A record served by the mock [Fetcher].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub position: Position,
    pub value: u64,
}

/// Generates the default page of records for a position.
pub fn page(position: Position) -> Vec<Record> {
    (0..PAGE_SIZE)
        .map(|value| Record { position, value })
        .collect()
}

/// A fetcher that serves a page of records for any position after a fixed
/// latency. Individual positions can be overridden or made to fail.
///
/// Clones share state.
#[derive(Clone)]
pub struct Fetcher<E: Clock + Spawner> {
    context: E,
    inner: Arc<Mutex<FetcherInner>>,
}

struct FetcherInner {
    /// Overridden pages
    pages: HashMap<Position, Vec<Record>>,

    /// Positions whose fetches are abandoned
    failures: HashSet<Position>,

    /// Delay before each response resolves
    latency: Duration,

    /// Number of fetches issued
    fetches: usize,
}

impl<E: Clock + Spawner> Fetcher<E> {
    /// Create a new fetcher that resolves responses on the given context.
    pub fn new(context: E) -> Self {
        Self {
            context,
            inner: Arc::new(Mutex::new(FetcherInner {
                pages: HashMap::new(),
                failures: HashSet::new(),
                latency: Duration::from_millis(10),
                fetches: 0,
            })),
        }
    }

    /// Override the records served for `position`.
    pub fn insert(&self, position: Position, records: Vec<Record>) {
        self.inner.lock().unwrap().pages.insert(position, records);
    }

    /// Abandon every fetch for `position`.
    pub fn fail(&self, position: Position) {
        self.inner.lock().unwrap().failures.insert(position);
    }

    /// Serve `position` again.
    pub fn recover(&self, position: Position) {
        self.inner.lock().unwrap().failures.remove(&position);
    }

    /// Set the delay before responses resolve.
    pub fn set_latency(&self, latency: Duration) {
        self.inner.lock().unwrap().latency = latency;
    }

    /// Returns the number of fetches issued.
    pub fn fetches(&self) -> usize {
        self.inner.lock().unwrap().fetches
    }
}

impl<E: Clock + Spawner> crate::Fetcher for Fetcher<E> {
    type Record = Record;

    async fn fetch(&mut self, position: Position) -> oneshot::Receiver<Vec<Record>> {
        let (sender, receiver) = oneshot::channel();
        let (records, latency) = {
            let mut inner = self.inner.lock().unwrap();
            inner.fetches += 1;
            let records = if inner.failures.contains(&position) {
                None
            } else {
                Some(
                    inner
                        .pages
                        .get(&position)
                        .cloned()
                        .unwrap_or_else(|| page(position)),
                )
            };
            (records, inner.latency)
        };
        self.context.clone().spawn(move |context| async move {
            context.sleep(latency).await;
            if let Some(records) = records {
                let _ = sender.send(records);
            }
            // An abandoned fetch drops the sender
        });
        receiver
    }
}

/// An operation applied to the [Store].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Insert(Vec<u64>),
    Remove(Vec<u64>),
    Clear,
}

/// An in-memory store that logs the operations applied to it.
///
/// Clones share state, so tests can keep a handle to a store owned by an
/// engine.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    next: u64,
    records: HashMap<u64, Record>,
    ops: Vec<Op>,
}

impl Store {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records held.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    /// Returns whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the operations applied so far.
    pub fn ops(&self) -> Vec<Op> {
        self.inner.lock().unwrap().ops.clone()
    }
}

impl crate::Store for Store {
    type Id = u64;
    type Record = Record;

    fn insert(&mut self, records: Vec<Record>) -> Vec<u64> {
        let mut inner = self.inner.lock().unwrap();
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = inner.next;
            inner.next += 1;
            inner.records.insert(id, record);
            ids.push(id);
        }
        inner.ops.push(Op::Insert(ids.clone()));
        ids
    }

    fn remove(&mut self, ids: &[u64]) {
        let mut inner = self.inner.lock().unwrap();
        for id in ids {
            inner.records.remove(id);
        }
        inner.ops.push(Op::Remove(ids.to_vec()));
    }

    fn get(&self, ids: &[u64]) -> Vec<Record> {
        let inner = self.inner.lock().unwrap();
        ids.iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect()
    }

    fn clear(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        inner.records.clear();
        inner.ops.push(Op::Clear);
    }
}
