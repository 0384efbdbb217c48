use crate::Position;

/// Configuration for the [Engine](super::Engine).
pub struct Config<S, F> {
    /// Materializes fetched records.
    pub store: S,

    /// Fetches the records for a position.
    pub fetcher: F,

    /// Number of neighbor positions kept loaded on each side of the focus.
    pub buffer: u64,

    /// Inclusive lower bound of the position range.
    pub min: Position,

    /// Inclusive upper bound of the position range.
    pub max: Position,

    /// The maximum size of the mailbox backlog.
    pub mailbox_size: usize,
}

impl<S, F> Config<S, F> {
    /// Creates a configuration with a single-position window over the full
    /// position range.
    pub fn new(store: S, fetcher: F) -> Self {
        Self {
            store,
            fetcher,
            buffer: 1,
            min: 0,
            max: Position::MAX,
            mailbox_size: 64,
        }
    }
}
