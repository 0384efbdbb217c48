use crate::{Error, Event, Position};
use futures::{
    channel::{mpsc, oneshot},
    SinkExt,
};

/// Message types that can be sent to the [Mailbox].
pub enum Message<R> {
    /// Move the focus to a position.
    Seek { position: Position },

    /// Request the current focus position.
    Position {
        responder: oneshot::Sender<Option<Position>>,
    },

    /// Request the records materialized for a position.
    Records {
        position: Position,
        responder: oneshot::Sender<Option<Vec<R>>>,
    },

    /// Request the positions currently materialized.
    Loaded {
        responder: oneshot::Sender<Vec<Position>>,
    },

    /// Register an observer of cache events.
    Subscribe {
        events: mpsc::UnboundedSender<Event>,
    },

    /// Drop every record and all window tracking state.
    Reset,
}

/// Ingress mailbox for [Engine](super::Engine).
#[derive(Clone)]
pub struct Mailbox<R> {
    sender: mpsc::Sender<Message<R>>,
}

impl<R> Mailbox<R> {
    pub(super) fn new(sender: mpsc::Sender<Message<R>>) -> Self {
        Self { sender }
    }

    /// Move the focus to `position`.
    ///
    /// Issues loads for the focus and for newly entered neighbor positions,
    /// and evicts positions that left the window. Seeking to the current
    /// focus is a no-op: no loads are issued and no events fire.
    pub async fn seek(&mut self, position: Position) {
        self.sender
            .send(Message::Seek { position })
            .await
            .expect("mailbox closed");
    }

    /// Returns the current focus position.
    pub async fn position(&mut self) -> Option<Position> {
        let (sender, receiver) = oneshot::channel();
        self.sender
            .send(Message::Position { responder: sender })
            .await
            .expect("mailbox closed");
        receiver.await.expect("engine stopped")
    }

    /// Returns the records materialized for `position` (in load order), or
    /// `None` if the position is not loaded.
    pub async fn records(&mut self, position: Position) -> Option<Vec<R>> {
        let (sender, receiver) = oneshot::channel();
        self.sender
            .send(Message::Records {
                position,
                responder: sender,
            })
            .await
            .expect("mailbox closed");
        receiver.await.expect("engine stopped")
    }

    /// Returns the positions currently materialized, in order.
    pub async fn loaded(&mut self) -> Vec<Position> {
        let (sender, receiver) = oneshot::channel();
        self.sender
            .send(Message::Loaded { responder: sender })
            .await
            .expect("mailbox closed");
        receiver.await.expect("engine stopped")
    }

    /// Register an observer of cache events.
    ///
    /// Events are delivered in firing order. The subscription is dropped
    /// when the receiver is.
    pub async fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Event> {
        let (sender, receiver) = mpsc::unbounded();
        self.sender
            .send(Message::Subscribe { events: sender })
            .await
            .expect("mailbox closed");
        receiver
    }

    /// Drop every record and all window tracking state.
    ///
    /// Loads still in flight are abandoned. The focus position is retained,
    /// so a subsequent seek to the same value remains a no-op.
    pub async fn reset(&mut self) {
        self.sender
            .send(Message::Reset)
            .await
            .expect("mailbox closed");
    }

    /// Fetching a position directly is locked: records enter the cache only
    /// through [Mailbox::seek], so that every materialized record is
    /// attributable to exactly one loaded position.
    pub fn fetch(&mut self, _position: Position) -> Result<(), Error> {
        Err(Error::FetchLocked)
    }
}
