//! # Event Feed
//!
//! A lossless, point-to-point queue of the events matching one filter.
//!
//! Broadcast subscriptions share one bounded ring: a burst of unrelated
//! events can push an event out before a slow subscriber reads it. A feed
//! is filtered on publish and buffered without bound, so a consumer that
//! must answer every request (the effects loop) never misses one.

use crate::events::EventFilter;
use crate::subscriber::SubscriptionError;
use shared_types::EntityEvent;
use tokio::sync::mpsc;

/// Publishing half held by the bus.
pub(crate) struct FeedSender {
    filter: EventFilter,
    sender: mpsc::UnboundedSender<EntityEvent>,
}

impl FeedSender {
    /// Forward `event` if it matches. Returns false once the feed is gone.
    pub(crate) fn offer(&self, event: &EntityEvent) -> bool {
        if self.sender.is_closed() {
            return false;
        }
        if !self.filter.matches(event) {
            return true;
        }
        self.sender.send(event.clone()).is_ok()
    }
}

/// Receiving half of a feed.
pub struct EventFeed {
    receiver: mpsc::UnboundedReceiver<EntityEvent>,
    filter: EventFilter,
}

impl EventFeed {
    pub(crate) fn open(filter: EventFilter) -> (FeedSender, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            FeedSender {
                filter: filter.clone(),
                sender,
            },
            Self { receiver, filter },
        )
    }

    /// Next matching event, in publish order.
    ///
    /// Returns `None` once the bus has been dropped.
    pub async fn recv(&mut self) -> Option<EntityEvent> {
        self.receiver.recv().await
    }

    /// - `Ok(Some(event))` - an event was queued
    /// - `Ok(None)` - the queue is empty
    /// - `Err(SubscriptionError::Closed)` - the bus was dropped
    pub fn try_recv(&mut self) -> Result<Option<EntityEvent>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    /// Events queued and not yet received.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}
