//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use crate::events::EventFilter;
use crate::feed::{EventFeed, FeedSender};
use crate::subscriber::{EventStream, EventSubscriber, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use shared_types::EntityEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Trait for publishing events to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// Returns the number of active subscribers that received the event.
    async fn publish(&self, event: EntityEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer
/// semantics within one process.
pub struct InMemoryEventBus {
    /// Broadcast sender for events.
    sender: broadcast::Sender<EntityEvent>,

    /// Active subscription count by filter key.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Lossless feeds, filtered on publish.
    feeds: Mutex<Vec<FeedSender>>,

    /// Total events published.
    events_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            feeds: Mutex::new(Vec::new()),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        let filter_key = filter.key();

        if let Ok(mut subs) = self.subscriptions.write() {
            *subs.entry(filter_key.clone()).or_insert(0) += 1;
        }

        debug!(filter = %filter_key, "New subscription created");

        Subscription::new(receiver, filter, self.subscriptions.clone(), filter_key)
    }

    /// Get a stream of events matching a filter.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    /// Open a lossless feed of the events matching a filter.
    ///
    /// Unlike a [`Subscription`], a feed never skips events: it is meant for
    /// consumers that must see every matching event, however slow they are.
    #[must_use]
    pub fn feed(&self, filter: EventFilter) -> EventFeed {
        let filter_key = filter.key();
        let (sender, feed) = EventFeed::open(filter);
        if let Ok(mut feeds) = self.feeds.lock() {
            feeds.push(sender);
        }
        debug!(filter = %filter_key, "New feed opened");
        feed
    }

    /// Number of open feeds (closed ones are released on the next publish).
    #[must_use]
    pub fn feed_count(&self) -> usize {
        self.feeds.lock().map(|feeds| feeds.len()).unwrap_or(0)
    }

    /// Publish without awaiting; used from synchronous dispatch paths.
    pub fn publish_now(&self, event: EntityEvent) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut feeds) = self.feeds.lock() {
            feeds.retain(|feed| feed.offer(&event));
        }

        let entity_type = event.entity_type.clone();
        let kind = event.kind;
        let correlation_id = event.correlation_id;

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(
                    entity_type = %entity_type,
                    event_kind = %kind,
                    correlation_id = %correlation_id,
                    receivers,
                    "Event published"
                );
                receivers
            }
            Err(_) => {
                // Nobody listening; the store still reduced the event.
                trace!(
                    entity_type = %entity_type,
                    event_kind = %kind,
                    correlation_id = %correlation_id,
                    "Event published without receivers"
                );
                0
            }
        }
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EntityEvent) -> usize {
        self.publish_now(event)
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        InMemoryEventBus::subscribe(self, filter)
    }
}
