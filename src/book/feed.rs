//! Market-data feed attachment.
//!
//! The real transport is out of scope for the book: it only needs a way to
//! attach one listener per `(symbol, source)` subscription and to detach it
//! again on drop. [`ChannelFeed`] is the in-process implementation used by
//! tests and replay harnesses.

use crate::book::error::BookError;
use crate::book::types::OrderEvent;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Callback receiving one batch of raw order records plus the new-snapshot
/// flag.
pub type FeedListener = Arc<dyn Fn(&[OrderEvent], bool) + Send + Sync>;

/// Identifier of one feed attachment, returned by [`MarketDataFeed::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A source of per-order market-data batches.
pub trait MarketDataFeed: Send + Sync {
    /// Attach `listener` to the order stream for `symbol` from `source`.
    ///
    /// # Errors
    /// Returns [`BookError::FeedAttach`] when the feed cannot serve the
    /// subscription.
    fn attach(
        &self,
        symbol: &str,
        source: &str,
        listener: FeedListener,
    ) -> Result<SubscriptionId, BookError>;

    /// Detach a previously attached listener.
    ///
    /// Once this returns, the listener is guaranteed not to be invoked
    /// again.
    fn detach(&self, id: SubscriptionId);
}

struct Attachment {
    symbol: String,
    source: String,
    listener: FeedListener,
}

/// In-process feed that fans published batches out to attached listeners.
///
/// Batches are delivered synchronously on the publishing thread, under the
/// feed's own lock, which is what makes the [`MarketDataFeed::detach`]
/// guarantee hold: a detach blocks until any in-flight delivery completes.
#[derive(Default)]
pub struct ChannelFeed {
    inner: Mutex<ChannelFeedInner>,
}

#[derive(Default)]
struct ChannelFeedInner {
    next_id: u64,
    attachments: HashMap<u64, Attachment>,
    closed: bool,
}

impl ChannelFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one batch to every listener attached to `symbol`/`source`.
    pub fn publish(&self, symbol: &str, source: &str, batch: &[OrderEvent], new_snapshot: bool) {
        let inner = self.inner.lock();
        for attachment in inner.attachments.values() {
            if attachment.symbol == symbol && attachment.source == source {
                (attachment.listener)(batch, new_snapshot);
            }
        }
    }

    /// Refuse all further attachments. Existing listeners keep receiving.
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }

    /// Number of currently attached listeners.
    pub fn attachment_count(&self) -> usize {
        self.inner.lock().attachments.len()
    }
}

impl MarketDataFeed for ChannelFeed {
    fn attach(
        &self,
        symbol: &str,
        source: &str,
        listener: FeedListener,
    ) -> Result<SubscriptionId, BookError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(BookError::FeedAttach {
                symbol: symbol.to_string(),
                source: source.to_string(),
                message: "feed is closed".to_string(),
            });
        }
        let id = inner.next_id;
        inner.next_id += 1;
        inner.attachments.insert(
            id,
            Attachment {
                symbol: symbol.to_string(),
                source: source.to_string(),
                listener,
            },
        );
        info!(symbol, source, id, "listener attached");
        Ok(SubscriptionId(id))
    }

    fn detach(&self, id: SubscriptionId) {
        let mut inner = self.inner.lock();
        if inner.attachments.remove(&id.0).is_some() {
            info!(id = id.0, "listener detached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::types::{EventFlags, OrderSide};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_event() -> OrderEvent {
        OrderEvent {
            index: 1,
            price: 100.0,
            size: 5.0,
            time: 0,
            side: OrderSide::Sell,
            flags: EventFlags::empty(),
        }
    }

    #[test]
    fn publish_reaches_matching_listeners_only() {
        let feed = ChannelFeed::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counted = {
            let hits = Arc::clone(&hits);
            Arc::new(move |_: &[OrderEvent], _: bool| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        feed.attach("AAPL", "NTV", counted.clone()).expect("attach");
        feed.attach("MSFT", "NTV", counted).expect("attach");

        feed.publish("AAPL", "NTV", &[sample_event()], false);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detached_listener_stops_receiving() {
        let feed = ChannelFeed::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let id = {
            let hits = Arc::clone(&hits);
            feed.attach(
                "AAPL",
                "NTV",
                Arc::new(move |_: &[OrderEvent], _: bool| {
                    hits.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .expect("attach")
        };
        feed.publish("AAPL", "NTV", &[sample_event()], false);
        feed.detach(id);
        feed.publish("AAPL", "NTV", &[sample_event()], false);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(feed.attachment_count(), 0);
    }

    #[test]
    fn closed_feed_rejects_attach() {
        let feed = ChannelFeed::new();
        feed.close();

        let result = feed.attach("AAPL", "NTV", Arc::new(|_: &[OrderEvent], _: bool| {}));

        assert!(matches!(result, Err(BookError::FeedAttach { .. })));
    }
}
