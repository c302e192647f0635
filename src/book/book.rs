//! The price-level book instance: locking, batch processing, and the
//! outbound notification contract.

use crate::book::delta::build_level_deltas;
use crate::book::error::BookError;
use crate::book::events::{BookListener, ChangeSetListener};
use crate::book::feed::{FeedListener, MarketDataFeed, SubscriptionId};
use crate::book::order_index::OrderIndex;
use crate::book::side::{AskKey, BidKey, BookSide};
use crate::book::types::{OrderEvent, PriceLevel, PriceLevelChangeSet, PriceLevelSet};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Everything guarded by the instance lock.
///
/// Handlers live here too: they are invoked while the lock is held, which
/// serializes them against mutation and against re-registration.
struct BookState {
    order_index: OrderIndex,
    asks: BookSide<AskKey>,
    bids: BookSide<BidKey>,
    on_new_book: Option<BookListener>,
    on_book_update: Option<BookListener>,
    on_incremental_change: Option<ChangeSetListener>,
}

struct BookCore {
    symbol: String,
    source: String,
    depth: usize,
    state: Mutex<BookState>,
}

impl BookCore {
    /// Process one inbound batch. Runs on the feed thread, holding the
    /// instance lock end to end; handlers fire after all mutation is done,
    /// so a handler fault cannot leave the book half-applied.
    fn process_batch(&self, batch: &[OrderEvent], new_snapshot: bool) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if new_snapshot {
            state.order_index.clear();
            state.asks.clear();
            state.bids.clear();
        }

        if batch.is_empty() {
            if new_snapshot {
                let book = PriceLevelSet::default();
                debug!(symbol = %self.symbol, "new empty book");
                invoke(&self.symbol, "on_new_book", state.on_new_book.as_ref(), &book);
            }
            return;
        }

        let deltas = build_level_deltas(batch, &mut state.order_index);
        let ask_changes = state.asks.apply_deltas(&deltas.asks);
        let bid_changes = state.bids.apply_deltas(&deltas.bids);

        let book = PriceLevelSet {
            asks: state.asks.visible_levels(),
            bids: state.bids.visible_levels(),
        };

        if new_snapshot {
            debug!(
                symbol = %self.symbol,
                asks = book.asks.len(),
                bids = book.bids.len(),
                "new book"
            );
            invoke(&self.symbol, "on_new_book", state.on_new_book.as_ref(), &book);
        } else {
            let (ask_adds, ask_updates, ask_removes) = ask_changes.into_parts();
            let (bid_adds, bid_updates, bid_removes) = bid_changes.into_parts();
            let changes = PriceLevelChangeSet {
                additions: PriceLevelSet {
                    asks: ask_adds,
                    bids: bid_adds,
                },
                updates: PriceLevelSet {
                    asks: ask_updates,
                    bids: bid_updates,
                },
                removals: PriceLevelSet {
                    asks: ask_removes,
                    bids: bid_removes,
                },
            };
            invoke(
                &self.symbol,
                "on_incremental_change",
                state.on_incremental_change.as_ref(),
                &changes,
            );
            invoke(
                &self.symbol,
                "on_book_update",
                state.on_book_update.as_ref(),
                &book,
            );
        }
    }
}

/// Fire one handler, if set, isolating panics so later handlers and later
/// batches keep running.
fn invoke<A>(symbol: &str, name: &str, handler: Option<&Arc<dyn Fn(&A) + Send + Sync>>, arg: &A) {
    if let Some(handler) = handler {
        if catch_unwind(AssertUnwindSafe(|| handler(arg))).is_err() {
            error!(symbol, handler = name, "notification handler panicked");
        }
    }
}

/// A bounded price-level view of one instrument from one order source.
///
/// The book attaches to a [`MarketDataFeed`] at construction and consumes
/// per-order event batches from it. After every batch it notifies the
/// registered handlers: a full snapshot when the source declares a new book,
/// otherwise the incremental change-set of the visible window followed by
/// the updated top-N view.
///
/// `depth == 0` disables truncation: every price level is visible.
///
/// All processing happens synchronously on the feed thread under one
/// instance lock. Handlers run under that lock as well; they must be quick
/// and must not call back into the book. Dropping the book detaches it from
/// the feed, after which no further notification is delivered.
pub struct PriceLevelBook {
    core: Arc<BookCore>,
    feed: Arc<dyn MarketDataFeed>,
    subscription: SubscriptionId,
}

impl PriceLevelBook {
    /// Attach a new book to `feed` for `symbol` from `source`, keeping the
    /// best `depth` levels per side visible (`0` for unbounded).
    ///
    /// # Errors
    /// Returns [`BookError::FeedAttach`] when the feed rejects the
    /// subscription; no instance is created in that case.
    pub fn create(
        feed: Arc<dyn MarketDataFeed>,
        symbol: impl Into<String>,
        source: impl Into<String>,
        depth: usize,
    ) -> Result<Self, BookError> {
        let symbol = symbol.into();
        let source = source.into();
        let core = Arc::new(BookCore {
            symbol: symbol.clone(),
            source: source.clone(),
            depth,
            state: Mutex::new(BookState {
                order_index: OrderIndex::new(),
                asks: BookSide::new(depth),
                bids: BookSide::new(depth),
                on_new_book: None,
                on_book_update: None,
                on_incremental_change: None,
            }),
        });

        let listener: FeedListener = {
            let core = Arc::clone(&core);
            Arc::new(move |batch, new_snapshot| core.process_batch(batch, new_snapshot))
        };
        let subscription = feed.attach(&symbol, &source, listener)?;
        info!(symbol = %core.symbol, source = %core.source, depth, "price-level book attached");

        Ok(Self {
            core,
            feed,
            subscription,
        })
    }

    /// Register the handler fired once per new-snapshot batch with the full
    /// visible book. Last setter wins.
    pub fn set_on_new_book(&self, handler: BookListener) {
        self.core.state.lock().on_new_book = Some(handler);
    }

    /// Register the handler fired after each incremental batch with the
    /// updated top-N view. Last setter wins.
    pub fn set_on_book_update(&self, handler: BookListener) {
        self.core.state.lock().on_book_update = Some(handler);
    }

    /// Register the handler fired after each incremental batch with the
    /// change-set of the visible window. Last setter wins.
    pub fn set_on_incremental_change(&self, handler: ChangeSetListener) {
        self.core.state.lock().on_incremental_change = Some(handler);
    }

    /// The subscribed symbol.
    pub fn symbol(&self) -> &str {
        &self.core.symbol
    }

    /// The subscribed order source.
    pub fn source(&self) -> &str {
        &self.core.source
    }

    /// The configured window depth; zero means unbounded.
    pub fn depth(&self) -> usize {
        self.core.depth
    }

    /// The visible ask levels, best (lowest) price first.
    pub fn visible_asks(&self) -> Vec<PriceLevel> {
        self.core.state.lock().asks.visible_levels()
    }

    /// The visible bid levels, best (highest) price first.
    pub fn visible_bids(&self) -> Vec<PriceLevel> {
        self.core.state.lock().bids.visible_levels()
    }

    /// An owned copy of both visible sides.
    pub fn snapshot(&self) -> PriceLevelSet {
        let state = self.core.state.lock();
        PriceLevelSet {
            asks: state.asks.visible_levels(),
            bids: state.bids.visible_levels(),
        }
    }

    /// The best (lowest) ask level.
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.core.state.lock().asks.best()
    }

    /// The best (highest) bid level.
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.core.state.lock().bids.best()
    }

    /// Midpoint of the best bid and ask prices.
    pub fn mid_price(&self) -> Option<f64> {
        let state = self.core.state.lock();
        match (state.bids.best(), state.asks.best()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / 2.0),
            _ => None,
        }
    }

    /// Best ask price minus best bid price.
    pub fn spread(&self) -> Option<f64> {
        let state = self.core.state.lock();
        match (state.bids.best(), state.asks.best()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }
}

impl Drop for PriceLevelBook {
    fn drop(&mut self) {
        self.feed.detach(self.subscription);
        info!(symbol = %self.core.symbol, source = %self.core.source, "price-level book detached");
    }
}
