//! # levelbook
//!
//! Bounded price-level order book aggregation for per-order market-data
//! streams.
//!
//! A [`PriceLevelBook`] consumes batches of raw order events (additions,
//! modifications, removals) for a single instrument from one order source
//! and maintains the aggregation of those orders into price levels, one
//! level per distinct price per side, optionally truncated to the best N
//! levels. After each batch it emits one of:
//!
//! - a full-book snapshot when the source declares a new book,
//! - an incremental change-set of additions, updates, and removals inside
//!   the visible top-N window, followed by the full updated top-N view.
//!
//! The window is maintained incrementally: a change below the visible
//! boundary never re-sorts the book, and a change at the boundary promotes
//! or demotes exactly the levels that crossed it.
//!
//! ## Architecture
//!
//! - [`book::PriceLevelBook`]: the instance itself, with one lock, batch
//!   processing, and the notification hooks.
//! - [`book::feed`]: the feed attachment seam; [`ChannelFeed`] is the
//!   in-process implementation for tests and replay.
//! - [`book::types`]: order events, price levels, and change-sets.
//!
//! ## Example
//!
//! ```
//! use levelbook::{ChannelFeed, EventFlags, OrderEvent, OrderSide, PriceLevelBook, PriceLevelSet};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), levelbook::BookError> {
//! let feed = Arc::new(ChannelFeed::new());
//! let book = PriceLevelBook::create(feed.clone(), "AAPL", "NTV", 10)?;
//! book.set_on_new_book(Arc::new(|view: &PriceLevelSet| {
//!     println!("book reset: {} asks, {} bids", view.asks.len(), view.bids.len());
//! }));
//!
//! feed.publish(
//!     "AAPL",
//!     "NTV",
//!     &[OrderEvent {
//!         index: 1,
//!         price: 100.25,
//!         size: 300.0,
//!         time: 1_700_000_000_000,
//!         side: OrderSide::Sell,
//!         flags: EventFlags::empty(),
//!     }],
//!     true,
//! );
//!
//! assert_eq!(book.visible_asks().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod book;
pub mod prelude;

pub use book::{
    BookError, BookListener, ChangeSetListener, ChannelFeed, EventFlags, FeedListener,
    MarketDataFeed, OrderEvent, OrderSide, PriceLevel, PriceLevelBook, PriceLevelChangeSet,
    PriceLevelSet, Side, SubscriptionId,
};
