//! Price-level aggregation of a per-order market-data stream.

pub mod book;
mod delta;
pub mod error;
/// Notification hook aliases for book consumers.
pub mod events;
pub mod feed;
mod order_index;
mod side;
#[cfg(test)]
mod tests;
pub mod types;

pub use book::PriceLevelBook;
pub use error::BookError;
pub use events::{BookListener, ChangeSetListener};
pub use feed::{ChannelFeed, FeedListener, MarketDataFeed, SubscriptionId};
pub use types::{
    EventFlags, OrderEvent, OrderSide, PriceLevel, PriceLevelChangeSet, PriceLevelSet, Side,
};
