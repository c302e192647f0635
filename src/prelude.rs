//! Prelude module that re-exports commonly used types and traits.
//!
//! Instead of importing each type individually, you can use:
//!
//! ```rust
//! use levelbook::prelude::*;
//! ```

// Core book types
pub use crate::book::PriceLevelBook;
pub use crate::book::error::BookError;

// Feed attachment
pub use crate::book::feed::{ChannelFeed, FeedListener, MarketDataFeed, SubscriptionId};

// Notification hooks
pub use crate::book::events::{BookListener, ChangeSetListener};

// Data model
pub use crate::book::types::{
    EventFlags, OrderEvent, OrderSide, PriceLevel, PriceLevelChangeSet, PriceLevelSet, Side,
};
