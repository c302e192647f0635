//! Shared data model: raw order events, price levels, and change-sets.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Raw event flags as delivered on the market-data wire.
    ///
    /// Only [`EventFlags::REMOVE_EVENT`] participates in aggregation; the
    /// remaining bits are transport framing that the feed client has already
    /// acted on by the time a batch reaches the book.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventFlags: u32 {
        /// More events of the current transaction follow.
        const TX_PENDING = 0x01;
        /// The event removes the order identified by its `index`.
        const REMOVE_EVENT = 0x02;
        /// First event of a snapshot.
        const SNAPSHOT_BEGIN = 0x04;
        /// Last event of a snapshot.
        const SNAPSHOT_END = 0x08;
    }
}

/// Side of a resting order or price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Bid side.
    Buy,
    /// Ask side.
    Sell,
}

/// Side as carried on a raw wire event.
///
/// Feeds occasionally deliver records without a usable side; those surface
/// here as [`OrderSide::Undefined`] and are rejected by the delta builder
/// unless the order is already known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderSide {
    /// Bid side.
    Buy,
    /// Ask side.
    Sell,
    /// Side missing or unparsable.
    #[default]
    Undefined,
}

impl OrderSide {
    /// The definite side, if the event carried one.
    pub fn known(self) -> Option<Side> {
        match self {
            OrderSide::Buy => Some(Side::Buy),
            OrderSide::Sell => Some(Side::Sell),
            OrderSide::Undefined => None,
        }
    }
}

/// One raw order record as delivered by the feed callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderEvent {
    /// Feed-assigned order identifier, unique among live orders.
    pub index: i64,
    /// Order price. May be NaN on removal events.
    pub price: f64,
    /// Order size. Zero or NaN marks a removal.
    pub size: f64,
    /// Event timestamp in milliseconds since the epoch.
    pub time: i64,
    /// Order side; `Undefined` on some removal events.
    pub side: OrderSide,
    /// Raw wire flags.
    pub flags: EventFlags,
}

impl OrderEvent {
    /// Whether this event removes the order.
    ///
    /// A removal either carries [`EventFlags::REMOVE_EVENT`] or reports a
    /// zero or NaN size.
    pub fn is_removal(&self) -> bool {
        self.flags.contains(EventFlags::REMOVE_EVENT) || self.size == 0.0 || self.size.is_nan()
    }
}

/// Aggregate size of all live orders at one price on one side of the book.
///
/// Equality and ordering are by price only; `size` and `time` are payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Level price.
    pub price: f64,
    /// Aggregate size of all live orders at this price.
    pub size: f64,
    /// Timestamp of the last event that touched this level, in milliseconds.
    pub time: i64,
}

impl PriceLevel {
    /// Create a price level.
    pub fn new(price: f64, size: f64, time: i64) -> Self {
        Self { price, size, time }
    }

    /// A level only exists while its aggregate size is non-negligible.
    pub fn is_zero(&self) -> bool {
        self.size.abs() < f64::EPSILON
    }
}

/// Two prices denote the same level iff they differ by less than the IEEE
/// double machine epsilon.
pub fn same_price(a: f64, b: f64) -> bool {
    (a - b).abs() < f64::EPSILON
}

/// Price levels of both sides, asks ascending and bids descending by price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceLevelSet {
    /// Ask levels, best (lowest) price first.
    pub asks: Vec<PriceLevel>,
    /// Bid levels, best (highest) price first.
    pub bids: Vec<PriceLevel>,
}

impl PriceLevelSet {
    /// True when neither side holds a level.
    pub fn is_empty(&self) -> bool {
        self.asks.is_empty() && self.bids.is_empty()
    }
}

/// Everything that changed inside the visible window during one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceLevelChangeSet {
    /// Levels that entered the visible window.
    pub additions: PriceLevelSet,
    /// Visible levels whose size or time changed.
    pub updates: PriceLevelSet,
    /// Levels that left the visible window, with their pre-removal sizes.
    pub removals: PriceLevelSet,
}

impl PriceLevelChangeSet {
    /// True when the batch produced no visible change.
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.updates.is_empty() && self.removals.is_empty()
    }
}
