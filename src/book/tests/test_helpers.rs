//! Shared constructors for order events used across book tests.

use crate::book::types::{EventFlags, OrderEvent, OrderSide};

pub fn order(index: i64, price: f64, size: f64, side: OrderSide, time: i64) -> OrderEvent {
    OrderEvent {
        index,
        price,
        size,
        time,
        side,
        flags: EventFlags::empty(),
    }
}

pub fn sell(index: i64, price: f64, size: f64) -> OrderEvent {
    order(index, price, size, OrderSide::Sell, 1_000)
}

pub fn buy(index: i64, price: f64, size: f64) -> OrderEvent {
    order(index, price, size, OrderSide::Buy, 1_000)
}

/// A wire-faithful removal: flag set, no usable price, size, or side.
pub fn removal(index: i64) -> OrderEvent {
    OrderEvent {
        index,
        price: f64::NAN,
        size: f64::NAN,
        time: 2_000,
        side: OrderSide::Undefined,
        flags: EventFlags::REMOVE_EVENT,
    }
}
