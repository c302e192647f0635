//! Translation of raw order events into consolidated per-level deltas.
//!
//! One inbound batch of per-order events becomes at most one signed size
//! change per `(side, price)`. The builder leans on the order index to
//! resolve removals and side switches, whose events usually omit the prior
//! price and size.
//!
//! When an order changes price on an unchanged side, the upstream feed is
//! expected to deliver a separate removal for the old price; the builder
//! does not synthesize one.

use crate::book::order_index::{OrderEntry, OrderIndex};
use crate::book::types::{OrderEvent, Side};
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;
use std::ops::Bound;
use tracing::{trace, warn};

/// A signed size change at one price, consolidated over a batch.
///
/// Positive `signed_size` means size arrived at the price; negative means it
/// departed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LevelDelta {
    pub price: f64,
    pub signed_size: f64,
    pub time: i64,
}

/// Per-side level deltas produced from one inbound batch.
///
/// Asks are ascending and bids descending by price, matching the order in
/// which each side stores and emits its levels.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PriceLevelDeltas {
    pub asks: Vec<LevelDelta>,
    pub bids: Vec<LevelDelta>,
}

#[derive(Debug, Clone, Copy)]
struct Accum {
    signed_size: f64,
    time: i64,
}

type SideAccum = BTreeMap<OrderedFloat<f64>, Accum>;

/// Find an existing accumulation key within epsilon of `price`.
fn close_key(map: &SideAccum, price: f64) -> Option<OrderedFloat<f64>> {
    let lo = OrderedFloat(price - f64::EPSILON);
    let hi = OrderedFloat(price + f64::EPSILON);
    if lo == hi {
        // The interval collapsed to the price itself; epsilon equality
        // degenerates to exact equality at this magnitude.
        return map.contains_key(&lo).then_some(lo);
    }
    map.range((Bound::Excluded(lo), Bound::Excluded(hi)))
        .next()
        .map(|(k, _)| *k)
}

fn merge(map: &mut SideAccum, price: f64, signed_size: f64, time: i64) {
    let key = close_key(map, price).unwrap_or(OrderedFloat(price));
    let accum = map.entry(key).or_insert(Accum {
        signed_size: 0.0,
        time,
    });
    accum.signed_size += signed_size;
    accum.time = time;
}

/// Transform a batch of order events into per-side price-level deltas,
/// updating the order index along the way.
///
/// Events are processed in delivered order. Malformed events (a non-removal
/// with an undefined side or a non-finite price) are dropped with a warning;
/// they never abort the batch.
pub(crate) fn build_level_deltas(batch: &[OrderEvent], index: &mut OrderIndex) -> PriceLevelDeltas {
    let mut asks = SideAccum::new();
    let mut bids = SideAccum::new();

    for event in batch {
        trace!(
            index = event.index,
            price = event.price,
            size = event.size,
            side = ?event.side,
            flags = event.flags.bits(),
            "order event"
        );

        let removal = event.is_removal();
        let prior = index.lookup(event.index).copied();

        match prior {
            None => {
                if removal {
                    // Nothing to undo for an unknown order.
                    continue;
                }
                let Some(new_entry) = validated_entry(event) else {
                    continue;
                };
                accumulate(&mut asks, &mut bids, new_entry.side, event.price, event.size, event.time);
                index.upsert(event.index, new_entry);
            }
            Some(prior) => {
                if removal {
                    accumulate(
                        &mut asks,
                        &mut bids,
                        prior.side,
                        prior.price,
                        -prior.size,
                        event.time,
                    );
                    index.remove(event.index);
                } else {
                    let Some(new_entry) = validated_entry(event) else {
                        continue;
                    };
                    if new_entry.side != prior.side {
                        accumulate(
                            &mut asks,
                            &mut bids,
                            prior.side,
                            prior.price,
                            -prior.size,
                            event.time,
                        );
                    }
                    accumulate(&mut asks, &mut bids, new_entry.side, event.price, event.size, event.time);
                    index.upsert(event.index, new_entry);
                }
            }
        }
    }

    PriceLevelDeltas {
        asks: collect(asks.iter()),
        bids: collect(bids.iter().rev()),
    }
}

fn validated_entry(event: &OrderEvent) -> Option<OrderEntry> {
    let Some(side) = event.side.known() else {
        warn!(index = event.index, "dropping order event without a side");
        return None;
    };
    if !event.price.is_finite() {
        warn!(
            index = event.index,
            price = event.price,
            "dropping order event with non-finite price"
        );
        return None;
    }
    if !event.size.is_finite() || event.size < 0.0 {
        warn!(
            index = event.index,
            size = event.size,
            "dropping order event with unusable size"
        );
        return None;
    }
    Some(OrderEntry {
        price: event.price,
        size: event.size,
        time: event.time,
        side,
    })
}

fn accumulate(
    asks: &mut SideAccum,
    bids: &mut SideAccum,
    side: Side,
    price: f64,
    signed_size: f64,
    time: i64,
) {
    let map = match side {
        Side::Buy => bids,
        Side::Sell => asks,
    };
    merge(map, price, signed_size, time);
}

/// Consolidated deltas whose signed size cancelled out are discarded.
fn collect<'a>(entries: impl Iterator<Item = (&'a OrderedFloat<f64>, &'a Accum)>) -> Vec<LevelDelta> {
    entries
        .filter(|(_, accum)| accum.signed_size.abs() >= f64::EPSILON)
        .map(|(price, accum)| LevelDelta {
            price: price.into_inner(),
            signed_size: accum.signed_size,
            time: accum.time,
        })
        .collect()
}
