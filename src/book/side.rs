//! Sorted per-side level storage with top-N window maintenance.
//!
//! Each side keeps its levels in a `BTreeMap` whose key type sorts best
//! price first (ascending for asks, descending for bids), so the window
//! logic below is written once. The window cursor is the key of the last
//! visible level, re-resolved by key after every mutation; `None` plays the
//! role of the end iterator: the side is empty, or the depth is unbounded.
//!
//! A change at or inside the window boundary can shift it: removing a
//! visible level promotes the best hidden one, and an addition that fits
//! demotes the old worst visible level. Both cases are reconciled against
//! the changes already pending in the same batch, so a level that was added
//! and immediately pushed out again never reaches the change-set.

use crate::book::delta::LevelDelta;
use crate::book::types::PriceLevel;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::ops::Bound;
use tracing::warn;

/// Ordering key for one side of the book. Keys sort best price first.
pub(crate) trait PriceKey: Copy + Ord + Debug {
    fn from_price(price: f64) -> Self;
    fn price(self) -> f64;
}

/// Ask key: ascending price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct AskKey(OrderedFloat<f64>);

impl PriceKey for AskKey {
    fn from_price(price: f64) -> Self {
        AskKey(OrderedFloat(price))
    }

    fn price(self) -> f64 {
        self.0.into_inner()
    }
}

/// Bid key: descending price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct BidKey(Reverse<OrderedFloat<f64>>);

impl PriceKey for BidKey {
    fn from_price(price: f64) -> Self {
        BidKey(Reverse(OrderedFloat(price)))
    }

    fn price(self) -> f64 {
        self.0 .0.into_inner()
    }
}

/// Aggregate payload stored per price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LevelEntry {
    pub size: f64,
    pub time: i64,
}

/// Visible-window emissions accumulated while applying one batch to a side.
///
/// Backed by sorted maps so the final change-set comes out best price first
/// and so a pending addition can be cancelled when its level is demoted
/// later in the same batch.
#[derive(Debug)]
pub(crate) struct WindowChanges<K: PriceKey> {
    additions: BTreeMap<K, LevelEntry>,
    updates: BTreeMap<K, LevelEntry>,
    removals: BTreeMap<K, LevelEntry>,
}

impl<K: PriceKey> Default for WindowChanges<K> {
    fn default() -> Self {
        Self {
            additions: BTreeMap::new(),
            updates: BTreeMap::new(),
            removals: BTreeMap::new(),
        }
    }
}

impl<K: PriceKey> WindowChanges<K> {
    /// Drain into `(additions, updates, removals)`, each best price first.
    pub fn into_parts(self) -> (Vec<PriceLevel>, Vec<PriceLevel>, Vec<PriceLevel>) {
        fn levels<K: PriceKey>(map: BTreeMap<K, LevelEntry>) -> Vec<PriceLevel> {
            map.into_iter()
                .map(|(key, entry)| PriceLevel::new(key.price(), entry.size, entry.time))
                .collect()
        }
        (
            levels(self.additions),
            levels(self.updates),
            levels(self.removals),
        )
    }
}

enum Classified<K> {
    Addition(K, LevelEntry),
    Update(K, LevelEntry),
    Removal(K, LevelEntry),
}

/// One side of the book: sorted levels plus the top-N window cursor.
#[derive(Debug)]
pub(crate) struct BookSide<K: PriceKey> {
    levels: BTreeMap<K, LevelEntry>,
    /// Key of the last visible level; `None` when the side is empty or the
    /// depth is unbounded.
    cursor: Option<K>,
    /// Window depth; zero means unbounded.
    depth: usize,
}

impl<K: PriceKey> BookSide<K> {
    pub fn new(depth: usize) -> Self {
        Self {
            levels: BTreeMap::new(),
            cursor: None,
            depth,
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Drop all levels and reset the cursor. Invoked on new-snapshot
    /// boundaries.
    pub fn clear(&mut self) {
        self.levels.clear();
        self.cursor = None;
    }

    /// The first `min(depth, len)` levels in side order; all of them when
    /// the depth is unbounded.
    pub fn visible_levels(&self) -> Vec<PriceLevel> {
        let take = if self.depth == 0 {
            self.levels.len()
        } else {
            self.depth
        };
        self.levels
            .iter()
            .take(take)
            .map(|(key, entry)| PriceLevel::new(key.price(), entry.size, entry.time))
            .collect()
    }

    /// The best level of this side, regardless of windowing.
    pub fn best(&self) -> Option<PriceLevel> {
        self.levels
            .first_key_value()
            .map(|(key, entry)| PriceLevel::new(key.price(), entry.size, entry.time))
    }

    /// Apply one batch of consolidated deltas.
    ///
    /// Deltas are classified against the pre-mutation state, then applied as
    /// removals, additions, and updates in that order. Only changes that
    /// touch the visible window are reported back.
    pub fn apply_deltas(&mut self, deltas: &[LevelDelta]) -> WindowChanges<K> {
        let mut removals = Vec::new();
        let mut additions = Vec::new();
        let mut updates = Vec::new();

        for delta in deltas {
            match self.classify(delta) {
                Some(Classified::Removal(key, entry)) => removals.push((key, entry)),
                Some(Classified::Addition(key, entry)) => additions.push((key, entry)),
                Some(Classified::Update(key, entry)) => updates.push((key, entry)),
                None => {}
            }
        }

        let mut changes = WindowChanges::default();
        for (key, entry) in removals {
            self.apply_removal(key, entry, &mut changes);
        }
        for (key, entry) in additions {
            self.apply_addition(key, entry, &mut changes);
        }
        for (key, entry) in updates {
            self.apply_update(key, entry, &mut changes);
        }
        changes
    }

    /// Classify one delta against the current state: a fresh price is an
    /// addition, an existing one an update, and an update whose new size
    /// vanishes a removal of the stored level.
    fn classify(&self, delta: &LevelDelta) -> Option<Classified<K>> {
        match self.find_key(delta.price) {
            None => {
                if delta.signed_size < f64::EPSILON {
                    // A departure from a level we never saw; the feed and
                    // the book disagree, so the delta is dropped.
                    warn!(
                        price = delta.price,
                        signed_size = delta.signed_size,
                        "dropping negative delta without a matching level"
                    );
                    return None;
                }
                Some(Classified::Addition(
                    K::from_price(delta.price),
                    LevelEntry {
                        size: delta.signed_size,
                        time: delta.time,
                    },
                ))
            }
            Some(key) => {
                let current = *self.levels.get(&key)?;
                let new_size = current.size + delta.signed_size;
                if new_size.abs() < f64::EPSILON {
                    Some(Classified::Removal(key, current))
                } else {
                    Some(Classified::Update(
                        key,
                        LevelEntry {
                            size: new_size,
                            time: delta.time,
                        },
                    ))
                }
            }
        }
    }

    fn apply_removal(&mut self, key: K, entry: LevelEntry, changes: &mut WindowChanges<K>) {
        if self.levels.is_empty() {
            return;
        }
        if self.depth == 0 {
            changes.removals.insert(key, entry);
            self.levels.remove(&key);
            self.cursor = None;
            return;
        }

        let len = self.levels.len();
        // When more levels exist than the window holds, the element after
        // the cursor is the best hidden level.
        let after_cursor = self.cursor.and_then(|c| self.next_key(c));
        let visible = len <= self.depth || after_cursor.is_none_or(|n| key < n);

        if visible {
            changes.removals.insert(key, entry);
            if len > self.depth {
                if let Some(promoted) = after_cursor {
                    if let Some(hidden) = self.levels.get(&promoted).copied() {
                        changes.additions.insert(promoted, hidden);
                    }
                }
            }
        }

        // The new cursor, resolved before the erase so neighbours are still
        // reachable.
        let new_cursor = if visible {
            if after_cursor.is_some() {
                after_cursor
            } else if self.cursor.is_some_and(|c| key < c) {
                self.cursor
            } else {
                self.cursor.and_then(|c| self.prev_key(c))
            }
        } else {
            self.cursor
        };

        self.levels.remove(&key);
        self.cursor = new_cursor;
    }

    fn apply_addition(&mut self, key: K, entry: LevelEntry, changes: &mut WindowChanges<K>) {
        if self.depth == 0 {
            changes.additions.insert(key, entry);
            self.levels.insert(key, entry);
            self.cursor = None;
            return;
        }

        let len = self.levels.len();
        let fits = len < self.depth || self.cursor.is_some_and(|c| key < c);

        if fits {
            changes.additions.insert(key, entry);
            if len >= self.depth {
                if let Some(demoted) = self.cursor {
                    // The old worst visible level is pushed out. If it was
                    // itself added earlier in this batch the two cancel.
                    if changes.additions.remove(&demoted).is_none() {
                        if let Some(stored) = self.levels.get(&demoted).copied() {
                            changes.removals.insert(demoted, stored);
                        }
                    }
                }
            }
        }

        let new_cursor = if fits {
            match self.cursor {
                Some(cursor) if key < cursor => {
                    if len < self.depth {
                        // Room left: the old last visible level stays last.
                        Some(cursor)
                    } else {
                        match self.prev_key(cursor) {
                            Some(prev) if key < prev => Some(prev),
                            _ => Some(key),
                        }
                    }
                }
                _ => Some(key),
            }
        } else {
            self.cursor
        };

        self.levels.insert(key, entry);
        self.cursor = new_cursor;
    }

    fn apply_update(&mut self, key: K, entry: LevelEntry, changes: &mut WindowChanges<K>) {
        if self.depth == 0 {
            changes.updates.insert(key, entry);
            self.levels.insert(key, entry);
            self.cursor = None;
            return;
        }

        let visible =
            self.levels.len() <= self.depth || self.cursor.is_some_and(|c| key <= c);
        if visible {
            changes.updates.insert(key, entry);
        }
        // The key is unchanged, so the cursor stays pinned.
        self.levels.insert(key, entry);
    }

    /// Find the stored key within epsilon of `price`.
    fn find_key(&self, price: f64) -> Option<K> {
        let a = K::from_price(price - f64::EPSILON);
        let b = K::from_price(price + f64::EPSILON);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        if lo == hi {
            // Epsilon vanished against the price's magnitude; equality is
            // exact here.
            let exact = K::from_price(price);
            return self.levels.contains_key(&exact).then_some(exact);
        }
        self.levels
            .range((Bound::Excluded(lo), Bound::Excluded(hi)))
            .next()
            .map(|(key, _)| *key)
    }

    fn next_key(&self, key: K) -> Option<K> {
        self.levels
            .range((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(k, _)| *k)
    }

    fn prev_key(&self, key: K) -> Option<K> {
        self.levels
            .range((Bound::Unbounded, Bound::Excluded(key)))
            .next_back()
            .map(|(k, _)| *k)
    }

    /// All level prices in side order. Test-only.
    #[cfg(test)]
    pub fn prices(&self) -> Vec<f64> {
        self.levels.keys().map(|key| key.price()).collect()
    }

    /// The price under the window cursor. Test-only.
    #[cfg(test)]
    pub fn cursor_price(&self) -> Option<f64> {
        self.cursor.map(|key| key.price())
    }

    /// Aggregate size at `price`, if a level exists there. Test-only.
    #[cfg(test)]
    pub fn size_at(&self, price: f64) -> Option<f64> {
        self.find_key(price)
            .and_then(|key| self.levels.get(&key))
            .map(|entry| entry.size)
    }
}
