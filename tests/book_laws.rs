//! Algebraic properties of batch processing: consolidation idempotence,
//! add/remove round-trips, and window commutativity.

use levelbook::{
    ChannelFeed, EventFlags, OrderEvent, OrderSide, PriceLevelBook, PriceLevelChangeSet,
};
use parking_lot::Mutex;
use std::sync::Arc;

fn sell(index: i64, price: f64, size: f64) -> OrderEvent {
    OrderEvent {
        index,
        price,
        size,
        time: 1_000,
        side: OrderSide::Sell,
        flags: EventFlags::empty(),
    }
}

fn removal(index: i64) -> OrderEvent {
    OrderEvent {
        index,
        price: f64::NAN,
        size: f64::NAN,
        time: 2_000,
        side: OrderSide::Undefined,
        flags: EventFlags::REMOVE_EVENT,
    }
}

fn attach(depth: usize) -> (Arc<ChannelFeed>, PriceLevelBook) {
    let feed = Arc::new(ChannelFeed::new());
    let book = PriceLevelBook::create(feed.clone(), "AAPL", "NTV", depth).expect("attach");
    (feed, book)
}

#[test]
fn duplicate_event_in_one_batch_equals_doubled_size() {
    let (feed, book) = attach(3);
    feed.publish(
        "AAPL",
        "NTV",
        &[sell(1, 100.0, 5.0), sell(1, 100.0, 5.0)],
        true,
    );

    let (feed2, doubled) = attach(3);
    feed2.publish("AAPL", "NTV", &[sell(1, 100.0, 10.0)], true);

    assert_eq!(book.snapshot(), doubled.snapshot());
}

#[test]
fn add_then_remove_in_one_batch_is_a_no_op() {
    let (feed, book) = attach(3);
    feed.publish("AAPL", "NTV", &[sell(1, 100.0, 5.0)], true);
    let before = book.snapshot();

    feed.publish("AAPL", "NTV", &[sell(2, 100.5, 3.0), removal(2)], false);

    assert_eq!(book.snapshot(), before);
}

#[test]
fn add_then_remove_across_batches_restores_the_book() {
    let (feed, book) = attach(3);
    feed.publish(
        "AAPL",
        "NTV",
        &[sell(1, 100.0, 5.0), sell(2, 101.0, 3.0)],
        true,
    );
    let before: Vec<(f64, f64)> = book
        .visible_asks()
        .iter()
        .map(|l| (l.price, l.size))
        .collect();

    feed.publish("AAPL", "NTV", &[sell(3, 100.0, 2.25)], false);
    feed.publish("AAPL", "NTV", &[removal(3)], false);

    // Bit-exact on sizes: the removal subtracts exactly the size added.
    let after: Vec<(f64, f64)> = book
        .visible_asks()
        .iter()
        .map(|l| (l.price, l.size))
        .collect();
    assert_eq!(after, before);
}

#[test]
fn beyond_window_additions_leave_the_window_untouched() {
    let (feed, book) = attach(2);
    feed.publish(
        "AAPL",
        "NTV",
        &[sell(1, 10.0, 1.0), sell(2, 11.0, 1.0)],
        true,
    );
    let before = book.snapshot();

    let changes: Arc<Mutex<Vec<PriceLevelChangeSet>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let changes = Arc::clone(&changes);
        book.set_on_incremental_change(Arc::new(move |set: &PriceLevelChangeSet| {
            changes.lock().push(set.clone());
        }));
    }

    feed.publish(
        "AAPL",
        "NTV",
        &[sell(3, 12.0, 1.0), sell(4, 13.0, 1.0)],
        false,
    );

    // The change-set fires, but it is empty, and the window is unchanged.
    let recorded = changes.lock();
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].is_empty());
    assert_eq!(book.snapshot(), before);
}
