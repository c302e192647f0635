//! Benchmarks for price-level book batch processing.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use levelbook::{ChannelFeed, EventFlags, OrderEvent, OrderSide, PriceLevelBook};
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

fn populated(levels: usize, depth: usize) -> (Arc<ChannelFeed>, PriceLevelBook) {
    let feed = Arc::new(ChannelFeed::new());
    let book = PriceLevelBook::create(feed.clone(), "BENCH", "NTV", depth).expect("attach");
    let snapshot: Vec<OrderEvent> = (0..levels)
        .map(|i| sell(i as i64, 100.0 + i as f64 * 0.01, 10.0))
        .collect();
    feed.publish("BENCH", "NTV", &snapshot, true);
    (feed, book)
}

fn bench_incremental_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental_update");

    for levels in [10usize, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(levels),
            &levels,
            |b, &levels| {
                let (feed, _book) = populated(levels, 10);
                let add = [sell(1_000_000, 100.005, 1.0)];
                let remove = [removal(1_000_000)];

                b.iter(|| {
                    feed.publish("BENCH", "NTV", black_box(&add), false);
                    feed.publish("BENCH", "NTV", black_box(&remove), false);
                });
            },
        );
    }

    group.finish();
}

fn bench_snapshot_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_rebuild");

    for levels in [100usize, 1000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(levels),
            &levels,
            |b, &levels| {
                let feed = Arc::new(ChannelFeed::new());
                let _book = PriceLevelBook::create(feed.clone(), "BENCH", "NTV", 10).expect("attach");
                let snapshot: Vec<OrderEvent> = (0..levels)
                    .map(|i| sell(i as i64, 100.0 + i as f64 * 0.01, 10.0))
                    .collect();

                b.iter(|| {
                    feed.publish("BENCH", "NTV", black_box(&snapshot), true);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_incremental_update, bench_snapshot_rebuild);
criterion_main!(benches);
