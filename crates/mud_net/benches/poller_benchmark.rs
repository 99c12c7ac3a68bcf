//! Round-robin poller benchmarks.
//!
//! Run with: cargo bench -p mud_net --bench poller_benchmark

// criterion_group! generates undocumented items
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mud_net::ConnectionTable;

fn build_table(sessions: usize, ready_every: usize) -> ConnectionTable {
    let table = ConnectionTable::new();
    for i in 0..sessions {
        let session = table.accept();
        session.activate();
        if ready_every > 0 && i % ready_every == 0 {
            // next_ready() does not consume input, one line keeps it ready
            session.deliver("cmd");
        }
    }
    table
}

fn bench_next_ready_idle(c: &mut Criterion) {
    let table = build_table(500, 0);
    c.bench_function("next_ready_500_idle", |b| {
        b.iter(|| black_box(table.next_ready()));
    });
}

fn bench_next_ready_sparse(c: &mut Criterion) {
    let table = build_table(500, 50);
    c.bench_function("next_ready_500_sparse", |b| {
        b.iter(|| black_box(table.next_ready()));
    });
}

fn bench_has_ready_work(c: &mut Criterion) {
    let table = build_table(500, 0);
    c.bench_function("has_ready_work_500_idle", |b| {
        b.iter(|| black_box(table.has_ready_work()));
    });
}

criterion_group!(benches, bench_next_ready_idle, bench_next_ready_sparse, bench_has_ready_work);
criterion_main!(benches);
