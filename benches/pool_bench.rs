use std::{hint::black_box, sync::Arc, thread};

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;

use minnowdb::storage::{
    buffer_pool::BufferPoolManager, disk::MemDiskManager, replacer::LruKReplacer,
};

fn bench_replacer(c: &mut Criterion) {
    c.bench_function("lru_k_mixed_workload", |b| {
        b.iter(|| {
            let replacer = Arc::new(LruKReplacer::new(1024, 2));
            let mut handles = vec![];

            for _tid in 0..4 {
                let replacer = Arc::clone(&replacer);
                handles.push(thread::spawn(move || {
                    let mut rng = rand::rng();

                    for _ in 0..10_000 {
                        let frame = if rng.random_bool(0.8) {
                            // 80% hot frames
                            rng.random_range(0..128)
                        } else {
                            rng.random_range(0..1024)
                        };

                        replacer.record_access(frame);
                        replacer.set_evictable(frame, true);
                        if rng.random_bool(0.05) {
                            let _ = replacer.evict();
                        }
                        black_box(frame);
                    }
                }));
            }

            for h in handles {
                h.join().unwrap();
            }
        });
    });
}

fn bench_buffer_pool(c: &mut Criterion) {
    c.bench_function("pool_fetch_mixed_workload", |b| {
        b.iter(|| {
            let disk = Arc::new(MemDiskManager::new(4096));
            let bpm = Arc::new(BufferPoolManager::new(256, 2, disk));

            // seed a working set larger than the pool
            let mut ids = vec![];
            for _ in 0..512 {
                let page = bpm.new_page().unwrap();
                ids.push(page.id());
                bpm.unpin_page(page.id(), false);
            }

            let mut handles = vec![];
            for _tid in 0..4 {
                let bpm = Arc::clone(&bpm);
                let ids = ids.clone();
                handles.push(thread::spawn(move || {
                    let mut rng = rand::rng();

                    for _ in 0..2_000 {
                        let id = if rng.random_bool(0.8) {
                            // 80% hot pages
                            ids[rng.random_range(0..64)]
                        } else {
                            ids[rng.random_range(0..ids.len())]
                        };

                        let page = bpm.fetch_page(id).unwrap();
                        black_box(page.id());
                        bpm.unpin_page(id, false);
                    }
                }));
            }

            for h in handles {
                h.join().unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_replacer, bench_buffer_pool);
criterion_main!(benches);
