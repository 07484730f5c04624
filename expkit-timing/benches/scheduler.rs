use criterion::{black_box, criterion_group, criterion_main, Criterion};
use expkit_timing::{ManualClock, Scheduler};

fn schedule_and_drain(c: &mut Criterion) {
    c.bench_function("schedule_and_drain_1k", |b| {
        b.iter(|| {
            let mut sched = Scheduler::new(ManualClock::new());
            for i in 0..1000u64 {
                sched.push(black_box(i % 97), i);
            }
            while let Some(fired) = sched.wait_next() {
                black_box(fired.event);
            }
        })
    });
}

fn cancel_half(c: &mut Criterion) {
    c.bench_function("cancel_half_1k", |b| {
        b.iter(|| {
            let mut sched = Scheduler::new(ManualClock::new());
            let handles: Vec<_> = (0..1000u64).map(|i| sched.push(i, i)).collect();
            for handle in handles.iter().step_by(2) {
                black_box(sched.remove(*handle));
            }
            black_box(sched.len());
        })
    });
}

criterion_group!(benches, schedule_and_drain, cancel_half);
criterion_main!(benches);
