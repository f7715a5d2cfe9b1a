//! # PID Controller Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use drive_lib::{
    pid_ctrl::{Gains, PidController, DEFAULT_INTEGRAL_BOUND},
    tuner::{Params, Tuner},
};

/// A cross track error signal resembling a recorded drive
fn cte_signal(num_samples: usize) -> Vec<f64> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 * 0.05;
            1.5 * (t * 0.7).sin() + 0.3 * (t * 5.3).sin()
        })
        .collect()
}

fn pid_benchmark(c: &mut Criterion) {
    let samples = cte_signal(1000);

    c.bench_function("pid 1000 samples", |b| {
        b.iter(|| {
            let mut ctrl =
                PidController::new(Gains::new(0.19, 0.0016, 3.4), DEFAULT_INTEGRAL_BOUND);

            for s in samples.iter() {
                ctrl.update_error(*s);
                black_box(ctrl.total_error());
            }
        })
    });

    c.bench_function("tuned pid 1000 samples", |b| {
        b.iter(|| {
            let gains = Gains::new(0.18, 0.00000005, 4.0);
            let mut ctrl = PidController::new(gains, DEFAULT_INTEGRAL_BOUND);
            let mut tuner = Tuner::new(gains, &Params::default());

            for (i, s) in samples.iter().enumerate() {
                ctrl.update_error(*s);
                tuner.record_sample(*s);
                black_box(ctrl.total_error());

                if i % 100 == 99 {
                    black_box(tuner.end_trial(&mut ctrl));
                }
            }
        })
    });
}

criterion_group!(benches, pid_benchmark);
criterion_main!(benches);
