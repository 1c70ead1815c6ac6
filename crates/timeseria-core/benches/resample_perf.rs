//! Throughput benchmark for the resampling transform at scale.
//!
//! Run with: cargo bench --bench resample_perf

use std::time::{Duration, Instant};

use chrono_tz::Tz;
use timeseria_core::{DataPayload, DataTimePoint, Series, TimePoint, Unit};

fn generate_irregular_series(n: usize, mean_dt: f64) -> Series<DataTimePoint> {
    let mut s = Series::new();
    let mut t = 0.0;
    for i in 0..n {
        // Jitter the inter-sample gap so the resampler's validity-region
        // and coverage computation sees a genuinely variable-resolution
        // input rather than the uniform-resolution fast path.
        let jitter = ((i % 7) as f64 - 3.0) * (mean_dt * 0.05);
        t += mean_dt + jitter;
        let v = (2.0 * std::f64::consts::PI * i as f64 / 24.0).sin();
        s.append(DataTimePoint::new(TimePoint::new(t, Tz::UTC), DataPayload::scalar(v)))
            .unwrap();
    }
    s
}

fn benchmark_fn<F, R>(name: &str, iterations: usize, mut f: F) -> Duration
where
    F: FnMut() -> R,
{
    let _ = f();

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = std::hint::black_box(f());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "{}: total={:?}, per_iter={:?}, iters={}",
        name, elapsed, per_iter, iterations
    );
    elapsed
}

fn main() {
    println!("=== Resample Performance Benchmark ===\n");

    let series_lengths = [1_000, 10_000, 100_000, 1_000_000];

    println!("--- 1. Downsampling at 10x mean input interval ---\n");
    for &n in &series_lengths {
        let series = generate_irregular_series(n, 60.0);
        let iters = if n <= 10_000 { 20 } else { 3 };
        benchmark_fn(&format!("resample(n={n}, 600s slots)"), iters, || {
            timeseria_core::resample(&series, Unit::physical(600.0)).unwrap()
        });
    }

    println!("\n--- 2. Upsampling at half the mean input interval ---\n");
    for &n in &[1_000, 10_000, 100_000] {
        let series = generate_irregular_series(n, 60.0);
        let iters = if n <= 10_000 { 20 } else { 3 };
        benchmark_fn(&format!("resample(n={n}, 30s slots, upsample)"), iters, || {
            timeseria_core::resample(&series, Unit::physical(30.0)).unwrap()
        });
    }

    println!("\n--- 3. Sampling-interval inference cost alone ---\n");
    for &n in &series_lengths {
        let series = generate_irregular_series(n, 60.0);
        let iters = if n <= 10_000 { 50 } else { 5 };
        benchmark_fn(&format!("point_resolution(n={n})"), iters, || series.point_resolution());
    }

    println!("\n=== Benchmark Complete ===");
}
