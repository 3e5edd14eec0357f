//! Benchmarks for model fitting, periodogram estimation and selection.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sarimax_forecast::detection::periodogram;
use sarimax_forecast::models::{ModelConfig, ModelOrder, SeasonalModel, SeasonalOrder};
use sarimax_forecast::selection::{ModelSelection, SelectionOptions};
use sarimax_forecast::core::TimeSeries;
use chrono::{Duration, TimeZone, Utc};

fn generate_seasonal(n: usize, period: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            let noise = ((t * 12.9898).sin() * 43_758.545_3).fract() - 0.5;
            50.0 + 0.05 * t + 8.0 * (2.0 * std::f64::consts::PI * t / period as f64).sin() + noise
        })
        .collect()
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");

    for size in [100, 250, 500, 1000].iter() {
        let data = generate_seasonal(*size, 12);

        group.bench_with_input(BenchmarkId::new("ARIMA(1,1,1)", size), size, |b, _| {
            let config = ModelConfig::new(ModelOrder::new(1, 1, 1));
            b.iter(|| {
                let mut model = SeasonalModel::new(config.clone()).unwrap();
                model.fit_values(black_box(&data)).unwrap();
            })
        });

        group.bench_with_input(BenchmarkId::new("SARIMA(1,0,1)(1,1,0)[12]", size), size, |b, _| {
            let config = ModelConfig::new(ModelOrder::new(1, 0, 1))
                .with_seasonal(SeasonalOrder::new(1, 1, 0, 12).unwrap());
            b.iter(|| {
                let mut model = SeasonalModel::new(config.clone()).unwrap();
                model.fit_values(black_box(&data)).unwrap();
            })
        });
    }

    group.finish();
}

fn bench_periodogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("periodogram");
    for size in [256, 1024, 4096].iter() {
        let data = generate_seasonal(*size, 7);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| periodogram(black_box(&data)))
        });
    }
    group.finish();
}

fn bench_selection(c: &mut Criterion) {
    let data = generate_seasonal(168, 7);
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let timestamps = (0..data.len()).map(|i| base + Duration::days(i as i64)).collect();
    let series = TimeSeries::univariate(timestamps, data).unwrap();

    let mut group = c.benchmark_group("selection");
    group.sample_size(10);
    for parallel in [false, true] {
        let options = SelectionOptions::default()
            .with_max_order(1, 1)
            .with_periods(vec![7])
            .with_parallel(parallel);
        let selection = ModelSelection::new(options).unwrap();
        group.bench_function(if parallel { "parallel" } else { "sequential" }, |b| {
            b.iter(|| selection.find_best_model(black_box(&series)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fit, bench_periodogram, bench_selection);
criterion_main!(benches);
