use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flightfare::inference::FareModel;
use flightfare::preprocessing::FeaturePreprocessor;
use flightfare::training::{EstimatorSpec, Regressor};
use ndarray::Array1;
use polars::prelude::*;
use rand::prelude::*;

fn create_flight_data(n_rows: usize) -> (DataFrame, Array1<f64>) {
    let mut rng = rand::thread_rng();
    let airlines = ["IndiGo", "Air_India", "Vistara", "SpiceJet", "GO_FIRST", "AirAsia"];
    let classes = ["Economy", "Business"];

    let airline: Vec<&str> = (0..n_rows).map(|_| *airlines.choose(&mut rng).unwrap()).collect();
    let class: Vec<&str> = (0..n_rows).map(|_| *classes.choose(&mut rng).unwrap()).collect();
    let duration: Vec<f64> = (0..n_rows).map(|_| rng.gen_range(1.0..30.0)).collect();
    let days_left: Vec<i64> = (0..n_rows).map(|_| rng.gen_range(1..50)).collect();

    let price: Array1<f64> = (0..n_rows)
        .map(|i| {
            let business = if class[i] == "Business" { 20000.0 } else { 0.0 };
            3000.0 + business + 350.0 * duration[i] - 60.0 * days_left[i] as f64
                + rng.gen::<f64>() * 500.0
        })
        .collect();

    let df = df!(
        "airline" => &airline,
        "class" => &class,
        "duration" => &duration,
        "days_left" => &days_left
    )
    .unwrap();
    (df, price)
}

fn bench_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocessing");

    for n_rows in [1000, 10000].iter() {
        let (df, _) = create_flight_data(*n_rows);

        group.bench_with_input(BenchmarkId::new("fit_transform", n_rows), &df, |b, df| {
            b.iter(|| {
                let mut preprocessor = FeaturePreprocessor::new();
                preprocessor.fit_transform(black_box(df)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    let specs = [
        ("linear_regression", EstimatorSpec::LinearRegression),
        ("decision_tree", EstimatorSpec::decision_tree()),
        ("gradient_boosting", EstimatorSpec::gradient_boosting()),
    ];

    for n_rows in [1000, 5000].iter() {
        let (df, y) = create_flight_data(*n_rows);
        let x = FeaturePreprocessor::new().fit_transform(&df).unwrap();

        for (name, spec) in &specs {
            group.bench_with_input(BenchmarkId::new(*name, n_rows), &x, |b, x| {
                b.iter(|| {
                    let mut estimator = spec.build(Some(42));
                    estimator.fit(black_box(x), black_box(&y)).unwrap()
                })
            });
        }
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train model once
    let (train_df, y) = create_flight_data(5000);
    let mut preprocessor = FeaturePreprocessor::new();
    let x = preprocessor.fit_transform(&train_df).unwrap();
    let mut estimator = EstimatorSpec::decision_tree().build(Some(42));
    estimator.fit(&x, &y).unwrap();
    let model = FareModel::new(preprocessor, estimator).unwrap();

    for n_rows in [100, 1000, 10000].iter() {
        let (test_df, _) = create_flight_data(*n_rows);

        group.bench_with_input(BenchmarkId::new("predict", n_rows), &test_df, |b, df| {
            b.iter(|| model.predict(black_box(df)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_preprocessing, bench_training, bench_prediction);
criterion_main!(benches);
