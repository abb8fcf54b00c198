use criterion::{black_box, criterion_group, criterion_main, Criterion};
use eifair::adversarial::PgaSolver;
use eifair::data::{FairnessDataset, Matrix};
use eifair::effort::{Effort, GradientEffort, NoEffort};
use eifair::ei_model::{EIModel, TrainConfig};
use eifair::model::{Classifier, Sequential};
use eifair::objective::{LogLoss, ObjectiveFunction};
use eifair::params::BoxBounds;
use eifair::proxy::{FairnessProxy, Proxy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

fn make_dataset(n: usize, n_features: usize) -> FairnessDataset {
    let mut rng = StdRng::seed_from_u64(0);
    let mut data = Vec::with_capacity(n * n_features);
    let mut y = Vec::with_capacity(n);
    let mut z = Vec::with_capacity(n);
    for i in 0..n {
        let label = rng.gen_bool(0.5);
        for j in 0..n_features {
            let shift = if j == 0 && label { 1.0 } else { 0.0 };
            data.push(shift + rng.gen_range(-1.0..1.0));
        }
        y.push(if label { 1.0 } else { 0.0 });
        z.push((i % 2) as f64);
    }
    let x = Matrix::new(data, n, n_features).expect("matrix shape");
    FairnessDataset::new(x, y, z).expect("aligned dataset")
}

pub fn component_benchmarks(c: &mut Criterion) {
    let dataset = make_dataset(10_000, 8);
    let model = Sequential::mlp(8, &[16], 0);
    let y_hat = model.forward(dataset.x()).expect("forward");

    c.bench_function("forward mlp", |b| b.iter(|| model.forward(black_box(dataset.x()))));
    c.bench_function("backward mlp", |b| {
        b.iter(|| model.backward(black_box(dataset.x()), black_box(&y_hat)))
    });
    c.bench_function("log loss gradient", |b| {
        b.iter(|| LogLoss::default().loss_and_gradient(black_box(dataset.y()), black_box(&y_hat)))
    });
    c.bench_function("mean gap proxy", |b| {
        b.iter(|| Proxy::MeanGap.value_and_gradient(black_box(dataset.z()), black_box(&y_hat)))
    });
    c.bench_function("covariance proxy", |b| {
        b.iter(|| Proxy::Covariance.value_and_gradient(black_box(dataset.z()), black_box(&y_hat)))
    });

    let effort = GradientEffort::new(0.5).expect("valid delta");
    c.bench_function("gradient effort", |b| {
        b.iter(|| effort.apply(black_box(&model), &dataset, black_box(dataset.x())))
    });

    let solver = PgaSolver::new(50, 0.0, 1e-3);
    let bounds = BoxBounds::around(&model.parameters(), 0.1);
    c.bench_function("projected gradient ascent", |b| {
        b.iter(|| solver.run(black_box(&model), dataset.x(), dataset.z(), &bounds, &Proxy::MeanGap))
    });
}

pub fn training_benchmarks(c: &mut Criterion) {
    let dataset = make_dataset(2_000, 8);
    let cfg = TrainConfig {
        lamb: 0.5,
        alpha: 0.1,
        lr: 0.01,
        n_epochs: 5,
        batch_size: 256,
        pga_n_iters: 10,
        ..Default::default()
    };

    let mut group = c.benchmark_group("training");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));
    group.bench_function("train logistic", |b| {
        b.iter(|| {
            let mut ei = EIModel::with_default_tau(Sequential::logistic(8, 0), Proxy::MeanGap, NoEffort::default());
            ei.train(black_box(&dataset), &cfg).expect("training");
        })
    });
    group.bench_function("train mlp with effort", |b| {
        b.iter(|| {
            let effort = GradientEffort::new(0.2).expect("valid delta");
            let mut ei = EIModel::with_default_tau(Sequential::mlp(8, &[16], 0), Proxy::Covariance, effort);
            ei.train(black_box(&dataset), &cfg).expect("training");
        })
    });
    group.finish();
}

criterion_group!(benches, component_benchmarks, training_benchmarks);
criterion_main!(benches);
