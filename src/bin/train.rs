use softnet::feed_forward::{NeuralNet, TrainOptions};
use softnet::monitor::Logging;

use rand::Rng;
use rand_distr::{Distribution, Normal};

type Point = [f64; 2];

/// Samples noisy points on the unit circle, labelled by quadrant parity.
/// The classes are not linearly separable, so the hidden layers have to do
/// real work.
fn generate_data(num_samples: usize) -> (Vec<Point>, Vec<usize>) {
    let mut rng = rand::thread_rng();
    let noise = Normal::new(0.0, 0.1).unwrap();

    let mut data = Vec::with_capacity(num_samples);
    let mut labels = Vec::with_capacity(num_samples);
    for _ in 0..num_samples {
        let theta = rng.gen_range(0.0..2.0 * std::f64::consts::PI);
        let dx = noise.sample(&mut rng);
        let dy = noise.sample(&mut rng);
        let point = [theta.cos() + dx, theta.sin() + dy];
        let label = if point[0] * point[1] > 0.0 { 0 } else { 1 };
        data.push(point);
        labels.push(label);
    }
    (data, labels)
}

fn score(set_name: &str, net: &NeuralNet, data: &[Point], labels: &[usize]) {
    let predicted = net.predict(data);
    let num_correct = predicted
        .iter()
        .zip(labels.iter())
        .filter(|(p, l)| p == l)
        .count();
    println!(
        "{} set results: {} of {} correct",
        set_name,
        num_correct,
        data.len()
    );
}

fn main() {
    let (train_data, train_labels) = generate_data(2_000);
    let (test_data, test_labels) = generate_data(500);

    let mut net = NeuralNet::new(2, 2, &[5, 5]).unwrap();
    let options = TrainOptions::new()
        .step_size(0.5)
        .iterations(500)
        .regularization(1e-6);
    net.train(
        &train_data,
        &train_labels,
        &options,
        Some((&test_data, &test_labels)),
        &mut Logging::Iterations(50),
    )
    .unwrap();

    println!();
    score("Training", &net, &train_data, &train_labels);
    score("Test", &net, &test_data, &test_labels);
}
