//! A feed-forward [multilayer perceptron]
//! (https://en.wikipedia.org/wiki/Multilayer_perceptron) classifier.
//!
//! # Example
//!
//! Let's train a network to separate two clusters of points:
//!
//! ```
//! use softnet::feed_forward::{NeuralNet, TrainOptions};
//! use softnet::monitor::Logging;
//!
//! let data = [[-2.0, -2.0], [-2.0, -1.8], [2.0, 2.0], [2.0, 1.8]];
//! let labels = [0, 0, 1, 1];
//!
//! // Train a two-class network with one hidden layer of 8 units.
//! let mut net = NeuralNet::seeded(2, 2, &[8], 42).unwrap();
//! let options = TrainOptions::new().step_size(0.1).iterations(500);
//! net.train(&data, &labels, &options, None, &mut Logging::Silent)
//!     .unwrap();
//!
//! // And verify the network classifies the clusters correctly.
//! assert_eq!(net.predict(&data), vec![0, 0, 1, 1]);
//! ```

use crate::error::{Error, Result};
use crate::layer::FullyConnectedLayer;
use crate::matrix::Mat;
use crate::monitor::{IterationReport, Monitor, TrainingSummary};
use crate::utils::{argmax, error_rate};

use itertools::izip;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

/// Ceiling applied to the reported per-sample loss. Whenever the softmax
/// probability at the true label drops below `exp(-LOSS_CLAMP)` the scalar
/// loss is reported as exactly `LOSS_CLAMP`; the gradient is never clipped.
const LOSS_CLAMP: f64 = 10.0;

/// A multilayer perceptron classifier.
///
/// The network owns an ordered list of [`FullyConnectedLayer`]s and one
/// weight matrix per layer. Activations and weight snapshots are threaded
/// explicitly through [`forward`](NeuralNet::forward) and
/// [`backward`](NeuralNet::backward) rather than cached on the layers, so
/// interleaved forward and backward calls across samples can never alias
/// each other's state. Hidden layers use ReLU; the final layer emits raw
/// logits.
#[derive(Clone, Debug)]
pub struct NeuralNet {
    /// Layer widths: `[din, dhidden..., dout]`. Fixed at construction.
    dim: Vec<usize>,
    layers: Vec<FullyConnectedLayer>,
    weights: Vec<Mat>,
}

impl NeuralNet {
    /// Creates a new network with freshly initialized weights.
    ///
    /// Arguments:
    ///  * `din` - the input dimension; must be positive.
    ///  * `dout` - the number of classes; must be positive.
    ///  * `dhidden` - the hidden layer widths; must be non-empty, all
    ///                positive.
    pub fn new(din: usize, dout: usize, dhidden: &[usize]) -> Result<Self> {
        Self::with_rng(din, dout, dhidden, &mut rand::thread_rng())
    }

    /// Creates a new network with weights drawn from a seeded generator,
    /// for reproducible experiments.
    pub fn seeded(
        din: usize,
        dout: usize,
        dhidden: &[usize],
        seed: u64,
    ) -> Result<Self> {
        Self::with_rng(din, dout, dhidden, &mut StdRng::seed_from_u64(seed))
    }

    /// Creates a new network drawing initial weights from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(
        din: usize,
        dout: usize,
        dhidden: &[usize],
        rng: &mut R,
    ) -> Result<Self> {
        if din == 0 || dout == 0 {
            return Err(Error::InvalidConfig(
                "input and output dimensions must be positive".to_owned(),
            ));
        }
        if dhidden.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one hidden layer is required".to_owned(),
            ));
        }
        if dhidden.contains(&0) {
            return Err(Error::InvalidConfig(
                "hidden layer widths must be positive".to_owned(),
            ));
        }

        let mut dim = Vec::with_capacity(dhidden.len() + 2);
        dim.push(din);
        dim.extend_from_slice(dhidden);
        dim.push(dout);

        let layers: Vec<FullyConnectedLayer> = dim
            .windows(2)
            .map(|pair| FullyConnectedLayer::new(pair[0], pair[1]))
            .collect();
        let weights = layers.iter().map(|l| l.generate_weight(rng)).collect();

        Ok(NeuralNet { dim, layers, weights })
    }

    /// Returns the size of the input layer to the network.
    pub fn input_len(&self) -> usize {
        self.dim[0]
    }

    /// Returns the number of output classes.
    pub fn output_len(&self) -> usize {
        self.dim[self.dim.len() - 1]
    }

    /// Returns the layer widths, `[din, dhidden..., dout]`.
    pub fn dim(&self) -> &[usize] {
        &self.dim
    }

    /// Returns the current weight matrices, one per layer.
    pub fn weights(&self) -> &[Mat] {
        &self.weights
    }

    /// Propagates `x0` through every layer under the weight snapshot `w`.
    ///
    /// `w` need not be the network's own weights, which permits evaluating
    /// the same architecture under arbitrary parameters (used by the
    /// gradient checks). Returns the activation cache and the logits: the
    /// cache holds the input to each layer, so `cache[0]` is `x0` and
    /// `cache[i]` is the ReLU-activated output of layer `i - 1`. The final
    /// layer applies no activation.
    pub fn forward(&self, x0: &[f64], w: &[Mat]) -> (Vec<Vec<f64>>, Vec<f64>) {
        let l = self.layers.len();
        assert_eq!(w.len(), l);
        let mut cache = Vec::with_capacity(l);
        cache.push(x0.to_vec());
        for i in 0..l - 1 {
            let mut y = self.layers[i].forward(&cache[i], &w[i]);
            for v in y.iter_mut() {
                if *v < 0.0 {
                    *v = 0.0;
                }
            }
            cache.push(y);
        }
        let logits = self.layers[l - 1].forward(&cache[l - 1], &w[l - 1]);
        (cache, logits)
    }

    /// Propagates the loss gradient `dy` backward through every layer.
    ///
    /// `x` and `w` must be the activation cache and weight snapshot from
    /// the matching `forward` call. Between layers the ReLU derivative
    /// mask is applied: the gradient is zeroed wherever the forward
    /// activation was clamped to zero. Returns one weight gradient per
    /// layer, indexed like `w`.
    pub fn backward(&self, x: &[Vec<f64>], w: &[Mat], dy: Vec<f64>) -> Vec<Mat> {
        assert_eq!(x.len(), self.layers.len());
        assert_eq!(w.len(), self.layers.len());
        let mut grads = Vec::with_capacity(self.layers.len());
        let mut dy = dy;
        for i in (0..self.layers.len()).rev() {
            let (mut dx, dw) = self.layers[i].backward(&x[i], &w[i], &dy);
            grads.push(dw);
            if i > 0 {
                for (d, &a) in dx.iter_mut().zip(x[i].iter()) {
                    if a <= 0.0 {
                        *d = 0.0;
                    }
                }
                dy = dx;
            }
        }
        grads.reverse();
        grads
    }

    /// Computes the softmax cross-entropy loss and its gradient for one
    /// sample.
    ///
    /// The softmax subtracts the max logit before exponentiating so large
    /// scores cannot overflow. The returned gradient is always
    /// `softmax(logits) - onehot(label)`; the scalar loss is `-ln p[label]`
    /// capped at [`LOSS_CLAMP`] for near-zero probabilities.
    pub fn loss(&self, logits: &[f64], label: usize) -> Result<(f64, Vec<f64>)> {
        let classes = self.output_len();
        assert_eq!(logits.len(), classes);
        if label >= classes {
            return Err(Error::LabelOutOfRange { label, classes });
        }

        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut p: Vec<f64> = logits.iter().map(|&s| (s - max).exp()).collect();
        let sum: f64 = p.iter().sum();
        for v in p.iter_mut() {
            *v /= sum;
        }

        let loss = if p[label] < (-LOSS_CLAMP).exp() {
            LOSS_CLAMP
        } else {
            -p[label].ln()
        };
        p[label] -= 1.0;
        Ok((loss, p))
    }

    /// Performs one full-batch gradient-descent step over the entire
    /// dataset, in order, without shuffling.
    ///
    /// Per-layer gradients are summed over all samples while the weights
    /// are held fixed, then each weight matrix is updated once:
    /// `w -= (dw_sum / n) * step_size + w * regularization`. The decay term
    /// multiplies the current weight rather than entering the gradient.
    ///
    /// Returns the per-sample losses and argmax predictions for
    /// monitoring.
    pub fn train_iteration<I>(
        &mut self,
        data: &[I],
        labels: &[usize],
        step_size: f64,
        regularization: f64,
    ) -> Result<(Vec<f64>, Vec<usize>)>
    where
        I: AsRef<[f64]>,
    {
        if data.is_empty() {
            return Err(Error::EmptyDataset);
        }
        if data.len() != labels.len() {
            return Err(Error::InvalidData(format!(
                "{} samples but {} labels",
                data.len(),
                labels.len()
            )));
        }

        let mut dw_sum: Vec<Mat> = self
            .layers
            .iter()
            .map(|l| Mat::zeros(l.input_len() + 1, l.output_len()))
            .collect();
        let mut losses = Vec::with_capacity(data.len());
        let mut predicted = Vec::with_capacity(data.len());

        for (sample, &label) in data.iter().zip(labels.iter()) {
            let (cache, logits) = self.forward(sample.as_ref(), &self.weights);
            let (loss, dy) = self.loss(&logits, label)?;
            let dw = self.backward(&cache, &self.weights, dy);
            for (sum, grad) in izip!(dw_sum.iter_mut(), dw.iter()) {
                *sum += grad;
            }
            losses.push(loss);
            predicted.push(argmax(&logits));
        }

        let scale = step_size / data.len() as f64;
        for (w, grad) in izip!(self.weights.iter_mut(), dw_sum.iter()) {
            w.apply_update(scale, regularization, grad);
        }

        Ok((losses, predicted))
    }

    /// Trains the network for a fixed number of full-batch iterations.
    ///
    /// After each iteration the mean training loss and training error rate
    /// are computed; when a held-out `(test_data, test_labels)` pair is
    /// supplied its error rate is computed via [`predict`](NeuralNet::predict).
    /// Progress is delivered to the injected `monitor`.
    pub fn train<I, M>(
        &mut self,
        data: &[I],
        labels: &[usize],
        options: &TrainOptions,
        test: Option<(&[I], &[usize])>,
        monitor: &mut M,
    ) -> Result<()>
    where
        I: AsRef<[f64]>,
        M: Monitor,
    {
        options.validate()?;
        if let Some((test_data, test_labels)) = test {
            if test_data.len() != test_labels.len() {
                return Err(Error::InvalidData(format!(
                    "{} test samples but {} test labels",
                    test_data.len(),
                    test_labels.len()
                )));
            }
        }

        let start = Instant::now();
        let mut mean_loss = 0.0;
        let mut train_error = 0.0;
        let mut test_error = None;
        for iteration in 1..=options.iterations {
            let (losses, predicted) = self.train_iteration(
                data,
                labels,
                options.step_size,
                options.regularization,
            )?;
            mean_loss = losses.iter().sum::<f64>() / losses.len() as f64;
            train_error = error_rate(&predicted, labels);
            test_error = test
                .map(|(test_data, test_labels)| {
                    error_rate(&self.predict(test_data), test_labels)
                });

            let elapsed = start.elapsed();
            let remaining = Duration::from_secs_f64(
                elapsed.as_secs_f64() / iteration as f64
                    * (options.iterations - iteration) as f64,
            );
            monitor.iteration(&IterationReport {
                iteration,
                iterations: options.iterations,
                mean_loss,
                train_error,
                test_error,
                elapsed,
                remaining,
            });
        }
        monitor.completion(&TrainingSummary {
            iterations: options.iterations,
            mean_loss,
            train_error,
            test_error,
            elapsed: start.elapsed(),
        });
        Ok(())
    }

    /// Predicts the class of every sample under the current weights.
    ///
    /// Read-only with respect to the network; safe to call at any point,
    /// including between training runs.
    pub fn predict<I: AsRef<[f64]>>(&self, data: &[I]) -> Vec<usize> {
        data.iter()
            .map(|sample| {
                let (_, logits) = self.forward(sample.as_ref(), &self.weights);
                argmax(&logits)
            })
            .collect()
    }
}

/// Training hyperparameters for [`NeuralNet::train`].
#[derive(Copy, Clone, Debug)]
pub struct TrainOptions {
    step_size: f64,
    iterations: usize,
    regularization: f64,
}

impl TrainOptions {
    /// Creates options with the default hyperparameters: a step size of
    /// 0.1, 1000 iterations, and no regularization.
    pub fn new() -> Self {
        TrainOptions {
            step_size: 0.1,
            iterations: 1000,
            regularization: 0.0,
        }
    }

    /// Sets the gradient-descent step size. Must be positive.
    pub fn step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    /// Sets the number of full-batch iterations. Must be positive.
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the weight-decay coefficient. Must be non-negative.
    pub fn regularization(mut self, regularization: f64) -> Self {
        self.regularization = regularization;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.step_size > 0.0) {
            return Err(Error::InvalidConfig(
                "step size must be positive".to_owned(),
            ));
        }
        if self.iterations == 0 {
            return Err(Error::InvalidConfig(
                "iteration count must be positive".to_owned(),
            ));
        }
        if self.regularization < 0.0 {
            return Err(Error::InvalidConfig(
                "regularization must be non-negative".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Default for TrainOptions {
    fn default() -> Self {
        TrainOptions::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn softmax(logits: &[f64]) -> Vec<f64> {
        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|&s| (s - max).exp()).collect();
        let sum: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / sum).collect()
    }

    #[test]
    fn construction_rejects_zero_dimensions() {
        assert!(NeuralNet::new(0, 2, &[3]).is_err());
        assert!(NeuralNet::new(2, 0, &[3]).is_err());
        assert!(NeuralNet::new(2, 2, &[3, 0]).is_err());
    }

    #[test]
    fn construction_requires_hidden_layer() {
        assert!(NeuralNet::new(2, 2, &[]).is_err());
    }

    #[test]
    fn forward_preserves_layer_shapes() {
        let net = NeuralNet::seeded(3, 2, &[5, 4], 0).unwrap();
        let (cache, logits) = net.forward(&[0.1, -0.2, 0.3], net.weights());
        assert_eq!(cache.len(), 3);
        assert_eq!(cache[0].len(), 3);
        assert_eq!(cache[1].len(), 5);
        assert_eq!(cache[2].len(), 4);
        assert_eq!(logits.len(), 2);
    }

    #[test]
    fn forward_is_deterministic_for_fixed_weights() {
        let net = NeuralNet::seeded(2, 3, &[4], 9).unwrap();
        let x = [0.5, -1.5];
        let (_, a) = net.forward(&x, net.weights());
        let (_, b) = net.forward(&x, net.weights());
        assert_eq!(a, b);
    }

    #[test]
    fn forward_accepts_arbitrary_weight_snapshots() {
        let net = NeuralNet::seeded(2, 2, &[3], 1).unwrap();
        let zeros: Vec<Mat> = vec![Mat::zeros(3, 3), Mat::zeros(4, 2)];
        let (cache, logits) = net.forward(&[1.0, -1.0], &zeros);
        assert_eq!(cache[1], vec![0.0, 0.0, 0.0]);
        assert_eq!(logits, vec![0.0, 0.0]);
    }

    #[test]
    fn hidden_activations_are_non_negative() {
        let net = NeuralNet::seeded(2, 2, &[8], 3).unwrap();
        let (cache, _) = net.forward(&[-3.0, 2.5], net.weights());
        assert!(cache[1].iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn loss_gradient_is_softmax_minus_onehot() {
        let net = NeuralNet::seeded(2, 3, &[2], 5).unwrap();
        let logits = [1.5, -0.5, 0.25];
        let (_, grad) = net.loss(&logits, 1).unwrap();
        let p = softmax(&logits);
        for (i, (&g, &pi)) in grad.iter().zip(p.iter()).enumerate() {
            let expected = if i == 1 { pi - 1.0 } else { pi };
            assert!((g - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn loss_is_stable_under_large_logits() {
        let net = NeuralNet::seeded(2, 2, &[2], 5).unwrap();
        let (loss, grad) = net.loss(&[1000.0, 999.0], 0).unwrap();
        assert!(loss.is_finite());
        assert!(grad.iter().all(|g| g.is_finite()));
    }

    #[test]
    fn loss_is_clamped_for_near_zero_probability() {
        let net = NeuralNet::seeded(2, 3, &[2], 5).unwrap();
        // p[0] ~ e^-50, far below the e^-10 floor.
        let (loss, grad) = net.loss(&[0.0, 50.0, 0.0], 0).unwrap();
        assert_eq!(loss, 10.0);
        // The gradient is untouched by the clamp.
        assert!((grad[0] - (-1.0)).abs() < 1e-6);
        assert!((grad[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn loss_is_unclamped_above_the_floor() {
        let net = NeuralNet::seeded(2, 2, &[2], 5).unwrap();
        let (loss, _) = net.loss(&[1.0, 0.0], 0).unwrap();
        let p = softmax(&[1.0, 0.0]);
        assert!((loss - (-p[0].ln())).abs() < 1e-12);
        assert!(loss < 10.0);
    }

    #[test]
    fn loss_rejects_out_of_range_label() {
        let net = NeuralNet::seeded(2, 2, &[2], 5).unwrap();
        assert_eq!(
            net.loss(&[0.0, 0.0], 2),
            Err(Error::LabelOutOfRange { label: 2, classes: 2 })
        );
    }

    #[test]
    fn backward_matches_finite_differences() {
        let net = NeuralNet::seeded(2, 2, &[3], 11).unwrap();
        let x = [0.4, -0.7];
        let label = 1;
        let w = net.weights().to_vec();

        let (cache, logits) = net.forward(&x, &w);
        let (_, dy) = net.loss(&logits, label).unwrap();
        let grads = net.backward(&cache, &w, dy);

        let loss_under = |w: &[Mat]| -> f64 {
            let (_, logits) = net.forward(&x, w);
            net.loss(&logits, label).unwrap().0
        };

        let eps = 1e-5;
        for (l, grad) in grads.iter().enumerate() {
            for row in 0..grad.rows() {
                for col in 0..grad.cols() {
                    let mut plus = w.clone();
                    let mut minus = w.clone();
                    plus[l][(row, col)] += eps;
                    minus[l][(row, col)] -= eps;
                    let numeric =
                        (loss_under(&plus) - loss_under(&minus)) / (2.0 * eps);
                    assert!(
                        (numeric - grad[(row, col)]).abs() < 1e-4,
                        "layer {} dw[{},{}]: numeric {} vs analytic {}",
                        l,
                        row,
                        col,
                        numeric,
                        grad[(row, col)]
                    );
                }
            }
        }
    }

    #[test]
    fn train_iteration_rejects_empty_dataset() {
        let mut net = NeuralNet::seeded(2, 2, &[2], 5).unwrap();
        let data: Vec<Vec<f64>> = Vec::new();
        let labels: Vec<usize> = Vec::new();
        assert_eq!(
            net.train_iteration(&data, &labels, 0.1, 0.0),
            Err(Error::EmptyDataset)
        );
    }

    #[test]
    fn train_iteration_rejects_length_mismatch() {
        let mut net = NeuralNet::seeded(2, 2, &[2], 5).unwrap();
        let data = [[0.0, 0.0], [1.0, 1.0]];
        let labels = [0];
        assert!(matches!(
            net.train_iteration(&data, &labels, 0.1, 0.0),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn train_iteration_fails_fast_on_bad_label() {
        let mut net = NeuralNet::seeded(2, 2, &[2], 5).unwrap();
        let data = [[0.0, 0.0]];
        let labels = [7];
        assert_eq!(
            net.train_iteration(&data, &labels, 0.1, 0.0),
            Err(Error::LabelOutOfRange { label: 7, classes: 2 })
        );
    }

    #[test]
    fn train_iteration_reports_per_sample_metrics() {
        let mut net = NeuralNet::seeded(2, 2, &[4], 5).unwrap();
        let data = [[-1.0, -1.0], [1.0, 1.0], [0.5, 0.5]];
        let labels = [0, 1, 1];
        let (losses, predicted) =
            net.train_iteration(&data, &labels, 0.1, 0.0).unwrap();
        assert_eq!(losses.len(), 3);
        assert_eq!(predicted.len(), 3);
        assert!(losses.iter().all(|&l| l > 0.0 && l <= 10.0));
        assert!(predicted.iter().all(|&p| p < 2));
    }

    #[test]
    fn regularization_decays_weights() {
        let mut net = NeuralNet::seeded(2, 2, &[2], 5).unwrap();
        let frozen = net.clone();
        let data = [[0.5, -0.5]];
        let labels = [0];
        // A vanishing step isolates the decay term: w' = w * (1 - 0.5),
        // up to the negligible gradient contribution.
        net.train_iteration(&data, &labels, 1e-12, 0.5).unwrap();
        for (w, old) in net.weights().iter().zip(frozen.weights().iter()) {
            for row in 0..w.rows() {
                for col in 0..w.cols() {
                    assert!(
                        (w[(row, col)] - 0.5 * old[(row, col)]).abs() < 1e-9
                    );
                }
            }
        }
    }

    #[test]
    fn train_rejects_bad_options() {
        let mut net = NeuralNet::seeded(2, 2, &[2], 5).unwrap();
        let data = [[0.0, 0.0]];
        let labels = [0];
        let mut silent = crate::monitor::Logging::Silent;
        let bad = TrainOptions::new().step_size(0.0);
        assert!(matches!(
            net.train(&data, &labels, &bad, None, &mut silent),
            Err(Error::InvalidConfig(_))
        ));
        let bad = TrainOptions::new().iterations(0);
        assert!(matches!(
            net.train(&data, &labels, &bad, None, &mut silent),
            Err(Error::InvalidConfig(_))
        ));
        let bad = TrainOptions::new().regularization(-1.0);
        assert!(matches!(
            net.train(&data, &labels, &bad, None, &mut silent),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn predict_does_not_mutate_weights() {
        let net = NeuralNet::seeded(2, 2, &[3], 5).unwrap();
        let before = net.weights().to_vec();
        net.predict(&[[0.1, 0.2], [-0.3, 0.4]]);
        assert_eq!(net.weights(), &before[..]);
    }
}
