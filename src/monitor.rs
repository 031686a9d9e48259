//! Training progress reporting.
//!
//! The numeric core never prints; `NeuralNet::train` hands structured
//! records to an injected [`Monitor`]. [`Logging`] is the stock console
//! monitor; library users embedding training elsewhere can implement
//! `Monitor` themselves.

use serde_derive::Serialize;
use std::time::Duration;

/// Metrics produced after one full-batch training iteration.
#[derive(Clone, Debug, Serialize)]
pub struct IterationReport {
    /// 1-based index of the iteration that just completed.
    pub iteration: usize,
    /// Total number of iterations requested.
    pub iterations: usize,
    /// Mean per-sample training loss for this iteration.
    pub mean_loss: f64,
    /// Fraction of training samples whose argmax prediction was wrong.
    pub train_error: f64,
    /// Error rate over the held-out set, when one was supplied.
    pub test_error: Option<f64>,
    /// Wall time since training started.
    pub elapsed: Duration,
    /// Estimated time to finish the remaining iterations.
    pub remaining: Duration,
}

/// Metrics produced once training completes.
#[derive(Clone, Debug, Serialize)]
pub struct TrainingSummary {
    pub iterations: usize,
    pub mean_loss: f64,
    pub train_error: f64,
    pub test_error: Option<f64>,
    pub elapsed: Duration,
}

/// A sink for training progress.
pub trait Monitor {
    /// Called after every training iteration.
    fn iteration(&mut self, report: &IterationReport);

    /// Called once when training finishes.
    fn completion(&mut self, summary: &TrainingSummary);
}

/// Console logging frequency to use during training.
#[derive(Copy, Clone, Debug)]
pub enum Logging {
    /// No logs will be printed.
    Silent,
    /// A summary will be printed at completion.
    Completion,
    /// A summary will be printed after every `n` training iterations.
    Iterations(usize),
}

impl Monitor for Logging {
    fn iteration(&mut self, report: &IterationReport) {
        if let Logging::Iterations(freq) = *self {
            if freq > 0 && report.iteration % freq == 0 {
                match report.test_error {
                    Some(test_error) => println!(
                        "Iteration {}/{}:\tloss={:.6}\ttrain_err={:.4}\ttest_err={:.4}\teta={}s",
                        report.iteration,
                        report.iterations,
                        report.mean_loss,
                        report.train_error,
                        test_error,
                        report.remaining.as_secs(),
                    ),
                    None => println!(
                        "Iteration {}/{}:\tloss={:.6}\ttrain_err={:.4}\teta={}s",
                        report.iteration,
                        report.iterations,
                        report.mean_loss,
                        report.train_error,
                        report.remaining.as_secs(),
                    ),
                }
            }
        }
    }

    fn completion(&mut self, summary: &TrainingSummary) {
        if let Logging::Silent = *self {
            return;
        }
        println!(
            "Ran {} iterations in {} seconds.",
            summary.iterations,
            summary.elapsed.as_secs()
        );
        println!("Final mean loss: {}", summary.mean_loss);
        println!("Final training error: {}", summary.train_error);
        if let Some(test_error) = summary.test_error {
            println!("Final test error: {}", test_error);
        }
    }
}
