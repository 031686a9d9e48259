/// Returns the index of the largest element of `xs`.
///
/// Ties break toward the lowest index. `xs` must be non-empty.
pub fn argmax(xs: &[f64]) -> usize {
    assert!(!xs.is_empty());
    let mut best = 0;
    for (i, &x) in xs.iter().enumerate().skip(1) {
        if x > xs[best] {
            best = i;
        }
    }
    best
}

/// Computes the fraction of mismatched entries between `predicted` and
/// `expected`.
pub fn error_rate(predicted: &[usize], expected: &[usize]) -> f64 {
    assert_eq!(predicted.len(), expected.len());
    let mismatched = predicted
        .iter()
        .zip(expected.iter())
        .filter(|(p, e)| p != e)
        .count();
    mismatched as f64 / predicted.len() as f64
}
