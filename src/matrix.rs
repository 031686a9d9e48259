use rand::Rng;
use rand_distr::StandardNormal;
use std::ops::{AddAssign, Index, IndexMut};

/// A dense matrix of `f64` values.
///
/// This is deliberately minimal storage: the layer code owns the numeric
/// loops, `Mat` only provides construction, indexing, and the elementwise
/// operations the training loop needs.
#[derive(Clone, Debug, PartialEq)]
pub struct Mat {
    rows: usize,
    cols: usize,
    data: Vec<f64>, // row-major array
}

impl Mat {
    /// Returns a `rows x cols` matrix of zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Mat {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Returns a `rows x cols` matrix with entries drawn from a Gaussian
    /// with mean zero and the provided standard deviation.
    pub fn random<R: Rng + ?Sized>(
        rng: &mut R,
        std_dev: f64,
        rows: usize,
        cols: usize,
    ) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for _ in 0..(rows * cols) {
            let sample: f64 = rng.sample(StandardNormal);
            data.push(sample * std_dev);
        }
        Mat { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Applies one gradient-descent step in place:
    /// `w -= grad * scale + w * decay`, using the pre-update value of `w`
    /// for the decay term.
    pub fn apply_update(&mut self, scale: f64, decay: f64, grad: &Mat) {
        assert_eq!(self.rows, grad.rows);
        assert_eq!(self.cols, grad.cols);
        for (w, g) in self.data.iter_mut().zip(grad.data.iter()) {
            *w -= g * scale + *w * decay;
        }
    }
}

impl Index<(usize, usize)> for Mat {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        assert!(row < self.rows && col < self.cols);
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Mat {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        assert!(row < self.rows && col < self.cols);
        &mut self.data[row * self.cols + col]
    }
}

impl<'a> AddAssign<&'a Mat> for Mat {
    fn add_assign(&mut self, other: &Mat) {
        assert_eq!(self.rows, other.rows);
        assert_eq!(self.cols, other.cols);
        for (l, r) in self.data.iter_mut().zip(other.data.iter()) {
            *l += *r;
        }
    }
}
