use crate::matrix::Mat;

use rand::Rng;

/// A single fully connected layer of the network.
///
/// The layer is stateless with respect to training: weights are generated
/// once at network construction and then threaded explicitly through
/// `forward` and `backward` by the caller, so forward and backward for one
/// sample always see the same weight snapshot.
///
/// The bias is folded into the weight matrix as an extra final row, and the
/// input is implicitly augmented with a trailing `1.0`. A layer mapping
/// `din` inputs to `dout` outputs therefore carries a `(din + 1) x dout`
/// weight matrix.
#[derive(Copy, Clone, Debug)]
pub struct FullyConnectedLayer {
    din: usize,
    dout: usize,
}

impl FullyConnectedLayer {
    pub fn new(din: usize, dout: usize) -> Self {
        FullyConnectedLayer { din, dout }
    }

    /// Returns the number of inputs to this layer.
    pub fn input_len(&self) -> usize {
        self.din
    }

    /// Returns the number of outputs from this layer.
    pub fn output_len(&self) -> usize {
        self.dout
    }

    /// Returns a freshly initialized weight matrix for this layer.
    ///
    /// Entries are drawn from a Gaussian scaled by the inverse square root
    /// of the fan-in, keeping initial activations small enough that the
    /// ReLU units above start out neither saturated nor dead.
    pub fn generate_weight<R: Rng + ?Sized>(&self, rng: &mut R) -> Mat {
        let std_dev = 1.0 / ((self.din + 1) as f64).sqrt();
        Mat::random(rng, std_dev, self.din + 1, self.dout)
    }

    /// Computes `y = [x, 1] . w`. Pure; no state is touched.
    pub fn forward(&self, x: &[f64], w: &Mat) -> Vec<f64> {
        assert_eq!(x.len(), self.din);
        assert_eq!(w.rows(), self.din + 1);
        assert_eq!(w.cols(), self.dout);
        let mut y = vec![0.0; self.dout];
        for (col, out) in y.iter_mut().enumerate() {
            let mut acc = w[(self.din, col)];
            for (row, &xv) in x.iter().enumerate() {
                acc += xv * w[(row, col)];
            }
            *out = acc;
        }
        y
    }

    /// Propagates the upstream gradient `dy` back through the layer.
    ///
    /// Returns `(dx, dw)` where `dx = dy . w^T` restricted to the non-bias
    /// rows, and `dw = [x, 1]^T (x) dy` is the outer product against the
    /// augmented input. `x` and `w` must be the same values the matching
    /// `forward` call saw.
    pub fn backward(&self, x: &[f64], w: &Mat, dy: &[f64]) -> (Vec<f64>, Mat) {
        assert_eq!(x.len(), self.din);
        assert_eq!(dy.len(), self.dout);
        assert_eq!(w.rows(), self.din + 1);
        assert_eq!(w.cols(), self.dout);

        let mut dx = vec![0.0; self.din];
        for (row, out) in dx.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (col, &dyv) in dy.iter().enumerate() {
                acc += dyv * w[(row, col)];
            }
            *out = acc;
        }

        let mut dw = Mat::zeros(self.din + 1, self.dout);
        for (col, &dyv) in dy.iter().enumerate() {
            for (row, &xv) in x.iter().enumerate() {
                dw[(row, col)] = xv * dyv;
            }
            dw[(self.din, col)] = dyv;
        }

        (dx, dw)
    }
}
