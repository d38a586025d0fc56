//! The additive layer model: `value(i, j) = mean + row_effects[i] + col_effects[j]`.

use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Least-squares additive decomposition of a rectangular region.
///
/// The effect vectors are aligned with the order of the row/column indices of
/// the submatrix the layer was fit on, not with the original matrix indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub mean: f64,
    pub row_effects: Array1<f64>,
    pub col_effects: Array1<f64>,
}

impl Layer {
    /// Closed-form fit over a submatrix: grand mean, per-row mean minus the
    /// grand mean, per-column mean minus the grand mean. Callers must not
    /// pass a zero-row or zero-column view.
    pub fn fit(submatrix: &ArrayView2<f64>) -> Self {
        debug_assert!(submatrix.nrows() > 0 && submatrix.ncols() > 0);
        let mean = submatrix.mean().unwrap_or(0.0);
        let row_effects = submatrix.mean_axis(Axis(1)).unwrap_or_default() - mean;
        let col_effects = submatrix.mean_axis(Axis(0)).unwrap_or_default() - mean;
        Self {
            mean,
            row_effects,
            col_effects,
        }
    }

    /// A 0x0 placeholder, used when the initial partition yields no candidate
    /// to fit on. Its sum of squares is zero.
    pub fn empty() -> Self {
        Self {
            mean: 0.0,
            row_effects: Array1::zeros(0),
            col_effects: Array1::zeros(0),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.row_effects.len(), self.col_effects.len())
    }

    /// Layer value at local coordinates `(i, j)` of the fitted region.
    #[inline]
    pub fn value(&self, i: usize, j: usize) -> f64 {
        self.mean + self.row_effects[i] + self.col_effects[j]
    }

    /// Materializes the layer as a dense matrix with the shape of the region
    /// it was fit on.
    pub fn dense(&self) -> Array2<f64> {
        Array2::from_shape_fn(self.shape(), |(i, j)| self.value(i, j))
    }

    pub fn sum_of_squares(&self) -> f64 {
        let mut total = 0.0;
        for i in 0..self.row_effects.len() {
            for j in 0..self.col_effects.len() {
                let v = self.value(i, j);
                total += v * v;
            }
        }
        total
    }
}
