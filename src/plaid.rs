//! Plaid biclustering: iterative layered decomposition of a residual matrix.
//!
//! Each accepted bicluster is an additive layer (mean + row effect + column
//! effect) carved out of the residuals. Reference: Turner, Bailey &
//! Krzanowski (2005), Improved biclustering of microarray data demonstrated
//! through systematic performance tests.

use log::{debug, info};
use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::bicluster::{Bicluster, Biclustering};
use crate::config::{PlaidError, PlaidParams};
use crate::layer::Layer;
use crate::partition::BinaryPartitioner;

/// The one capability every biclustering algorithm exposes: turn a matrix
/// into an ordered set of biclusters. Executable- or toolkit-backed
/// algorithms would implement this same contract.
pub trait BiclusteringAlgorithm {
    fn run(&self, data: &Array2<f64>) -> Result<Biclustering, PlaidError>;
    fn name(&self) -> &str;
}

/// Plaid model fitting via binary least squares.
pub struct Plaid {
    params: PlaidParams,
}

impl Plaid {
    pub fn new(params: PlaidParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PlaidParams {
        &self.params
    }

    /// Computes the biclustering. When a background layer is configured it is
    /// fit first and excluded from the returned solution.
    pub fn run(&self, data: &Array2<f64>) -> Result<Biclustering, PlaidError> {
        let (mut biclusters, mut layers, _residuals) = self.decompose(data)?;
        if self.params.fit_background_layer {
            // The index-0 entry is the full-matrix background layer.
            biclusters.remove(0);
            layers.remove(0);
        }
        Ok(Biclustering::new(biclusters))
    }

    /// Computes the biclustering and returns the materialized layers with it.
    ///
    /// The first layer is the background (when configured) and the last is
    /// the final residual matrix; both are paired with full-matrix
    /// biclusters, and `biclustering.len() == layers.len()`.
    pub fn run_with_layers(
        &self,
        data: &Array2<f64>,
    ) -> Result<(Biclustering, Vec<Array2<f64>>), PlaidError> {
        let (mut biclusters, layers, residuals) = self.decompose(data)?;
        let (nrows, ncols) = data.dim();
        let mut dense_layers: Vec<Array2<f64>> = layers.iter().map(|l| l.dense()).collect();
        dense_layers.push(residuals);
        biclusters.push(Bicluster::full(nrows, ncols));
        Ok((Biclustering::new(biclusters), dense_layers))
    }

    /// The INIT -> BACKGROUND -> DISCOVER loop. Returns the accepted
    /// bicluster/layer pairs in discovery order plus the final residuals.
    fn decompose(
        &self,
        data: &Array2<f64>,
    ) -> Result<(Vec<Bicluster>, Vec<Layer>, Array2<f64>), PlaidError> {
        self.params.validate()?;

        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut residuals = data.clone();
        let (nrows, ncols) = residuals.dim();
        let mut biclusters: Vec<Bicluster> = Vec::new();
        let mut layers: Vec<Layer> = Vec::new();

        info!(
            "plaid: fitting {}x{} matrix, up to {} biclusters",
            nrows, ncols, self.params.num_biclusters
        );

        if self.params.fit_background_layer {
            let background = Layer::fit(&residuals.view());
            let span = Bicluster::full(nrows, ncols);
            apply_layer(&mut residuals, &span, &background, -1.0);
            debug!("plaid: background layer subtracted, mean {:.4}", background.mean);
            layers.push(background);
            biclusters.push(span);
        }

        for i in 0..self.params.num_biclusters {
            let (rows, cols, layer) = self.fit_layer(&residuals, &mut rng)?;

            if rows.is_empty() || cols.is_empty() {
                info!("plaid: selection emptied at layer {}, stopping search", i);
                break;
            }
            if !self.is_significant(&residuals, &layer, &mut rng)? {
                info!("plaid: layer {} failed the significance test, stopping search", i);
                break;
            }

            let bicluster = Bicluster::new(rows, cols);
            apply_layer(&mut residuals, &bicluster, &layer, -1.0);
            info!(
                "plaid: accepted bicluster {} of shape {:?}",
                biclusters.len(),
                bicluster.shape()
            );
            layers.push(layer);
            biclusters.push(bicluster);

            self.back_fit(&mut residuals, &mut layers, &biclusters);
        }

        Ok((biclusters, layers, residuals))
    }

    /// Proposes a new layer: seed a candidate bicluster with two binary
    /// partitions (rows on the residuals, columns on their transpose), then
    /// alternate row and column pruning against the fitted layer for the
    /// full round budget. Column pruning is scored against the row set as it
    /// was before this round's row pruning.
    fn fit_layer(
        &self,
        residuals: &Array2<f64>,
        rng: &mut StdRng,
    ) -> Result<(Vec<usize>, Vec<usize>, Layer), PlaidError> {
        let partitioner = BinaryPartitioner::new(self.params.initialization_runs);
        let mut rows = partitioner.partition(&residuals.view(), rng)?;
        let mut cols = partitioner.partition(&residuals.t(), rng)?;
        if rows.is_empty() || cols.is_empty() {
            return Ok((rows, cols, Layer::empty()));
        }

        let sub = selected(residuals.view(), &rows, &cols);
        let mut layer = Layer::fit(&sub.view());

        for _ in 0..self.params.iterations_per_layer {
            let rows_before = rows.clone();
            let dense = layer.dense();
            rows = prune(
                residuals.view(),
                dense.view(),
                &rows,
                &cols,
                self.params.row_pruning_threshold,
            );
            cols = prune(
                residuals.t(),
                dense.t(),
                &cols,
                &rows_before,
                self.params.col_pruning_threshold,
            );

            if rows.is_empty() || cols.is_empty() {
                break;
            }

            let sub = selected(residuals.view(), &rows, &cols);
            layer = Layer::fit(&sub.view());
        }

        Ok((rows, cols, layer))
    }

    /// Permutation test: a candidate layer is significant only if no layer
    /// fit on a uniformly shuffled copy of the residuals reaches its sum of
    /// squares. Per-trial seeds are drawn from the master generator up
    /// front in both modes, so the verdict and every later draw are
    /// identical whether trials run sequentially (with short-circuiting) or
    /// on the rayon pool.
    fn is_significant(
        &self,
        residuals: &Array2<f64>,
        layer: &Layer,
        rng: &mut StdRng,
    ) -> Result<bool, PlaidError> {
        if self.params.significance_tests == 0 {
            return Ok(true);
        }
        let score = layer.sum_of_squares();
        let seeds: Vec<u64> = (0..self.params.significance_tests)
            .map(|_| rng.gen())
            .collect();

        if self.params.parallel_significance {
            let trial_scores = seeds
                .into_par_iter()
                .map(|seed| {
                    let mut trial_rng = StdRng::seed_from_u64(seed);
                    let shuffled = permuted(residuals, &mut trial_rng);
                    let (_, _, test_layer) = self.fit_layer(&shuffled, &mut trial_rng)?;
                    Ok(test_layer.sum_of_squares())
                })
                .collect::<Result<Vec<f64>, PlaidError>>()?;
            return Ok(trial_scores.into_iter().all(|s| s < score));
        }

        for (trial, seed) in seeds.into_iter().enumerate() {
            let mut trial_rng = StdRng::seed_from_u64(seed);
            let shuffled = permuted(residuals, &mut trial_rng);
            let (_, _, test_layer) = self.fit_layer(&shuffled, &mut trial_rng)?;
            let test_score = test_layer.sum_of_squares();
            if test_score >= score {
                debug!(
                    "plaid: trial {} scored {:.4} >= candidate {:.4}",
                    trial, test_score, score
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Re-estimates every accepted layer against the current residuals, in
    /// discovery order: restore the layer's contribution, refit it on the
    /// restored submatrix, subtract the refit. Later layers in a round see
    /// the corrections of earlier ones.
    fn back_fit(&self, residuals: &mut Array2<f64>, layers: &mut [Layer], biclusters: &[Bicluster]) {
        for _ in 0..self.params.back_fitting_steps {
            for (layer, bicluster) in layers.iter_mut().zip(biclusters) {
                apply_layer(residuals, bicluster, layer, 1.0);
                let sub = selected(residuals.view(), &bicluster.rows, &bicluster.cols);
                *layer = Layer::fit(&sub.view());
                apply_layer(residuals, bicluster, layer, -1.0);
            }
        }
    }
}

impl BiclusteringAlgorithm for Plaid {
    fn run(&self, data: &Array2<f64>) -> Result<Biclustering, PlaidError> {
        Plaid::run(self, data)
    }

    fn name(&self) -> &str {
        "Plaid"
    }
}

/// Owned copy of the submatrix addressed by `rows` x `cols`.
fn selected(matrix: ArrayView2<f64>, rows: &[usize], cols: &[usize]) -> Array2<f64> {
    matrix.select(Axis(0), rows).select(Axis(1), cols)
}

/// Adds (`sign` = 1.0) or subtracts (`sign` = -1.0) the layer's values at the
/// cells the bicluster addresses.
fn apply_layer(residuals: &mut Array2<f64>, bicluster: &Bicluster, layer: &Layer, sign: f64) {
    for (i, &r) in bicluster.rows.iter().enumerate() {
        for (j, &c) in bicluster.cols.iter().enumerate() {
            residuals[(r, c)] += sign * layer.value(i, j);
        }
    }
}

/// Keeps a candidate index only if the layer explains away more than
/// `threshold` of its sum of squares over the `against` set:
/// `sum (residual - layer)^2 < (1 - threshold) * sum residual^2`.
/// Column pruning passes the transposed residuals and layer.
fn prune(
    residuals: ArrayView2<f64>,
    layer: ArrayView2<f64>,
    candidates: &[usize],
    against: &[usize],
    threshold: f64,
) -> Vec<usize> {
    let res = selected(residuals, candidates, against);
    let mut kept = Vec::with_capacity(candidates.len());
    for (i, &index) in candidates.iter().enumerate() {
        let mut sum_squared_diff = 0.0;
        let mut sum_squared_res = 0.0;
        for (j, &value) in res.row(i).iter().enumerate() {
            let diff = value - layer[(i, j)];
            sum_squared_diff += diff * diff;
            sum_squared_res += value * value;
        }
        if sum_squared_diff < (1.0 - threshold) * sum_squared_res {
            kept.push(index);
        }
    }
    kept
}

/// Uniformly random permutation of all matrix entries: flatten, shuffle,
/// restore the original shape.
fn permuted(residuals: &Array2<f64>, rng: &mut StdRng) -> Array2<f64> {
    let mut flat: Vec<f64> = residuals.iter().copied().collect();
    flat.shuffle(rng);
    Array2::from_shape_vec(residuals.raw_dim(), flat).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    /// 6x6 matrix of 5s with a planted additive block of 25s at
    /// rows {0, 1} x cols {0, 1}.
    fn planted_matrix() -> Array2<f64> {
        let mut m = Array2::from_elem((6, 6), 5.0);
        for i in 0..2 {
            for j in 0..2 {
                m[(i, j)] += 20.0;
            }
        }
        m
    }

    fn planted_params() -> PlaidParams {
        PlaidParams::new()
            .num_biclusters(1)
            .fit_background_layer(false)
            .pruning_thresholds(0.5, 0.5)
            .significance_tests(0)
            .seed(42)
    }

    #[test]
    fn test_recovers_planted_block() {
        let plaid = Plaid::new(planted_params());
        let solution = plaid.run(&planted_matrix()).unwrap();
        assert_eq!(solution.len(), 1);
        assert_eq!(solution.biclusters[0].rows, vec![0, 1]);
        assert_eq!(solution.biclusters[0].cols, vec![0, 1]);
    }

    #[test]
    fn test_planted_block_survives_significance_test() {
        let plaid = Plaid::new(planted_params().significance_tests(5));
        let solution = plaid.run(&planted_matrix()).unwrap();
        assert_eq!(solution.len(), 1);
        assert_eq!(solution.biclusters[0].rows, vec![0, 1]);
        assert_eq!(solution.biclusters[0].cols, vec![0, 1]);
    }

    #[test]
    fn test_noise_yields_no_biclusters() {
        // Pure i.i.d. noise: the candidate layer is statistically no
        // stronger than layers refit on permutations, so with enough trials
        // the first candidate is rejected and the search stops at zero.
        let noise: Array2<f64> = Array2::random((10, 8), Uniform::new(0.0, 1.0));
        let plaid = Plaid::new(
            PlaidParams::new()
                .num_biclusters(3)
                .fit_background_layer(false)
                .significance_tests(60)
                .iterations_per_layer(5)
                .seed(2024),
        );
        let solution = plaid.run(&noise).unwrap();
        assert!(solution.is_empty());
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let mut matrix: Array2<f64> = Array2::random((12, 9), Uniform::new(0.0, 1.0));
        for i in 0..4 {
            for j in 0..3 {
                matrix[(i, j)] += 15.0;
            }
        }
        let params = PlaidParams::new()
            .num_biclusters(2)
            .significance_tests(2)
            .seed(7);
        let (first_b, first_l) = Plaid::new(params.clone()).run_with_layers(&matrix).unwrap();
        let (second_b, second_l) = Plaid::new(params).run_with_layers(&matrix).unwrap();
        assert_eq!(first_b, second_b);
        assert_eq!(first_l, second_l);
    }

    #[test]
    fn test_layers_mode_bookkeeping() {
        let matrix = planted_matrix();
        let plaid = Plaid::new(planted_params().fit_background_layer(true));
        let (solution, layers) = plaid.run_with_layers(&matrix).unwrap();

        // Background first, residual last, both spanning the full matrix.
        assert_eq!(solution.len(), layers.len());
        assert!(solution.len() >= 2);
        assert_eq!(solution.biclusters[0], Bicluster::full(6, 6));
        assert_eq!(solution.biclusters[solution.len() - 1], Bicluster::full(6, 6));
        assert_eq!(layers[0].dim(), (6, 6));
        assert_eq!(layers[layers.len() - 1].dim(), (6, 6));
    }

    #[test]
    fn test_biclusters_only_mode_drops_background() {
        let matrix = planted_matrix();
        let plaid = Plaid::new(planted_params().fit_background_layer(true));
        let solution = plaid.run(&matrix).unwrap();
        let full = Bicluster::full(6, 6);
        assert!(solution.iter().all(|b| *b != full));
    }

    #[test]
    fn test_discovery_bounded_by_target_count() {
        let mut matrix: Array2<f64> = Array2::random((14, 14), Uniform::new(0.0, 1.0));
        for i in 0..4 {
            for j in 0..4 {
                matrix[(i, j)] += 30.0;
                matrix[(i + 7, j + 7)] += 30.0;
            }
        }
        let plaid = Plaid::new(
            PlaidParams::new()
                .num_biclusters(2)
                .fit_background_layer(false)
                .significance_tests(0)
                .seed(5),
        );
        let solution = plaid.run(&matrix).unwrap();
        assert!(solution.len() <= 2);
    }

    #[test]
    fn test_indices_unique_and_in_bounds() {
        let matrix = planted_matrix();
        let plaid = Plaid::new(planted_params().num_biclusters(3));
        let solution = plaid.run(&matrix).unwrap();
        for bicluster in solution.iter() {
            assert!(!bicluster.is_empty());
            for window in [&bicluster.rows, &bicluster.cols] {
                let mut sorted = window.to_vec();
                sorted.sort_unstable();
                sorted.dedup();
                assert_eq!(sorted.len(), window.len(), "duplicate index in {:?}", window);
            }
            assert!(bicluster.rows.iter().all(|&r| r < 6));
            assert!(bicluster.cols.iter().all(|&c| c < 6));
        }
    }

    #[test]
    fn test_back_fitting_keeps_recovery() {
        let plaid = Plaid::new(planted_params().back_fitting_steps(2));
        let solution = plaid.run(&planted_matrix()).unwrap();
        assert_eq!(solution.len(), 1);
        assert_eq!(solution.biclusters[0].rows, vec![0, 1]);
        assert_eq!(solution.biclusters[0].cols, vec![0, 1]);
    }

    #[test]
    fn test_parallel_significance_matches_sequential() {
        let mut matrix: Array2<f64> = Array2::random((10, 10), Uniform::new(0.0, 1.0));
        for i in 0..3 {
            for j in 0..3 {
                matrix[(i, j)] += 25.0;
            }
        }
        let base = PlaidParams::new()
            .num_biclusters(2)
            .significance_tests(4)
            .seed(11);
        let sequential = Plaid::new(base.clone()).run(&matrix).unwrap();
        let parallel = Plaid::new(base.parallel_significance(true)).run(&matrix).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_invalid_params_rejected_before_fitting() {
        let plaid = Plaid::new(PlaidParams::new().pruning_thresholds(1.0, 0.5));
        let err = plaid.run(&planted_matrix()).unwrap_err();
        assert!(matches!(err, PlaidError::InvalidParameter(_)));
    }

    #[test]
    fn test_prune_stricter_threshold_keeps_subset() {
        // Constant-1 layer over a 3x3 selection. Row 0 fits exactly, row 1
        // roughly, row 2 poorly; tightening the threshold peels them off in
        // that order.
        let residuals = ndarray::array![
            [1.0, 1.0, 1.0],
            [1.0, 1.0, 2.0],
            [5.0, 5.0, 5.0]
        ];
        let layer = Layer {
            mean: 1.0,
            row_effects: Array1::zeros(3),
            col_effects: Array1::zeros(3),
        };
        let dense = layer.dense();
        let all = [0, 1, 2];
        let loose = prune(residuals.view(), dense.view(), &all, &all, 0.2);
        let medium = prune(residuals.view(), dense.view(), &all, &all, 0.5);
        let strict = prune(residuals.view(), dense.view(), &all, &all, 0.9);
        assert_eq!(loose, vec![0, 1, 2]);
        assert_eq!(medium, vec![0, 1]);
        assert_eq!(strict, vec![0]);
        // Monotonic: every stricter retention is a subset of the looser one.
        assert!(medium.iter().all(|i| loose.contains(i)));
        assert!(strict.iter().all(|i| medium.contains(i)));
    }

    #[test]
    fn test_apply_layer_roundtrip() {
        let mut residuals = planted_matrix();
        let original = residuals.clone();
        let bicluster = Bicluster::new(vec![0, 1], vec![0, 1]);
        let sub = selected(residuals.view(), &bicluster.rows, &bicluster.cols);
        let layer = Layer::fit(&sub.view());
        apply_layer(&mut residuals, &bicluster, &layer, -1.0);
        assert!((residuals[(0, 0)]).abs() < 1e-12);
        apply_layer(&mut residuals, &bicluster, &layer, 1.0);
        for (a, b) in residuals.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_permutation_preserves_multiset() {
        let matrix: Array2<f64> = Array2::random((5, 4), Uniform::new(0.0, 1.0));
        let mut rng = StdRng::seed_from_u64(1);
        let shuffled = permuted(&matrix, &mut rng);
        assert_eq!(shuffled.dim(), matrix.dim());
        let mut a: Vec<f64> = matrix.iter().copied().collect();
        let mut b: Vec<f64> = shuffled.iter().copied().collect();
        a.sort_by(|x, y| x.partial_cmp(y).unwrap());
        b.sort_by(|x, y| x.partial_cmp(y).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn test_trait_object_dispatch() {
        let algorithm: Box<dyn BiclusteringAlgorithm> = Box::new(Plaid::new(planted_params()));
        assert_eq!(algorithm.name(), "Plaid");
        let solution = algorithm.run(&planted_matrix()).unwrap();
        assert_eq!(solution.len(), 1);
    }
}
