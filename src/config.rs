use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Configuration for the Plaid fitting loop.
///
/// Defaults follow Turner, Bailey & Krzanowski (2005): up to 10 biclusters,
/// a background layer, balanced 0.5 pruning thresholds, 3 permutation tests
/// per candidate and a single back-fitting pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaidParams {
    /// Upper bound on the number of biclusters to discover.
    pub num_biclusters: usize,
    /// Fit and subtract a whole-matrix layer before the search starts.
    pub fit_background_layer: bool,
    /// Row pruning strictness, strictly inside (0, 1). A row is kept only if
    /// the layer explains more than this fraction of its sum of squares, so
    /// values near 1 prune aggressively and values near 0 keep almost all.
    pub row_pruning_threshold: f64,
    /// Column pruning strictness, same interpretation as the row threshold.
    pub col_pruning_threshold: f64,
    /// Number of permutation trials per candidate layer. 0 accepts every
    /// candidate unconditionally.
    pub significance_tests: usize,
    /// Rounds of re-estimation of all accepted layers after each acceptance.
    /// 0 disables back-fitting.
    pub back_fitting_steps: usize,
    /// Independent k-means restarts when seeding a new candidate bicluster.
    pub initialization_runs: usize,
    /// Pruning rounds per layer. The budget is always spent in full unless a
    /// selection empties; there is no fixed-point early exit.
    pub iterations_per_layer: usize,
    /// Run significance trials on the rayon pool. Accept/reject outcome is
    /// identical to the sequential path for a fixed seed.
    pub parallel_significance: bool,
    /// Master seed for k-means initialization and permutation shuffles.
    /// `None` draws from OS entropy and makes runs non-reproducible.
    pub seed: Option<u64>,
}

impl Default for PlaidParams {
    fn default() -> Self {
        Self {
            num_biclusters: 10,
            fit_background_layer: true,
            row_pruning_threshold: 0.5,
            col_pruning_threshold: 0.5,
            significance_tests: 3,
            back_fitting_steps: 1,
            initialization_runs: 6,
            iterations_per_layer: 10,
            parallel_significance: false,
            seed: None,
        }
    }
}

impl PlaidParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_biclusters(mut self, n: usize) -> Self {
        self.num_biclusters = n;
        self
    }

    pub fn fit_background_layer(mut self, fit: bool) -> Self {
        self.fit_background_layer = fit;
        self
    }

    pub fn pruning_thresholds(mut self, row: f64, col: f64) -> Self {
        self.row_pruning_threshold = row;
        self.col_pruning_threshold = col;
        self
    }

    pub fn significance_tests(mut self, n: usize) -> Self {
        self.significance_tests = n;
        self
    }

    pub fn back_fitting_steps(mut self, n: usize) -> Self {
        self.back_fitting_steps = n;
        self
    }

    pub fn initialization_runs(mut self, n: usize) -> Self {
        self.initialization_runs = n;
        self
    }

    pub fn iterations_per_layer(mut self, n: usize) -> Self {
        self.iterations_per_layer = n;
        self
    }

    pub fn parallel_significance(mut self, parallel: bool) -> Self {
        self.parallel_significance = parallel;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks every constraint before a run touches the data. The counts the
    /// original formulation rejected when negative are `usize` here, so only
    /// the strictly-positive and open-interval constraints remain.
    pub fn validate(&self) -> Result<(), PlaidError> {
        if self.num_biclusters == 0 {
            return Err(PlaidError::InvalidParameter(
                "num_biclusters must be greater than zero".into(),
            ));
        }
        if self.initialization_runs == 0 {
            return Err(PlaidError::InvalidParameter(
                "initialization_runs must be greater than zero".into(),
            ));
        }
        if self.iterations_per_layer == 0 {
            return Err(PlaidError::InvalidParameter(
                "iterations_per_layer must be greater than zero".into(),
            ));
        }
        for (name, value) in [
            ("row_pruning_threshold", self.row_pruning_threshold),
            ("col_pruning_threshold", self.col_pruning_threshold),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(PlaidError::InvalidParameter(format!(
                    "{} must lie strictly between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Errors a biclustering run can surface. Degenerate fits and failed
/// significance tests are regular early termination, not errors.
#[derive(Debug)]
pub enum PlaidError {
    /// A configuration constraint was violated; reported before any
    /// computation starts.
    InvalidParameter(String),
    /// The binary-partition collaborator (k-means) failed.
    Clustering(String),
}

impl fmt::Display for PlaidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaidError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            PlaidError::Clustering(msg) => write!(f, "clustering failed: {}", msg),
        }
    }
}

impl Error for PlaidError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PlaidParams::default().validate().is_ok());
    }

    #[test]
    fn test_zero_counts_rejected() {
        assert!(PlaidParams::new().num_biclusters(0).validate().is_err());
        assert!(PlaidParams::new().initialization_runs(0).validate().is_err());
        assert!(PlaidParams::new().iterations_per_layer(0).validate().is_err());
    }

    #[test]
    fn test_disabled_counts_accepted() {
        // 0 significance tests and 0 back-fitting steps are valid off switches.
        let params = PlaidParams::new().significance_tests(0).back_fitting_steps(0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_thresholds_open_interval() {
        for bad in [0.0, 1.0, -0.1, 1.5] {
            assert!(
                PlaidParams::new().pruning_thresholds(bad, 0.5).validate().is_err(),
                "row threshold {} should be rejected",
                bad
            );
            assert!(
                PlaidParams::new().pruning_thresholds(0.5, bad).validate().is_err(),
                "col threshold {} should be rejected",
                bad
            );
        }
        assert!(PlaidParams::new().pruning_thresholds(0.01, 0.99).validate().is_ok());
    }

    #[test]
    fn test_builder_chaining() {
        let params = PlaidParams::new()
            .num_biclusters(3)
            .fit_background_layer(false)
            .significance_tests(0)
            .seed(7);
        assert_eq!(params.num_biclusters, 3);
        assert!(!params.fit_background_layer);
        assert_eq!(params.seed, Some(7));
    }
}
