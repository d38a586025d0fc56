//! Two-cluster grouping used to seed a new candidate bicluster.

use linfa::prelude::*;
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use log::debug;
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::PlaidError;

/// Splits a set of vectors (matrix rows) into two groups with k-means and
/// keeps the smaller one as the initial selection for layer fitting.
///
/// The k-means collaborator is run with exactly 2 target clusters and
/// `n_runs` independent restarts; the restart with the lowest intra-cluster
/// variance wins. When both groups have the same size, label 0 is chosen;
/// the tie-break is arbitrary and nothing downstream may rely on it.
pub struct BinaryPartitioner {
    pub n_runs: usize,
}

impl BinaryPartitioner {
    pub fn new(n_runs: usize) -> Self {
        Self { n_runs }
    }

    /// Returns the indices of the smaller of the two groups, in ascending
    /// order. An empty result means every vector landed in one cluster.
    ///
    /// Entropy is drawn from `rng` once per call, so consecutive calls on the
    /// same generator explore different initializations.
    pub fn partition(
        &self,
        vectors: &ArrayView2<f64>,
        rng: &mut StdRng,
    ) -> Result<Vec<usize>, PlaidError> {
        let records = vectors.to_owned();
        let dataset = DatasetBase::from(records);

        let child = StdRng::seed_from_u64(rng.gen());
        let model = KMeans::params_with_rng(2, child)
            .n_runs(self.n_runs)
            .fit(&dataset)
            .map_err(|e| PlaidError::Clustering(e.to_string()))?;
        let labels = model.predict(dataset.records());

        let count0 = labels.iter().filter(|&&l| l == 0).count();
        let count1 = labels.len() - count0;
        let minority = if count0 <= count1 { 0 } else { 1 };
        debug!(
            "binary partition: {} vectors split {}/{}, keeping label {}",
            labels.len(),
            count0,
            count1,
            minority
        );

        Ok(labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == minority)
            .map(|(i, _)| i)
            .collect())
    }
}
