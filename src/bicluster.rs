//! Result entities shared by every biclustering algorithm: a `Bicluster`
//! names a submatrix by its row and column indices, a `Biclustering` is the
//! ordered collection a run produces.

use serde::{Deserialize, Serialize};

/// A pair of row and column index sets identifying a coherent submatrix.
///
/// Indices are 0-based positions into the input matrix. Element order carries
/// no meaning but is preserved as discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bicluster {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
}

impl Bicluster {
    pub fn new(rows: Vec<usize>, cols: Vec<usize>) -> Self {
        Self { rows, cols }
    }

    /// A bicluster spanning every row and column of an `nrows` x `ncols`
    /// matrix. Used for the background and residual bookkeeping entries.
    pub fn full(nrows: usize, ncols: usize) -> Self {
        Self {
            rows: (0..nrows).collect(),
            cols: (0..ncols).collect(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.cols.is_empty()
    }
}

/// An ordered sequence of biclusters, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Biclustering {
    pub biclusters: Vec<Bicluster>,
}

impl Biclustering {
    pub fn new(biclusters: Vec<Bicluster>) -> Self {
        Self { biclusters }
    }

    pub fn len(&self) -> usize {
        self.biclusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biclusters.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bicluster> {
        self.biclusters.iter()
    }
}
