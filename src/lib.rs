//! Plaid biclustering for dense real-valued matrices.
//!
//! A bicluster is a (row set, column set) pair whose submatrix follows an
//! additive mean + row-effect + column-effect pattern. The [`Plaid`]
//! algorithm discovers them by repeatedly carving an additive [`Layer`] out
//! of a residual matrix, validating it with a permutation test, subtracting
//! it and back-fitting everything found so far.
//!
//! ```no_run
//! use ndarray::Array2;
//! use plaid_bicluster::{Plaid, PlaidParams};
//!
//! # fn main() -> Result<(), plaid_bicluster::PlaidError> {
//! let data: Array2<f64> = Array2::from_elem((50, 30), 1.0);
//! let plaid = Plaid::new(PlaidParams::new().num_biclusters(5).seed(42));
//! let solution = plaid.run(&data)?;
//! for bicluster in solution.iter() {
//!     println!("{:?} x {:?}", bicluster.rows, bicluster.cols);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bicluster;
pub mod config;
pub mod layer;
pub mod partition;
pub mod plaid;

pub use bicluster::{Bicluster, Biclustering};
pub use config::{PlaidError, PlaidParams};
pub use layer::Layer;
pub use partition::BinaryPartitioner;
pub use plaid::{BiclusteringAlgorithm, Plaid};
