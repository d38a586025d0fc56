use std::error::Error;
use std::fs::File;

use log::{info, LevelFilter};
use ndarray::Array2;
use ndarray_npy::ReadNpyExt;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use plaid_bicluster::{Plaid, PlaidParams};

/// Demo driver.
///
/// ```bash
/// $ cargo run -- data/matrix.npy 10 42
/// ```
///
/// args: `[matrix.npy] [num_biclusters] [seed]`. Without a path a synthetic
/// matrix with two planted additive blocks is generated.
fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()?;

    let mut args = std::env::args().skip(1);
    let matrix = match args.next() {
        Some(path) => {
            info!("loading matrix from {}", path);
            let reader = File::open(path)?;
            Array2::<f64>::read_npy(reader)?
        }
        None => {
            info!("no input given, generating a 60x40 planted-block matrix");
            planted_demo_matrix(60, 40)
        }
    };
    let num_biclusters = match args.next() {
        Some(n) => n.parse::<usize>()?,
        None => 10,
    };
    let seed = match args.next() {
        Some(s) => Some(s.parse::<u64>()?),
        None => None,
    };

    let mut params = PlaidParams::new().num_biclusters(num_biclusters);
    if let Some(seed) = seed {
        params = params.seed(seed);
    }

    let plaid = Plaid::new(params);
    let solution = plaid.run(&matrix)?;

    info!("found {} biclusters", solution.len());
    for (i, bicluster) in solution.iter().enumerate() {
        info!(
            "bicluster {}: {}x{} rows {:?} cols {:?}",
            i,
            bicluster.rows.len(),
            bicluster.cols.len(),
            bicluster.rows,
            bicluster.cols
        );
    }

    Ok(())
}

/// Uniform noise with two strong additive blocks planted in opposite corners.
fn planted_demo_matrix(nrows: usize, ncols: usize) -> Array2<f64> {
    let mut matrix: Array2<f64> = Array2::random((nrows, ncols), Uniform::new(0.0, 1.0));
    for i in 0..nrows / 6 {
        for j in 0..ncols / 6 {
            matrix[(i, j)] += 20.0;
            matrix[(nrows - 1 - i, ncols - 1 - j)] += 12.0;
        }
    }
    matrix
}
