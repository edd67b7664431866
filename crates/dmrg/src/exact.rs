//! Dense exact diagonalisation of small chains, for cross-checking DMRG.
//!
//! Basis states are ordered with site 0 as the most significant digit.

use faer::{Mat, Side};
use rayon::prelude::*;
use tn::tensor::{C64, ONE, ZERO};
use tn::MPO;

use crate::error::{DmrgError, Result};

/// Largest Hilbert-space dimension that will be densified.
pub const EXACT_DIM_LIMIT: usize = 1024;

pub fn hilbert_dim(h: &MPO) -> Option<usize> {
    h.site_dims().into_iter().try_fold(1usize, |acc, d| acc.checked_mul(d))
}

/// Contracts the MPO into a `D × D` matrix, one site at a time.
pub fn dense_matrix(h: &MPO) -> Result<Mat<C64>> {
    let dim = hilbert_dim(h).unwrap_or(usize::MAX);
    if dim > EXACT_DIM_LIMIT {
        return Err(DmrgError::ExactTooLarge {
            dim,
            limit: EXACT_DIM_LIMIT,
        });
    }

    // partial[O, I, w] over the sites absorbed so far
    let mut partial = vec![ONE];
    let (mut rows, mut bond) = (1usize, 1usize);
    for w in &h.sites {
        let (d, wr) = (w.dout, w.dr);
        let new_rows = rows * d;
        let row_len = new_rows * wr;
        let mut next = vec![ZERO; new_rows * row_len];

        next.par_chunks_mut(row_len).enumerate().for_each(|(row, out)| {
            let (big_o, o) = (row / d, row % d);
            for big_i in 0..rows {
                for wl in 0..bond {
                    let v = partial[(big_o * rows + big_i) * bond + wl];
                    if v == ZERO {
                        continue;
                    }
                    for i in 0..d {
                        for w2 in 0..wr {
                            let c = w.get(wl, o, i, w2);
                            if c != ZERO {
                                out[(big_i * d + i) * wr + w2] += v * c;
                            }
                        }
                    }
                }
            }
        });

        partial = next;
        rows = new_rows;
        bond = wr;
    }

    Ok(Mat::from_fn(rows, rows, |r, c| partial[r * rows + c]))
}

/// The `k` lowest eigenvalues, ascending. Fewer are returned if the space is smaller.
pub fn lowest_energies(h: &MPO, k: usize) -> Result<Vec<f64>> {
    let m = dense_matrix(h)?;
    let mut ev: Vec<f64> = m.selfadjoint_eigenvalues(Side::Lower);
    ev.sort_by(|a, b| a.total_cmp(b));
    ev.truncate(k);
    log::debug!("exact diagonalisation in dimension {}: {:?}", m.nrows(), ev);
    Ok(ev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spinchain::{models::ising, HamiltonianBuilder, Lattice};

    #[test]
    fn dense_matrix_is_hermitian() {
        let lat = Lattice::spin_chain(3, 2).unwrap();
        let mut terms = ising(3, 0.8, 0.3);
        terms.two_site(0.4, "Sy", 1, "Sy", 2);
        let h = HamiltonianBuilder::new(&lat).build(&terms).unwrap();
        let m = dense_matrix(&h).unwrap();
        assert_eq!(m.nrows(), 8);
        for r in 0..8 {
            for c in 0..8 {
                assert!((m.read(r, c) - m.read(c, r).conj()).norm() < 1e-14);
            }
        }
    }

    #[test]
    fn free_spins_in_a_field() {
        // J = 0: every spin independently has energies ∓h/2
        let lat = Lattice::spin_chain(3, 2).unwrap();
        let h = HamiltonianBuilder::new(&lat).build(&ising(3, 0.0, 1.0)).unwrap();
        let e = lowest_energies(&h, 3).unwrap();
        assert!((e[0] + 1.5).abs() < 1e-12);
        assert!((e[1] + 0.5).abs() < 1e-12);
        assert!((e[2] + 0.5).abs() < 1e-12);
    }

    #[test]
    fn refuses_large_chains() {
        let lat = Lattice::spin_chain(11, 2).unwrap();
        let h = HamiltonianBuilder::new(&lat).build(&ising(11, 1.0, 1.0)).unwrap();
        assert!(matches!(dense_matrix(&h), Err(DmrgError::ExactTooLarge { dim: 2048, .. })));
    }
}
