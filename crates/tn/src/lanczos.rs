//! Lowest eigenpair of a Hermitian operator given only as a matvec.
//!
//! Lanczos with full re-orthogonalisation, started from a caller-supplied
//! vector (in DMRG, the current two-site tensor). The matvec budget is hard:
//! the solver never applies the operator more than `max_iter` times and
//! returns its best Ritz pair whether or not the residual tolerance was met.

use crate::error::{Result, TnError};
use crate::tensor::{C64, ZERO};
use faer::{Mat, Side};

#[derive(Clone, Copy, Debug)]
pub struct LanczosOptions {
    /// Maximum number of operator applications.
    pub max_iter: usize,
    /// Residual norm `‖Hx - λx‖` below which the pair counts as converged.
    pub tol: f64,
}

impl Default for LanczosOptions {
    fn default() -> Self {
        Self {
            max_iter: 2,
            tol: 1e-10,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Eigenpair {
    pub value: f64,
    pub vector: Vec<C64>,
    pub residual: f64,
    pub iterations: usize,
    pub converged: bool,
}

const BREAKDOWN: f64 = 1e-13;

pub fn dot(a: &[C64], b: &[C64]) -> C64 {
    a.iter().zip(b).map(|(x, y)| x.conj() * y).sum()
}

pub fn norm(a: &[C64]) -> f64 {
    a.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt()
}

fn axpy(alpha: C64, x: &[C64], y: &mut [C64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

/// Deterministic fallback start vector for a degenerate initial guess.
fn fallback_start(dim: usize) -> Vec<C64> {
    (0..dim)
        .map(|i| C64::new(((i as f64 + 1.0) * 0.618033988749895).fract() - 0.5, 0.0))
        .collect()
}

pub fn lowest_eigenpair<F>(apply: F, start: &[C64], opts: LanczosOptions) -> Result<Eigenpair>
where
    F: Fn(&[C64]) -> Vec<C64>,
{
    let dim = start.len();
    if dim == 0 {
        return Err(TnError::EmptyChain);
    }

    let mut q0 = start.to_vec();
    let mut nrm = norm(&q0);
    if !nrm.is_finite() {
        return Err(TnError::NonFinite { context: "lanczos start vector" });
    }
    if nrm < BREAKDOWN {
        q0 = fallback_start(dim);
        nrm = norm(&q0);
    }
    for v in q0.iter_mut() {
        *v /= nrm;
    }

    let m = opts.max_iter.max(2).min(dim);
    let mut q_vecs: Vec<Vec<C64>> = Vec::with_capacity(m + 1);
    let mut alpha: Vec<f64> = Vec::with_capacity(m);
    let mut beta: Vec<f64> = Vec::with_capacity(m);
    q_vecs.push(q0);

    let mut last_beta = 0.0;
    for j in 0..m {
        let mut w = apply(&q_vecs[j]);
        if w.iter().any(|v| !v.re.is_finite() || !v.im.is_finite()) {
            return Err(TnError::NonFinite { context: "effective operator" });
        }

        let a = dot(&q_vecs[j], &w).re;
        alpha.push(a);

        axpy(C64::new(-a, 0.0), &q_vecs[j], &mut w);
        if j > 0 {
            axpy(C64::new(-beta[j - 1], 0.0), &q_vecs[j - 1], &mut w);
        }

        // Two passes of Gram-Schmidt keep the basis orthogonal to machine precision.
        for _ in 0..2 {
            for qi in &q_vecs {
                let ov = dot(qi, &w);
                axpy(-ov, qi, &mut w);
            }
        }

        let b = norm(&w);
        last_beta = b;
        if b < BREAKDOWN || j + 1 == m {
            break;
        }
        beta.push(b);
        for v in w.iter_mut() {
            *v /= b;
        }
        q_vecs.push(w);
    }

    let k = alpha.len();
    let mut t = Mat::<f64>::zeros(k, k);
    for i in 0..k {
        t.write(i, i, alpha[i]);
        if i > 0 {
            t.write(i, i - 1, beta[i - 1]);
            t.write(i - 1, i, beta[i - 1]);
        }
    }
    let eig = t.selfadjoint_eigendecomposition(Side::Lower);
    let evals = eig.s().column_vector();
    let evecs = eig.u();

    let mut best = 0;
    for i in 1..k {
        if evals.read(i) < evals.read(best) {
            best = i;
        }
    }
    let value = evals.read(best);

    let mut vector = vec![ZERO; dim];
    for j in 0..k {
        let c = evecs.read(j, best);
        axpy(C64::new(c, 0.0), &q_vecs[j], &mut vector);
    }
    let vn = norm(&vector);
    if vn > 0.0 {
        for v in vector.iter_mut() {
            *v /= vn;
        }
    }

    let residual = if last_beta < BREAKDOWN {
        0.0
    } else {
        (last_beta * evecs.read(k - 1, best)).abs()
    };
    let converged = residual <= opts.tol;
    if !converged {
        log::debug!(
            "lanczos: budget of {} matvecs exhausted, residual = {:.3e}",
            k,
            residual
        );
    }

    Ok(Eigenpair {
        value,
        vector,
        residual,
        iterations: k,
        converged,
    })
}
