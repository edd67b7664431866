use crate::tensor::{C64, ZERO};
use faer::Mat;

/// Bond truncation policy.
///
/// `cutoff` bounds the relative discarded weight `Σ_discarded s² / Σ s²`;
/// `max_bond` caps the kept rank. The stricter of the two wins and at least
/// one singular value always survives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Truncation {
    pub max_bond: usize,
    pub cutoff: f64,
}

impl Truncation {
    /// Keeps every singular value.
    pub fn exact() -> Self {
        Self {
            max_bond: usize::MAX,
            cutoff: 0.0,
        }
    }
}

/// Result of a truncated SVD `theta ≈ U · diag(s) · Vh`.
pub struct SvdSplit {
    pub u: Mat<C64>,
    pub s: Vec<f64>,
    pub vh: Mat<C64>,
    pub discarded_weight: f64,
}

impl SvdSplit {
    pub fn rank(&self) -> usize {
        self.s.len()
    }

    /// Scales the kept spectrum to unit 2-norm, returning the old norm.
    pub fn normalize(&mut self) -> f64 {
        let norm = self.s.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            for x in self.s.iter_mut() {
                *x /= norm;
            }
        }
        norm
    }

    /// `U · diag(s)`.
    pub fn us(&self) -> Mat<C64> {
        let mut m = Mat::<C64>::zeros(self.u.nrows(), self.rank());
        for i in 0..self.u.nrows() {
            for k in 0..self.rank() {
                m.write(i, k, self.u.read(i, k) * self.s[k]);
            }
        }
        m
    }

    /// `diag(s) · Vh`.
    pub fn svh(&self) -> Mat<C64> {
        let mut m = Mat::<C64>::zeros(self.rank(), self.vh.ncols());
        for k in 0..self.rank() {
            for j in 0..self.vh.ncols() {
                m.write(k, j, self.vh.read(k, j) * self.s[k]);
            }
        }
        m
    }
}

/// Number of singular values to keep and the relative weight thrown away.
///
/// `s` must be sorted non-increasing.
pub fn kept_rank(s: &[f64], trunc: Truncation) -> (usize, f64) {
    if s.is_empty() {
        return (0, 0.0);
    }
    let total: f64 = s.iter().map(|x| x * x).sum();
    if total <= 0.0 {
        return (1, 0.0);
    }

    // Smallest k whose tail weight stays within the cutoff.
    let mut tail = 0.0;
    let mut k = s.len();
    while k > 1 {
        let w = s[k - 1] * s[k - 1] / total;
        if tail + w > trunc.cutoff {
            break;
        }
        tail += w;
        k -= 1;
    }

    let kept = k.min(trunc.max_bond).max(1);
    let discarded = s[kept..].iter().map(|x| x * x).sum::<f64>() / total;
    (kept, discarded)
}

pub fn truncated_svd(theta: &Mat<C64>, trunc: Truncation) -> SvdSplit {
    let svd = theta.thin_svd();
    let s = svd.s_diagonal();

    let mut s_all = Vec::with_capacity(s.nrows());
    for i in 0..s.nrows() {
        s_all.push(s.read(i).re);
    }
    let (kept, discarded_weight) = kept_rank(&s_all, trunc);

    let u_full = svd.u();
    let v_full = svd.v();

    let mut u = Mat::<C64>::zeros(u_full.nrows(), kept);
    for i in 0..u_full.nrows() {
        for k in 0..kept {
            u.write(i, k, u_full.read(i, k));
        }
    }

    let mut vh = Mat::<C64>::zeros(kept, v_full.nrows());
    for k in 0..kept {
        for j in 0..v_full.nrows() {
            vh.write(k, j, v_full.read(j, k).conj());
        }
    }

    s_all.truncate(kept);
    SvdSplit {
        u,
        s: s_all,
        vh,
        discarded_weight,
    }
}

pub(crate) fn matmul(a: &Mat<C64>, b: &Mat<C64>) -> Mat<C64> {
    let mut c = Mat::<C64>::zeros(a.nrows(), b.ncols());
    for i in 0..a.nrows() {
        for k in 0..a.ncols() {
            let aik = a.read(i, k);
            if aik == ZERO {
                continue;
            }
            for j in 0..b.ncols() {
                let cur = c.read(i, j);
                c.write(i, j, cur + aik * b.read(k, j));
            }
        }
    }
    c
}
