use crate::environment::Env;
use crate::error::{Result, TnError};
use crate::mpo::MPO;
use crate::tensor::{C64, Tensor3, Tensor4};
use crate::truncation::{matmul, truncated_svd, SvdSplit, Truncation};
use faer::Mat;
use rng::ONDRng;

/// Matrix-product state with an explicit orthogonality centre.
///
/// Tensors left of `center` are left-orthonormal, tensors right of it are
/// right-orthonormal; the squared norm of the state equals the squared
/// Frobenius norm of `sites[center]`.
#[derive(Clone, Debug)]
pub struct MPS {
    pub sites: Vec<Tensor3>,
    center: usize,
}

impl MPS {
    /// Random state over the given local dimensions, right-canonical with centre 0
    /// and unit norm. Bond dimensions are capped at `bond_dim` and by the exact
    /// Schmidt rank of each cut.
    pub fn random(dims: &[usize], bond_dim: usize, rng: &mut ONDRng) -> Result<Self> {
        if dims.is_empty() {
            return Err(TnError::EmptyChain);
        }
        let n = dims.len();
        let chi = bond_dim.max(1);

        // bonds[i] sits between sites i-1 and i
        let mut bonds = vec![1usize; n + 1];
        for i in 1..n {
            let left: usize = dims[..i].iter().fold(1usize, |acc, &d| acc.saturating_mul(d));
            let right: usize = dims[i..].iter().fold(1usize, |acc, &d| acc.saturating_mul(d));
            bonds[i] = chi.min(left).min(right);
        }

        let sites = (0..n)
            .map(|i| Tensor3::random(bonds[i], dims[i], bonds[i + 1], rng))
            .collect();
        let mut psi = Self {
            sites,
            center: n - 1,
        };
        psi.canonicalize(0)?;
        psi.normalize()?;
        Ok(psi)
    }

    /// Product state `|s_0 s_1 ...⟩` in the computational basis.
    pub fn product(dims: &[usize], states: &[usize]) -> Result<Self> {
        if dims.is_empty() {
            return Err(TnError::EmptyChain);
        }
        if dims.len() != states.len() {
            return Err(TnError::LengthMismatch {
                left: dims.len(),
                right: states.len(),
            });
        }
        let mut sites = Vec::with_capacity(dims.len());
        for (i, (&d, &s)) in dims.iter().zip(states).enumerate() {
            if s >= d {
                return Err(TnError::DimensionMismatch {
                    site: i,
                    expected: d,
                    got: s,
                });
            }
            let mut t = Tensor3::zeros(1, d, 1);
            t.set(0, s, 0, C64::new(1.0, 0.0));
            sites.push(t);
        }
        Ok(Self { sites, center: 0 })
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn center(&self) -> usize {
        self.center
    }

    pub fn site_dims(&self) -> Vec<usize> {
        self.sites.iter().map(|t| t.dp).collect()
    }

    /// Dimensions of the `N - 1` internal bonds.
    pub fn bond_dims(&self) -> Vec<usize> {
        self.sites.iter().take(self.len().saturating_sub(1)).map(|t| t.dr).collect()
    }

    pub fn max_bond_dim(&self) -> usize {
        self.bond_dims().into_iter().max().unwrap_or(1)
    }

    /// Moves the orthogonality centre to `center` with exact (untruncated) SVDs.
    pub fn canonicalize(&mut self, center: usize) -> Result<()> {
        let n = self.len();
        if center >= n {
            return Err(TnError::SiteOutOfRange { site: center, len: n });
        }
        for i in 0..center {
            self.shift_right(i, Truncation::exact());
        }
        for i in (center + 1..n).rev() {
            self.shift_left(i, Truncation::exact());
        }
        self.center = center;
        Ok(())
    }

    /// Rescales the centre tensor so the state has unit norm; returns the old norm.
    pub fn normalize(&mut self) -> Result<f64> {
        let nrm = self.sites[self.center].norm_sqr().sqrt();
        if nrm == 0.0 || !nrm.is_finite() {
            return Err(TnError::ZeroNorm);
        }
        self.sites[self.center].scale(1.0 / nrm);
        Ok(nrm)
    }

    /// Truncates the bond between `bond` and `bond + 1`, leaving the centre at
    /// `bond` and the state renormalised. Returns the relative discarded weight.
    pub fn truncate(&mut self, bond: usize, cutoff: f64, max_dim: usize) -> Result<f64> {
        let n = self.len();
        if bond + 1 >= n {
            return Err(TnError::BondOutOfRange { bond, len: n });
        }
        self.canonicalize(bond)?;

        let a = &self.sites[bond];
        let b = &self.sites[bond + 1];
        let theta = matmul(&a.to_left_matrix(), &b.to_right_matrix());
        let (dl, dp_a) = (a.dl, a.dp);
        let (dp_b, dr) = (b.dp, b.dr);

        let mut split = truncated_svd(&theta, Truncation { max_bond: max_dim, cutoff });
        split.normalize();
        self.sites[bond] = Tensor3::from_left_matrix(&split.us(), dl, dp_a);
        self.sites[bond + 1] = Tensor3::from_right_matrix(&split.vh, dp_b, dr);
        Ok(split.discarded_weight)
    }

    /// Replaces sites `(i, i+1)` by the factors of a two-site tensor
    /// `theta[(l·p1), (p2·r)]`, placing the centre on `i + 1` when
    /// `move_right` and on `i` otherwise. The kept spectrum is renormalised.
    pub fn set_two_site(
        &mut self,
        i: usize,
        theta: &Mat<C64>,
        dims: (usize, usize, usize, usize),
        trunc: Truncation,
        move_right: bool,
    ) -> SvdSplit {
        let (dl, d1, d2, dr) = dims;
        let mut split = truncated_svd(theta, trunc);
        split.normalize();
        if move_right {
            self.sites[i] = Tensor3::from_left_matrix(&split.u, dl, d1);
            self.sites[i + 1] = Tensor3::from_right_matrix(&split.svh(), d2, dr);
            self.center = i + 1;
        } else {
            self.sites[i] = Tensor3::from_left_matrix(&split.us(), dl, d1);
            self.sites[i + 1] = Tensor3::from_right_matrix(&split.vh, d2, dr);
            self.center = i;
        }
        split
    }

    /// `⟨self|other⟩`, conjugate-linear in `self`.
    pub fn overlap(&self, other: &MPS) -> Result<C64> {
        if self.len() != other.len() {
            return Err(TnError::LengthMismatch {
                left: self.len(),
                right: other.len(),
            });
        }
        let mut env = Env::trivial();
        for (i, (a, b)) in self.sites.iter().zip(&other.sites).enumerate() {
            if a.dp != b.dp {
                return Err(TnError::DimensionMismatch {
                    site: i,
                    expected: a.dp,
                    got: b.dp,
                });
            }
            env = env.extend_left(a, &Tensor4::identity(a.dp), b);
        }
        Ok(env.scalar())
    }

    pub fn norm(&self) -> f64 {
        let mut env = Env::trivial();
        for a in &self.sites {
            env = env.extend_left(a, &Tensor4::identity(a.dp), a);
        }
        env.scalar().re.max(0.0).sqrt()
    }

    /// `⟨ψ|H|ψ⟩ / ⟨ψ|ψ⟩`.
    pub fn expectation(&self, h: &MPO) -> Result<f64> {
        let num = h.matrix_element(self, self)?;
        let den = self.norm().powi(2);
        if den == 0.0 {
            return Err(TnError::ZeroNorm);
        }
        Ok(num.re / den)
    }

    // A[i] = U, A[i+1] <- S Vh A[i+1]
    fn shift_right(&mut self, i: usize, trunc: Truncation) {
        let a = &self.sites[i];
        let (dl, dp) = (a.dl, a.dp);
        let split = truncated_svd(&a.to_left_matrix(), trunc);
        self.sites[i] = Tensor3::from_left_matrix(&split.u, dl, dp);

        let next = &self.sites[i + 1];
        let (ndp, ndr) = (next.dp, next.dr);
        let merged = matmul(&split.svh(), &next.to_right_matrix());
        self.sites[i + 1] = Tensor3::from_right_matrix(&merged, ndp, ndr);
    }

    // A[i] = Vh, A[i-1] <- A[i-1] U S
    fn shift_left(&mut self, i: usize, trunc: Truncation) {
        let a = &self.sites[i];
        let (dp, dr) = (a.dp, a.dr);
        let split = truncated_svd(&a.to_right_matrix(), trunc);
        self.sites[i] = Tensor3::from_right_matrix(&split.vh, dp, dr);

        let prev = &self.sites[i - 1];
        let (pdl, pdp) = (prev.dl, prev.dp);
        let merged = matmul(&prev.to_left_matrix(), &split.us());
        self.sites[i - 1] = Tensor3::from_left_matrix(&merged, pdl, pdp);
    }
}
