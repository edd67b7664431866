//! Two-site effective Hamiltonian and projected overlaps.
//!
//! `left[i]` contracts sites `0..i` and `right[i]` contracts sites `i..n`,
//! so the bond `(i, i+1)` sees `left[i]` and `right[i + 2]`. Entries are only
//! meaningful on the side of the orthogonality centre they were last
//! refreshed from; the sweep order keeps the ones in use current.

use tn::environment::Env;
use tn::tensor::{C64, Tensor4, ZERO};
use tn::{MPO, MPS};

pub(crate) struct ProjectedOperator<'a> {
    mpo: &'a MPO,
    left: Vec<Env>,
    right: Vec<Env>,
}

impl<'a> ProjectedOperator<'a> {
    /// Environments for a state whose centre is on site 0.
    pub(crate) fn new(mpo: &'a MPO, psi: &MPS) -> Self {
        let n = psi.len();
        let mut right = vec![Env::trivial(); n + 1];
        for i in (1..n).rev() {
            let a = &psi.sites[i];
            right[i] = right[i + 1].extend_right(a, &mpo.sites[i], a);
        }
        Self {
            mpo,
            left: vec![Env::trivial(); n + 1],
            right,
        }
    }

    pub(crate) fn update_left(&mut self, psi: &MPS, site: usize) {
        let a = &psi.sites[site];
        self.left[site + 1] = self.left[site].extend_left(a, &self.mpo.sites[site], a);
    }

    pub(crate) fn update_right(&mut self, psi: &MPS, site: usize) {
        let a = &psi.sites[site];
        self.right[site] = self.right[site + 1].extend_right(a, &self.mpo.sites[site], a);
    }

    /// `H_eff · x` for a two-site tensor `x[l, s1, s2, r]` on bond `(i, i+1)`.
    pub(crate) fn apply(&self, i: usize, x: &[C64]) -> Vec<C64> {
        let l_env = &self.left[i];
        let r_env = &self.right[i + 2];
        let w1 = &self.mpo.sites[i];
        let w2 = &self.mpo.sites[i + 1];

        let (dl, dr) = (l_env.ket, r_env.ket);
        let (d1, d2) = (w1.din, w2.din);
        let (wl, wm, wr) = (w1.dl, w1.dr, w2.dr);
        debug_assert_eq!(x.len(), dl * d1 * d2 * dr);

        // X1[l', wl, s1, s2, r] = Σ_l L[l', wl, l] x[l, s1, s2, r]
        let inner = d1 * d2 * dr;
        let mut x1 = vec![ZERO; dl * wl * inner];
        for lp in 0..dl {
            for w in 0..wl {
                let dst = (lp * wl + w) * inner;
                for l in 0..dl {
                    let e = l_env.get(lp, w, l);
                    if e == ZERO {
                        continue;
                    }
                    let src = l * inner;
                    for k in 0..inner {
                        x1[dst + k] += e * x[src + k];
                    }
                }
            }
        }

        // X2[l', t1, wm, s2, r] = Σ_{wl, s1} X1[l', wl, s1, s2, r] W1[wl, t1, s1, wm]
        let tail = d2 * dr;
        let mut x2 = vec![ZERO; dl * d1 * wm * tail];
        for lp in 0..dl {
            for w in 0..wl {
                for m in 0..wm {
                    if w1.block_is_zero(w, m) {
                        continue;
                    }
                    for t1 in 0..d1 {
                        let dst = ((lp * d1 + t1) * wm + m) * tail;
                        for s1 in 0..d1 {
                            let c = w1.get(w, t1, s1, m);
                            if c == ZERO {
                                continue;
                            }
                            let src = ((lp * wl + w) * d1 + s1) * tail;
                            for k in 0..tail {
                                x2[dst + k] += c * x1[src + k];
                            }
                        }
                    }
                }
            }
        }

        // X3[l', t1, t2, wr, r] = Σ_{wm, s2} X2[l', t1, wm, s2, r] W2[wm, t2, s2, wr]
        let mut x3 = vec![ZERO; dl * d1 * d2 * wr * dr];
        for lt in 0..dl * d1 {
            for m in 0..wm {
                for w in 0..wr {
                    if w2.block_is_zero(m, w) {
                        continue;
                    }
                    for t2 in 0..d2 {
                        let dst = ((lt * d2 + t2) * wr + w) * dr;
                        for s2 in 0..d2 {
                            let c = w2.get(m, t2, s2, w);
                            if c == ZERO {
                                continue;
                            }
                            let src = ((lt * wm + m) * d2 + s2) * dr;
                            for r in 0..dr {
                                x3[dst + r] += c * x2[src + r];
                            }
                        }
                    }
                }
            }
        }

        // y[l', t1, t2, r'] = Σ_{wr, r} X3[l', t1, t2, wr, r] R[r', wr, r]
        let mut y = vec![ZERO; dl * d1 * d2 * dr];
        for ltt in 0..dl * d1 * d2 {
            for w in 0..wr {
                let src = (ltt * wr + w) * dr;
                for rp in 0..dr {
                    let mut acc = ZERO;
                    for r in 0..dr {
                        acc += x3[src + r] * r_env.get(rp, w, r);
                    }
                    y[ltt * dr + rp] += acc;
                }
            }
        }
        y
    }
}

/// Overlap environments `⟨φ|ψ⟩` of a fixed state `φ` against the state being
/// optimised. The local vector `b` satisfies `⟨φ|ψ⟩ = b† · θ` for the current
/// two-site tensor `θ`.
pub(crate) struct ProjectedOverlap<'a> {
    phi: &'a MPS,
    left: Vec<Env>,
    right: Vec<Env>,
}

impl<'a> ProjectedOverlap<'a> {
    pub(crate) fn new(phi: &'a MPS, psi: &MPS) -> Self {
        let n = psi.len();
        let mut right = vec![Env::trivial(); n + 1];
        for i in (1..n).rev() {
            let id = Tensor4::identity(psi.sites[i].dp);
            right[i] = right[i + 1].extend_right(&phi.sites[i], &id, &psi.sites[i]);
        }
        Self {
            phi,
            left: vec![Env::trivial(); n + 1],
            right,
        }
    }

    pub(crate) fn update_left(&mut self, psi: &MPS, site: usize) {
        let id = Tensor4::identity(psi.sites[site].dp);
        self.left[site + 1] = self.left[site].extend_left(&self.phi.sites[site], &id, &psi.sites[site]);
    }

    pub(crate) fn update_right(&mut self, psi: &MPS, site: usize) {
        let id = Tensor4::identity(psi.sites[site].dp);
        self.right[site] = self.right[site + 1].extend_right(&self.phi.sites[site], &id, &psi.sites[site]);
    }

    /// `b[l, s1, s2, r] = Σ_{a, c} conj(L[a, l]) Φ[a, s1, s2, c] conj(R[c, r])`.
    pub(crate) fn local_vector(&self, i: usize) -> Vec<C64> {
        let l_env = &self.left[i];
        let r_env = &self.right[i + 2];
        let p1 = &self.phi.sites[i];
        let p2 = &self.phi.sites[i + 1];

        let (da, dl) = (l_env.bra, l_env.ket);
        let (dc, dr) = (r_env.bra, r_env.ket);
        let (d1, d2, dm) = (p1.dp, p2.dp, p1.dr);

        // Φ[a, s1, s2, c]
        let mut phi = vec![ZERO; da * d1 * d2 * dc];
        for a in 0..da {
            for s1 in 0..d1 {
                for m in 0..dm {
                    let u = p1.get(a, s1, m);
                    if u == ZERO {
                        continue;
                    }
                    for s2 in 0..d2 {
                        let dst = ((a * d1 + s1) * d2 + s2) * dc;
                        for c in 0..dc {
                            phi[dst + c] += u * p2.get(m, s2, c);
                        }
                    }
                }
            }
        }

        // X[l, s1, s2, c] = Σ_a conj(L[a, l]) Φ[a, s1, s2, c]
        let inner = d1 * d2 * dc;
        let mut x = vec![ZERO; dl * inner];
        for l in 0..dl {
            for a in 0..da {
                let e = l_env.get(a, 0, l).conj();
                if e == ZERO {
                    continue;
                }
                for k in 0..inner {
                    x[l * inner + k] += e * phi[a * inner + k];
                }
            }
        }

        let mut b = vec![ZERO; dl * d1 * d2 * dr];
        for lss in 0..dl * d1 * d2 {
            for c in 0..dc {
                let v = x[lss * dc + c];
                if v == ZERO {
                    continue;
                }
                for r in 0..dr {
                    b[lss * dr + r] += v * r_env.get(c, 0, r).conj();
                }
            }
        }
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::Mat;
    use rng::ONDRng;
    use tn::lanczos::dot;
    use tn::Truncation;

    fn theta_of(psi: &MPS, i: usize) -> Vec<C64> {
        let (a, b) = (&psi.sites[i], &psi.sites[i + 1]);
        let mut out = vec![ZERO; a.dl * a.dp * b.dp * b.dr];
        for l in 0..a.dl {
            for s1 in 0..a.dp {
                for m in 0..a.dr {
                    for s2 in 0..b.dp {
                        for r in 0..b.dr {
                            out[((l * a.dp + s1) * b.dp + s2) * b.dr + r] += a.get(l, s1, m) * b.get(m, s2, r);
                        }
                    }
                }
            }
        }
        out
    }

    // Moves the centre from i to i + 1 without touching any other site.
    fn step_right(psi: &mut MPS, i: usize) {
        let (a, b) = (&psi.sites[i], &psi.sites[i + 1]);
        let dims = (a.dl, a.dp, b.dp, b.dr);
        let theta = theta_of(psi, i);
        let cols = dims.2 * dims.3;
        let m = Mat::from_fn(dims.0 * dims.1, cols, |r, c| theta[r * cols + c]);
        psi.set_two_site(i, &m, dims, Truncation::exact(), true);
    }

    fn z_field(n: usize) -> MPO {
        // H = Σ_i (i + 1) Z_i as a bond-2 automaton
        let mut sites = Vec::new();
        for i in 0..n {
            let dl = if i == 0 { 1 } else { 2 };
            let dr = if i + 1 == n { 1 } else { 2 };
            let mut w = Tensor4::zeros(dl, 2, 2, dr);
            let coef = (i + 1) as f64;
            if i + 1 < n {
                w.set(0, 0, 0, 0, C64::new(1.0, 0.0));
                w.set(0, 1, 1, 0, C64::new(1.0, 0.0));
            }
            if i > 0 {
                w.set(dl - 1, 0, 0, dr - 1, C64::new(1.0, 0.0));
                w.set(dl - 1, 1, 1, dr - 1, C64::new(1.0, 0.0));
            }
            w.set(0, 0, 0, dr - 1, C64::new(coef, 0.0));
            w.set(0, 1, 1, dr - 1, C64::new(-coef, 0.0));
            sites.push(w);
        }
        MPO::new(sites).unwrap()
    }

    fn local_energy(op: &ProjectedOperator<'_>, psi: &MPS, i: usize) -> f64 {
        let theta = theta_of(psi, i);
        dot(&theta, &op.apply(i, &theta)).re / dot(&theta, &theta).re
    }

    #[test]
    fn local_energy_matches_global_expectation() {
        let mut rng = ONDRng::from_label("projected-energy");
        let psi = MPS::random(&[2; 5], 4, &mut rng).unwrap();
        let h = z_field(5);

        let op = ProjectedOperator::new(&h, &psi);
        let e_local = local_energy(&op, &psi, 0);
        let e_global = psi.expectation(&h).unwrap();
        assert!((e_local - e_global).abs() < 1e-10, "{} vs {}", e_local, e_global);
    }

    #[test]
    fn local_energy_after_moving_centre() {
        let mut rng = ONDRng::from_label("projected-move");
        let mut psi = MPS::random(&[2; 4], 4, &mut rng).unwrap();
        let h = z_field(4);
        let mut op = ProjectedOperator::new(&h, &psi);

        step_right(&mut psi, 0);
        op.update_left(&psi, 0);
        step_right(&mut psi, 1);
        op.update_left(&psi, 1);
        let e_global = psi.expectation(&h).unwrap();
        assert!((local_energy(&op, &psi, 2) - e_global).abs() < 1e-10);

        op.update_right(&psi, 3);
        assert!((local_energy(&op, &psi, 1) - e_global).abs() < 1e-10);
    }

    #[test]
    fn overlap_vector_reproduces_overlap() {
        let mut rng = ONDRng::from_label("projected-overlap");
        let phi = MPS::random(&[3; 4], 3, &mut rng).unwrap();
        let mut psi = MPS::random(&[3; 4], 5, &mut rng).unwrap();

        let mut ov = ProjectedOverlap::new(&phi, &psi);
        let direct = phi.overlap(&psi).unwrap();
        let local = dot(&ov.local_vector(0), &theta_of(&psi, 0));
        assert!((direct - local).norm() < 1e-10, "{} vs {}", direct, local);

        step_right(&mut psi, 0);
        ov.update_left(&psi, 0);
        step_right(&mut psi, 1);
        ov.update_left(&psi, 1);
        let local = dot(&ov.local_vector(2), &theta_of(&psi, 2));
        assert!((phi.overlap(&psi).unwrap() - local).norm() < 1e-10);
    }
}
