//! Left/right environment contractions `⟨bra| W |ket⟩` over a prefix or
//! suffix of the chain.
//!
//! An environment is stored as `E[a, w, b]` with `a` the bra bond, `w` the
//! MPO bond and `b` the ket bond. The bra side is always conjugated.

use crate::tensor::{C64, Tensor3, Tensor4, ONE, ZERO};

#[derive(Clone, Debug)]
pub struct Env {
    pub data: Vec<C64>,
    pub bra: usize,
    pub mpo: usize,
    pub ket: usize,
}

impl Env {
    /// Boundary environment: a single entry equal to one.
    pub fn trivial() -> Self {
        Self {
            data: vec![ONE],
            bra: 1,
            mpo: 1,
            ket: 1,
        }
    }

    pub fn zeros(bra: usize, mpo: usize, ket: usize) -> Self {
        Self {
            data: vec![ZERO; bra * mpo * ket],
            bra,
            mpo,
            ket,
        }
    }

    #[inline]
    pub fn idx(&self, a: usize, w: usize, b: usize) -> usize {
        (a * self.mpo + w) * self.ket + b
    }

    #[inline]
    pub fn get(&self, a: usize, w: usize, b: usize) -> C64 {
        self.data[self.idx(a, w, b)]
    }

    /// Scalar value of a fully contracted chain.
    pub fn scalar(&self) -> C64 {
        self.data.iter().copied().sum()
    }

    /// Absorbs one site from the left: `E'[a', w', b'] = Σ E[a,w,b] conj(B[a,s,a']) W[w,s,t,w'] K[b,t,b']`.
    pub fn extend_left(&self, bra: &Tensor3, w: &Tensor4, ket: &Tensor3) -> Env {
        let (d_out, d_in) = (w.dout, w.din);

        // T1[a, w, t, b'] = Σ_b E[a, w, b] K[b, t, b']
        let mut t1 = vec![ZERO; self.bra * self.mpo * d_in * ket.dr];
        for a in 0..self.bra {
            for wl in 0..self.mpo {
                for b in 0..self.ket {
                    let e = self.get(a, wl, b);
                    if e == ZERO {
                        continue;
                    }
                    for t in 0..d_in {
                        let base = ((a * self.mpo + wl) * d_in + t) * ket.dr;
                        for bp in 0..ket.dr {
                            t1[base + bp] += e * ket.get(b, t, bp);
                        }
                    }
                }
            }
        }

        // T2[a, s, w', b'] = Σ_{w,t} T1[a, w, t, b'] W[w, s, t, w']
        let mut t2 = vec![ZERO; self.bra * d_out * w.dr * ket.dr];
        for a in 0..self.bra {
            for wl in 0..self.mpo {
                for wr in 0..w.dr {
                    if w.block_is_zero(wl, wr) {
                        continue;
                    }
                    for s in 0..d_out {
                        for t in 0..d_in {
                            let wv = w.get(wl, s, t, wr);
                            if wv == ZERO {
                                continue;
                            }
                            let src = ((a * self.mpo + wl) * d_in + t) * ket.dr;
                            let dst = ((a * d_out + s) * w.dr + wr) * ket.dr;
                            for bp in 0..ket.dr {
                                t2[dst + bp] += wv * t1[src + bp];
                            }
                        }
                    }
                }
            }
        }

        // E'[a', w', b'] = Σ_{a,s} conj(B[a, s, a']) T2[a, s, w', b']
        let mut out = Env::zeros(bra.dr, w.dr, ket.dr);
        for a in 0..self.bra {
            for s in 0..d_out {
                for ap in 0..bra.dr {
                    let bv = bra.get(a, s, ap).conj();
                    if bv == ZERO {
                        continue;
                    }
                    for wr in 0..w.dr {
                        let src = ((a * d_out + s) * w.dr + wr) * ket.dr;
                        let dst = out.idx(ap, wr, 0);
                        for bp in 0..ket.dr {
                            out.data[dst + bp] += bv * t2[src + bp];
                        }
                    }
                }
            }
        }
        out
    }

    /// Absorbs one site from the right: `E[a, w, b] = Σ conj(B[a,s,a']) W[w,s,t,w'] K[b,t,b'] E'[a',w',b']`.
    pub fn extend_right(&self, bra: &Tensor3, w: &Tensor4, ket: &Tensor3) -> Env {
        let (d_out, d_in) = (w.dout, w.din);

        // T1[b, t, a', w'] = Σ_{b'} K[b, t, b'] E'[a', w', b']
        let mut t1 = vec![ZERO; ket.dl * d_in * self.bra * self.mpo];
        for b in 0..ket.dl {
            for t in 0..d_in {
                for bp in 0..ket.dr {
                    let kv = ket.get(b, t, bp);
                    if kv == ZERO {
                        continue;
                    }
                    let base = (b * d_in + t) * self.bra * self.mpo;
                    for ap in 0..self.bra {
                        for wr in 0..self.mpo {
                            t1[base + ap * self.mpo + wr] += kv * self.get(ap, wr, bp);
                        }
                    }
                }
            }
        }

        // T2[b, s, a', w] = Σ_{t, w'} W[w, s, t, w'] T1[b, t, a', w']
        let mut t2 = vec![ZERO; ket.dl * d_out * self.bra * w.dl];
        for wl in 0..w.dl {
            for wr in 0..w.dr {
                if w.block_is_zero(wl, wr) {
                    continue;
                }
                for s in 0..d_out {
                    for t in 0..d_in {
                        let wv = w.get(wl, s, t, wr);
                        if wv == ZERO {
                            continue;
                        }
                        for b in 0..ket.dl {
                            let src = (b * d_in + t) * self.bra * self.mpo;
                            let dst = (b * d_out + s) * self.bra * w.dl;
                            for ap in 0..self.bra {
                                t2[dst + ap * w.dl + wl] += wv * t1[src + ap * self.mpo + wr];
                            }
                        }
                    }
                }
            }
        }

        // E[a, w, b] = Σ_{s, a'} conj(B[a, s, a']) T2[b, s, a', w]
        let mut out = Env::zeros(bra.dl, w.dl, ket.dl);
        for a in 0..bra.dl {
            for s in 0..d_out {
                for ap in 0..bra.dr {
                    let bv = bra.get(a, s, ap).conj();
                    if bv == ZERO {
                        continue;
                    }
                    for b in 0..ket.dl {
                        let src = (b * d_out + s) * self.bra * w.dl + ap * w.dl;
                        for wl in 0..w.dl {
                            let k = out.idx(a, wl, b);
                            out.data[k] += bv * t2[src + wl];
                        }
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rng::ONDRng;

    // Brute-force ⟨bra|W|ket⟩ for a single site with trivial boundaries.
    fn direct(bra: &Tensor3, w: &Tensor4, ket: &Tensor3) -> C64 {
        let mut acc = ZERO;
        for s in 0..w.dout {
            for t in 0..w.din {
                acc += bra.get(0, s, 0).conj() * w.get(0, s, t, 0) * ket.get(0, t, 0);
            }
        }
        acc
    }

    #[test]
    fn left_and_right_agree_on_single_site() {
        let mut rng = ONDRng::new(b"env");
        let bra = Tensor3::random(1, 3, 1, &mut rng);
        let ket = Tensor3::random(1, 3, 1, &mut rng);
        let mut w = Tensor4::zeros(1, 3, 3, 1);
        for s in 0..3 {
            for t in 0..3 {
                w.set(0, s, t, 0, C64::new((s + 2 * t) as f64, (s as f64) - (t as f64)));
            }
        }

        let expected = direct(&bra, &w, &ket);
        let left = Env::trivial().extend_left(&bra, &w, &ket).scalar();
        let right = Env::trivial().extend_right(&bra, &w, &ket).scalar();
        assert!((left - expected).norm() < 1e-12, "left = {}", left);
        assert!((right - expected).norm() < 1e-12, "right = {}", right);
    }

    #[test]
    fn two_site_chain_left_equals_right() {
        let mut rng = ONDRng::new(b"env2");
        let a0 = Tensor3::random(1, 2, 3, &mut rng);
        let a1 = Tensor3::random(3, 2, 1, &mut rng);
        let id = Tensor4::identity(2);

        let l = Env::trivial().extend_left(&a0, &id, &a0).extend_left(&a1, &id, &a1);
        let r = Env::trivial().extend_right(&a1, &id, &a1).extend_right(&a0, &id, &a0);
        assert!((l.scalar() - r.scalar()).norm() < 1e-10);
        assert!(l.scalar().im.abs() < 1e-10);
        assert!(l.scalar().re > 0.0);
    }
}
