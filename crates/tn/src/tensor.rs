use faer::Mat;
use num_complex::Complex64;
use rng::ONDRng;

pub type C64 = Complex64;

pub const ZERO: C64 = C64::new(0.0, 0.0);
pub const ONE: C64 = C64::new(1.0, 0.0);

/// MPS site tensor `A[l, p, r]`, row-major.
#[derive(Clone, Debug)]
pub struct Tensor3 {
    pub data: Vec<C64>,
    pub dl: usize,
    pub dp: usize,
    pub dr: usize,
}

impl Tensor3 {
    pub fn zeros(dl: usize, dp: usize, dr: usize) -> Self {
        Self {
            data: vec![ZERO; dl * dp * dr],
            dl,
            dp,
            dr,
        }
    }

    /// Entries with independent standard-normal real and imaginary parts.
    pub fn random(dl: usize, dp: usize, dr: usize, rng: &mut ONDRng) -> Self {
        let mut t = Self::zeros(dl, dp, dr);
        for v in t.data.iter_mut() {
            let re = rng.next_gaussian(b"MPS_INIT_RE");
            let im = rng.next_gaussian(b"MPS_INIT_IM");
            *v = C64::new(re, im);
        }
        t
    }

    #[inline]
    fn idx(&self, l: usize, p: usize, r: usize) -> usize {
        (l * self.dp + p) * self.dr + r
    }

    #[inline]
    pub fn get(&self, l: usize, p: usize, r: usize) -> C64 {
        self.data[self.idx(l, p, r)]
    }

    #[inline]
    pub fn set(&mut self, l: usize, p: usize, r: usize, v: C64) {
        let i = self.idx(l, p, r);
        self.data[i] = v;
    }

    pub fn norm_sqr(&self) -> f64 {
        self.data.iter().map(|v| v.norm_sqr()).sum()
    }

    pub fn scale(&mut self, factor: f64) {
        for v in self.data.iter_mut() {
            *v *= factor;
        }
    }

    /// Matrix `(l·p) × r`.
    pub fn to_left_matrix(&self) -> Mat<C64> {
        let mut m = Mat::<C64>::zeros(self.dl * self.dp, self.dr);
        for l in 0..self.dl {
            for p in 0..self.dp {
                for r in 0..self.dr {
                    m.write(l * self.dp + p, r, self.get(l, p, r));
                }
            }
        }
        m
    }

    /// Matrix `l × (p·r)`.
    pub fn to_right_matrix(&self) -> Mat<C64> {
        let mut m = Mat::<C64>::zeros(self.dl, self.dp * self.dr);
        for l in 0..self.dl {
            for p in 0..self.dp {
                for r in 0..self.dr {
                    m.write(l, p * self.dr + r, self.get(l, p, r));
                }
            }
        }
        m
    }

    pub fn from_left_matrix(m: &Mat<C64>, dl: usize, dp: usize) -> Self {
        let dr = m.ncols();
        let mut t = Self::zeros(dl, dp, dr);
        for l in 0..dl {
            for p in 0..dp {
                for r in 0..dr {
                    t.set(l, p, r, m.read(l * dp + p, r));
                }
            }
        }
        t
    }

    pub fn from_right_matrix(m: &Mat<C64>, dp: usize, dr: usize) -> Self {
        let dl = m.nrows();
        let mut t = Self::zeros(dl, dp, dr);
        for l in 0..dl {
            for p in 0..dp {
                for r in 0..dr {
                    t.set(l, p, r, m.read(l, p * dr + r));
                }
            }
        }
        t
    }
}

/// MPO site tensor `W[wl, out, in, wr]`, row-major.
#[derive(Clone, Debug)]
pub struct Tensor4 {
    pub data: Vec<C64>,
    pub dl: usize,
    pub dout: usize,
    pub din: usize,
    pub dr: usize,
}

impl Tensor4 {
    pub fn zeros(dl: usize, dout: usize, din: usize, dr: usize) -> Self {
        Self {
            data: vec![ZERO; dl * dout * din * dr],
            dl,
            dout,
            din,
            dr,
        }
    }

    /// Bond-dimension-one identity on a `d`-dimensional site.
    pub fn identity(d: usize) -> Self {
        let mut w = Self::zeros(1, d, d, 1);
        for s in 0..d {
            w.set(0, s, s, 0, ONE);
        }
        w
    }

    #[inline]
    fn idx(&self, wl: usize, o: usize, i: usize, wr: usize) -> usize {
        ((wl * self.dout + o) * self.din + i) * self.dr + wr
    }

    #[inline]
    pub fn get(&self, wl: usize, o: usize, i: usize, wr: usize) -> C64 {
        self.data[self.idx(wl, o, i, wr)]
    }

    #[inline]
    pub fn set(&mut self, wl: usize, o: usize, i: usize, wr: usize, v: C64) {
        let k = self.idx(wl, o, i, wr);
        self.data[k] = v;
    }

    #[inline]
    pub fn add(&mut self, wl: usize, o: usize, i: usize, wr: usize, v: C64) {
        let k = self.idx(wl, o, i, wr);
        self.data[k] += v;
    }

    /// Block `(wl, wr)` is structurally zero.
    pub fn block_is_zero(&self, wl: usize, wr: usize) -> bool {
        for o in 0..self.dout {
            for i in 0..self.din {
                if self.get(wl, o, i, wr) != ZERO {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_matrix_roundtrip_preserves_layout() {
        let mut rng = ONDRng::new(b"tensor3");
        let t = Tensor3::random(2, 3, 4, &mut rng);
        let m = t.to_left_matrix();
        assert_eq!((m.nrows(), m.ncols()), (6, 4));
        assert_eq!(m.read(1 * 3 + 2, 3), t.get(1, 2, 3));

        let back = Tensor3::from_left_matrix(&m, 2, 3);
        assert_eq!(back.data, t.data);
    }

    #[test]
    fn right_matrix_layout() {
        let mut rng = ONDRng::new(b"tensor3r");
        let t = Tensor3::random(3, 2, 2, &mut rng);
        let m = t.to_right_matrix();
        assert_eq!(m.read(2, 1 * 2 + 0), t.get(2, 1, 0));
        let back = Tensor3::from_right_matrix(&m, 2, 2);
        assert_eq!(back.data, t.data);
    }

    #[test]
    fn identity_mpo_tensor() {
        let w = Tensor4::identity(3);
        assert_eq!(w.get(0, 1, 1, 0), ONE);
        assert_eq!(w.get(0, 1, 2, 0), ZERO);
        assert!(!w.block_is_zero(0, 0));
    }
}
