use tn::tensor::{C64, ONE, ZERO};

/// Dense `d × d` local operator, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalOp {
    pub dim: usize,
    pub data: Vec<C64>,
}

impl LocalOp {
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            data: vec![ZERO; dim * dim],
        }
    }

    pub fn identity(dim: usize) -> Self {
        let mut op = Self::zeros(dim);
        for i in 0..dim {
            op.set(i, i, ONE);
        }
        op
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> C64 {
        self.data[row * self.dim + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, v: C64) {
        self.data[row * self.dim + col] = v;
    }

    /// `self · other`.
    pub fn compose(&self, other: &LocalOp) -> LocalOp {
        let d = self.dim;
        let mut out = LocalOp::zeros(d);
        for i in 0..d {
            for k in 0..d {
                let a = self.get(i, k);
                if a == ZERO {
                    continue;
                }
                for j in 0..d {
                    out.data[i * d + j] += a * other.get(k, j);
                }
            }
        }
        out
    }

    pub fn scaled(&self, c: C64) -> LocalOp {
        LocalOp {
            dim: self.dim,
            data: self.data.iter().map(|v| v * c).collect(),
        }
    }

    pub fn is_hermitian(&self, tol: f64) -> bool {
        for i in 0..self.dim {
            for j in 0..self.dim {
                if (self.get(i, j) - self.get(j, i).conj()).norm() > tol {
                    return false;
                }
            }
        }
        true
    }
}

// Basis index k carries magnetisation m = S - k.
fn magnetization(dim: usize, k: usize) -> f64 {
    (dim as f64 - 1.0) / 2.0 - k as f64
}

pub fn sz(dim: usize) -> LocalOp {
    let mut op = LocalOp::zeros(dim);
    for k in 0..dim {
        op.set(k, k, C64::new(magnetization(dim, k), 0.0));
    }
    op
}

/// Raising operator `S+|m⟩ = √(S(S+1) - m(m+1)) |m+1⟩`.
pub fn s_plus(dim: usize) -> LocalOp {
    let s = (dim as f64 - 1.0) / 2.0;
    let mut op = LocalOp::zeros(dim);
    for k in 1..dim {
        let m = magnetization(dim, k);
        op.set(k - 1, k, C64::new((s * (s + 1.0) - m * (m + 1.0)).sqrt(), 0.0));
    }
    op
}

pub fn s_minus(dim: usize) -> LocalOp {
    let p = s_plus(dim);
    let mut op = LocalOp::zeros(dim);
    for i in 0..dim {
        for j in 0..dim {
            op.set(i, j, p.get(j, i).conj());
        }
    }
    op
}

pub fn sx(dim: usize) -> LocalOp {
    let (p, m) = (s_plus(dim), s_minus(dim));
    let mut op = LocalOp::zeros(dim);
    for i in 0..dim * dim {
        op.data[i] = (p.data[i] + m.data[i]) * 0.5;
    }
    op
}

/// `Sy = (S+ - S-) / 2i`, intrinsically complex.
pub fn sy(dim: usize) -> LocalOp {
    let (p, m) = (s_plus(dim), s_minus(dim));
    let mut op = LocalOp::zeros(dim);
    for i in 0..dim * dim {
        op.data[i] = (p.data[i] - m.data[i]) * C64::new(0.0, -0.5);
    }
    op
}

pub fn pauli_x() -> LocalOp {
    sx(2).scaled(C64::new(2.0, 0.0))
}

pub fn pauli_y() -> LocalOp {
    sy(2).scaled(C64::new(2.0, 0.0))
}

pub fn pauli_z() -> LocalOp {
    sz(2).scaled(C64::new(2.0, 0.0))
}

/// Operator by name for local dimension `dim`; `None` if the name is unknown.
pub fn by_name(name: &str, dim: usize) -> Option<LocalOp> {
    match name {
        "Id" | "I" => Some(LocalOp::identity(dim)),
        "Sz" => Some(sz(dim)),
        "Sx" => Some(sx(dim)),
        "Sy" => Some(sy(dim)),
        "S+" | "Sp" => Some(s_plus(dim)),
        "S-" | "Sm" => Some(s_minus(dim)),
        "X" if dim == 2 => Some(pauli_x()),
        "Y" if dim == 2 => Some(pauli_y()),
        "Z" if dim == 2 => Some(pauli_z()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commutator(a: &LocalOp, b: &LocalOp) -> LocalOp {
        let ab = a.compose(b);
        let ba = b.compose(a);
        LocalOp {
            dim: a.dim,
            data: ab.data.iter().zip(&ba.data).map(|(x, y)| x - y).collect(),
        }
    }

    fn close(a: &LocalOp, b: &LocalOp) -> bool {
        a.data.iter().zip(&b.data).all(|(x, y)| (x - y).norm() < 1e-12)
    }

    #[test]
    fn spin_algebra_holds_for_several_spins() {
        for dim in 2..=5 {
            let (x, y, z) = (sx(dim), sy(dim), sz(dim));
            let i = C64::new(0.0, 1.0);
            assert!(close(&commutator(&x, &y), &z.scaled(i)), "[Sx,Sy] != iSz, d = {}", dim);
            assert!(close(&commutator(&y, &z), &x.scaled(i)), "[Sy,Sz] != iSx, d = {}", dim);
            assert!(x.is_hermitian(1e-14) && y.is_hermitian(1e-14) && z.is_hermitian(1e-14));

            let s = (dim as f64 - 1.0) / 2.0;
            let casimir = x.compose(&x);
            let yy = y.compose(&y);
            let zz = z.compose(&z);
            for k in 0..dim {
                let v = casimir.get(k, k) + yy.get(k, k) + zz.get(k, k);
                assert!((v.re - s * (s + 1.0)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn sy_is_complex_for_spin_half() {
        let y = sy(2);
        assert_eq!(y.get(0, 1), C64::new(0.0, -0.5));
        assert_eq!(y.get(1, 0), C64::new(0.0, 0.5));
    }

    #[test]
    fn pauli_names_only_for_qubits() {
        assert!(by_name("Z", 2).is_some());
        assert!(by_name("Z", 3).is_none());
        assert!(by_name("Sz", 3).is_some());
        assert!(by_name("Sq", 2).is_none());
        assert_eq!(by_name("Z", 2).unwrap().get(1, 1), C64::new(-1.0, 0.0));
    }
}
