use crate::environment::Env;
use crate::error::{Result, TnError};
use crate::mps::MPS;
use crate::tensor::{C64, Tensor4};

/// Matrix-product operator. Boundary tensors have outer bond dimension one.
#[derive(Clone, Debug)]
pub struct MPO {
    pub sites: Vec<Tensor4>,
}

impl MPO {
    pub fn new(sites: Vec<Tensor4>) -> Result<Self> {
        if sites.is_empty() {
            return Err(TnError::EmptyChain);
        }
        let n = sites.len();
        if sites[0].dl != 1 {
            return Err(TnError::DimensionMismatch { site: 0, expected: 1, got: sites[0].dl });
        }
        if sites[n - 1].dr != 1 {
            return Err(TnError::DimensionMismatch {
                site: n - 1,
                expected: 1,
                got: sites[n - 1].dr,
            });
        }
        for i in 0..n {
            let w = &sites[i];
            if w.dout != w.din {
                return Err(TnError::DimensionMismatch { site: i, expected: w.din, got: w.dout });
            }
            if i + 1 < n && w.dr != sites[i + 1].dl {
                return Err(TnError::DimensionMismatch {
                    site: i + 1,
                    expected: w.dr,
                    got: sites[i + 1].dl,
                });
            }
        }
        Ok(Self { sites })
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn site_dims(&self) -> Vec<usize> {
        self.sites.iter().map(|w| w.din).collect()
    }

    pub fn bond_dims(&self) -> Vec<usize> {
        self.sites.iter().take(self.len() - 1).map(|w| w.dr).collect()
    }

    pub fn max_bond_dim(&self) -> usize {
        self.bond_dims().into_iter().max().unwrap_or(1)
    }

    /// `⟨bra|H|ket⟩`.
    pub fn matrix_element(&self, bra: &MPS, ket: &MPS) -> Result<C64> {
        if bra.len() != self.len() || ket.len() != self.len() {
            return Err(TnError::LengthMismatch {
                left: self.len(),
                right: bra.len().min(ket.len()),
            });
        }
        let mut env = Env::trivial();
        for (i, w) in self.sites.iter().enumerate() {
            let (b, k) = (&bra.sites[i], &ket.sites[i]);
            if b.dp != w.dout || k.dp != w.din {
                return Err(TnError::DimensionMismatch { site: i, expected: w.din, got: k.dp });
            }
            env = env.extend_left(b, w, k);
        }
        Ok(env.scalar())
    }
}
