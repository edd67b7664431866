use crate::error::{ModelError, Result};

/// One site of the chain, fixed local Hilbert-space dimension `d = 2S + 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Site {
    pub dim: usize,
}

impl Site {
    pub fn spin(&self) -> f64 {
        (self.dim as f64 - 1.0) / 2.0
    }
}

/// Ordered chain of sites. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lattice {
    sites: Vec<Site>,
}

impl Lattice {
    /// `n` identical spins of dimension `spin_dim`.
    pub fn spin_chain(n: usize, spin_dim: usize) -> Result<Self> {
        if n == 0 {
            return Err(ModelError::EmptyLattice);
        }
        if spin_dim < 2 {
            return Err(ModelError::InvalidSpinDim(spin_dim));
        }
        Ok(Self {
            sites: vec![Site { dim: spin_dim }; n],
        })
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn dims(&self) -> Vec<usize> {
        self.sites.iter().map(|s| s.dim).collect()
    }

    /// Site for a 1-based index.
    pub fn site(&self, index: usize) -> Option<&Site> {
        index.checked_sub(1).and_then(|i| self.sites.get(i))
    }
}
