use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::terms::TermList;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Ising,
    Heisenberg,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Ising => "ising",
            ModelKind::Heisenberg => "heisenberg",
        }
    }

    /// Term list at coupling `j`; `h` is ignored for Heisenberg.
    pub fn terms(&self, n: usize, j: f64, h: f64) -> TermList {
        match self {
            ModelKind::Ising => ising(n, j, h),
            ModelKind::Heisenberg => heisenberg(n, j),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ising" => Ok(ModelKind::Ising),
            "heisenberg" => Ok(ModelKind::Heisenberg),
            other => Err(ModelError::UnknownModel(other.to_string())),
        }
    }
}

/// Transverse-field Ising: `H = -J Σ Sz_i Sz_{i+1} - h Σ Sx_i`.
pub fn ising(n: usize, j: f64, h: f64) -> TermList {
    let mut terms = TermList::new();
    for i in 1..n {
        terms.two_site(-j, "Sz", i, "Sz", i + 1);
    }
    for i in 1..=n {
        terms.one_site(-h, "Sx", i);
    }
    terms
}

/// Isotropic Heisenberg: `H = -J Σ S_i · S_{i+1}`.
pub fn heisenberg(n: usize, j: f64) -> TermList {
    xyz(n, j, j, j)
}

/// Anisotropic XYZ chain `H = -Σ (jx SxSx + jy SySy + jz SzSz)`.
pub fn xyz(n: usize, jx: f64, jy: f64, jz: f64) -> TermList {
    let mut terms = TermList::new();
    for i in 1..n {
        terms.two_site(-jx, "Sx", i, "Sx", i + 1);
        terms.two_site(-jy, "Sy", i, "Sy", i + 1);
        terms.two_site(-jz, "Sz", i, "Sz", i + 1);
    }
    terms
}
