use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

/// A term that cannot be placed on the configured lattice.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidTermError {
    #[error("term {term}: site {site} outside [1, {n}]")]
    SiteOutOfRange { term: usize, site: usize, n: usize },

    #[error("term {term}: operator '{name}' is not defined for local dimension {dim}")]
    UnknownOperator { term: usize, name: String, dim: usize },

    #[error("term {term} has no operators")]
    Empty { term: usize },

    #[error("term {term} has non-finite coefficient {coef}")]
    NonFiniteCoefficient { term: usize, coef: f64 },
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("chain length must be positive")]
    EmptyLattice,

    #[error("local dimension must be at least 2, got {0}")]
    InvalidSpinDim(usize),

    #[error("unknown model kind '{0}' (expected 'ising' or 'heisenberg')")]
    UnknownModel(String),

    #[error(transparent)]
    InvalidTerm(#[from] InvalidTermError),

    #[error(transparent)]
    Tensor(#[from] tn::TnError),
}
