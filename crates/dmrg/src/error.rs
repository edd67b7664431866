use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DmrgError>;

/// Invalid run setup; always detected before any optimisation starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("chain length {0} is too short for two-site sweeps (need at least 2)")]
    ChainTooShort(usize),

    #[error("coupling step must be positive, got {0}")]
    NonPositiveStep(f64),

    #[error("empty coupling range [{min}, {max}]")]
    EmptyRange { min: f64, max: f64 },

    #[error("parameter '{0}' must be finite")]
    NonFinite(&'static str),

    #[error("number of states must be at least 1")]
    NoStates,

    #[error("initial bond dimension must be at least 1")]
    ZeroInitBondDim,

    #[error("sweep schedule has no sweeps")]
    EmptySchedule,

    #[error("sweep {sweep}: {reason}")]
    InvalidSweep { sweep: usize, reason: String },

    #[error("penalty weight must be positive and finite, got {0}")]
    InvalidPenaltyWeight(f64),

    #[error("overlap tolerance must be non-negative, got {0}")]
    InvalidOverlapTolerance(f64),

    #[error("MPO has {mpo} sites but the state has {state}")]
    LengthMismatch { mpo: usize, state: usize },
}

#[derive(Error, Debug)]
pub enum DmrgError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] spinchain::ModelError),

    #[error(transparent)]
    Tensor(#[from] tn::TnError),

    #[error("cannot write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("exact diagonalisation is limited to dimension {limit}, got {dim}")]
    ExactTooLarge { dim: usize, limit: usize },
}

impl From<spinchain::InvalidTermError> for DmrgError {
    fn from(err: spinchain::InvalidTermError) -> Self {
        DmrgError::Model(err.into())
    }
}
