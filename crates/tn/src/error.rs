use thiserror::Error;

pub type Result<T> = std::result::Result<T, TnError>;

#[derive(Error, Debug)]
pub enum TnError {
    #[error("chain has no sites")]
    EmptyChain,

    #[error("site {site} out of range for chain of length {len}")]
    SiteOutOfRange { site: usize, len: usize },

    #[error("bond {bond} out of range for chain of length {len}")]
    BondOutOfRange { bond: usize, len: usize },

    #[error("dimension mismatch at site {site}: expected {expected}, got {got}")]
    DimensionMismatch {
        site: usize,
        expected: usize,
        got: usize,
    },

    #[error("chain lengths differ: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("state has zero norm")]
    ZeroNorm,

    #[error("non-finite values encountered in {context}")]
    NonFinite { context: &'static str },
}
