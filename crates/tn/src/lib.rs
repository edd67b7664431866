pub mod environment;
pub mod error;
pub mod lanczos;
pub mod mpo;
pub mod mps;
pub mod tensor;
pub mod truncation;

pub use error::{Result, TnError};
pub use mpo::MPO;
pub use mps::MPS;
pub use tensor::{C64, Tensor3, Tensor4};
pub use truncation::Truncation;
