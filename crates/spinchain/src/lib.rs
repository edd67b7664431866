pub mod builder;
pub mod error;
pub mod lattice;
pub mod models;
pub mod operators;
pub mod terms;

pub use builder::HamiltonianBuilder;
pub use error::{InvalidTermError, ModelError, Result};
pub use lattice::Lattice;
pub use models::ModelKind;
pub use terms::{Term, TermList};
