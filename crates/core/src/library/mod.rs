//! Media catalog model and its persisted representations.

mod fidelity;
mod types;

pub use fidelity::*;
pub use types::*;
