//! Test utilities for the fee currency subsystem.

mod engine;
mod signer;

pub use engine::*;
pub use signer::*;
