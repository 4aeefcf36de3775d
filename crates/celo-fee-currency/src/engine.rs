//! The narrow slice of the execution engine the fee currency subsystem calls into.

use alloy_primitives::{Address, Bytes, U256};
use auto_impl::auto_impl;

/// Result of a nested contract call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOutcome {
    /// Return data, or revert data if the call reverted.
    pub output: Bytes,
    /// Gas not consumed by the call.
    pub gas_left: u64,
    /// Whether the call reverted.
    pub reverted: bool,
}

impl CallOutcome {
    /// A successful call.
    pub const fn success(output: Bytes, gas_left: u64) -> Self {
        Self { output, gas_left, reverted: false }
    }

    /// A reverted call.
    pub const fn revert(output: Bytes, gas_left: u64) -> Self {
        Self { output, gas_left, reverted: true }
    }

    /// Returns `true` if the call did not revert.
    pub const fn is_success(&self) -> bool {
        !self.reverted
    }
}

/// Executes contract calls inside the state of the block currently being built or validated.
///
/// State-mutating calls must observe the effects of every prior call of the block and their own
/// effects become part of the enclosing transaction's state transition. All calls carry zero
/// value.
#[auto_impl(&mut, Box)]
pub trait ContractCaller {
    /// Engine-level failure (database errors, fatal interpreter errors). A revert is not an error,
    /// it is reported through [`CallOutcome::reverted`].
    type Error: core::error::Error + Send + Sync + 'static;

    /// Performs a state-mutating call from `caller` to `target`, bounded by `gas_limit`.
    fn call(
        &mut self,
        caller: Address,
        target: Address,
        input: Bytes,
        gas_limit: u64,
    ) -> Result<CallOutcome, Self::Error>;

    /// Performs a read-only call from `caller` to `target`, bounded by `gas_limit`.
    fn static_call(
        &mut self,
        caller: Address,
        target: Address,
        input: Bytes,
        gas_limit: u64,
    ) -> Result<CallOutcome, Self::Error>;

    /// Reads the raw native balance of `account`.
    fn native_balance(&mut self, account: Address) -> Result<U256, Self::Error>;
}
