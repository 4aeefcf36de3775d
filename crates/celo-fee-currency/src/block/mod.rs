//! Block-level fee currency handling.
//!
//! # Architecture
//!
//! Two pieces take part in building and executing a block:
//!
//! 1. **[`MultiGasPool`]**: splits the block gas limit into one pool per fee currency so that a
//!    single currency cannot fill the whole block.
//! 2. **Settlement** ([`debit`], [`credit`], [`balance_of`]): charges and pays out the fees of a
//!    transaction through its fee currency's token contract.
//!
//! Both are driven by [`CeloChainConfig`], which also carries the hardfork schedule used by the
//! transaction signer.
//!
//! Blocks from before Gingerbread are still readable through [`HistoricalHeader`] and
//! [`HistoricalBody`].

mod gas_pool;
mod hardfork;
mod historical;
mod result;
mod settlement;

pub use gas_pool::*;
pub use hardfork::*;
pub use historical::*;
pub use result::*;
pub use settlement::*;
