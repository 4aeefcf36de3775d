//! Currency-aware pending transaction pool.
//!
//! # Architecture
//!
//! - **[`CeloTxList`]**: the transactions of one account, sorted by nonce, with a ledger of the
//!   total cost committed in every fee currency.
//! - **[`compare_with_rates`]**: ranks transactions paying in different currencies by converting
//!   their tips or fee caps through the block's exchange rates.
//! - **[`TxPool`]**: the shared pool. It validates incoming transactions, re-filters every list
//!   when a new block is announced and hands out the best transactions for block building.
//!
//! Every transaction leaving a list, whichever way it leaves, goes through the list's ledger.

mod error;
mod list;
mod ordering;
mod tx;
mod txpool;

pub use error::*;
pub use list::*;
pub use ordering::*;
pub use tx::*;
pub use txpool::*;
