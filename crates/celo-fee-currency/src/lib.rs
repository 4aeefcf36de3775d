//! The multi-currency fee market of the Celo execution layer.
//!
//! Transactions may pay gas in an ERC-20 fee currency instead of the native token. This crate
//! holds everything around that: exchange rates and the per-block currency registry, the
//! transaction types carrying a fee currency and their fork-gated signer, the per-currency block
//! gas pools, fee settlement through the token contracts and the pending transaction pool.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod constants;
pub mod contracts;

mod block;
pub use block::*;

mod currency;
pub use currency::*;

mod engine;
pub use engine::*;

mod pool;
pub use pool::*;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

mod tx;
pub use tx::*;
