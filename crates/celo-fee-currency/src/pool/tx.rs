use alloy_primitives::{Address, B256, U256};

use crate::{CeloTxEnvelope, FeeCurrency};

/// A transaction admitted to the pool, with its recovered sender.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Deref)]
pub struct PooledTx {
    #[deref]
    tx: CeloTxEnvelope,
    sender: Address,
    hash: B256,
    cost: U256,
    fee_currency: FeeCurrency,
}

impl PooledTx {
    /// Wraps `tx`, signed by `sender`.
    pub fn new(tx: CeloTxEnvelope, sender: Address) -> Self {
        let hash = tx.hash();
        let cost = tx.cost();
        let fee_currency = tx.fee_currency();
        Self { tx, sender, hash, cost, fee_currency }
    }

    /// The transaction.
    pub const fn tx(&self) -> &CeloTxEnvelope {
        &self.tx
    }

    /// The recovered sender.
    pub const fn sender(&self) -> Address {
        self.sender
    }

    /// The transaction hash.
    pub const fn hash(&self) -> B256 {
        self.hash
    }

    /// The cost charged to the sender's balance in [`fee_currency`](Self::fee_currency).
    pub const fn cost(&self) -> U256 {
        self.cost
    }

    /// The currency fees are paid in.
    pub const fn fee_currency(&self) -> FeeCurrency {
        self.fee_currency
    }

    /// Unwraps the transaction.
    pub fn into_tx(self) -> CeloTxEnvelope {
        self.tx
    }
}
