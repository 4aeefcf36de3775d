use alloy_primitives::{Address, B256, U256};

use crate::{FeeCurrency, SignerError};

/// Reasons a transaction is not admitted to the pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The transaction is already pooled.
    #[error("transaction {0} already known")]
    AlreadyKnown(B256),

    /// The signature or chain id is invalid, or the transaction type is not accepted.
    #[error(transparent)]
    Signer(#[from] SignerError),

    /// The fee currency has no exchange rate in the current block.
    #[error("fee currency not whitelisted: {currency}")]
    CurrencyNotWhitelisted {
        /// The fee currency
        currency: Address,
    },

    /// The transaction can never fit in a block.
    #[error("gas limit {gas_limit} exceeds the block gas limit {block_gas_limit}")]
    GasLimitExceeded {
        /// The transaction's gas limit
        gas_limit: u64,
        /// The block gas limit
        block_gas_limit: u64,
    },

    /// The gas limit does not cover the intrinsic gas, including the fee currency surcharge.
    #[error("intrinsic gas too low: have {gas_limit}, want {intrinsic_gas}")]
    IntrinsicGasTooLow {
        /// The transaction's gas limit
        gas_limit: u64,
        /// Intrinsic gas of the transaction
        intrinsic_gas: u64,
    },

    /// The sender cannot pay for all its pooled transactions in this currency.
    #[error("insufficient balance of {account} in {currency}: have {balance}, want {cost}")]
    InsufficientBalance {
        /// The sender
        account: Address,
        /// The fee currency
        currency: FeeCurrency,
        /// The sender's balance
        balance: U256,
        /// Total cost committed in the currency, including this transaction
        cost: U256,
    },

    /// A transaction with the same nonce is pooled and this one does not pay enough more.
    #[error("replacement transaction underpriced at nonce {nonce}")]
    ReplacementUnderpriced {
        /// The contested nonce
        nonce: u64,
    },

    /// The sender already has the maximum number of pooled transactions.
    #[error("account {account} has no free slots")]
    AccountSlotsFull {
        /// The sender
        account: Address,
    },

    /// The sender's balance could not be read.
    #[error("failed to read the balance of {account} in {currency}: {source}")]
    BalanceReadFailed {
        /// The sender
        account: Address,
        /// The fee currency
        currency: FeeCurrency,
        /// The reader's error
        #[source]
        source: Box<dyn core::error::Error + Send + Sync>,
    },
}

impl PoolError {
    /// Returns `true` if the transaction can become valid without being re-signed, e.g. once the
    /// sender's balance grows.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. } |
                Self::AccountSlotsFull { .. } |
                Self::BalanceReadFailed { .. } |
                Self::CurrencyNotWhitelisted { .. }
        )
    }
}
