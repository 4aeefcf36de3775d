use alloy_primitives::{Address, Bytes, U256};

use crate::{CreditLeg, FeeCurrency};

/// A block ran out of gas for the transactions of one currency.
///
/// The transaction that triggered it is skipped for this block. It stays valid and may be included
/// in a later block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GasPoolError {
    /// Not enough gas left in the currency's pool.
    #[error(
        "gas pool of {currency} exhausted: requested={requested} > available={available}"
    )]
    GasPoolExhausted {
        /// Currency of the exhausted pool
        currency: FeeCurrency,
        /// Gas requested
        requested: u64,
        /// Gas left in the pool
        available: u64,
    },
}

impl GasPoolError {
    /// The gas requested from the pool.
    pub const fn requested(&self) -> u64 {
        match self {
            Self::GasPoolExhausted { requested, .. } => *requested,
        }
    }

    /// The gas that was still available.
    pub const fn available(&self) -> u64 {
        match self {
            Self::GasPoolExhausted { available, .. } => *available,
        }
    }
}

/// A fee currency gas limit fraction outside `[0, 1]`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeeCurrencyLimitsError {
    /// The fraction of currencies without an override.
    #[error("default fee currency gas limit out of range: {0}")]
    Default(f64),
    /// The fraction of one currency.
    #[error("gas limit of fee currency {currency} out of range: {fraction}")]
    Override {
        /// The currency
        currency: Address,
        /// Its fraction
        fraction: f64,
    },
}

/// Why a call into a fee currency contract failed.
#[derive(Debug, thiserror::Error)]
pub enum CallFailure<E: core::error::Error + 'static> {
    /// The call reverted.
    #[error("reverted: {0}")]
    Reverted(Bytes),
    /// No gas was left in the budget to attempt the call.
    #[error("no gas left in the budget")]
    NoGasLeft,
    /// The call returned data that does not decode.
    #[error("malformed return data: {0}")]
    MalformedReturn(#[source] alloy_sol_types::Error),
    /// The engine failed.
    #[error("engine error: {0}")]
    Engine(#[source] E),
}

/// Failure of the fee settlement of a transaction.
///
/// A settlement error invalidates only the offending transaction. It is never retried.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError<E: core::error::Error + 'static> {
    /// The sender's fee could not be moved to the holding address.
    #[error("fee debit of {amount} in {currency} from {from} failed: {reason}")]
    FeeDebitFailed {
        /// The fee payer
        from: Address,
        /// Amount being debited
        amount: U256,
        /// Currency token
        currency: Address,
        /// What went wrong
        #[source]
        reason: CallFailure<E>,
    },

    /// A credit leg failed. Legs before it have already been applied.
    #[error("fee credit of the {leg} leg in {currency} failed: {reason}")]
    FeeCreditFailed {
        /// The leg that failed
        leg: CreditLeg,
        /// Currency token
        currency: Address,
        /// What went wrong
        #[source]
        reason: CallFailure<E>,
    },

    /// A balance could not be read.
    #[error("balance read of {account} in {currency} failed: {reason}")]
    BalanceReadFailed {
        /// The account whose balance was read
        account: Address,
        /// Currency the balance is denominated in
        currency: FeeCurrency,
        /// What went wrong
        #[source]
        reason: CallFailure<E>,
    },
}

impl<E: core::error::Error + 'static> SettlementError<E> {
    /// The credit leg that failed, if this is a credit failure.
    pub const fn failed_leg(&self) -> Option<CreditLeg> {
        match self {
            Self::FeeCreditFailed { leg, .. } => Some(*leg),
            _ => None,
        }
    }

    /// The underlying call failure.
    pub const fn reason(&self) -> &CallFailure<E> {
        match self {
            Self::FeeDebitFailed { reason, .. } |
            Self::FeeCreditFailed { reason, .. } |
            Self::BalanceReadFailed { reason, .. } => reason,
        }
    }
}
