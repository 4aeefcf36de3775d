use alloy_primitives::{Address, U256};

use crate::FeeCurrency;

/// Errors of exchange-rate lookups, conversions and comparisons.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeeCurrencyError {
    /// The currency has no exchange rate in the current registry snapshot.
    #[error("fee currency not whitelisted: {currency}")]
    CurrencyNotWhitelisted {
        /// The offending currency.
        currency: Address,
    },

    /// An exchange rate with a zero numerator or denominator.
    #[error("invalid exchange rate {numerator}/{denominator}")]
    InvalidExchangeRate {
        /// Rate numerator
        numerator: U256,
        /// Rate denominator
        denominator: U256,
    },

    /// A converted amount does not fit in 256 bits.
    #[error("converted value overflows: {amount} from {from} to {to}")]
    ValueOverflow {
        /// The amount being converted
        amount: U256,
        /// Source currency
        from: FeeCurrency,
        /// Target currency
        to: FeeCurrency,
    },
}

impl FeeCurrencyError {
    /// Returns `true` if the error is caused by a currency missing from the registry.
    pub const fn is_not_whitelisted(&self) -> bool {
        matches!(self, Self::CurrencyNotWhitelisted { .. })
    }
}
