use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};

use crate::{constants::INTRINSIC_GAS_FOR_ALTERNATIVE_FEE_CURRENCY, ExchangeRate, FeeCurrency};

/// Exchange rates of all whitelisted fee currencies. A currency missing from the map is not
/// whitelisted.
pub type ExchangeRates = BTreeMap<Address, ExchangeRate>;

/// Intrinsic gas surcharge of every whitelisted fee currency.
pub type IntrinsicGasCosts = BTreeMap<Address, u64>;

/// The per-block fee currency configuration: exchange rates and intrinsic gas surcharges.
///
/// A context is built once per block from contract state and never mutated afterwards; share it
/// through an [`Arc`](std::sync::Arc), see [`CurrencyRegistry`](crate::CurrencyRegistry).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeCurrencyContext {
    /// Exchange rate per whitelisted currency.
    pub exchange_rates: ExchangeRates,
    /// Intrinsic gas surcharge per whitelisted currency.
    pub intrinsic_gas_costs: IntrinsicGasCosts,
}

impl FeeCurrencyContext {
    /// Creates a context from its two maps.
    pub const fn new(
        exchange_rates: ExchangeRates,
        intrinsic_gas_costs: IntrinsicGasCosts,
    ) -> Self {
        Self { exchange_rates, intrinsic_gas_costs }
    }

    /// Whitelists `currency` with the given rate and intrinsic gas surcharge.
    pub fn with_currency(
        mut self,
        currency: Address,
        rate: ExchangeRate,
        intrinsic_gas: u64,
    ) -> Self {
        self.exchange_rates.insert(currency, rate);
        self.intrinsic_gas_costs.insert(currency, intrinsic_gas);
        self
    }

    /// Whitelists `currency` with the default intrinsic gas surcharge.
    pub fn with_rate(self, currency: Address, numerator: u64, denominator: u64) -> Self {
        match ExchangeRate::new(U256::from(numerator), U256::from(denominator)) {
            Ok(rate) => {
                self.with_currency(currency, rate, INTRINSIC_GAS_FOR_ALTERNATIVE_FEE_CURRENCY)
            }
            Err(_) => self,
        }
    }

    /// Returns `true` if fees may be paid in `currency`. Native is always whitelisted.
    pub fn is_whitelisted(&self, currency: FeeCurrency) -> bool {
        crate::is_whitelisted(currency, &self.exchange_rates)
    }

    /// The whitelisted currencies, in address order.
    pub fn whitelist(&self) -> impl Iterator<Item = Address> + '_ {
        self.exchange_rates.keys().copied()
    }

    /// The intrinsic gas surcharge of `currency`: zero for native, `None` if not whitelisted.
    pub fn currency_intrinsic_gas_cost(&self, currency: FeeCurrency) -> Option<u64> {
        match currency.address() {
            None => Some(0),
            Some(address) => self.intrinsic_gas_costs.get(&address).copied(),
        }
    }

    /// The gas a currency's token contract may burn while debiting and crediting fees. It allows
    /// the contract to overshoot the charged surcharge up to three times.
    pub fn max_allowed_intrinsic_gas_cost(&self, currency: FeeCurrency) -> Option<u64> {
        self.currency_intrinsic_gas_cost(currency).map(|gas| gas.saturating_mul(3))
    }
}
