//! Building the per-block [`FeeCurrencyContext`] from contract state and publishing it.
//!
//! The context is assembled in three steps: the whitelist contract lists the allowed currencies,
//! the price oracle reports one median rate per currency, and the fee currency directory reports
//! each currency's intrinsic gas surcharge. A currency whose rate cannot be read (the call fails,
//! reverts or reports a zero part) is left out of the context, so it counts as not whitelisted
//! for the whole block. A failing directory lookup only falls back to the default surcharge.
//!
//! Once built, a context is published through [`CurrencyRegistry`]. Readers take an
//! [`Arc`] snapshot and never observe a partially built context.

use std::sync::Arc;

use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{
    constants::{INTRINSIC_GAS_FOR_ALTERNATIVE_FEE_CURRENCY, MAX_GAS_FOR_REGISTRY_CALL},
    contracts::{IFeeCurrencyDirectory, IFeeCurrencyWhitelist, ISortedOracles},
    ContractCaller, ExchangeRate, FeeCurrencyContext,
};

/// Addresses of the contracts the registry is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RegistryContracts {
    /// Contract listing the whitelisted fee currencies.
    pub whitelist: Address,
    /// Price oracle reporting median rates.
    pub oracle: Address,
    /// Fee currency directory reporting intrinsic gas surcharges.
    pub directory: Address,
}

/// Failure to read the list of whitelisted currencies. Without it no context can be built.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError<E: core::error::Error + 'static> {
    /// The whitelist call reverted.
    #[error("whitelist query reverted")]
    WhitelistReverted,
    /// The whitelist call returned data that is not an address array.
    #[error("whitelist query returned malformed data: {0}")]
    MalformedWhitelist(#[source] alloy_sol_types::Error),
    /// The engine failed while executing the whitelist call.
    #[error("engine error while querying the whitelist: {0}")]
    Engine(#[source] E),
}

/// Why a single currency was left out of the context.
#[derive(Debug, thiserror::Error)]
enum SkipReason<E: core::error::Error + 'static> {
    #[error("rate query reverted")]
    Reverted,
    #[error("malformed rate: {0}")]
    Malformed(#[source] alloy_sol_types::Error),
    #[error("{0}")]
    InvalidRate(#[source] crate::FeeCurrencyError),
    #[error("engine error: {0}")]
    Engine(#[source] E),
}

/// Reads the whitelist, rates and intrinsic gas surcharges from contract state.
pub fn build_fee_currency_context<C: ContractCaller>(
    caller: &mut C,
    contracts: &RegistryContracts,
) -> Result<FeeCurrencyContext, RegistryError<C::Error>> {
    let input = IFeeCurrencyWhitelist::getWhitelistCall {}.abi_encode();
    let outcome = caller
        .static_call(Address::ZERO, contracts.whitelist, input.into(), MAX_GAS_FOR_REGISTRY_CALL)
        .map_err(RegistryError::Engine)?;
    if !outcome.is_success() {
        return Err(RegistryError::WhitelistReverted);
    }
    let whitelist = IFeeCurrencyWhitelist::getWhitelistCall::abi_decode_returns(&outcome.output)
        .map_err(RegistryError::MalformedWhitelist)?;

    let mut context = FeeCurrencyContext::default();
    for token in whitelist {
        let rate = match query_rate(caller, contracts.oracle, token) {
            Ok(rate) => rate,
            Err(reason) => {
                warn!(%token, %reason, "Skipping fee currency without a usable exchange rate");
                continue;
            }
        };
        let intrinsic_gas = query_intrinsic_gas(caller, contracts.directory, token);
        debug!(%token, ?rate, intrinsic_gas, "Registered fee currency");
        context = context.with_currency(token, rate, intrinsic_gas);
    }
    Ok(context)
}

fn query_rate<C: ContractCaller>(
    caller: &mut C,
    oracle: Address,
    token: Address,
) -> Result<ExchangeRate, SkipReason<C::Error>> {
    let input = ISortedOracles::medianRateCall { token }.abi_encode();
    let outcome = caller
        .static_call(Address::ZERO, oracle, input.into(), MAX_GAS_FOR_REGISTRY_CALL)
        .map_err(SkipReason::Engine)?;
    if !outcome.is_success() {
        return Err(SkipReason::Reverted);
    }
    let quote = ISortedOracles::medianRateCall::abi_decode_returns(&outcome.output)
        .map_err(SkipReason::Malformed)?;
    // The oracle quotes currency units per native unit.
    ExchangeRate::from_inverse(quote.numerator, quote.denominator).map_err(SkipReason::InvalidRate)
}

fn query_intrinsic_gas<C: ContractCaller>(
    caller: &mut C,
    directory: Address,
    token: Address,
) -> u64 {
    let input = IFeeCurrencyDirectory::getCurrencyConfigCall { token }.abi_encode();
    let configured = caller
        .static_call(Address::ZERO, directory, input.into(), MAX_GAS_FOR_REGISTRY_CALL)
        .ok()
        .filter(|outcome| outcome.is_success())
        .and_then(|outcome| {
            IFeeCurrencyDirectory::getCurrencyConfigCall::abi_decode_returns(&outcome.output).ok()
        })
        .map(|config| config.intrinsicGas)
        .filter(|gas| !gas.is_zero())
        .and_then(|gas| u64::try_from(gas).ok());

    configured.unwrap_or_else(|| {
        debug!(%token, "No intrinsic gas configured, using the default");
        INTRINSIC_GAS_FOR_ALTERNATIVE_FEE_CURRENCY
    })
}

/// Publishes the fee currency context of the current block.
///
/// A new context replaces the previous one in a single step once it has been fully built.
/// Consumers hold on to the [`Arc`] they obtained for the whole block.
#[derive(Debug, Default)]
pub struct CurrencyRegistry {
    current: RwLock<Arc<FeeCurrencyContext>>,
}

impl CurrencyRegistry {
    /// Creates a registry publishing `context`.
    pub fn new(context: FeeCurrencyContext) -> Self {
        Self { current: RwLock::new(Arc::new(context)) }
    }

    /// The context of the current block.
    pub fn snapshot(&self) -> Arc<FeeCurrencyContext> {
        self.current.read().clone()
    }

    /// Replaces the current context and returns the published snapshot.
    pub fn publish(&self, context: FeeCurrencyContext) -> Arc<FeeCurrencyContext> {
        let context = Arc::new(context);
        *self.current.write() = context.clone();
        context
    }

    /// Rebuilds the context from contract state and publishes it. On failure the previous context
    /// stays in place.
    pub fn refresh<C: ContractCaller>(
        &self,
        caller: &mut C,
        contracts: &RegistryContracts,
    ) -> Result<Arc<FeeCurrencyContext>, RegistryError<C::Error>> {
        let context = build_fee_currency_context(caller, contracts)?;
        Ok(self.publish(context))
    }
}
