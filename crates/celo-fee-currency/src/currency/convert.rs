//! Conversion and comparison of amounts across fee currencies.

use core::cmp::Ordering;

use alloy_primitives::U256;

use crate::{ExchangeRate, ExchangeRates, FeeCurrency, FeeCurrencyError};

/// Returns `true` if fees may be paid in `currency`. Native is always whitelisted.
pub fn is_whitelisted(currency: FeeCurrency, rates: &ExchangeRates) -> bool {
    currency.address().is_none_or(|address| rates.contains_key(&address))
}

/// Looks up the rate of `currency`; native has the unit rate.
pub fn exchange_rate(
    currency: FeeCurrency,
    rates: &ExchangeRates,
) -> Result<ExchangeRate, FeeCurrencyError> {
    match currency.address() {
        None => Ok(ExchangeRate::UNIT),
        Some(address) => rates
            .get(&address)
            .copied()
            .ok_or(FeeCurrencyError::CurrencyNotWhitelisted { currency: address }),
    }
}

/// Converts `amount` from one currency into another, truncating toward zero.
///
/// Converting between identical currencies is the identity and never fails, even for currencies
/// missing from `rates`.
pub fn convert(
    amount: U256,
    from: FeeCurrency,
    to: FeeCurrency,
    rates: &ExchangeRates,
) -> Result<U256, FeeCurrencyError> {
    if from == to {
        return Ok(amount);
    }
    let from_rate = exchange_rate(from, rates)?;
    let to_rate = exchange_rate(to, rates)?;
    from_rate.convert(amount, &to_rate).ok_or(FeeCurrencyError::ValueOverflow { amount, from, to })
}

/// Compares `amount1` in `currency1` with `amount2` in `currency2` by their native value.
pub fn compare(
    amount1: U256,
    currency1: FeeCurrency,
    amount2: U256,
    currency2: FeeCurrency,
    rates: &ExchangeRates,
) -> Result<Ordering, FeeCurrencyError> {
    if currency1 == currency2 {
        return Ok(amount1.cmp(&amount2));
    }
    let rate1 = exchange_rate(currency1, rates)?;
    let rate2 = exchange_rate(currency2, rates)?;
    Ok(rate1.compare(amount1, &rate2, amount2))
}
