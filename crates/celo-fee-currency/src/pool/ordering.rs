//! Price ordering of transactions paying in different currencies.

use core::cmp::Ordering;
use std::collections::HashMap;

use alloy_primitives::U256;
use parking_lot::Mutex;
use tracing::trace;

use crate::{compare, convert, CeloTxEnvelope, ExchangeRates, FeeCurrency, FeeCurrencyError};

/// Exchange rates and base fee of the block transactions are ordered for.
///
/// The base fee in each fee currency is derived from the native base fee on first use and
/// memoized.
#[derive(Debug, Default)]
pub struct RatesAndFees {
    rates: ExchangeRates,
    native_base_fee: Option<U256>,
    currency_base_fees: Mutex<HashMap<FeeCurrency, U256>>,
}

impl RatesAndFees {
    /// Creates the ordering context of a block. `native_base_fee` is `None` before London.
    pub fn new(rates: ExchangeRates, native_base_fee: Option<U256>) -> Self {
        Self { rates, native_base_fee, currency_base_fees: Mutex::default() }
    }

    /// The exchange rates.
    pub const fn rates(&self) -> &ExchangeRates {
        &self.rates
    }

    /// Returns `true` if the block has a base fee.
    pub const fn has_base_fee(&self) -> bool {
        self.native_base_fee.is_some()
    }

    /// The native base fee.
    pub const fn native_base_fee(&self) -> Option<U256> {
        self.native_base_fee
    }

    /// The base fee denominated in `currency`, `None` if the block has no base fee.
    pub fn base_fee_in(&self, currency: FeeCurrency) -> Result<Option<U256>, FeeCurrencyError> {
        let Some(native) = self.native_base_fee else { return Ok(None) };
        if currency.is_native() {
            return Ok(Some(native));
        }

        let mut memo = self.currency_base_fees.lock();
        if let Some(base_fee) = memo.get(&currency) {
            return Ok(Some(*base_fee));
        }
        let base_fee = convert(native, FeeCurrency::NATIVE, currency, &self.rates)?;
        memo.insert(currency, base_fee);
        Ok(Some(base_fee))
    }
}

/// Compares the prices of `a` and `b` in native value. [`Ordering::Greater`] means `a` pays more.
///
/// - Without rates, fee caps and then tip caps are compared nominally.
/// - With a base fee, the effective tips are compared. A fee cap below the base fee counts as a
///   zero tip.
/// - Without a base fee, fee caps are compared, then tip caps.
///
/// When a currency is not whitelisted the comparison falls back to the nominal one.
pub fn compare_with_rates(
    a: &CeloTxEnvelope,
    b: &CeloTxEnvelope,
    rates_and_fees: Option<&RatesAndFees>,
) -> Ordering {
    let Some(rates_and_fees) = rates_and_fees else {
        return compare_nominal(a, b);
    };
    compare_by_value(a, b, rates_and_fees).unwrap_or_else(|err| {
        trace!(%err, "Comparing transactions nominally");
        compare_nominal(a, b)
    })
}

fn compare_by_value(
    a: &CeloTxEnvelope,
    b: &CeloTxEnvelope,
    rates_and_fees: &RatesAndFees,
) -> Result<Ordering, FeeCurrencyError> {
    let rates = rates_and_fees.rates();
    let (currency_a, currency_b) = (a.fee_currency(), b.fee_currency());

    if let (Some(base_fee_a), Some(base_fee_b)) =
        (rates_and_fees.base_fee_in(currency_a)?, rates_and_fees.base_fee_in(currency_b)?)
    {
        let tip_a = a.effective_gas_tip(base_fee_a).unwrap_or_default();
        let tip_b = b.effective_gas_tip(base_fee_b).unwrap_or_default();
        return compare(tip_a, currency_a, tip_b, currency_b, rates);
    }

    let fee_caps = compare(
        U256::from(a.max_fee_per_gas()),
        currency_a,
        U256::from(b.max_fee_per_gas()),
        currency_b,
        rates,
    )?;
    if fee_caps.is_ne() {
        return Ok(fee_caps);
    }
    compare(
        U256::from(a.max_priority_fee_per_gas()),
        currency_a,
        U256::from(b.max_priority_fee_per_gas()),
        currency_b,
        rates,
    )
}

fn compare_nominal(a: &CeloTxEnvelope, b: &CeloTxEnvelope) -> Ordering {
    a.max_fee_per_gas()
        .cmp(&b.max_fee_per_gas())
        .then_with(|| a.max_priority_fee_per_gas().cmp(&b.max_priority_fee_per_gas()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_utils::{cip64_tx, native_tx, TestSigner},
        ExchangeRate,
    };
    use alloy_primitives::{address, Address};
    use rstest::rstest;

    const X: Address = address!("0x765DE816845861e75A25fCA122bb6898B8B1282a");
    const UNKNOWN: Address = address!("0x00000000000000000000000000000000000000aa");

    fn rates() -> ExchangeRates {
        // 2 native per X.
        ExchangeRates::from([(X, ExchangeRate::new(U256::from(2), U256::from(1)).unwrap())])
    }

    #[test]
    fn test_converted_fee_cap_outranks_native() {
        let signer = TestSigner::new(1);
        let native = signer.sign(native_tx(0, 21_000, 50, 2));
        let in_x = signer.sign(cip64_tx(0, 21_000, 100, 2, Some(X)));

        let context = RatesAndFees::new(rates(), None);
        assert_eq!(compare_with_rates(&in_x, &native, Some(&context)), Ordering::Greater);
        assert_eq!(compare_with_rates(&native, &in_x, Some(&context)), Ordering::Less);
    }

    #[rstest]
    // Effective tips 2 (native) and 1 X = 2 native.
    #[case::equal_value(60, 2, 10, 1, Ordering::Equal)]
    // Effective tips 2 (native) and 2 X = 4 native.
    #[case::higher_value(60, 2, 10, 2, Ordering::Less)]
    // Fee cap 4 X is below the base fee of 5 X: zero tip.
    #[case::underpriced(60, 2, 4, 4, Ordering::Greater)]
    fn test_effective_tip_ordering(
        #[case] native_fee_cap: u128,
        #[case] native_tip_cap: u128,
        #[case] x_fee_cap: u128,
        #[case] x_tip_cap: u128,
        #[case] expected: Ordering,
    ) {
        let signer = TestSigner::new(1);
        let native = signer.sign(native_tx(0, 21_000, native_fee_cap, native_tip_cap));
        let in_x = signer.sign(cip64_tx(0, 21_000, x_fee_cap, x_tip_cap, Some(X)));

        // A native base fee of 10 is 5 X.
        let context = RatesAndFees::new(rates(), Some(U256::from(10)));
        assert_eq!(compare_with_rates(&native, &in_x, Some(&context)), expected);
    }

    #[test]
    fn test_base_fee_in_currency_is_memoized() {
        let context = RatesAndFees::new(rates(), Some(U256::from(11)));
        assert_eq!(context.base_fee_in(FeeCurrency::NATIVE), Ok(Some(U256::from(11))));
        // 11 native is 5.5 X, truncated.
        assert_eq!(context.base_fee_in(FeeCurrency::token(X)), Ok(Some(U256::from(5))));
        assert_eq!(context.currency_base_fees.lock().len(), 1);
        assert!(context.base_fee_in(FeeCurrency::token(UNKNOWN)).is_err());
    }

    #[test]
    fn test_unregistered_currency_compares_nominally() {
        let signer = TestSigner::new(1);
        let native = signer.sign(native_tx(0, 21_000, 50, 2));
        let unknown = signer.sign(cip64_tx(0, 21_000, 40, 2, Some(UNKNOWN)));

        let context = RatesAndFees::new(rates(), None);
        assert_eq!(compare_with_rates(&native, &unknown, Some(&context)), Ordering::Greater);
    }

    #[test]
    fn test_without_rates_compares_nominally() {
        let signer = TestSigner::new(1);
        let a = signer.sign(native_tx(0, 21_000, 50, 3));
        let b = signer.sign(cip64_tx(0, 21_000, 50, 2, Some(X)));
        assert_eq!(compare_with_rates(&a, &b, None), Ordering::Greater);
    }
}
