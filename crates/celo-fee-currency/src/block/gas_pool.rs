//! Per-currency block gas accounting.
//!
//! A block reserves a share of its gas limit for each fee currency so that transactions paying in
//! one currency cannot crowd out the others. [`MultiGasPool`] holds one [`GasPool`] per currency:
//!
//! - The native currency draws from a pool sized to the full block gas limit.
//! - A currency with an explicit fraction in [`FeeCurrencyLimits::overrides`] gets a pool of
//!   `floor(block_gas_limit * fraction)`, created when the multi-pool is built.
//! - Any other currency gets a pool of `floor(block_gas_limit * default)` the first time it is
//!   asked for. The pool is cached, so later calls return the same pool.
//!
//! Pools are independent. Exhausting one currency's pool does not affect the inclusion of
//! transactions paying in another currency.
//!
//! # Block Building Workflow
//!
//! ```rust,ignore
//! let mut pools = MultiGasPool::new(header.gas_limit, &chain_config.fee_currency_limits);
//! for tx in candidates {
//!     let pool = pools.pool_for(tx.fee_currency());
//!     if !pool.has_gas(tx.gas_limit()) {
//!         continue; // skip, try the next transaction
//!     }
//!     let outcome = execute(tx)?;
//!     pools.pool_for(tx.fee_currency()).sub_gas(outcome.gas_used)?;
//! }
//! ```

use std::collections::{BTreeMap, HashMap};

use alloy_primitives::Address;

use crate::{
    constants::{
        CEUR_ADDRESS, CEUR_FEE_CURRENCY_LIMIT, CREAL_ADDRESS, CREAL_FEE_CURRENCY_LIMIT,
        CUSD_ADDRESS, CUSD_FEE_CURRENCY_LIMIT, DEFAULT_FEE_CURRENCY_LIMIT,
    },
    FeeCurrency, FeeCurrencyLimitsError, GasPoolError,
};

/// Fractions of the block gas limit available to each fee currency. Every fraction lies in
/// `[0, 1]`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawFeeCurrencyLimits")]
pub struct FeeCurrencyLimits {
    default: f64,
    overrides: BTreeMap<Address, f64>,
}

#[derive(serde::Deserialize)]
struct RawFeeCurrencyLimits {
    default: f64,
    #[serde(default)]
    overrides: BTreeMap<Address, f64>,
}

impl TryFrom<RawFeeCurrencyLimits> for FeeCurrencyLimits {
    type Error = FeeCurrencyLimitsError;

    fn try_from(raw: RawFeeCurrencyLimits) -> Result<Self, Self::Error> {
        raw.overrides.into_iter().try_fold(
            Self::default().with_default(raw.default)?,
            |limits, (currency, fraction)| limits.with_override(currency, fraction),
        )
    }
}

impl Default for FeeCurrencyLimits {
    fn default() -> Self {
        Self { default: DEFAULT_FEE_CURRENCY_LIMIT, overrides: BTreeMap::new() }
    }
}

impl FeeCurrencyLimits {
    /// The mainnet defaults.
    pub fn mainnet() -> Self {
        let overrides = BTreeMap::from([
            (CUSD_ADDRESS, CUSD_FEE_CURRENCY_LIMIT),
            (CEUR_ADDRESS, CEUR_FEE_CURRENCY_LIMIT),
            (CREAL_ADDRESS, CREAL_FEE_CURRENCY_LIMIT),
        ]);
        Self { default: DEFAULT_FEE_CURRENCY_LIMIT, overrides }
    }

    /// Fraction applied to currencies without an override.
    pub const fn default_fraction(&self) -> f64 {
        self.default
    }

    /// Per-currency fractions.
    pub const fn overrides(&self) -> &BTreeMap<Address, f64> {
        &self.overrides
    }

    /// Sets the fraction of currencies without an override.
    pub fn with_default(mut self, fraction: f64) -> Result<Self, FeeCurrencyLimitsError> {
        if !is_fraction(fraction) {
            return Err(FeeCurrencyLimitsError::Default(fraction));
        }
        self.default = fraction;
        Ok(self)
    }

    /// Sets the fraction of `currency`.
    pub fn with_override(
        mut self,
        currency: Address,
        fraction: f64,
    ) -> Result<Self, FeeCurrencyLimitsError> {
        if !is_fraction(fraction) {
            return Err(FeeCurrencyLimitsError::Override { currency, fraction });
        }
        self.overrides.insert(currency, fraction);
        Ok(self)
    }
}

/// Rejects NaN along with everything outside `[0, 1]`.
fn is_fraction(fraction: f64) -> bool {
    (0.0..=1.0).contains(&fraction)
}

/// Gas remaining in a block for the transactions of one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPool {
    currency: FeeCurrency,
    capacity: u64,
    gas: u64,
}

impl GasPool {
    /// Creates a full pool of `capacity` gas.
    pub const fn new(currency: FeeCurrency, capacity: u64) -> Self {
        Self { currency, capacity, gas: capacity }
    }

    /// The currency this pool accounts for.
    pub const fn currency(&self) -> FeeCurrency {
        self.currency
    }

    /// The gas the pool was created with.
    pub const fn capacity(&self) -> u64 {
        self.capacity
    }

    /// The gas still available.
    pub const fn gas(&self) -> u64 {
        self.gas
    }

    /// The gas drawn so far.
    pub const fn used(&self) -> u64 {
        self.capacity.saturating_sub(self.gas)
    }

    /// Returns `true` if `amount` gas can still be drawn.
    pub const fn has_gas(&self, amount: u64) -> bool {
        amount <= self.gas
    }

    /// Returns gas to the pool, saturating at `u64::MAX`.
    pub fn add_gas(&mut self, amount: u64) -> &mut Self {
        self.gas = self.gas.saturating_add(amount);
        self
    }

    /// Draws `amount` gas from the pool. Fails without drawing anything if less than `amount`
    /// remains.
    pub fn sub_gas(&mut self, amount: u64) -> Result<&mut Self, GasPoolError> {
        if amount > self.gas {
            return Err(GasPoolError::GasPoolExhausted {
                currency: self.currency,
                requested: amount,
                available: self.gas,
            });
        }
        self.gas -= amount;
        Ok(self)
    }
}

/// One [`GasPool`] per fee currency for a single block.
#[derive(Debug, Clone)]
pub struct MultiGasPool {
    native: GasPool,
    pools: HashMap<Address, GasPool>,
    block_gas_limit: u64,
    default_fraction: f64,
}

impl MultiGasPool {
    /// Creates the pools of a block with the given gas limit. Every currency listed in
    /// `limits.overrides` gets its pool right away.
    pub fn new(block_gas_limit: u64, limits: &FeeCurrencyLimits) -> Self {
        let mut pools = Self {
            native: GasPool::new(FeeCurrency::NATIVE, block_gas_limit),
            pools: HashMap::with_capacity(limits.overrides.len()),
            block_gas_limit,
            default_fraction: limits.default,
        };
        for (&currency, &fraction) in &limits.overrides {
            pools.get_or_init(currency, Some(fraction));
        }
        pools
    }

    /// The block gas limit the pools are derived from.
    pub const fn block_gas_limit(&self) -> u64 {
        self.block_gas_limit
    }

    /// Returns the pool of `currency`, creating it with the default fraction on first use.
    pub fn pool_for(&mut self, currency: FeeCurrency) -> &mut GasPool {
        match currency.address() {
            None => &mut self.native,
            Some(address) => self.get_or_init(address, None),
        }
    }

    /// Draws `gas` from the pool of `currency`.
    pub fn sub_gas(&mut self, currency: FeeCurrency, gas: u64) -> Result<(), GasPoolError> {
        self.pool_for(currency).sub_gas(gas).map(|_| ())
    }

    /// The only place sub-pools are created. `fraction` is only given while building the
    /// multi-pool from its overrides; lazily created pools always use the default fraction.
    fn get_or_init(&mut self, currency: Address, fraction: Option<f64>) -> &mut GasPool {
        let block_gas_limit = self.block_gas_limit;
        let fraction = fraction.unwrap_or(self.default_fraction);
        self.pools.entry(currency).or_insert_with(|| {
            GasPool::new(FeeCurrency::token(currency), fraction_of(block_gas_limit, fraction))
        })
    }
}

/// `floor(gas_limit * fraction)` for a `fraction` in `[0, 1]`.
fn fraction_of(gas_limit: u64, fraction: f64) -> u64 {
    // Truncating float-to-int conversion floors non-negative values.
    ((gas_limit as f64) * fraction) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use rstest::rstest;

    const USD: Address = address!("0x765DE816845861e75A25fCA122bb6898B8B1282a");
    const EUR: Address = address!("0xD8763CBa276a3738E6DE85b4b3bF5FDed6D6cA73");

    fn with_override(currency: Address, fraction: f64) -> FeeCurrencyLimits {
        FeeCurrencyLimits::default().with_override(currency, fraction).unwrap()
    }

    fn with_default(fraction: f64) -> FeeCurrencyLimits {
        FeeCurrencyLimits::default().with_default(fraction).unwrap()
    }

    #[rstest]
    #[case::default_only(FeeCurrencyLimits::default(), USD, 5_000)]
    #[case::override_applies(with_override(USD, 0.9), USD, 9_000)]
    #[case::other_currency(with_override(EUR, 0.9), USD, 5_000)]
    #[case::custom_default(with_default(0.25), USD, 2_500)]
    #[case::floor(with_default(0.33333), USD, 3_333)]
    #[case::whole_block(with_override(USD, 1.0), USD, 10_000)]
    #[case::nothing(with_override(USD, 0.0), USD, 0)]
    fn test_pool_capacity(
        #[case] limits: FeeCurrencyLimits,
        #[case] currency: Address,
        #[case] expected: u64,
    ) {
        let mut pools = MultiGasPool::new(10_000, &limits);
        assert_eq!(pools.pool_for(FeeCurrency::token(currency)).capacity(), expected);
        assert_eq!(pools.pool_for(FeeCurrency::NATIVE).capacity(), 10_000);
    }

    #[test]
    fn test_pool_is_cached() {
        let mut pools = MultiGasPool::new(1_000, &FeeCurrencyLimits::default());
        pools.pool_for(FeeCurrency::token(USD)).sub_gas(100).unwrap();
        assert_eq!(pools.pool_for(FeeCurrency::token(USD)).gas(), 400);
        assert_eq!(pools.pool_for(FeeCurrency::token(USD)).used(), 100);
    }

    #[test]
    fn test_pools_are_independent() {
        let mut pools = MultiGasPool::new(1_000, &FeeCurrencyLimits::default());
        pools.sub_gas(FeeCurrency::token(USD), 500).unwrap();
        assert!(pools.sub_gas(FeeCurrency::token(USD), 1).is_err());
        pools.sub_gas(FeeCurrency::token(EUR), 500).unwrap();
        pools.sub_gas(FeeCurrency::NATIVE, 1_000).unwrap();
    }

    #[test]
    fn test_exhaustion_does_not_draw() {
        let mut pool = GasPool::new(FeeCurrency::token(USD), 100);
        let err = pool.sub_gas(101).unwrap_err();
        assert_eq!(
            err,
            GasPoolError::GasPoolExhausted {
                currency: FeeCurrency::token(USD),
                requested: 101,
                available: 100,
            }
        );
        assert_eq!(pool.gas(), 100);
        pool.sub_gas(100).unwrap();
        assert_eq!(pool.gas(), 0);
    }

    #[test]
    fn test_add_gas_saturates() {
        let mut pool = GasPool::new(FeeCurrency::NATIVE, u64::MAX);
        pool.add_gas(1);
        assert_eq!(pool.gas(), u64::MAX);
    }

    #[test]
    fn test_mainnet_limits() {
        let mut pools = MultiGasPool::new(30_000_000, &FeeCurrencyLimits::mainnet());
        assert_eq!(pools.pool_for(FeeCurrency::token(CUSD_ADDRESS)).capacity(), 27_000_000);
        assert_eq!(pools.pool_for(FeeCurrency::token(CEUR_ADDRESS)).capacity(), 15_000_000);
        assert_eq!(pools.pool_for(FeeCurrency::token(CREAL_ADDRESS)).capacity(), 15_000_000);
    }

    #[test]
    fn test_limits_from_json() {
        let limits: FeeCurrencyLimits = serde_json::from_str(
            r#"{"default":0.5,"overrides":{"0x765de816845861e75a25fca122bb6898b8b1282a":0.9}}"#,
        )
        .unwrap();
        assert_eq!(limits, with_override(USD, 0.9));
    }

    #[rstest]
    #[case::above_one(1.5)]
    #[case::negative(-0.1)]
    #[case::nan(f64::NAN)]
    fn test_out_of_range_fraction_is_rejected(#[case] fraction: f64) {
        assert!(matches!(
            FeeCurrencyLimits::default().with_default(fraction),
            Err(FeeCurrencyLimitsError::Default(_))
        ));
        assert!(matches!(
            FeeCurrencyLimits::default().with_override(USD, fraction),
            Err(FeeCurrencyLimitsError::Override { currency, .. }) if currency == USD
        ));
    }

    #[test]
    fn test_out_of_range_fraction_from_json_is_rejected() {
        let err = serde_json::from_str::<FeeCurrencyLimits>(
            r#"{"default":0.5,"overrides":{"0x765de816845861e75a25fca122bb6898b8b1282a":1.5}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
        assert!(serde_json::from_str::<FeeCurrencyLimits>(r#"{"default":-1.0}"#).is_err());
    }
}
