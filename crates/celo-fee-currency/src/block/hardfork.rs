use std::collections::HashMap;

use alloy_hardforks::{hardfork, ForkCondition};
use alloy_primitives::{BlockTimestamp, ChainId};
use auto_impl::auto_impl;

use crate::{constants::MAINNET_CHAIN_ID, FeeCurrencyLimits};

hardfork! {
    /// The name of Celo hardforks. It is expected to mix with
    /// [`EthereumHardfork`](alloy_hardforks::EthereumHardfork).
    #[derive(serde::Serialize, serde::Deserialize)]
    CeloHardfork {
        /// The transition of the chain to an L2.
        Cel2,
    }
}

/// Celo hardfork activation helpers.
#[auto_impl(&, Box, Arc)]
pub trait CeloHardforks {
    /// Retrieves [`ForkCondition`] by a [`CeloHardfork`]. If `fork` is not present, returns
    /// [`ForkCondition::Never`].
    fn celo_fork_activation(&self, fork: CeloHardfork) -> ForkCondition;

    /// Returns `true` if [`CeloHardfork::Cel2`] is active at given block timestamp.
    fn is_cel2_active_at_timestamp(&self, timestamp: BlockTimestamp) -> bool {
        self.celo_fork_activation(CeloHardfork::Cel2).active_at_timestamp(timestamp)
    }
}

/// Activation conditions of the Celo hardforks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CeloHardforkConfig {
    hardforks: HashMap<CeloHardfork, ForkCondition>,
}

impl CeloHardforkConfig {
    /// A configuration with every Celo hardfork active from genesis.
    pub fn all_active() -> Self {
        Self::default().with_fork(CeloHardfork::Cel2, ForkCondition::Timestamp(0))
    }

    /// Sets the activation condition of `fork`, overwriting any previous one.
    pub fn with_fork(mut self, fork: CeloHardfork, condition: ForkCondition) -> Self {
        self.hardforks.insert(fork, condition);
        self
    }
}

impl CeloHardforks for CeloHardforkConfig {
    fn celo_fork_activation(&self, fork: CeloHardfork) -> ForkCondition {
        self.hardforks.get(&fork).copied().unwrap_or(ForkCondition::Never)
    }
}

/// Chain parameters the fee currency subsystem depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct CeloChainConfig {
    /// The chain id transactions are signed for.
    pub chain_id: ChainId,
    /// Hardfork activations.
    pub hardforks: CeloHardforkConfig,
    /// Per-currency shares of the block gas limit.
    pub fee_currency_limits: FeeCurrencyLimits,
}

impl CeloChainConfig {
    /// A chain with every hardfork active from genesis and the default gas limit shares.
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            hardforks: CeloHardforkConfig::all_active(),
            fee_currency_limits: FeeCurrencyLimits::default(),
        }
    }

    /// The mainnet chain id and fee currency limits. Hardforks are active from genesis until
    /// replaced through [`with_hardforks`](Self::with_hardforks).
    pub fn mainnet() -> Self {
        Self::new(MAINNET_CHAIN_ID).with_fee_currency_limits(FeeCurrencyLimits::mainnet())
    }

    /// Sets the chain id.
    pub fn with_chain_id(mut self, chain_id: ChainId) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Sets the hardfork activations.
    pub fn with_hardforks(mut self, hardforks: CeloHardforkConfig) -> Self {
        self.hardforks = hardforks;
        self
    }

    /// Sets the gas limit shares of the fee currencies.
    pub fn with_fee_currency_limits(mut self, limits: FeeCurrencyLimits) -> Self {
        self.fee_currency_limits = limits;
        self
    }
}

impl CeloHardforks for CeloChainConfig {
    fn celo_fork_activation(&self, fork: CeloHardfork) -> ForkCondition {
        self.hardforks.celo_fork_activation(fork)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fork_is_never_active() {
        let config = CeloHardforkConfig::default();
        assert_eq!(config.celo_fork_activation(CeloHardfork::Cel2), ForkCondition::Never);
        assert!(!config.is_cel2_active_at_timestamp(u64::MAX));
    }

    #[test]
    fn test_timestamp_activation() {
        let config = CeloHardforkConfig::default()
            .with_fork(CeloHardfork::Cel2, ForkCondition::Timestamp(100));
        assert!(!config.is_cel2_active_at_timestamp(99));
        assert!(config.is_cel2_active_at_timestamp(100));
        assert!(config.is_cel2_active_at_timestamp(101));
    }

    #[test]
    fn test_chain_config_delegates() {
        let config = CeloChainConfig::mainnet().with_hardforks(
            CeloHardforkConfig::default()
                .with_fork(CeloHardfork::Cel2, ForkCondition::Timestamp(1_000)),
        );
        assert_eq!(config.chain_id, 42220);
        assert!(config.is_cel2_active_at_timestamp(1_000));
        assert!(!config.is_cel2_active_at_timestamp(999));
        // Through a reference, as the signer holds it.
        let by_ref = &config;
        assert!(!by_ref.is_cel2_active_at_timestamp(0));
        assert!(CeloChainConfig::mainnet().is_cel2_active_at_timestamp(0));
    }
}
