use std::collections::{HashMap, HashSet};

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;

use crate::{
    contracts::{IFeeCurrency, IFeeCurrencyDirectory, IFeeCurrencyWhitelist, ISortedOracles},
    CallOutcome, ContractCaller, RegistryContracts,
};

/// Engine failure injected by [`MockEngine::with_failing_target`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("engine failure while calling {0}")]
pub struct MockEngineError(pub Address);

/// A call received by the [`MockEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// The caller.
    pub caller: Address,
    /// The called contract.
    pub target: Address,
    /// The calldata.
    pub input: Bytes,
    /// The gas limit of the call.
    pub gas_limit: u64,
    /// Whether the call was read-only.
    pub is_static: bool,
}

/// A token transfer applied by the [`MockEngine`]: token, from, to, amount.
pub type MockTransfer = (Address, Address, Address, U256);

/// An in-memory engine emulating fee currency tokens and the registry contracts.
///
/// Tokens answer `balanceOf` and `transfer`. A transfer costs a fixed amount of gas and reverts
/// when the sender's balance is insufficient, the recipient is configured to revert, or the call
/// does not carry enough gas. Calls to any other address revert.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    tokens: HashMap<Address, HashMap<Address, U256>>,
    native: HashMap<Address, U256>,
    transfer_gas: u64,
    reverting_recipients: HashSet<Address>,
    failing_targets: HashSet<Address>,
    registry: Option<RegistryContracts>,
    whitelist: Vec<Address>,
    median_rates: HashMap<Address, (U256, U256)>,
    intrinsic_gas: HashMap<Address, u64>,
    calls: Vec<MockCall>,
    transfers: Vec<MockTransfer>,
}

impl MockEngine {
    /// Deploys a token without balances.
    pub fn with_token(mut self, token: Address) -> Self {
        self.tokens.entry(token).or_default();
        self
    }

    /// Sets the balance of `account` in `token`, deploying the token if needed.
    pub fn with_token_balance(mut self, token: Address, account: Address, balance: U256) -> Self {
        self.tokens.entry(token).or_default().insert(account, balance);
        self
    }

    /// Sets the gas every transfer consumes.
    pub const fn with_transfer_gas(mut self, gas: u64) -> Self {
        self.transfer_gas = gas;
        self
    }

    /// Makes every transfer to `recipient` revert.
    pub fn with_reverting_transfer_to(mut self, recipient: Address) -> Self {
        self.reverting_recipients.insert(recipient);
        self
    }

    /// Makes every call to `target` fail with a [`MockEngineError`].
    pub fn with_failing_target(mut self, target: Address) -> Self {
        self.failing_targets.insert(target);
        self
    }

    /// Sets the native balance of `account`.
    pub fn with_native_balance(mut self, account: Address, balance: U256) -> Self {
        self.native.insert(account, balance);
        self
    }

    /// Deploys the whitelist, oracle and directory contracts at the given addresses.
    pub const fn with_registry(
        mut self,
        whitelist: Address,
        oracle: Address,
        directory: Address,
    ) -> Self {
        self.registry = Some(RegistryContracts { whitelist, oracle, directory });
        self
    }

    /// Appends `token` to the whitelist.
    pub fn with_whitelisted(mut self, token: Address) -> Self {
        self.whitelist.push(token);
        self
    }

    /// Sets the oracle's median rate of `token`, in token units per native unit.
    pub fn with_median_rate(mut self, token: Address, numerator: U256, denominator: U256) -> Self {
        self.median_rates.insert(token, (numerator, denominator));
        self
    }

    /// Registers the intrinsic gas surcharge of `token` in the directory.
    pub fn with_intrinsic_gas(mut self, token: Address, gas: u64) -> Self {
        self.intrinsic_gas.insert(token, gas);
        self
    }

    /// Every call received so far.
    pub fn calls(&self) -> &[MockCall] {
        &self.calls
    }

    /// The successful transfers so far, in order.
    pub fn transfers(&self) -> Vec<MockTransfer> {
        self.transfers.clone()
    }

    /// The balance of `account` in `token`.
    pub fn token_balance(&self, token: Address, account: Address) -> U256 {
        self.tokens
            .get(&token)
            .and_then(|balances| balances.get(&account))
            .copied()
            .unwrap_or_default()
    }

    fn execute(
        &mut self,
        caller: Address,
        target: Address,
        input: Bytes,
        gas_limit: u64,
        is_static: bool,
    ) -> Result<CallOutcome, MockEngineError> {
        self.calls.push(MockCall { caller, target, input: input.clone(), gas_limit, is_static });
        if self.failing_targets.contains(&target) {
            return Err(MockEngineError(target));
        }
        if self.tokens.contains_key(&target) {
            return Ok(self.execute_token(caller, target, &input, gas_limit, is_static));
        }
        Ok(self
            .execute_registry(target, &input, gas_limit)
            .unwrap_or_else(|| CallOutcome::revert(Bytes::new(), gas_limit)))
    }

    fn execute_token(
        &mut self,
        caller: Address,
        token: Address,
        input: &[u8],
        gas_limit: u64,
        is_static: bool,
    ) -> CallOutcome {
        if let Ok(call) = IFeeCurrency::balanceOfCall::abi_decode(input) {
            let balance = self.token_balance(token, call.account);
            let output = IFeeCurrency::balanceOfCall::abi_encode_returns(&balance);
            return CallOutcome::success(output.into(), gas_limit);
        }
        let Ok(call) = IFeeCurrency::transferCall::abi_decode(input) else {
            return CallOutcome::revert(Bytes::new(), gas_limit);
        };
        if gas_limit < self.transfer_gas {
            return CallOutcome::revert(Bytes::new(), 0);
        }
        let gas_left = gas_limit - self.transfer_gas;
        let from_balance = self.token_balance(token, caller);
        if is_static || from_balance < call.amount || self.reverting_recipients.contains(&call.to) {
            return CallOutcome::revert(Bytes::new(), gas_left);
        }

        let balances = self.tokens.entry(token).or_default();
        balances.insert(caller, from_balance - call.amount);
        let to_balance = balances.entry(call.to).or_default();
        *to_balance += call.amount;
        self.transfers.push((token, caller, call.to, call.amount));
        CallOutcome::success(IFeeCurrency::transferCall::abi_encode_returns(&true).into(), gas_left)
    }

    fn execute_registry(
        &self,
        target: Address,
        input: &[u8],
        gas_limit: u64,
    ) -> Option<CallOutcome> {
        let registry = self.registry?;
        let output = if target == registry.whitelist {
            IFeeCurrencyWhitelist::getWhitelistCall::abi_decode(input).ok()?;
            IFeeCurrencyWhitelist::getWhitelistCall::abi_encode_returns(&self.whitelist)
        } else if target == registry.oracle {
            let call = ISortedOracles::medianRateCall::abi_decode(input).ok()?;
            let (numerator, denominator) = *self.median_rates.get(&call.token)?;
            ISortedOracles::medianRateCall::abi_encode_returns(&ISortedOracles::medianRateReturn {
                numerator,
                denominator,
            })
        } else if target == registry.directory {
            let call = IFeeCurrencyDirectory::getCurrencyConfigCall::abi_decode(input).ok()?;
            let gas = *self.intrinsic_gas.get(&call.token)?;
            IFeeCurrencyDirectory::getCurrencyConfigCall::abi_encode_returns(
                &IFeeCurrencyDirectory::getCurrencyConfigReturn {
                    oracle: registry.oracle,
                    intrinsicGas: U256::from(gas),
                },
            )
        } else {
            return None;
        };
        Some(CallOutcome::success(output.into(), gas_limit))
    }
}

impl ContractCaller for MockEngine {
    type Error = MockEngineError;

    fn call(
        &mut self,
        caller: Address,
        target: Address,
        input: Bytes,
        gas_limit: u64,
    ) -> Result<CallOutcome, Self::Error> {
        self.execute(caller, target, input, gas_limit, false)
    }

    fn static_call(
        &mut self,
        caller: Address,
        target: Address,
        input: Bytes,
        gas_limit: u64,
    ) -> Result<CallOutcome, Self::Error> {
        self.execute(caller, target, input, gas_limit, true)
    }

    fn native_balance(&mut self, account: Address) -> Result<U256, Self::Error> {
        Ok(self.native.get(&account).copied().unwrap_or_default())
    }
}
