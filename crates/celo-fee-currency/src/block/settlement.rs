//! Fee settlement through fee currency token contracts.
//!
//! A transaction paying in a fee currency is charged in two steps around its execution:
//!
//! 1. **Debit**: before execution the maximum fee (`gas_limit * gas_price`) is moved from the
//!    sender to [`HOLDING_ADDRESS`] with a single `transfer` call made as the sender.
//! 2. **Credit**: after execution the holding address pays out, in order, the base fee to the fee
//!    handler, the tip to the block's fee recipient, the unused gas back to the sender and the
//!    data availability fee to its receiver. All credit legs share one gas budget of
//!    [`MAX_GAS_FOR_CREDIT_GAS_FEES`].
//!
//! Every call is a nested, state-mutating call through [`ContractCaller`], so its effects belong to
//! the transaction's state transition. A failed leg aborts the settlement and the transaction is
//! invalid.

use core::fmt;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use tracing::trace;

use crate::{
    constants::{
        HOLDING_ADDRESS, MAX_GAS_FOR_CREDIT_GAS_FEES, MAX_GAS_FOR_DEBIT_GAS_FEES, MAX_GAS_FOR_READ,
    },
    contracts::IFeeCurrency,
    CallFailure, CallOutcome, ContractCaller, FeeCurrency, SettlementError,
};

/// One payout of the credit step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreditLeg {
    /// Base fee to the fee handler.
    BaseFee,
    /// Priority fee to the block's fee recipient.
    Tip,
    /// Unused gas back to the sender.
    Refund,
    /// Data availability fee to its receiver.
    DataAvailabilityFee,
}

impl fmt::Display for CreditLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BaseFee => "base fee",
            Self::Tip => "tip",
            Self::Refund => "refund",
            Self::DataAvailabilityFee => "data availability fee",
        })
    }
}

/// The payouts of a transaction's credit step, all denominated in `currency`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditRequest {
    /// The sender, receiving the refund.
    pub from: Address,
    /// The block's fee recipient, receiving the tip.
    pub fee_recipient: Address,
    /// The fee handler, receiving the base fee.
    pub fee_handler: Address,
    /// Base fee amount.
    pub base_fee: U256,
    /// Tip amount. Skipped when zero.
    pub tip: U256,
    /// Refund amount. Skipped when zero.
    pub refund: U256,
    /// Receiver and amount of the data availability fee, if one is charged.
    pub data_availability_fee: Option<(Address, U256)>,
    /// The fee currency token.
    pub currency: Address,
}

/// Amounts charged for a transaction, all in the transaction's fee currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBreakdown {
    /// Amount debited before execution: `gas_limit * effective_gas_price`.
    pub debit: U256,
    /// Base fee credited to the fee handler: `gas_used * base_fee`.
    pub base_fee: U256,
    /// Tip credited to the fee recipient: `gas_used * (effective_gas_price - base_fee)`.
    pub tip: U256,
    /// Unused gas refunded to the sender: `(gas_limit - gas_used) * effective_gas_price`.
    pub refund: U256,
}

impl FeeBreakdown {
    /// Splits the fee of a transaction. `base_fee` must already be denominated in the
    /// transaction's fee currency.
    ///
    /// The effective gas price is `min(fee_cap, base_fee + tip_cap)`, and is never below the base
    /// fee for a transaction admitted to the block.
    pub fn compute(
        gas_limit: u64,
        gas_used: u64,
        fee_cap: U256,
        tip_cap: U256,
        base_fee: U256,
    ) -> Self {
        let price = fee_cap.min(base_fee.saturating_add(tip_cap));
        let gas_used = gas_used.min(gas_limit);
        let used = U256::from(gas_used);
        Self {
            debit: U256::from(gas_limit).saturating_mul(price),
            base_fee: used.saturating_mul(base_fee.min(price)),
            tip: used.saturating_mul(price.saturating_sub(base_fee)),
            refund: U256::from(gas_limit - gas_used).saturating_mul(price),
        }
    }

    /// The total credited. Equals [`debit`](Self::debit).
    pub fn credited(&self) -> U256 {
        self.base_fee.saturating_add(self.tip).saturating_add(self.refund)
    }
}

/// Gas left for the remaining credit legs. Passed by value into each leg and handed back reduced
/// by what the leg consumed.
#[derive(Debug, PartialEq, Eq)]
struct GasBudget(u64);

/// Moves `amount` of `currency` from `from` to [`HOLDING_ADDRESS`]. Returns the gas used.
///
/// A zero amount is not transferred and uses no gas.
pub fn debit<C: ContractCaller>(
    caller: &mut C,
    from: Address,
    amount: U256,
    currency: Address,
) -> Result<u64, SettlementError<C::Error>> {
    if amount.is_zero() {
        return Ok(0);
    }
    let input = IFeeCurrency::transferCall { to: HOLDING_ADDRESS, amount }.abi_encode();
    let outcome = caller
        .call(from, currency, input.into(), MAX_GAS_FOR_DEBIT_GAS_FEES)
        .map_err(CallFailure::Engine)
        .and_then(into_success)
        .map_err(|reason| SettlementError::FeeDebitFailed { from, amount, currency, reason })?;

    let gas_used = MAX_GAS_FOR_DEBIT_GAS_FEES.saturating_sub(outcome.gas_left);
    trace!(%currency, %from, %amount, gas_used, "Debited fees");
    Ok(gas_used)
}

/// Pays out the credit legs of `request` from [`HOLDING_ADDRESS`]. Returns the gas used by all
/// legs.
///
/// Legs run in the order base fee, tip, refund, data availability fee. Tip and refund are skipped
/// when zero and the data availability leg when absent. The first failing leg aborts the credit.
pub fn credit<C: ContractCaller>(
    caller: &mut C,
    request: &CreditRequest,
) -> Result<u64, SettlementError<C::Error>> {
    let currency = request.currency;
    let mut legs = vec![(CreditLeg::BaseFee, request.fee_handler, request.base_fee)];
    if !request.tip.is_zero() {
        legs.push((CreditLeg::Tip, request.fee_recipient, request.tip));
    }
    if !request.refund.is_zero() {
        legs.push((CreditLeg::Refund, request.from, request.refund));
    }
    if let Some((receiver, amount)) = request.data_availability_fee {
        legs.push((CreditLeg::DataAvailabilityFee, receiver, amount));
    }

    let mut budget = GasBudget(MAX_GAS_FOR_CREDIT_GAS_FEES);
    for (leg, to, amount) in legs {
        budget = credit_leg(caller, currency, leg, to, amount, budget)?;
    }

    let gas_used = MAX_GAS_FOR_CREDIT_GAS_FEES - budget.0;
    trace!(%currency, gas_used, "Credited fees");
    Ok(gas_used)
}

fn credit_leg<C: ContractCaller>(
    caller: &mut C,
    currency: Address,
    leg: CreditLeg,
    to: Address,
    amount: U256,
    budget: GasBudget,
) -> Result<GasBudget, SettlementError<C::Error>> {
    let fail =
        |reason: CallFailure<C::Error>| SettlementError::FeeCreditFailed { leg, currency, reason };
    let GasBudget(gas) = budget;
    if gas == 0 {
        return Err(fail(CallFailure::NoGasLeft));
    }

    let input = IFeeCurrency::transferCall { to, amount }.abi_encode();
    let outcome = caller
        .call(HOLDING_ADDRESS, currency, input.into(), gas)
        .map_err(CallFailure::Engine)
        .and_then(into_success)
        .map_err(fail)?;

    let left = outcome.gas_left.min(gas);
    trace!(%leg, %currency, %to, %amount, gas_used = gas - left, "Credit leg applied");
    Ok(GasBudget(left))
}

/// Reads the balance of `account` in `currency`. Native balances come from the engine directly,
/// token balances from a read-only `balanceOf` call.
pub fn balance_of<C: ContractCaller>(
    caller: &mut C,
    account: Address,
    currency: FeeCurrency,
) -> Result<U256, SettlementError<C::Error>> {
    let fail = |reason: CallFailure<C::Error>| SettlementError::BalanceReadFailed {
        account,
        currency,
        reason,
    };
    let Some(token) = currency.address() else {
        return caller.native_balance(account).map_err(|err| fail(CallFailure::Engine(err)));
    };

    let input = IFeeCurrency::balanceOfCall { account }.abi_encode();
    let outcome = caller
        .static_call(Address::ZERO, token, input.into(), MAX_GAS_FOR_READ)
        .map_err(CallFailure::Engine)
        .and_then(into_success)
        .map_err(fail)?;
    IFeeCurrency::balanceOfCall::abi_decode_returns(&outcome.output)
        .map_err(|err| fail(CallFailure::MalformedReturn(err)))
}

/// A call succeeded when it did not revert. The `bool` returned by `transfer` is not inspected.
fn into_success<E: core::error::Error + 'static>(
    outcome: CallOutcome,
) -> Result<CallOutcome, CallFailure<E>> {
    if outcome.reverted {
        Err(CallFailure::Reverted(outcome.output))
    } else {
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockEngine;
    use alloy_primitives::address;

    const USD: Address = address!("0x765DE816845861e75A25fCA122bb6898B8B1282a");
    const SENDER: Address = address!("0x00000000000000000000000000000000000a11ce");
    const COINBASE: Address = address!("0x0000000000000000000000000000000000c01b0e");
    const HANDLER: Address = address!("0x00000000000000000000000000000000000fee11");
    const DA: Address = address!("0x00000000000000000000000000000000000000da");

    fn request(base_fee: u64, tip: u64, refund: u64) -> CreditRequest {
        CreditRequest {
            from: SENDER,
            fee_recipient: COINBASE,
            fee_handler: HANDLER,
            base_fee: U256::from(base_fee),
            tip: U256::from(tip),
            refund: U256::from(refund),
            data_availability_fee: None,
            currency: USD,
        }
    }

    #[test]
    fn test_zero_debit_is_noop() {
        let mut engine = MockEngine::default().with_token(USD);
        assert_eq!(debit(&mut engine, SENDER, U256::ZERO, USD).unwrap(), 0);
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_debit_moves_to_holding_address() {
        let mut engine = MockEngine::default()
            .with_token_balance(USD, SENDER, U256::from(1_000))
            .with_transfer_gas(21_000);
        let gas_used = debit(&mut engine, SENDER, U256::from(700), USD).unwrap();
        assert_eq!(gas_used, 21_000);
        assert_eq!(engine.token_balance(USD, SENDER), U256::from(300));
        assert_eq!(engine.token_balance(USD, HOLDING_ADDRESS), U256::from(700));
    }

    #[test]
    fn test_debit_revert_fails() {
        let mut engine = MockEngine::default().with_token_balance(USD, SENDER, U256::from(10));
        let err = debit(&mut engine, SENDER, U256::from(700), USD).unwrap_err();
        assert!(matches!(
            err,
            SettlementError::FeeDebitFailed { reason: CallFailure::Reverted(_), .. }
        ));
        assert_eq!(engine.token_balance(USD, SENDER), U256::from(10));
    }

    #[test]
    fn test_credit_legs_run_in_order() {
        let mut engine = MockEngine::default()
            .with_token_balance(USD, HOLDING_ADDRESS, U256::from(1_000))
            .with_transfer_gas(10_000);
        let mut req = request(600, 100, 200);
        req.data_availability_fee = Some((DA, U256::from(50)));

        let gas_used = credit(&mut engine, &req).unwrap();
        assert_eq!(gas_used, 40_000);
        let recipients: Vec<_> = engine.transfers().into_iter().map(|(_, _, to, _)| to).collect();
        assert_eq!(recipients, vec![HANDLER, COINBASE, SENDER, DA]);
        assert_eq!(engine.token_balance(USD, HOLDING_ADDRESS), U256::from(50));
    }

    #[test]
    fn test_credit_skips_zero_legs() {
        let mut engine = MockEngine::default()
            .with_token_balance(USD, HOLDING_ADDRESS, U256::from(600))
            .with_transfer_gas(10_000);
        assert_eq!(credit(&mut engine, &request(600, 0, 0)).unwrap(), 10_000);
        assert_eq!(engine.transfers().len(), 1);
    }

    #[test]
    fn test_credit_failure_names_leg() {
        let mut engine = MockEngine::default()
            .with_token_balance(USD, HOLDING_ADDRESS, U256::from(1_000))
            .with_reverting_transfer_to(SENDER);
        let err = credit(&mut engine, &request(600, 100, 200)).unwrap_err();
        assert_eq!(err.failed_leg(), Some(CreditLeg::Refund));
        // Base fee and tip were applied before the refund failed.
        assert_eq!(engine.token_balance(USD, HANDLER), U256::from(600));
        assert_eq!(engine.token_balance(USD, COINBASE), U256::from(100));
    }

    #[test]
    fn test_exhausted_budget_fails_next_leg() {
        let mut engine = MockEngine::default()
            .with_token_balance(USD, HOLDING_ADDRESS, U256::from(1_000))
            .with_transfer_gas(MAX_GAS_FOR_CREDIT_GAS_FEES);
        let err = credit(&mut engine, &request(600, 100, 0)).unwrap_err();
        assert!(matches!(
            err,
            SettlementError::FeeCreditFailed {
                leg: CreditLeg::Tip,
                reason: CallFailure::NoGasLeft,
                ..
            }
        ));
        assert_eq!(engine.transfers().len(), 1);
    }

    #[test]
    fn test_balance_of() {
        let mut engine = MockEngine::default()
            .with_token_balance(USD, SENDER, U256::from(42))
            .with_native_balance(SENDER, U256::from(7));
        let balance = balance_of(&mut engine, SENDER, FeeCurrency::token(USD)).unwrap();
        assert_eq!(balance, U256::from(42));
        assert_eq!(balance_of(&mut engine, SENDER, FeeCurrency::NATIVE).unwrap(), U256::from(7));
        let unknown = FeeCurrency::token(Address::repeat_byte(0x11));
        assert!(balance_of(&mut engine, SENDER, unknown).is_err());
    }

    #[test]
    fn test_fee_breakdown() {
        // 100k gas limit, 70k used, fee cap 10, tip cap 2, base fee 6: price 8.
        let fees =
            FeeBreakdown::compute(100_000, 70_000, U256::from(10), U256::from(2), U256::from(6));
        assert_eq!(fees.debit, U256::from(800_000));
        assert_eq!(fees.base_fee, U256::from(420_000));
        assert_eq!(fees.tip, U256::from(140_000));
        assert_eq!(fees.refund, U256::from(240_000));
        assert_eq!(fees.credited(), fees.debit);
    }
}
