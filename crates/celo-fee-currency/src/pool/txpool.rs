use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::Arc,
};

use alloy_primitives::{Address, B256, U256};
use auto_impl::auto_impl;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{
    balance_of,
    constants::{
        DEFAULT_ACCOUNT_SLOTS, DEFAULT_PRICE_BUMP, TX_ACCESS_LIST_ADDRESS_GAS,
        TX_ACCESS_LIST_STORAGE_KEY_GAS, TX_DATA_NON_ZERO_GAS, TX_DATA_ZERO_GAS, TX_GAS,
        TX_GAS_CONTRACT_CREATION,
    },
    compare_with_rates, convert, CeloChainConfig, CeloSigner, CeloTxEnvelope, CeloTxList,
    ContractCaller, FeeCurrency, FeeCurrencyContext, PoolError, PooledTx, RatesAndFees,
    SettlementError,
};

/// Pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Minimum price increase, in percent, of a replacement transaction.
    pub price_bump: u64,
    /// Maximum number of transactions per account.
    pub account_slots: usize,
    /// Whether account lists drop everything above a removed nonce.
    pub strict: bool,
    /// Block gas limit used until the first block is announced.
    pub block_gas_limit: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            price_bump: DEFAULT_PRICE_BUMP,
            account_slots: DEFAULT_ACCOUNT_SLOTS,
            strict: true,
            block_gas_limit: 30_000_000,
        }
    }
}

impl PoolConfig {
    /// Sets the replacement price bump.
    pub const fn with_price_bump(mut self, price_bump: u64) -> Self {
        self.price_bump = price_bump;
        self
    }

    /// Sets the number of transactions per account.
    pub const fn with_account_slots(mut self, account_slots: usize) -> Self {
        self.account_slots = account_slots;
        self
    }

    /// Sets whether account lists are strict.
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets the initial block gas limit.
    pub const fn with_block_gas_limit(mut self, block_gas_limit: u64) -> Self {
        self.block_gas_limit = block_gas_limit;
        self
    }
}

/// The state of a newly announced block the pool revalidates against.
#[derive(Debug, Clone)]
pub struct BlockContext {
    /// Block timestamp, selecting the signing rules.
    pub timestamp: u64,
    /// Block gas limit.
    pub gas_limit: u64,
    /// Native base fee, `None` before London.
    pub base_fee: Option<U256>,
    /// Fee currencies of the block.
    pub fee_currency_context: Arc<FeeCurrencyContext>,
}

/// Reads account balances in any fee currency from the head state.
#[auto_impl(&mut, Box)]
pub trait BalanceReader {
    /// Failure to read a balance.
    type Error: core::error::Error + Send + Sync + 'static;

    /// The balance of `account` in `currency`.
    fn balance(&mut self, account: Address, currency: FeeCurrency) -> Result<U256, Self::Error>;

    /// The native data availability cost the sender pays for `tx` on top of its execution fees.
    fn data_availability_cost(&mut self, _tx: &CeloTxEnvelope) -> U256 {
        U256::ZERO
    }
}

/// Reads balances through `balanceOf` calls and native balance lookups of an engine.
#[derive(Debug)]
pub struct EngineBalances<C>(pub C);

impl<C: ContractCaller> BalanceReader for EngineBalances<C> {
    type Error = SettlementError<C::Error>;

    fn balance(&mut self, account: Address, currency: FeeCurrency) -> Result<U256, Self::Error> {
        balance_of(&mut self.0, account, currency)
    }
}

/// Transactions taken out of the pool by a revalidation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetOutcome {
    /// Transactions that failed the whitelist or balance checks.
    pub dropped: Vec<B256>,
    /// Transactions removed because a lower nonce of the same account was dropped.
    pub invalidated: Vec<B256>,
}

/// Intrinsic gas of `tx`, including the surcharge of its fee currency. `None` if the currency is
/// not whitelisted in `context`.
pub fn intrinsic_gas(tx: &CeloTxEnvelope, context: &FeeCurrencyContext) -> Option<u64> {
    let base = if tx.kind().is_create() { TX_GAS_CONTRACT_CREATION } else { TX_GAS };
    let zero_bytes = tx.input().iter().filter(|byte| **byte == 0).count() as u64;
    let non_zero_bytes = tx.input().len() as u64 - zero_bytes;
    let access_list = tx.access_list().map_or(0, |list| {
        list.0.iter().fold(0u64, |gas, item| {
            gas.saturating_add(TX_ACCESS_LIST_ADDRESS_GAS).saturating_add(
                TX_ACCESS_LIST_STORAGE_KEY_GAS.saturating_mul(item.storage_keys.len() as u64),
            )
        })
    });
    let surcharge = context.currency_intrinsic_gas_cost(tx.fee_currency())?;

    Some(
        base.saturating_add(zero_bytes.saturating_mul(TX_DATA_ZERO_GAS))
            .saturating_add(non_zero_bytes.saturating_mul(TX_DATA_NON_ZERO_GAS))
            .saturating_add(access_list)
            .saturating_add(surcharge),
    )
}

#[derive(Debug)]
struct PoolInner {
    lists: HashMap<Address, CeloTxList>,
    all: HashMap<B256, Arc<PooledTx>>,
    context: Arc<FeeCurrencyContext>,
    rates_and_fees: Arc<RatesAndFees>,
    timestamp: u64,
    gas_limit: u64,
}

impl PoolInner {
    fn forget(&mut self, txs: &[Arc<PooledTx>]) {
        for tx in txs {
            self.all.remove(&tx.hash());
        }
    }

    fn prune(&mut self, account: Address) {
        if self.lists.get(&account).is_some_and(CeloTxList::is_empty) {
            self.lists.remove(&account);
        }
    }
}

/// The pending transaction pool.
///
/// All state sits behind a single lock. Mutations take the write guard for the time they touch
/// the account lists and the lookup index. Balance reads happen before the guard is taken.
#[derive(Debug)]
pub struct TxPool {
    config: PoolConfig,
    chain: CeloChainConfig,
    inner: RwLock<PoolInner>,
}

impl TxPool {
    /// Creates an empty pool. Until the first [`reset`](Self::reset) no fee currency is
    /// whitelisted.
    pub fn new(config: PoolConfig, chain: CeloChainConfig) -> Self {
        let inner = PoolInner {
            lists: HashMap::new(),
            all: HashMap::new(),
            context: Arc::default(),
            rates_and_fees: Arc::default(),
            timestamp: 0,
            gas_limit: config.block_gas_limit,
        };
        Self { config, chain, inner: RwLock::new(inner) }
    }

    /// The pool configuration.
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of pooled transactions.
    pub fn len(&self) -> usize {
        self.inner.read().all.len()
    }

    /// Returns `true` if no transaction is pooled.
    pub fn is_empty(&self) -> bool {
        self.inner.read().all.is_empty()
    }

    /// The pooled transaction with `hash`.
    pub fn get(&self, hash: &B256) -> Option<Arc<PooledTx>> {
        self.inner.read().all.get(hash).cloned()
    }

    /// Returns `true` if a transaction with `hash` is pooled.
    pub fn contains(&self, hash: &B256) -> bool {
        self.inner.read().all.contains_key(hash)
    }

    /// Total cost committed by `account` in `currency`.
    pub fn total_cost_for(&self, account: Address, currency: FeeCurrency) -> U256 {
        self.inner
            .read()
            .lists
            .get(&account)
            .map_or(U256::ZERO, |list| list.total_cost_for(currency))
    }

    /// The fee currency context of the current head.
    pub fn fee_currency_context(&self) -> Arc<FeeCurrencyContext> {
        self.inner.read().context.clone()
    }

    /// The ordering context of the current head.
    pub fn rates_and_fees(&self) -> Arc<RatesAndFees> {
        self.inner.read().rates_and_fees.clone()
    }

    /// Validates `tx` and inserts it, possibly replacing a pooled transaction with the same
    /// sender and nonce. Returns the hash of `tx`.
    pub fn add<R: BalanceReader>(
        &self,
        tx: CeloTxEnvelope,
        balances: &mut R,
    ) -> Result<B256, PoolError> {
        let (context, timestamp, gas_limit) = {
            let inner = self.inner.read();
            (inner.context.clone(), inner.timestamp, inner.gas_limit)
        };

        let hash = tx.hash();
        if self.contains(&hash) {
            return Err(PoolError::AlreadyKnown(hash));
        }
        let sender = self.validate(&tx, &context, timestamp, gas_limit)?;
        let currency = tx.fee_currency();
        let balance = balances.balance(sender, currency).map_err(|err| {
            PoolError::BalanceReadFailed { account: sender, currency, source: Box::new(err) }
        })?;

        let mut inner = self.inner.write();
        let inner = &mut *inner;
        // A reset may have published a new head while the lock was released.
        let head_changed = !Arc::ptr_eq(&inner.context, &context) ||
            inner.timestamp != timestamp ||
            inner.gas_limit != gas_limit;
        if head_changed {
            debug!(%sender, %hash, "Revalidating transaction against the new head");
            self.validate(&tx, &inner.context, inner.timestamp, inner.gas_limit)?;
        }
        let pooled = Arc::new(PooledTx::new(tx, sender));

        let list = inner.lists.entry(sender).or_insert_with(|| CeloTxList::new(self.config.strict));

        let nonce = pooled.nonce();
        if !list.contains(nonce) && list.len() >= self.config.account_slots {
            inner.prune(sender);
            return Err(PoolError::AccountSlotsFull { account: sender });
        }
        let replaced_cost = list
            .get(nonce)
            .filter(|old| old.fee_currency() == currency)
            .map_or(U256::ZERO, |old| old.cost());
        let committed = list
            .total_cost_for(currency)
            .saturating_sub(replaced_cost)
            .saturating_add(pooled.cost());
        if committed > balance {
            let err = PoolError::InsufficientBalance {
                account: sender,
                currency,
                balance,
                cost: committed,
            };
            inner.prune(sender);
            return Err(err);
        }

        let rates = &inner.context.exchange_rates;
        let replaced = list.add(pooled.clone(), self.config.price_bump, rates)?;
        if let Some(old) = replaced {
            debug!(%sender, nonce, old = %old.hash(), new = %hash, "Replaced pooled transaction");
            inner.all.remove(&old.hash());
        } else {
            debug!(%sender, nonce, %hash, %currency, "Added transaction to the pool");
        }
        inner.all.insert(hash, pooled);
        Ok(hash)
    }

    /// Checks `tx` against the head state: signing rules at `timestamp`, the whitelist and
    /// intrinsic gas of `context`, and the block gas limit. Returns the sender.
    fn validate(
        &self,
        tx: &CeloTxEnvelope,
        context: &FeeCurrencyContext,
        timestamp: u64,
        gas_limit: u64,
    ) -> Result<Address, PoolError> {
        let sender = CeloSigner::from_config(&self.chain, timestamp).sender(tx)?;
        let Some(intrinsic_gas) = intrinsic_gas(tx, context) else {
            return Err(PoolError::CurrencyNotWhitelisted {
                currency: tx.fee_currency().address().unwrap_or_default(),
            });
        };
        if tx.gas_limit() > gas_limit {
            return Err(PoolError::GasLimitExceeded {
                gas_limit: tx.gas_limit(),
                block_gas_limit: gas_limit,
            });
        }
        if tx.gas_limit() < intrinsic_gas {
            return Err(PoolError::IntrinsicGasTooLow { gas_limit: tx.gas_limit(), intrinsic_gas });
        }
        Ok(sender)
    }

    /// Switches the pool to a new head block: publishes its fee currency context and base fee,
    /// then drops every transaction whose currency is no longer whitelisted or whose sender
    /// cannot afford it any more.
    ///
    /// Balances are read before the pool is locked. A balance that cannot be read is logged and
    /// the transactions paying in that currency are kept.
    pub fn reset<R: BalanceReader>(&self, block: BlockContext, balances: &mut R) -> ResetOutcome {
        let accounts: Vec<_> = self
            .inner
            .read()
            .lists
            .iter()
            .map(|(account, list)| (*account, list.fee_currencies(), list.first().cloned()))
            .collect();

        let rates = &block.fee_currency_context.exchange_rates;
        let mut account_balances = HashMap::with_capacity(accounts.len());
        for (account, currencies, first) in accounts {
            let da_cost = first.map_or(U256::ZERO, |tx| balances.data_availability_cost(&tx));
            let mut available = HashMap::new();
            for currency in currencies {
                let balance = match balances.balance(account, currency) {
                    Ok(balance) => balance,
                    Err(err) => {
                        warn!(%account, %currency, %err, "Failed to read balance");
                        continue;
                    }
                };
                // Currencies without a rate are dropped by the whitelist filter anyway.
                let Ok(da_cost) = convert(da_cost, FeeCurrency::NATIVE, currency, rates) else {
                    continue;
                };
                available.insert(currency, balance.saturating_sub(da_cost));
            }
            account_balances.insert(account, available);
        }

        let mut outcome = ResetOutcome::default();
        let mut inner = self.inner.write();
        inner.context = block.fee_currency_context.clone();
        inner.rates_and_fees = Arc::new(RatesAndFees::new(rates.clone(), block.base_fee));
        inner.timestamp = block.timestamp;
        inner.gas_limit = block.gas_limit;

        let accounts: Vec<Address> = inner.lists.keys().copied().collect();
        for account in accounts {
            let Some(list) = inner.lists.get_mut(&account) else { continue };
            let (mut dropped, mut invalidated) = list.filter_whitelisted(rates);
            if let Some(available) = account_balances.get(&account) {
                let (more_dropped, more_invalidated) =
                    list.filter_balance(available, block.gas_limit);
                dropped.extend(more_dropped);
                invalidated.extend(more_invalidated);
            }

            for tx in &dropped {
                debug!(%account, hash = %tx.hash(), nonce = tx.nonce(), "Dropped transaction");
            }
            inner.forget(&dropped);
            inner.forget(&invalidated);
            inner.prune(account);
            outcome.dropped.extend(dropped.iter().map(|tx| tx.hash()));
            outcome.invalidated.extend(invalidated.iter().map(|tx| tx.hash()));
        }
        outcome
    }

    /// Removes and returns the consecutive transactions of `account` starting at its lowest
    /// pooled nonce, if that nonce is not above `from_nonce`.
    pub fn ready(&self, account: Address, from_nonce: u64) -> Vec<Arc<PooledTx>> {
        let mut inner = self.inner.write();
        let Some(list) = inner.lists.get_mut(&account) else { return Vec::new() };
        let ready = list.ready(from_nonce);
        inner.forget(&ready);
        inner.prune(account);
        ready
    }

    /// Removes the transactions of `account` with a nonce below `nonce`, e.g. once they are
    /// included in a block.
    pub fn forward(&self, account: Address, nonce: u64) -> Vec<Arc<PooledTx>> {
        let mut inner = self.inner.write();
        let Some(list) = inner.lists.get_mut(&account) else { return Vec::new() };
        let forwarded = list.forward(nonce);
        inner.forget(&forwarded);
        inner.prune(account);
        forwarded
    }

    /// The transactions of `account`, sorted by nonce.
    pub fn flatten(&self, account: Address) -> Vec<Arc<PooledTx>> {
        self.inner.read().lists.get(&account).map(CeloTxList::flatten).unwrap_or_default()
    }

    /// Removes the transaction with `hash`. Returns `None` if it is not pooled, otherwise the
    /// transactions of the same account invalidated by its removal.
    pub fn remove(&self, hash: &B256) -> Option<Vec<Arc<PooledTx>>> {
        let mut inner = self.inner.write();
        let tx = inner.all.remove(hash)?;
        let account = tx.sender();
        let invalidated = inner.lists.get_mut(&account).and_then(|list| list.remove(&tx))?;
        inner.forget(&invalidated);
        inner.prune(account);
        Some(invalidated)
    }

    /// All pooled transactions, best first.
    ///
    /// Transactions of one account come out in nonce order. Across accounts the next transaction
    /// is the best-priced of the accounts' next transactions under [`compare_with_rates`]. Ties go
    /// to the lower sender address.
    pub fn pending(&self) -> Vec<Arc<PooledTx>> {
        let inner = self.inner.read();
        let mut queues: Vec<VecDeque<Arc<PooledTx>>> = inner
            .lists
            .iter()
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .map(|list| list.flatten().into())
            .collect();
        let rates_and_fees = Some(&*inner.rates_and_fees);

        let mut pending = Vec::with_capacity(inner.all.len());
        loop {
            let mut best: Option<usize> = None;
            for (index, queue) in queues.iter().enumerate() {
                let Some(head) = queue.front() else { continue };
                let better = best.and_then(|best| queues[best].front()).is_none_or(|current| {
                    compare_with_rates(head, current, rates_and_fees).is_gt()
                });
                if better {
                    best = Some(index);
                }
            }
            let Some(tx) = best.and_then(|best| queues[best].pop_front()) else { break };
            pending.push(tx);
        }
        pending
    }
}
