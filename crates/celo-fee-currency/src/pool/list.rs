use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use alloy_primitives::U256;

use crate::{compare, is_whitelisted, ExchangeRates, FeeCurrency, PoolError, PooledTx};

/// Transactions removed by a filter: those failing the filter, and those invalidated because a
/// lower nonce was removed.
pub type Filtered = (Vec<Arc<PooledTx>>, Vec<Arc<PooledTx>>);

/// The pooled transactions of one account, sorted by nonce.
///
/// Alongside the transactions the list keeps a ledger of the total cost committed in each fee
/// currency. Every insertion and removal updates the ledger, so
/// [`total_cost_for`](Self::total_cost_for) always equals the sum of [`PooledTx::cost`] over the
/// transactions currently in the list paying in that currency.
///
/// A strict list does not tolerate nonce gaps: removing a transaction for any reason other than
/// inclusion also removes every transaction with a higher nonce.
#[derive(Debug, Clone, Default)]
pub struct CeloTxList {
    strict: bool,
    txs: BTreeMap<u64, Arc<PooledTx>>,
    total_cost: HashMap<FeeCurrency, U256>,
}

impl CeloTxList {
    /// Creates an empty list.
    pub fn new(strict: bool) -> Self {
        Self { strict, ..Default::default() }
    }

    /// Returns `true` if nonce gaps are not tolerated.
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    /// Number of transactions.
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    /// Returns `true` if the list holds no transaction.
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// The transaction with `nonce`.
    pub fn get(&self, nonce: u64) -> Option<&Arc<PooledTx>> {
        self.txs.get(&nonce)
    }

    /// Returns `true` if a transaction with `nonce` is pooled.
    pub fn contains(&self, nonce: u64) -> bool {
        self.txs.contains_key(&nonce)
    }

    /// The transaction with the lowest nonce.
    pub fn first(&self) -> Option<&Arc<PooledTx>> {
        self.txs.values().next()
    }

    /// The transaction with the highest nonce.
    pub fn last(&self) -> Option<&Arc<PooledTx>> {
        self.txs.values().next_back()
    }

    /// Total cost of the pooled transactions paying in `currency`.
    pub fn total_cost_for(&self, currency: FeeCurrency) -> U256 {
        self.total_cost.get(&currency).copied().unwrap_or_default()
    }

    /// The currencies the pooled transactions pay in.
    pub fn fee_currencies(&self) -> BTreeSet<FeeCurrency> {
        self.txs.values().map(|tx| tx.fee_currency()).collect()
    }

    /// Inserts `tx`, replacing the transaction with the same nonce if `tx` pays at least
    /// `price_bump` percent more in both fee cap and tip cap. Returns the replaced transaction.
    ///
    /// Caps in different currencies are compared by value through `rates`. If either currency is
    /// missing from `rates` they are compared nominally.
    pub fn add(
        &mut self,
        tx: Arc<PooledTx>,
        price_bump: u64,
        rates: &ExchangeRates,
    ) -> Result<Option<Arc<PooledTx>>, PoolError> {
        let nonce = tx.nonce();
        if let Some(old) = self.txs.get(&nonce) {
            if !outbids(&tx, old, price_bump, rates) {
                return Err(PoolError::ReplacementUnderpriced { nonce });
            }
        }

        self.add_cost(&tx);
        let replaced = self.txs.insert(nonce, tx);
        if let Some(old) = &replaced {
            self.sub_cost(old);
        }
        Ok(replaced)
    }

    /// Removes every transaction with a nonce below `threshold`.
    pub fn forward(&mut self, threshold: u64) -> Vec<Arc<PooledTx>> {
        let kept = self.txs.split_off(&threshold);
        let removed = core::mem::replace(&mut self.txs, kept);
        self.settle(removed.into_values().collect())
    }

    /// Removes the highest nonces until at most `threshold` transactions remain.
    pub fn cap(&mut self, threshold: usize) -> Vec<Arc<PooledTx>> {
        let mut removed = Vec::new();
        while self.txs.len() > threshold {
            if let Some((_, tx)) = self.txs.pop_last() {
                removed.push(tx);
            }
        }
        self.settle(removed)
    }

    /// Removes `tx`. Returns `None` if it is not in the list, otherwise the transactions
    /// invalidated by the removal (strict lists only).
    pub fn remove(&mut self, tx: &PooledTx) -> Option<Vec<Arc<PooledTx>>> {
        let nonce = tx.nonce();
        if self.txs.get(&nonce).is_none_or(|pooled| pooled.hash() != tx.hash()) {
            return None;
        }
        let removed = self.txs.remove(&nonce).into_iter().collect();
        self.settle(removed);

        if !self.strict {
            return Some(Vec::new());
        }
        let invalidated = self.txs.split_off(&nonce.saturating_add(1));
        Some(self.settle(invalidated.into_values().collect()))
    }

    /// Removes and returns the run of consecutive nonces starting at the lowest pooled nonce, if
    /// that nonce is not above `start`.
    pub fn ready(&mut self, start: u64) -> Vec<Arc<PooledTx>> {
        let mut ready = Vec::new();
        let Some(mut next) = self.txs.keys().next().copied().filter(|first| *first <= start) else {
            return ready;
        };
        while let Some(entry) = self.txs.first_entry().filter(|entry| *entry.key() == next) {
            ready.push(entry.remove());
            next += 1;
        }
        self.settle(ready)
    }

    /// The transactions sorted by nonce.
    pub fn flatten(&self) -> Vec<Arc<PooledTx>> {
        self.txs.values().cloned().collect()
    }

    /// Removes every transaction whose fee currency is no longer whitelisted.
    pub fn filter_whitelisted(&mut self, rates: &ExchangeRates) -> Filtered {
        self.filter(|tx| !is_whitelisted(tx.fee_currency(), rates))
    }

    /// Removes every transaction exceeding `gas_limit` or the sender's balance.
    ///
    /// Costs accumulate per currency in nonce order: a transaction is removed when the costs of
    /// the lower-nonce transactions kept so far plus its own exceed the balance in its currency.
    /// Transactions paying in a currency missing from `balances` are kept.
    pub fn filter_balance(
        &mut self,
        balances: &HashMap<FeeCurrency, U256>,
        gas_limit: u64,
    ) -> Filtered {
        let mut committed: HashMap<FeeCurrency, U256> = HashMap::new();
        self.filter(|tx| {
            if tx.gas_limit() > gas_limit {
                return true;
            }
            let Some(balance) = balances.get(&tx.fee_currency()) else {
                return false;
            };
            let total = committed.entry(tx.fee_currency()).or_default();
            let with_tx = total.saturating_add(tx.cost());
            if with_tx > *balance {
                return true;
            }
            *total = with_tx;
            false
        })
    }

    /// Removes the transactions matching `remove`, visiting them in nonce order. In a strict list
    /// every transaction above the lowest removed nonce is invalidated as well.
    fn filter(&mut self, mut remove: impl FnMut(&PooledTx) -> bool) -> Filtered {
        let nonces: Vec<u64> = self
            .txs
            .iter()
            .filter(|(_, tx)| remove(tx.as_ref()))
            .map(|(nonce, _)| *nonce)
            .collect();
        let Some(lowest) = nonces.first().copied() else {
            return (Vec::new(), Vec::new());
        };

        let removed = nonces.iter().filter_map(|nonce| self.txs.remove(nonce)).collect();
        let removed = self.settle(removed);
        let invalidated = if self.strict {
            let invalidated = self.txs.split_off(&lowest.saturating_add(1));
            self.settle(invalidated.into_values().collect())
        } else {
            Vec::new()
        };
        (removed, invalidated)
    }

    /// Reverses the ledger entries of transactions taken out of the list.
    fn settle(&mut self, removed: Vec<Arc<PooledTx>>) -> Vec<Arc<PooledTx>> {
        for tx in &removed {
            self.sub_cost(tx);
        }
        removed
    }

    fn add_cost(&mut self, tx: &PooledTx) {
        let total = self.total_cost.entry(tx.fee_currency()).or_default();
        *total = total.saturating_add(tx.cost());
    }

    fn sub_cost(&mut self, tx: &PooledTx) {
        let currency = tx.fee_currency();
        let Some(total) = self.total_cost.get_mut(&currency) else { return };
        *total = total.saturating_sub(tx.cost());
        if total.is_zero() {
            self.total_cost.remove(&currency);
        }
    }
}

/// Returns `true` if `new` pays strictly more than `old` and at least `price_bump` percent more,
/// in both fee cap and tip cap.
fn outbids(new: &PooledTx, old: &PooledTx, price_bump: u64, rates: &ExchangeRates) -> bool {
    let clears = |new_cap: u128, old_cap: u128| {
        let new_cap = U256::from(new_cap);
        let old_cap = U256::from(old_cap);
        let threshold = old_cap * U256::from(100 + price_bump) / U256::from(100);
        let cmp = |a: U256, b: U256| {
            compare(a, new.fee_currency(), b, old.fee_currency(), rates)
                .unwrap_or_else(|_| a.cmp(&b))
        };
        cmp(new_cap, old_cap).is_gt() && cmp(new_cap, threshold).is_ge()
    };
    clears(new.max_fee_per_gas(), old.max_fee_per_gas()) &&
        clears(new.max_priority_fee_per_gas(), old.max_priority_fee_per_gas())
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

    const USD: Address = address!("0x765DE816845861e75A25fCA122bb6898B8B1282a");
    const EUR: Address = address!("0xD8763CBa276a3738E6DE85b4b3bF5FDed6D6cA73");

    fn rates() -> ExchangeRates {
        ExchangeRates::from([(USD, ExchangeRate::new(U256::from(2), U256::from(1)).unwrap())])
    }

    /// A USD transaction costing `cost`: 1 gas at a fee cap of `cost`.
    fn usd(signer: &TestSigner, nonce: u64, cost: u128) -> Arc<PooledTx> {
        Arc::new(signer.pooled(cip64_tx(nonce, 1, cost, cost, Some(USD))))
    }

    fn native(signer: &TestSigner, nonce: u64, fee_cap: u128) -> Arc<PooledTx> {
        Arc::new(signer.pooled(native_tx(nonce, 1, fee_cap, fee_cap)))
    }

    fn assert_ledger(list: &CeloTxList) {
        for currency in [FeeCurrency::NATIVE, FeeCurrency::token(USD), FeeCurrency::token(EUR)] {
            let expected = list
                .flatten()
                .iter()
                .filter(|tx| tx.fee_currency() == currency)
                .fold(U256::ZERO, |sum, tx| sum + tx.cost());
            assert_eq!(list.total_cost_for(currency), expected, "{currency}");
        }
    }

    #[test]
    fn test_add_tracks_cost_per_currency() {
        let signer = TestSigner::new(1);
        let mut list = CeloTxList::new(true);
        list.add(usd(&signer, 0, 400), 10, &rates()).unwrap();
        list.add(native(&signer, 1, 50), 10, &rates()).unwrap();

        assert_eq!(list.total_cost_for(FeeCurrency::token(USD)), U256::from(400));
        assert_eq!(list.total_cost_for(FeeCurrency::NATIVE), U256::from(50));
        assert_eq!(list.fee_currencies().len(), 2);
        assert_ledger(&list);
    }

    #[test]
    fn test_replacement_within_same_currency_reconciles_ledger() {
        let signer = TestSigner::new(1);
        let mut list = CeloTxList::new(true);
        list.add(usd(&signer, 0, 400), 10, &rates()).unwrap();

        let replaced = list.add(usd(&signer, 0, 440), 10, &rates()).unwrap();
        assert_eq!(replaced.map(|tx| tx.cost()), Some(U256::from(400)));
        assert_eq!(list.total_cost_for(FeeCurrency::token(USD)), U256::from(440));
        assert_ledger(&list);
    }

    #[test]
    fn test_replacement_across_currencies_moves_cost() {
        let signer = TestSigner::new(1);
        let mut list = CeloTxList::new(true);
        list.add(native(&signer, 0, 100), 10, &rates()).unwrap();

        // 60 USD are worth 120 native: enough of a bump over 100 native.
        list.add(usd(&signer, 0, 60), 10, &rates()).unwrap();
        assert_eq!(list.total_cost_for(FeeCurrency::NATIVE), U256::ZERO);
        assert_eq!(list.total_cost_for(FeeCurrency::token(USD)), U256::from(60));
        assert_ledger(&list);
    }

    #[rstest]
    #[case::no_bump(400, false)]
    #[case::below_bump(439, false)]
    #[case::exact_bump(440, true)]
    fn test_replacement_price_bump(#[case] new_cost: u128, #[case] accepted: bool) {
        let signer = TestSigner::new(1);
        let mut list = CeloTxList::new(true);
        list.add(usd(&signer, 0, 400), 10, &rates()).unwrap();

        let result = list.add(usd(&signer, 0, new_cost), 10, &rates());
        assert_eq!(result.is_ok(), accepted);
        if !accepted {
            assert!(matches!(result, Err(PoolError::ReplacementUnderpriced { nonce: 0 })));
            assert_eq!(list.total_cost_for(FeeCurrency::token(USD)), U256::from(400));
        }
        assert_ledger(&list);
    }

    #[test]
    fn test_balance_filter_drops_unaffordable() {
        let signer = TestSigner::new(1);
        let mut list = CeloTxList::new(false);
        list.add(usd(&signer, 0, 400), 10, &rates()).unwrap();
        list.add(usd(&signer, 1, 700), 10, &rates()).unwrap();

        let balances = HashMap::from([(FeeCurrency::token(USD), U256::from(1_000))]);
        let (dropped, invalidated) = list.filter_balance(&balances, 30_000_000);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].nonce(), 1);
        assert!(invalidated.is_empty());
        assert_eq!(list.total_cost_for(FeeCurrency::token(USD)), U256::from(400));
    }

    #[test]
    fn test_strict_balance_filter_invalidates_higher_nonces() {
        let signer = TestSigner::new(1);
        let mut list = CeloTxList::new(true);
        list.add(usd(&signer, 0, 700), 10, &rates()).unwrap();
        list.add(native(&signer, 1, 10), 10, &rates()).unwrap();
        list.add(usd(&signer, 2, 100), 10, &rates()).unwrap();

        let balances = HashMap::from([
            (FeeCurrency::token(USD), U256::from(500)),
            (FeeCurrency::NATIVE, U256::from(1_000)),
        ]);
        let (dropped, invalidated) = list.filter_balance(&balances, 30_000_000);
        assert_eq!(dropped.iter().map(|tx| tx.nonce()).collect::<Vec<_>>(), vec![0]);
        assert_eq!(invalidated.iter().map(|tx| tx.nonce()).collect::<Vec<_>>(), vec![1, 2]);
        assert!(list.is_empty());
        assert_ledger(&list);
    }

    #[test]
    fn test_balance_filter_drops_over_gas_limit() {
        let signer = TestSigner::new(1);
        let mut list = CeloTxList::new(false);
        list.add(Arc::new(signer.pooled(native_tx(0, 50_000, 1, 1))), 10, &rates()).unwrap();

        let balances = HashMap::from([(FeeCurrency::NATIVE, U256::MAX)]);
        let (dropped, _) = list.filter_balance(&balances, 30_000);
        assert_eq!(dropped.len(), 1);
    }

    #[test]
    fn test_whitelist_filter() {
        let signer = TestSigner::new(1);
        let mut list = CeloTxList::new(true);
        list.add(native(&signer, 0, 10), 10, &rates()).unwrap();
        list.add(usd(&signer, 1, 100), 10, &rates()).unwrap();
        list.add(native(&signer, 2, 10), 10, &rates()).unwrap();

        // Still whitelisted: nothing happens.
        assert_eq!(list.filter_whitelisted(&rates()), (vec![], vec![]));

        let (dropped, invalidated) = list.filter_whitelisted(&ExchangeRates::new());
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].fee_currency(), FeeCurrency::token(USD));
        assert_eq!(invalidated.len(), 1);
        assert_eq!(list.len(), 1);
        assert_eq!(list.total_cost_for(FeeCurrency::token(USD)), U256::ZERO);
        assert_ledger(&list);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let signer = TestSigner::new(1);
        let mut list = CeloTxList::new(false);
        let tx = usd(&signer, 0, 400);
        list.add(tx.clone(), 10, &rates()).unwrap();

        assert_eq!(list.remove(&tx), Some(vec![]));
        assert_eq!(list.remove(&tx), None);
        assert_eq!(list.total_cost_for(FeeCurrency::token(USD)), U256::ZERO);
    }

    #[test]
    fn test_remove_of_other_tx_with_same_nonce_is_noop() {
        let signer = TestSigner::new(1);
        let mut list = CeloTxList::new(false);
        list.add(usd(&signer, 0, 400), 10, &rates()).unwrap();

        assert_eq!(list.remove(&usd(&signer, 0, 500)), None);
        assert_eq!(list.total_cost_for(FeeCurrency::token(USD)), U256::from(400));
    }

    #[test]
    fn test_forward_cap_and_ready_update_ledger() {
        let signer = TestSigner::new(1);
        let mut list = CeloTxList::new(false);
        for nonce in [0, 1, 2, 4, 5] {
            list.add(usd(&signer, nonce, 100), 10, &rates()).unwrap();
        }

        assert_eq!(list.forward(1).len(), 1);
        assert_eq!(list.cap(3).iter().map(|tx| tx.nonce()).collect::<Vec<_>>(), vec![5]);
        assert_ledger(&list);

        let ready = list.ready(1);
        assert_eq!(ready.iter().map(|tx| tx.nonce()).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(list.flatten().iter().map(|tx| tx.nonce()).collect::<Vec<_>>(), vec![4]);
        assert_eq!(list.total_cost_for(FeeCurrency::token(USD)), U256::from(100));

        // The lowest nonce is above the start: nothing is ready.
        assert!(list.ready(3).is_empty());
    }
}
