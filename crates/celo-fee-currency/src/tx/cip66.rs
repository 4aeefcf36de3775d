use alloy_eips::eip2930::AccessList;
use alloy_primitives::{Address, Bytes, ChainId, TxKind, U256};

use crate::{CeloTxType, CIP66_TX_TYPE_ID};

/// A [CIP-66](https://github.com/celo-org/celo-proposals/blob/master/CIPs/cip-0066.md) fee
/// currency denominated transaction.
///
/// Fee caps are denominated in the native currency, while `max_fee_in_fee_currency` bounds the
/// total fee paid in the fee currency after conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TxCip66 {
    /// Chain the transaction is signed for.
    pub chain_id: ChainId,
    /// Sender nonce.
    pub nonce: u64,
    /// Maximum tip per gas.
    pub max_priority_fee_per_gas: u128,
    /// Maximum total fee per gas.
    pub max_fee_per_gas: u128,
    /// Gas limit.
    pub gas_limit: u64,
    /// Recipient, or contract creation.
    pub to: TxKind,
    /// Value transferred.
    pub value: U256,
    /// Call data or init code.
    pub input: Bytes,
    /// EIP-2930 access list.
    pub access_list: AccessList,
    /// Fee currency as found on the wire. `None` pays in the native currency.
    pub fee_currency: Option<Address>,
    /// Upper bound of the total fee, denominated in the fee currency.
    pub max_fee_in_fee_currency: U256,
}

impl TxCip66 {
    /// The most the sender pays in the fee currency.
    pub const fn max_fee_in_currency(&self) -> U256 {
        self.max_fee_in_fee_currency
    }
}

impl_fee_currency_tx!(TxCip66, CeloTxType::Cip66, CIP66_TX_TYPE_ID, max_fee_in_fee_currency);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CeloSignableTx, FeeCurrency, SignedTx};
    use alloy_primitives::{address, Signature};

    fn sample() -> TxCip66 {
        TxCip66 {
            chain_id: 44787,
            nonce: 0,
            max_priority_fee_per_gas: 2,
            max_fee_per_gas: 10,
            gas_limit: 50_000,
            to: TxKind::Create,
            value: U256::ZERO,
            input: Bytes::from_static(&[0x60, 0x80]),
            access_list: AccessList::default(),
            fee_currency: Some(address!("0x765DE816845861e75A25fCA122bb6898B8B1282a")),
            max_fee_in_fee_currency: U256::from(1_000_000),
        }
    }

    #[test]
    fn test_signed_encoding_roundtrip() {
        let signed = SignedTx::new(sample(), Signature::new(U256::from(3), U256::from(4), false));
        let mut buf = Vec::new();
        signed.encode_signed(signed.signature(), &mut buf);
        assert_eq!(buf[0], CIP66_TX_TYPE_ID);

        let decoded = TxCip66::decode_signed(&mut &buf[1..]).unwrap();
        assert_eq!(decoded.max_fee_in_currency(), U256::from(1_000_000));
        assert_eq!(decoded, signed);
    }

    #[test]
    fn test_fee_currency_and_type() {
        let usd = address!("0x765DE816845861e75A25fCA122bb6898B8B1282a");
        assert_eq!(sample().fee_currency(), FeeCurrency::token(usd));
        let zero = TxCip66 { fee_currency: Some(Address::ZERO), ..sample() };
        assert_eq!(zero.fee_currency(), FeeCurrency::NATIVE);
        assert_eq!(sample().tx_type(), CeloTxType::Cip66);
    }

    #[test]
    fn test_signature_hash_covers_max_fee_in_currency() {
        let other = TxCip66 { max_fee_in_fee_currency: U256::from(1), ..sample() };
        assert_ne!(other.signature_hash(), sample().signature_hash());
    }
}
