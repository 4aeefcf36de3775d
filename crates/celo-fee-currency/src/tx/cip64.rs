use alloy_eips::eip2930::AccessList;
use alloy_primitives::{Address, Bytes, ChainId, TxKind, U256};

use crate::{CeloTxType, CIP64_TX_TYPE_ID};

/// A [CIP-64](https://github.com/celo-org/celo-proposals/blob/master/CIPs/cip-0064.md) dynamic
/// fee transaction. Fee caps are denominated in the fee currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TxCip64 {
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
}

impl_fee_currency_tx!(TxCip64, CeloTxType::Cip64, CIP64_TX_TYPE_ID);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CeloSignableTx, FeeCurrency, SignedTx};
    use alloy_primitives::{address, hex, keccak256, Signature};

    fn sample() -> TxCip64 {
        TxCip64 {
            chain_id: 44787,
            nonce: 3,
            max_priority_fee_per_gas: 1_000_000_000,
            max_fee_per_gas: 30_000_000_000,
            gas_limit: 21_000,
            to: TxKind::Call(address!("0x00000000000000000000000000000000000000ff")),
            value: U256::from(1),
            input: Bytes::new(),
            access_list: AccessList::default(),
            fee_currency: Some(address!("0x765DE816845861e75A25fCA122bb6898B8B1282a")),
        }
    }

    #[test]
    fn test_signed_encoding_roundtrip() {
        let signature = Signature::new(U256::from(7), U256::from(9), true);
        let signed = SignedTx::new(sample(), signature);

        let mut buf = Vec::new();
        signed.encode_signed(signed.signature(), &mut buf);
        assert_eq!(buf[0], CIP64_TX_TYPE_ID);
        assert_eq!(buf.len(), signed.encoded_signed_len(signed.signature()));

        let decoded = TxCip64::decode_signed(&mut &buf[1..]).unwrap();
        assert_eq!(decoded, signed);
        assert_eq!(decoded.hash(), &keccak256(&buf));
    }

    #[test]
    fn test_native_fee_currency_is_empty_string() {
        let tx = TxCip64 { fee_currency: None, ..sample() };
        let signature = Signature::new(U256::from(1), U256::from(1), false);
        let mut buf = Vec::new();
        tx.encode_signed(&signature, &mut buf);
        // access list, fee currency, y parity, r, s
        assert!(hex::encode(&buf).ends_with("c080800101"));
        assert_eq!(tx.fee_currency(), FeeCurrency::NATIVE);
    }

    #[test]
    fn test_signature_hash_covers_fee_currency() {
        let native = TxCip64 { fee_currency: None, ..sample() };
        assert_ne!(native.signature_hash(), sample().signature_hash());
    }
}
