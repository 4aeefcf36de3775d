//! Transaction types carrying a fee currency, their wire encodings and the fork-gated signer.
//!
//! Three transaction types extend the Ethereum set:
//!
//! - [`TxCip64`] (`0x7b`): a dynamic fee transaction paying in an optional fee currency.
//! - [`TxCip66`] (`0x7a`): like `0x7b`, plus a cap on the total fee denominated in the fee
//!   currency.
//! - [`TxCeloLegacy`]: the pre-L2 legacy transaction with fee currency and gateway fee fields. It
//!   has no type byte and is told apart from an Ethereum legacy transaction by its field count.
//!
//! All of them, together with the Ethereum types, are wrapped by [`CeloTxEnvelope`].

use alloy_primitives::{keccak256, Address, Signature, B256};
use alloy_rlp::{BufMut, Decodable, Encodable, EMPTY_STRING_CODE};

/// Implements the RLP codec and [`CeloSignableTx`] of a typed fee currency transaction.
///
/// The payload starts with the dynamic fee fields shared by every typed fee currency transaction,
/// `[chain_id, nonce, max_priority_fee_per_gas, max_fee_per_gas, gas_limit, to, value, input,
/// access_list, fee_currency]`, followed by the `$extra` fields in order.
/// - `$tx`: the transaction struct
/// - `$tx_type`: its [`CeloTxType`]
/// - `$type_id`: the EIP-2718 type byte
macro_rules! impl_fee_currency_tx {
    ($tx:ident, $tx_type:expr, $type_id:expr $(, $extra:ident)* $(,)?) => {
        impl $tx {
            /// The canonical fee currency selector.
            pub fn fee_currency(&self) -> $crate::FeeCurrency {
                $crate::FeeCurrency::new(self.fee_currency)
            }

            fn fields_len(&self) -> usize {
                use alloy_rlp::Encodable;
                self.chain_id.length() +
                    self.nonce.length() +
                    self.max_priority_fee_per_gas.length() +
                    self.max_fee_per_gas.length() +
                    self.gas_limit.length() +
                    self.to.length() +
                    self.value.length() +
                    self.input.length() +
                    self.access_list.length() +
                    $crate::tx::optional_address_len(&self.fee_currency)
                    $(+ self.$extra.length())*
            }

            fn encode_fields(&self, out: &mut dyn alloy_rlp::BufMut) {
                use alloy_rlp::Encodable;
                self.chain_id.encode(out);
                self.nonce.encode(out);
                self.max_priority_fee_per_gas.encode(out);
                self.max_fee_per_gas.encode(out);
                self.gas_limit.encode(out);
                self.to.encode(out);
                self.value.encode(out);
                self.input.encode(out);
                self.access_list.encode(out);
                $crate::tx::encode_optional_address(&self.fee_currency, out);
                $(self.$extra.encode(out);)*
            }

            fn decode_fields(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
                use alloy_rlp::Decodable;
                Ok(Self {
                    chain_id: Decodable::decode(buf)?,
                    nonce: Decodable::decode(buf)?,
                    max_priority_fee_per_gas: Decodable::decode(buf)?,
                    max_fee_per_gas: Decodable::decode(buf)?,
                    gas_limit: Decodable::decode(buf)?,
                    to: Decodable::decode(buf)?,
                    value: Decodable::decode(buf)?,
                    input: Decodable::decode(buf)?,
                    access_list: Decodable::decode(buf)?,
                    fee_currency: $crate::tx::decode_optional_address(buf)?,
                    $($extra: Decodable::decode(buf)?,)*
                })
            }

            /// Decodes the signed RLP list that follows the type byte.
            pub fn decode_signed(buf: &mut &[u8]) -> alloy_rlp::Result<$crate::SignedTx<Self>> {
                let header = alloy_rlp::Header::decode(buf)?;
                if !header.list {
                    return Err(alloy_rlp::Error::UnexpectedString);
                }
                let remaining = buf.len();
                let tx = Self::decode_fields(buf)?;
                let signature = $crate::tx::decode_signature_fields(buf)?;
                if remaining - buf.len() != header.payload_length {
                    return Err(alloy_rlp::Error::ListLengthMismatch {
                        expected: header.payload_length,
                        got: remaining - buf.len(),
                    });
                }
                Ok($crate::SignedTx::new(tx, signature))
            }
        }

        impl $crate::CeloSignableTx for $tx {
            fn tx_type(&self) -> $crate::CeloTxType {
                $tx_type
            }

            fn signature_hash(&self) -> alloy_primitives::B256 {
                use alloy_rlp::BufMut;
                let header = alloy_rlp::Header { list: true, payload_length: self.fields_len() };
                let mut buf = Vec::with_capacity(1 + header.length_with_payload());
                buf.put_u8($type_id);
                header.encode(&mut buf);
                self.encode_fields(&mut buf);
                alloy_primitives::keccak256(&buf)
            }

            fn encoded_signed_len(&self, signature: &alloy_primitives::Signature) -> usize {
                let payload_length =
                    self.fields_len() + $crate::tx::signature_fields_len(signature);
                1 + alloy_rlp::Header { list: true, payload_length }.length_with_payload()
            }

            fn encode_signed(
                &self,
                signature: &alloy_primitives::Signature,
                out: &mut dyn alloy_rlp::BufMut,
            ) {
                use alloy_rlp::BufMut;
                out.put_u8($type_id);
                let payload_length =
                    self.fields_len() + $crate::tx::signature_fields_len(signature);
                alloy_rlp::Header { list: true, payload_length }.encode(out);
                self.encode_fields(out);
                $crate::tx::encode_signature_fields(signature, out);
            }
        }
    };
}

mod celo_legacy;
pub use celo_legacy::*;

mod cip64;
pub use cip64::*;

mod cip66;
pub use cip66::*;

mod envelope;
pub use envelope::*;

mod error;
pub use error::*;

mod signing;
pub use signing::*;

mod tx_type;
pub use tx_type::*;

/// A Celo-specific transaction that can be signed and encoded.
pub trait CeloSignableTx {
    /// The transaction type.
    fn tx_type(&self) -> CeloTxType;

    /// The hash the sender signs.
    fn signature_hash(&self) -> B256;

    /// Length of [`encode_signed`](Self::encode_signed).
    fn encoded_signed_len(&self, signature: &Signature) -> usize;

    /// Writes the signed transaction in its EIP-2718 form, i.e. prefixed with the type byte for
    /// typed transactions.
    fn encode_signed(&self, signature: &Signature, out: &mut dyn BufMut);
}

/// A transaction with its signature and hash.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Deref)]
pub struct SignedTx<T> {
    #[deref]
    tx: T,
    signature: Signature,
    hash: B256,
}

impl<T: CeloSignableTx> SignedTx<T> {
    /// Attaches `signature` to `tx` and computes the transaction hash.
    pub fn new(tx: T, signature: Signature) -> Self {
        let mut buf = Vec::with_capacity(tx.encoded_signed_len(&signature));
        tx.encode_signed(&signature, &mut buf);
        Self { tx, signature, hash: keccak256(&buf) }
    }

    /// The transaction without signature.
    pub const fn tx(&self) -> &T {
        &self.tx
    }

    /// The signature.
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The transaction hash.
    pub const fn hash(&self) -> &B256 {
        &self.hash
    }

    /// Splits into transaction and signature.
    pub fn into_parts(self) -> (T, Signature) {
        (self.tx, self.signature)
    }
}

/// Length of an optional address field. `None` is the empty string.
pub(crate) fn optional_address_len(address: &Option<Address>) -> usize {
    address.as_ref().map_or(1, Encodable::length)
}

/// Writes an optional address field. `None` is the empty string.
pub(crate) fn encode_optional_address(address: &Option<Address>, out: &mut dyn BufMut) {
    match address {
        Some(address) => address.encode(out),
        None => out.put_u8(EMPTY_STRING_CODE),
    }
}

/// Reads an optional address field. The empty string is `None`.
pub(crate) fn decode_optional_address(buf: &mut &[u8]) -> alloy_rlp::Result<Option<Address>> {
    match buf.first() {
        None => Err(alloy_rlp::Error::InputTooShort),
        Some(&EMPTY_STRING_CODE) => {
            *buf = &buf[1..];
            Ok(None)
        }
        Some(_) => Address::decode(buf).map(Some),
    }
}

/// Length of the `y_parity, r, s` signature fields.
pub(crate) fn signature_fields_len(signature: &Signature) -> usize {
    signature.v().length() + signature.r().length() + signature.s().length()
}

/// Writes the `y_parity, r, s` signature fields.
pub(crate) fn encode_signature_fields(signature: &Signature, out: &mut dyn BufMut) {
    signature.v().encode(out);
    signature.r().encode(out);
    signature.s().encode(out);
}

/// Reads the `y_parity, r, s` signature fields.
pub(crate) fn decode_signature_fields(buf: &mut &[u8]) -> alloy_rlp::Result<Signature> {
    let y_parity = bool::decode(buf)?;
    let r = Decodable::decode(buf)?;
    let s = Decodable::decode(buf)?;
    Ok(Signature::new(r, s, y_parity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_optional_address_field() {
        let mut buf = Vec::new();
        encode_optional_address(&None, &mut buf);
        assert_eq!(buf, [EMPTY_STRING_CODE]);
        assert_eq!(optional_address_len(&None), 1);
        assert_eq!(decode_optional_address(&mut buf.as_slice()).unwrap(), None);

        let usd = address!("0x765DE816845861e75A25fCA122bb6898B8B1282a");
        let mut buf = Vec::new();
        encode_optional_address(&Some(usd), &mut buf);
        assert_eq!(buf.len(), 21);
        assert_eq!(buf[0], 0x94);
        assert_eq!(optional_address_len(&Some(usd)), 21);
        assert_eq!(decode_optional_address(&mut buf.as_slice()).unwrap(), Some(usd));
    }

    #[test]
    fn test_optional_address_rejects_short_string() {
        let buf = [0x82, 0x01, 0x02];
        assert!(decode_optional_address(&mut &buf[..]).is_err());
    }
}
