use alloy_primitives::{keccak256, Address, Bytes, ChainId, Signature, TxKind, B256, U256};
use alloy_rlp::{BufMut, Decodable, Encodable, Header};

use crate::{
    decode_optional_address, encode_optional_address, optional_address_len, CeloSignableTx,
    CeloTxType, FeeCurrency, SignedTx,
};

/// Number of fields of a signed [`TxCeloLegacy`]. An Ethereum legacy transaction has 9.
pub const CELO_LEGACY_SIGNED_FIELDS: usize = 12;

/// A legacy transaction of the Celo L1, with fee currency and gateway fee fields.
///
/// The signed RLP list is `[nonce, gas_price, gas, fee_currency, gateway_fee_recipient,
/// gateway_fee, to, value, data, v, r, s]`.
/// `v` is `27 + y_parity` for unprotected signatures and `chain_id * 2 + 35 + y_parity` for
/// EIP-155 protected ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TxCeloLegacy {
    /// Chain id for EIP-155 protected transactions.
    pub chain_id: Option<ChainId>,
    /// Sender nonce.
    pub nonce: u64,
    /// Gas price.
    pub gas_price: u128,
    /// Gas limit.
    pub gas_limit: u64,
    /// Fee currency as found on the wire. `None` pays in the native currency.
    pub fee_currency: Option<Address>,
    /// Gateway fee recipient.
    pub gateway_fee_recipient: Option<Address>,
    /// Gateway fee.
    pub gateway_fee: U256,
    /// Recipient, or contract creation.
    pub to: TxKind,
    /// Value transferred.
    pub value: U256,
    /// Call data or init code.
    pub input: Bytes,
}

impl TxCeloLegacy {
    /// The canonical fee currency selector.
    pub fn fee_currency(&self) -> FeeCurrency {
        FeeCurrency::new(self.fee_currency)
    }

    /// Returns `true` if the signature commits to a chain id.
    pub const fn is_protected(&self) -> bool {
        self.chain_id.is_some()
    }

    fn fields_len(&self) -> usize {
        self.nonce.length() +
            self.gas_price.length() +
            self.gas_limit.length() +
            optional_address_len(&self.fee_currency) +
            optional_address_len(&self.gateway_fee_recipient) +
            self.gateway_fee.length() +
            self.to.length() +
            self.value.length() +
            self.input.length()
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        encode_optional_address(&self.fee_currency, out);
        encode_optional_address(&self.gateway_fee_recipient, out);
        self.gateway_fee.encode(out);
        self.to.encode(out);
        self.value.encode(out);
        self.input.encode(out);
    }

    /// The raw `v` value of `signature` for this transaction.
    pub fn v(&self, signature: &Signature) -> u64 {
        let parity = u64::from(signature.v());
        match self.chain_id {
            Some(chain_id) => chain_id * 2 + 35 + parity,
            None => 27 + parity,
        }
    }

    /// Decodes a signed transaction from its RLP list.
    pub fn decode_signed(buf: &mut &[u8]) -> alloy_rlp::Result<SignedTx<Self>> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        let remaining = buf.len();

        let nonce = Decodable::decode(buf)?;
        let gas_price = Decodable::decode(buf)?;
        let gas_limit = Decodable::decode(buf)?;
        let fee_currency = decode_optional_address(buf)?;
        let gateway_fee_recipient = decode_optional_address(buf)?;
        let gateway_fee = Decodable::decode(buf)?;
        let to = Decodable::decode(buf)?;
        let value = Decodable::decode(buf)?;
        let input = Decodable::decode(buf)?;
        let v = u64::decode(buf)?;
        let r = Decodable::decode(buf)?;
        let s = Decodable::decode(buf)?;

        if remaining - buf.len() != header.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: remaining - buf.len(),
            });
        }

        let (chain_id, y_parity) = match v {
            27 | 28 => (None, v == 28),
            v if v >= 35 => (Some((v - 35) / 2), (v - 35) % 2 == 1),
            _ => return Err(alloy_rlp::Error::Custom("invalid v value")),
        };
        let tx = Self {
            chain_id,
            nonce,
            gas_price,
            gas_limit,
            fee_currency,
            gateway_fee_recipient,
            gateway_fee,
            to,
            value,
            input,
        };
        Ok(SignedTx::new(tx, Signature::new(r, s, y_parity)))
    }
}

impl CeloSignableTx for TxCeloLegacy {
    fn tx_type(&self) -> CeloTxType {
        CeloTxType::CeloLegacy
    }

    /// Protected transactions append `chain_id, 0, 0` to the unsigned fields.
    fn signature_hash(&self) -> B256 {
        let mut payload_length = self.fields_len();
        if let Some(chain_id) = self.chain_id {
            payload_length += chain_id.length() + 2;
        }
        let mut buf = Vec::new();
        Header { list: true, payload_length }.encode(&mut buf);
        self.encode_fields(&mut buf);
        if let Some(chain_id) = self.chain_id {
            chain_id.encode(&mut buf);
            0u8.encode(&mut buf);
            0u8.encode(&mut buf);
        }
        keccak256(&buf)
    }

    fn encoded_signed_len(&self, signature: &Signature) -> usize {
        let payload_length = self.fields_len() +
            self.v(signature).length() +
            signature.r().length() +
            signature.s().length();
        Header { list: true, payload_length }.length_with_payload()
    }

    fn encode_signed(&self, signature: &Signature, out: &mut dyn BufMut) {
        let payload_length = self.fields_len() +
            self.v(signature).length() +
            signature.r().length() +
            signature.s().length();
        Header { list: true, payload_length }.encode(out);
        self.encode_fields(out);
        self.v(signature).encode(out);
        signature.r().encode(out);
        signature.s().encode(out);
    }
}
