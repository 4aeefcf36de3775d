use alloy_consensus::{Transaction, TxEnvelope};
use alloy_eips::{
    eip2718::{Decodable2718, Eip2718Error, Eip2718Result, Encodable2718, Typed2718},
    eip2930::AccessList,
};
use alloy_primitives::{Bytes, ChainId, Signature, TxKind, B256, U256};
use alloy_rlp::{BufMut, Decodable, Encodable, Header};

use crate::{
    CeloSignableTx, CeloTxType, FeeCurrency, SignedTx, TxCeloLegacy, TxCip64, TxCip66,
    TxDecodeError, CELO_LEGACY_SIGNED_FIELDS, CIP64_TX_TYPE_ID, CIP66_TX_TYPE_ID,
};

/// Any transaction accepted on a Celo chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CeloTxEnvelope {
    /// An Ethereum transaction.
    Ethereum(TxEnvelope),
    /// A pre-L2 legacy transaction with fee currency fields.
    CeloLegacy(SignedTx<TxCeloLegacy>),
    /// A CIP-64 transaction.
    Cip64(SignedTx<TxCip64>),
    /// A CIP-66 transaction.
    Cip66(SignedTx<TxCip66>),
}

impl From<TxEnvelope> for CeloTxEnvelope {
    fn from(tx: TxEnvelope) -> Self {
        Self::Ethereum(tx)
    }
}

impl From<SignedTx<TxCeloLegacy>> for CeloTxEnvelope {
    fn from(tx: SignedTx<TxCeloLegacy>) -> Self {
        Self::CeloLegacy(tx)
    }
}

impl From<SignedTx<TxCip64>> for CeloTxEnvelope {
    fn from(tx: SignedTx<TxCip64>) -> Self {
        Self::Cip64(tx)
    }
}

impl From<SignedTx<TxCip66>> for CeloTxEnvelope {
    fn from(tx: SignedTx<TxCip66>) -> Self {
        Self::Cip66(tx)
    }
}

impl CeloTxEnvelope {
    /// Decodes a transaction from its EIP-2718 bytes. The whole input must be consumed.
    pub fn decode_raw(mut bytes: &[u8]) -> Result<Self, TxDecodeError> {
        let tx = Self::decode_2718(&mut bytes)?;
        if !bytes.is_empty() {
            return Err(TxDecodeError::TrailingBytes(bytes.len()));
        }
        Ok(tx)
    }

    /// The transaction type.
    pub fn tx_type(&self) -> CeloTxType {
        match self {
            Self::Ethereum(tx) => tx.tx_type().into(),
            Self::CeloLegacy(_) => CeloTxType::CeloLegacy,
            Self::Cip64(_) => CeloTxType::Cip64,
            Self::Cip66(_) => CeloTxType::Cip66,
        }
    }

    /// The transaction hash.
    pub fn hash(&self) -> B256 {
        match self {
            Self::Ethereum(tx) => *tx.tx_hash(),
            Self::CeloLegacy(tx) => *tx.hash(),
            Self::Cip64(tx) => *tx.hash(),
            Self::Cip66(tx) => *tx.hash(),
        }
    }

    /// The hash the sender signed.
    pub fn signature_hash(&self) -> B256 {
        match self {
            Self::Ethereum(tx) => tx.signature_hash(),
            Self::CeloLegacy(tx) => tx.signature_hash(),
            Self::Cip64(tx) => tx.signature_hash(),
            Self::Cip66(tx) => tx.signature_hash(),
        }
    }

    /// The signature.
    pub fn signature(&self) -> &Signature {
        match self {
            Self::Ethereum(tx) => tx.signature(),
            Self::CeloLegacy(tx) => tx.signature(),
            Self::Cip64(tx) => tx.signature(),
            Self::Cip66(tx) => tx.signature(),
        }
    }

    /// The chain id the transaction is signed for. `None` for unprotected legacy transactions.
    pub fn chain_id(&self) -> Option<ChainId> {
        match self {
            Self::Ethereum(tx) => tx.chain_id(),
            Self::CeloLegacy(tx) => tx.chain_id,
            Self::Cip64(tx) => Some(tx.chain_id),
            Self::Cip66(tx) => Some(tx.chain_id),
        }
    }

    /// The sender nonce.
    pub fn nonce(&self) -> u64 {
        match self {
            Self::Ethereum(tx) => tx.nonce(),
            Self::CeloLegacy(tx) => tx.nonce,
            Self::Cip64(tx) => tx.nonce,
            Self::Cip66(tx) => tx.nonce,
        }
    }

    /// The gas limit.
    pub fn gas_limit(&self) -> u64 {
        match self {
            Self::Ethereum(tx) => tx.gas_limit(),
            Self::CeloLegacy(tx) => tx.gas_limit,
            Self::Cip64(tx) => tx.gas_limit,
            Self::Cip66(tx) => tx.gas_limit,
        }
    }

    /// The fee cap per gas, i.e. the gas price of legacy transactions, in the fee currency.
    pub fn max_fee_per_gas(&self) -> u128 {
        match self {
            Self::Ethereum(tx) => tx.max_fee_per_gas(),
            Self::CeloLegacy(tx) => tx.gas_price,
            Self::Cip64(tx) => tx.max_fee_per_gas,
            Self::Cip66(tx) => tx.max_fee_per_gas,
        }
    }

    /// The tip cap per gas. Legacy transactions tip their whole gas price.
    pub fn max_priority_fee_per_gas(&self) -> u128 {
        match self {
            Self::Ethereum(tx) => {
                tx.max_priority_fee_per_gas().unwrap_or_else(|| tx.max_fee_per_gas())
            }
            Self::CeloLegacy(tx) => tx.gas_price,
            Self::Cip64(tx) => tx.max_priority_fee_per_gas,
            Self::Cip66(tx) => tx.max_priority_fee_per_gas,
        }
    }

    /// The value transferred.
    pub fn value(&self) -> U256 {
        match self {
            Self::Ethereum(tx) => tx.value(),
            Self::CeloLegacy(tx) => tx.value,
            Self::Cip64(tx) => tx.value,
            Self::Cip66(tx) => tx.value,
        }
    }

    /// The recipient.
    pub fn kind(&self) -> TxKind {
        match self {
            Self::Ethereum(tx) => tx.kind(),
            Self::CeloLegacy(tx) => tx.to,
            Self::Cip64(tx) => tx.to,
            Self::Cip66(tx) => tx.to,
        }
    }

    /// Call data or init code.
    pub fn input(&self) -> &Bytes {
        match self {
            Self::Ethereum(tx) => tx.input(),
            Self::CeloLegacy(tx) => &tx.input,
            Self::Cip64(tx) => &tx.input,
            Self::Cip66(tx) => &tx.input,
        }
    }

    /// The access list, if the transaction type has one.
    pub fn access_list(&self) -> Option<&AccessList> {
        match self {
            Self::Ethereum(tx) => tx.access_list(),
            Self::CeloLegacy(_) => None,
            Self::Cip64(tx) => Some(&tx.access_list),
            Self::Cip66(tx) => Some(&tx.access_list),
        }
    }

    /// The currency fees are paid in.
    pub fn fee_currency(&self) -> FeeCurrency {
        match self {
            Self::Ethereum(_) => FeeCurrency::NATIVE,
            Self::CeloLegacy(tx) => tx.tx().fee_currency(),
            Self::Cip64(tx) => tx.tx().fee_currency(),
            Self::Cip66(tx) => tx.tx().fee_currency(),
        }
    }

    /// The most a CIP-66 transaction pays in its fee currency.
    pub fn max_fee_in_fee_currency(&self) -> Option<U256> {
        match self {
            Self::Cip66(tx) => Some(tx.max_fee_in_currency()),
            _ => None,
        }
    }

    /// The most the transaction can cost its sender: `value + gas_limit * max_fee_per_gas`.
    pub fn cost(&self) -> U256 {
        U256::from(self.gas_limit())
            .saturating_mul(U256::from(self.max_fee_per_gas()))
            .saturating_add(self.value())
    }

    /// The tip per gas paid above `base_fee`: `min(tip_cap, fee_cap - base_fee)`. `None` if the
    /// fee cap is below the base fee. `base_fee` must be denominated in the fee currency.
    pub fn effective_gas_tip(&self, base_fee: U256) -> Option<U256> {
        let fee_cap = U256::from(self.max_fee_per_gas());
        let tip_cap = U256::from(self.max_priority_fee_per_gas());
        fee_cap.checked_sub(base_fee).map(|available| available.min(tip_cap))
    }
}

impl Typed2718 for CeloTxEnvelope {
    fn ty(&self) -> u8 {
        self.tx_type().ty()
    }
}

impl Encodable2718 for CeloTxEnvelope {
    fn type_flag(&self) -> Option<u8> {
        match self {
            Self::Ethereum(tx) => tx.type_flag(),
            Self::CeloLegacy(_) => None,
            Self::Cip64(_) => Some(CIP64_TX_TYPE_ID),
            Self::Cip66(_) => Some(CIP66_TX_TYPE_ID),
        }
    }

    fn encode_2718_len(&self) -> usize {
        match self {
            Self::Ethereum(tx) => tx.encode_2718_len(),
            Self::CeloLegacy(tx) => tx.encoded_signed_len(tx.signature()),
            Self::Cip64(tx) => tx.encoded_signed_len(tx.signature()),
            Self::Cip66(tx) => tx.encoded_signed_len(tx.signature()),
        }
    }

    fn encode_2718(&self, out: &mut dyn BufMut) {
        match self {
            Self::Ethereum(tx) => tx.encode_2718(out),
            Self::CeloLegacy(tx) => tx.encode_signed(tx.signature(), out),
            Self::Cip64(tx) => tx.encode_signed(tx.signature(), out),
            Self::Cip66(tx) => tx.encode_signed(tx.signature(), out),
        }
    }
}

impl Decodable2718 for CeloTxEnvelope {
    fn typed_decode(ty: u8, buf: &mut &[u8]) -> Eip2718Result<Self> {
        match ty {
            CIP64_TX_TYPE_ID => Ok(Self::Cip64(TxCip64::decode_signed(buf)?)),
            CIP66_TX_TYPE_ID => Ok(Self::Cip66(TxCip66::decode_signed(buf)?)),
            _ => TxEnvelope::typed_decode(ty, buf).map(Self::Ethereum),
        }
    }

    fn fallback_decode(buf: &mut &[u8]) -> Eip2718Result<Self> {
        if count_list_fields(buf)? == CELO_LEGACY_SIGNED_FIELDS {
            return Ok(Self::CeloLegacy(TxCeloLegacy::decode_signed(buf)?));
        }
        TxEnvelope::fallback_decode(buf).map(Self::Ethereum)
    }
}

/// Network encoding: legacy transactions as RLP lists, typed transactions wrapped in an RLP
/// string.
impl Encodable for CeloTxEnvelope {
    fn encode(&self, out: &mut dyn BufMut) {
        self.network_encode(out);
    }

    fn length(&self) -> usize {
        self.network_len()
    }
}

impl Decodable for CeloTxEnvelope {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        Self::network_decode(buf).map_err(|err| match err {
            Eip2718Error::RlpError(err) => err,
            _ => alloy_rlp::Error::Custom("unexpected transaction type"),
        })
    }
}

/// Counts the items of the RLP list at the start of `buf` without consuming it.
pub(crate) fn count_list_fields(buf: &[u8]) -> alloy_rlp::Result<usize> {
    let mut buf = buf;
    let header = Header::decode(&mut buf)?;
    if !header.list {
        return Err(alloy_rlp::Error::UnexpectedString);
    }
    let mut payload = buf.get(..header.payload_length).ok_or(alloy_rlp::Error::InputTooShort)?;
    let mut fields = 0;
    while !payload.is_empty() {
        let item = Header::decode(&mut payload)?;
        payload = payload.get(item.payload_length..).ok_or(alloy_rlp::Error::InputTooShort)?;
        fields += 1;
    }
    Ok(fields)
}
