//! Header and body layouts from before and after the Gingerbread fork.
//!
//! Gingerbread reintroduced the Ethereum header fields Celo had dropped, so historical blocks
//! come in two shapes. Decoding is done in two passes: the raw list is first classified by a
//! fixed discriminant, then decoded into exactly one shape. Input matching neither layout is
//! rejected with [`HistoricalEncodingError::MalformedHistoricalEncoding`].
//!
//! | Layout | Header discriminant            | Body                                       |
//! |--------|--------------------------------|--------------------------------------------|
//! | pre    | 2nd field is 20 bytes (miner)  | `[txs, [revealed, committed], [bitmap, signature]]` |
//! | post   | 2nd field is 32 bytes (ommers) | `[txs, uncles]` or `[txs, uncles, withdrawals]`     |

use alloy_consensus::Header;
use alloy_eips::eip4895::Withdrawal;
use alloy_primitives::{keccak256, Address, Bloom, Bytes, B256, U256};
use alloy_rlp::{BufMut, Decodable, Encodable, RlpDecodable, RlpEncodable};

use crate::CeloTxEnvelope;

/// Errors of decoding historical headers and bodies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoricalEncodingError {
    /// The input matches neither the pre- nor the post-Gingerbread layout.
    #[error("malformed historical encoding: {reason}")]
    MalformedHistoricalEncoding {
        /// What did not match
        reason: &'static str,
    },
    /// The input was classified but its fields failed to decode.
    #[error("rlp error: {0}")]
    Rlp(alloy_rlp::Error),
}

impl From<alloy_rlp::Error> for HistoricalEncodingError {
    fn from(err: alloy_rlp::Error) -> Self {
        Self::Rlp(err)
    }
}

const fn malformed(reason: &'static str) -> HistoricalEncodingError {
    HistoricalEncodingError::MalformedHistoricalEncoding { reason }
}

/// A header of the Celo L1 before Gingerbread.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct PreGingerbreadHeader {
    /// Hash of the parent block.
    pub parent_hash: B256,
    /// Block proposer.
    pub coinbase: Address,
    /// State trie root.
    pub state_root: B256,
    /// Transaction trie root.
    pub transactions_root: B256,
    /// Receipt trie root.
    pub receipts_root: B256,
    /// Bloom filter of the block's logs.
    pub logs_bloom: Bloom,
    /// Block number.
    pub number: u64,
    /// Gas used by the block.
    pub gas_used: u64,
    /// Block timestamp.
    pub timestamp: u64,
    /// Istanbul extra data, including the validator seals.
    pub extra_data: Bytes,
}

/// A header in either historical layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoricalHeader {
    /// Before Gingerbread.
    PreGingerbread(PreGingerbreadHeader),
    /// Gingerbread and later, identical to an Ethereum header.
    PostGingerbread(Header),
}

/// Which of the two layouts an encoding uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoricalLayout {
    /// Before Gingerbread.
    PreGingerbread,
    /// Gingerbread and later.
    PostGingerbread,
}

impl From<PreGingerbreadHeader> for HistoricalHeader {
    fn from(header: PreGingerbreadHeader) -> Self {
        Self::PreGingerbread(header)
    }
}

impl From<Header> for HistoricalHeader {
    fn from(header: Header) -> Self {
        Self::PostGingerbread(header)
    }
}

impl HistoricalHeader {
    /// The layout this header encodes to.
    pub const fn layout(&self) -> HistoricalLayout {
        match self {
            Self::PreGingerbread(_) => HistoricalLayout::PreGingerbread,
            Self::PostGingerbread(_) => HistoricalLayout::PostGingerbread,
        }
    }

    /// Keccak hash of the encoded header.
    pub fn hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(self.length());
        self.encode(&mut buf);
        keccak256(&buf)
    }

    /// Hash of the parent block.
    pub fn parent_hash(&self) -> B256 {
        match self {
            Self::PreGingerbread(h) => h.parent_hash,
            Self::PostGingerbread(h) => h.parent_hash,
        }
    }

    /// Block number.
    pub fn number(&self) -> u64 {
        match self {
            Self::PreGingerbread(h) => h.number,
            Self::PostGingerbread(h) => h.number,
        }
    }

    /// Block timestamp.
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::PreGingerbread(h) => h.timestamp,
            Self::PostGingerbread(h) => h.timestamp,
        }
    }

    /// Gas used by the block.
    pub fn gas_used(&self) -> u64 {
        match self {
            Self::PreGingerbread(h) => h.gas_used,
            Self::PostGingerbread(h) => h.gas_used,
        }
    }

    /// The header's base fee. Pre-Gingerbread headers have none.
    pub fn base_fee_per_gas(&self) -> Option<u64> {
        match self {
            Self::PreGingerbread(_) => None,
            Self::PostGingerbread(h) => h.base_fee_per_gas,
        }
    }

    /// Classifies an encoded header by the byte length of its second field.
    pub fn classify(buf: &[u8]) -> Result<HistoricalLayout, HistoricalEncodingError> {
        let mut payload = list_payload(buf)?;
        skip_item(&mut payload)?;
        let second = alloy_rlp::Header::decode(&mut payload)?;
        match (second.list, second.payload_length) {
            (false, 20) => Ok(HistoricalLayout::PreGingerbread),
            (false, 32) => Ok(HistoricalLayout::PostGingerbread),
            _ => Err(malformed("second header field is neither an address nor a hash")),
        }
    }

    /// Decodes a header in either layout, advancing `buf` past it.
    pub fn decode_historical(buf: &mut &[u8]) -> Result<Self, HistoricalEncodingError> {
        Ok(match Self::classify(buf)? {
            HistoricalLayout::PreGingerbread => Self::PreGingerbread(Decodable::decode(buf)?),
            HistoricalLayout::PostGingerbread => Self::PostGingerbread(Decodable::decode(buf)?),
        })
    }
}

impl Encodable for HistoricalHeader {
    fn encode(&self, out: &mut dyn BufMut) {
        match self {
            Self::PreGingerbread(h) => h.encode(out),
            Self::PostGingerbread(h) => h.encode(out),
        }
    }

    fn length(&self) -> usize {
        match self {
            Self::PreGingerbread(h) => h.length(),
            Self::PostGingerbread(h) => h.length(),
        }
    }
}

impl Decodable for HistoricalHeader {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        Self::decode_historical(buf).map_err(|err| match err {
            HistoricalEncodingError::Rlp(err) => err,
            HistoricalEncodingError::MalformedHistoricalEncoding { reason } => {
                alloy_rlp::Error::Custom(reason)
            }
        })
    }
}

/// Randomness beacon values of a pre-Gingerbread block.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct Randomness {
    /// Randomness revealed by the proposer.
    pub revealed: B256,
    /// Commitment to the proposer's next randomness.
    pub committed: B256,
}

/// Aggregated epoch signature of a pre-Gingerbread block.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct EpochSnarkData {
    /// Which validators signed.
    pub bitmap: U256,
    /// Aggregated BLS signature.
    pub signature: Bytes,
}

/// A block body in either historical layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoricalBody {
    /// Before Gingerbread.
    #[allow(missing_docs)]
    PreGingerbread {
        transactions: Vec<CeloTxEnvelope>,
        randomness: Randomness,
        epoch_snark_data: EpochSnarkData,
    },
    /// Gingerbread and later. Withdrawals are absent until Shanghai.
    #[allow(missing_docs)]
    PostGingerbread {
        transactions: Vec<CeloTxEnvelope>,
        uncles: Vec<Header>,
        withdrawals: Option<Vec<Withdrawal>>,
    },
}

impl HistoricalBody {
    /// The transactions of the block.
    pub fn transactions(&self) -> &[CeloTxEnvelope] {
        match self {
            Self::PreGingerbread { transactions, .. } |
            Self::PostGingerbread { transactions, .. } => transactions,
        }
    }

    /// The layout this body encodes to.
    pub const fn layout(&self) -> HistoricalLayout {
        match self {
            Self::PreGingerbread { .. } => HistoricalLayout::PreGingerbread,
            Self::PostGingerbread { .. } => HistoricalLayout::PostGingerbread,
        }
    }

    /// Classifies an encoded body by its field count and the shape of its second field.
    ///
    /// Randomness is a list of two 32 byte strings, while uncles is a (possibly empty) list of
    /// header lists.
    pub fn classify(buf: &[u8]) -> Result<HistoricalLayout, HistoricalEncodingError> {
        let payload = list_payload(buf)?;
        let fields = count_items(payload)?;

        let mut rest = payload;
        skip_item(&mut rest)?;
        let second = alloy_rlp::Header::decode(&mut rest)?;
        if !second.list {
            return Err(malformed("second body field is not a list"));
        }
        let mut second_payload = &rest[..second.payload_length];
        let first_inner = if second_payload.is_empty() {
            None
        } else {
            Some(alloy_rlp::Header::decode(&mut second_payload)?)
        };

        match (fields, first_inner) {
            (3, Some(inner)) if !inner.list && inner.payload_length == 32 => {
                Ok(HistoricalLayout::PreGingerbread)
            }
            (2 | 3, inner) if inner.as_ref().map_or(true, |h| h.list) => {
                Ok(HistoricalLayout::PostGingerbread)
            }
            _ => Err(malformed("body matches no known layout")),
        }
    }

    /// Decodes a body in either layout, advancing `buf` past it.
    pub fn decode_historical(buf: &mut &[u8]) -> Result<Self, HistoricalEncodingError> {
        let layout = Self::classify(buf)?;
        let header = alloy_rlp::Header::decode(buf)?;
        let started = buf.len();

        let body = match layout {
            HistoricalLayout::PreGingerbread => Self::PreGingerbread {
                transactions: Decodable::decode(buf)?,
                randomness: Decodable::decode(buf)?,
                epoch_snark_data: Decodable::decode(buf)?,
            },
            HistoricalLayout::PostGingerbread => {
                let transactions = Decodable::decode(buf)?;
                let uncles = Decodable::decode(buf)?;
                let withdrawals = if started - buf.len() < header.payload_length {
                    Some(Decodable::decode(buf)?)
                } else {
                    None
                };
                Self::PostGingerbread { transactions, uncles, withdrawals }
            }
        };

        let consumed = started - buf.len();
        if consumed != header.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: consumed,
            }
            .into());
        }
        Ok(body)
    }

    fn payload_length(&self) -> usize {
        match self {
            Self::PreGingerbread { transactions, randomness, epoch_snark_data } => {
                transactions.length() + randomness.length() + epoch_snark_data.length()
            }
            Self::PostGingerbread { transactions, uncles, withdrawals } => {
                transactions.length() +
                    uncles.length() +
                    withdrawals.as_ref().map_or(0, |w| w.length())
            }
        }
    }
}

impl Encodable for HistoricalBody {
    fn encode(&self, out: &mut dyn BufMut) {
        alloy_rlp::Header { list: true, payload_length: self.payload_length() }.encode(out);
        match self {
            Self::PreGingerbread { transactions, randomness, epoch_snark_data } => {
                transactions.encode(out);
                randomness.encode(out);
                epoch_snark_data.encode(out);
            }
            Self::PostGingerbread { transactions, uncles, withdrawals } => {
                transactions.encode(out);
                uncles.encode(out);
                if let Some(withdrawals) = withdrawals {
                    withdrawals.encode(out);
                }
            }
        }
    }

    fn length(&self) -> usize {
        alloy_rlp::Header { list: true, payload_length: self.payload_length() }
            .length_with_payload()
    }
}

impl Decodable for HistoricalBody {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        Self::decode_historical(buf).map_err(|err| match err {
            HistoricalEncodingError::Rlp(err) => err,
            HistoricalEncodingError::MalformedHistoricalEncoding { reason } => {
                alloy_rlp::Error::Custom(reason)
            }
        })
    }
}

/// The payload of the list at the start of `buf`.
fn list_payload(buf: &[u8]) -> Result<&[u8], HistoricalEncodingError> {
    let mut rest = buf;
    let header = alloy_rlp::Header::decode(&mut rest)?;
    if !header.list {
        return Err(malformed("expected a list"));
    }
    rest.get(..header.payload_length).ok_or(alloy_rlp::Error::InputTooShort.into())
}

fn skip_item(buf: &mut &[u8]) -> Result<(), HistoricalEncodingError> {
    let header = alloy_rlp::Header::decode(buf)?;
    if buf.len() < header.payload_length {
        return Err(alloy_rlp::Error::InputTooShort.into());
    }
    *buf = &buf[header.payload_length..];
    Ok(())
}

fn count_items(mut payload: &[u8]) -> Result<usize, HistoricalEncodingError> {
    let mut count = 0;
    while !payload.is_empty() {
        skip_item(&mut payload)?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256, bytes};

    fn pre_header() -> PreGingerbreadHeader {
        PreGingerbreadHeader {
            parent_hash: b256!("0x1111111111111111111111111111111111111111111111111111111111111111"),
            coinbase: address!("0x00000000000000000000000000000000000000cc"),
            state_root: B256::repeat_byte(0x22),
            transactions_root: B256::repeat_byte(0x33),
            receipts_root: B256::repeat_byte(0x44),
            logs_bloom: Bloom::default(),
            number: 1_000,
            gas_used: 21_000,
            timestamp: 1_587_571_200,
            extra_data: bytes!("d983010000846765746889676f312e31332e38856c696e7578"),
        }
    }

    fn post_header() -> Header {
        Header {
            parent_hash: B256::repeat_byte(0x11),
            beneficiary: address!("0x00000000000000000000000000000000000000cc"),
            number: 21_616_000,
            gas_limit: 35_000_000,
            gas_used: 21_000,
            timestamp: 1_695_000_000,
            base_fee_per_gas: Some(5_000_000_000),
            ..Default::default()
        }
    }

    #[test]
    fn test_pre_gingerbread_header_roundtrip() {
        let header = HistoricalHeader::from(pre_header());
        let mut buf = Vec::new();
        header.encode(&mut buf);

        assert_eq!(HistoricalHeader::classify(&buf), Ok(HistoricalLayout::PreGingerbread));
        let decoded = HistoricalHeader::decode(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.hash(), keccak256(&buf));
        assert_eq!(decoded.base_fee_per_gas(), None);
    }

    #[test]
    fn test_post_gingerbread_header_roundtrip() {
        let header = HistoricalHeader::from(post_header());
        let mut buf = Vec::new();
        header.encode(&mut buf);

        assert_eq!(HistoricalHeader::classify(&buf), Ok(HistoricalLayout::PostGingerbread));
        let decoded = HistoricalHeader::decode(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.hash(), post_header().hash_slow());
        assert_eq!(decoded.number(), 21_616_000);
    }

    #[test]
    fn test_unclassifiable_header_is_rejected() {
        // [0x01, "abc"]: the second field is three bytes long.
        let buf = [0xc5, 0x01, 0x83, b'a', b'b', b'c'];
        assert!(matches!(
            HistoricalHeader::decode_historical(&mut &buf[..]),
            Err(HistoricalEncodingError::MalformedHistoricalEncoding { .. })
        ));
    }

    #[test]
    fn test_pre_gingerbread_body_roundtrip() {
        let body = HistoricalBody::PreGingerbread {
            transactions: vec![],
            randomness: Randomness {
                revealed: B256::repeat_byte(0xaa),
                committed: B256::repeat_byte(0xbb),
            },
            epoch_snark_data: EpochSnarkData {
                bitmap: U256::from(0b1011),
                signature: bytes!("c0ffee"),
            },
        };
        let mut buf = Vec::new();
        body.encode(&mut buf);
        assert_eq!(buf.len(), body.length());

        assert_eq!(HistoricalBody::classify(&buf), Ok(HistoricalLayout::PreGingerbread));
        assert_eq!(HistoricalBody::decode(&mut buf.as_slice()).unwrap(), body);
    }

    #[test]
    fn test_post_gingerbread_body_roundtrip() {
        for withdrawals in [None, Some(vec![]), Some(vec![Withdrawal::default()])] {
            let body = HistoricalBody::PostGingerbread {
                transactions: vec![],
                uncles: vec![post_header()],
                withdrawals,
            };
            let mut buf = Vec::new();
            body.encode(&mut buf);

            assert_eq!(HistoricalBody::classify(&buf), Ok(HistoricalLayout::PostGingerbread));
            assert_eq!(HistoricalBody::decode(&mut buf.as_slice()).unwrap(), body);
        }
    }

    #[test]
    fn test_body_without_uncles_is_post_gingerbread() {
        // [[], []]
        let buf = [0xc2, 0xc0, 0xc0];
        assert_eq!(HistoricalBody::classify(&buf), Ok(HistoricalLayout::PostGingerbread));
    }

    #[test]
    fn test_unclassifiable_body_is_rejected() {
        // [[], ["a"]]: a single short string where randomness or uncles should be.
        let buf = [0xc3, 0xc0, 0xc1, b'a'];
        assert!(matches!(
            HistoricalBody::decode_historical(&mut &buf[..]),
            Err(HistoricalEncodingError::MalformedHistoricalEncoding { .. })
        ));
    }
}
