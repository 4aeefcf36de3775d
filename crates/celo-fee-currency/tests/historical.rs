//! Round trips of historical headers through their wire encoding.

use alloy_consensus::Header;
use alloy_primitives::{keccak256, Address, Bloom, Bytes, B256};
use alloy_rlp::{Decodable, Encodable};
use celo_fee_currency::{HistoricalHeader, HistoricalLayout, PreGingerbreadHeader};
use proptest::prelude::*;

fn pre_gingerbread() -> impl Strategy<Value = PreGingerbreadHeader> {
    (
        any::<[u8; 32]>(),
        any::<[u8; 20]>(),
        any::<u8>(),
        any::<u64>(),
        any::<u64>(),
        any::<u64>(),
        prop::collection::vec(any::<u8>(), 0..128),
    )
        .prop_map(|(parent, coinbase, fill, number, gas_used, timestamp, extra)| {
            PreGingerbreadHeader {
                parent_hash: B256::from(parent),
                coinbase: Address::from(coinbase),
                state_root: B256::repeat_byte(fill),
                transactions_root: keccak256(parent),
                receipts_root: keccak256(coinbase),
                logs_bloom: Bloom::repeat_byte(fill),
                number,
                gas_used,
                timestamp,
                extra_data: Bytes::from(extra),
            }
        })
}

fn post_gingerbread() -> impl Strategy<Value = Header> {
    (any::<[u8; 32]>(), any::<u64>(), any::<u64>(), prop::option::of(any::<u64>())).prop_map(
        |(parent, number, timestamp, base_fee)| Header {
            parent_hash: B256::from(parent),
            number,
            gas_limit: 30_000_000,
            timestamp,
            base_fee_per_gas: base_fee,
            ..Default::default()
        },
    )
}

fn roundtrip(header: &HistoricalHeader) -> Result<(), TestCaseError> {
    let mut buf = Vec::with_capacity(header.length());
    header.encode(&mut buf);
    prop_assert_eq!(HistoricalHeader::classify(&buf).ok(), Some(header.layout()));

    let decoded = HistoricalHeader::decode(&mut buf.as_slice())?;
    prop_assert_eq!(&decoded, header);
    prop_assert_eq!(decoded.hash(), keccak256(&buf));

    let mut reencoded = Vec::new();
    decoded.encode(&mut reencoded);
    prop_assert_eq!(reencoded, buf);
    Ok(())
}

proptest! {
    #[test]
    fn proptest_pre_gingerbread_header_roundtrip(header in pre_gingerbread()) {
        let header = HistoricalHeader::from(header);
        prop_assert_eq!(header.layout(), HistoricalLayout::PreGingerbread);
        roundtrip(&header)?;
    }

    #[test]
    fn proptest_post_gingerbread_header_roundtrip(header in post_gingerbread()) {
        let expected_hash = header.hash_slow();
        let header = HistoricalHeader::from(header);
        roundtrip(&header)?;
        prop_assert_eq!(header.hash(), expected_hash);
    }
}
