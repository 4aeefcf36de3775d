use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy_primitives::{address, keccak256, Address, Bytes, Signature, TxKind, B256, U256};
use k256::ecdsa::SigningKey;

use crate::{
    constants::MAINNET_CHAIN_ID, CeloSignableTx, CeloTxEnvelope, PooledTx, SignedTx, TxCeloLegacy,
    TxCip64, TxCip66,
};

/// Recipient of the transactions built by the helpers below.
pub const RECIPIENT: Address = address!("0x00000000000000000000000000000000000000b0");

/// An unsigned transaction [`TestSigner`] can sign.
pub trait TestTx {
    /// The hash to sign.
    fn signing_hash(&self) -> B256;

    /// Attaches `signature` and wraps the result.
    fn into_envelope(self, signature: Signature) -> CeloTxEnvelope;
}

impl TestTx for TxEip1559 {
    fn signing_hash(&self) -> B256 {
        SignableTransaction::signature_hash(self)
    }

    fn into_envelope(self, signature: Signature) -> CeloTxEnvelope {
        TxEnvelope::from(self.into_signed(signature)).into()
    }
}

impl TestTx for TxLegacy {
    fn signing_hash(&self) -> B256 {
        SignableTransaction::signature_hash(self)
    }

    fn into_envelope(self, signature: Signature) -> CeloTxEnvelope {
        TxEnvelope::from(self.into_signed(signature)).into()
    }
}

impl TestTx for TxCip64 {
    fn signing_hash(&self) -> B256 {
        CeloSignableTx::signature_hash(self)
    }

    fn into_envelope(self, signature: Signature) -> CeloTxEnvelope {
        SignedTx::new(self, signature).into()
    }
}

impl TestTx for TxCip66 {
    fn signing_hash(&self) -> B256 {
        CeloSignableTx::signature_hash(self)
    }

    fn into_envelope(self, signature: Signature) -> CeloTxEnvelope {
        SignedTx::new(self, signature).into()
    }
}

impl TestTx for TxCeloLegacy {
    fn signing_hash(&self) -> B256 {
        CeloSignableTx::signature_hash(self)
    }

    fn into_envelope(self, signature: Signature) -> CeloTxEnvelope {
        SignedTx::new(self, signature).into()
    }
}

/// A deterministic secp256k1 key signing test transactions.
#[derive(Debug, Clone)]
pub struct TestSigner {
    key: SigningKey,
    address: Address,
}

impl TestSigner {
    /// The key whose 32 bytes all equal `seed`. `seed` must not be zero.
    pub fn new(seed: u8) -> Self {
        let key = SigningKey::from_slice(&[seed; 32]).unwrap();
        let point = key.verifying_key().to_encoded_point(false);
        let address = Address::from_slice(&keccak256(&point.as_bytes()[1..])[12..]);
        Self { key, address }
    }

    /// The signer's address.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Signs `hash` with a low `s`.
    pub fn sign_hash(&self, hash: B256) -> Signature {
        let (signature, recovery_id) = self.key.sign_prehash_recoverable(hash.as_slice()).unwrap();
        let mut y_parity = recovery_id.is_y_odd();
        let signature = match signature.normalize_s() {
            Some(normalized) => {
                y_parity = !y_parity;
                normalized
            }
            None => signature,
        };
        let bytes = signature.to_bytes();
        Signature::new(
            U256::from_be_slice(&bytes[..32]),
            U256::from_be_slice(&bytes[32..]),
            y_parity,
        )
    }

    /// Signs `tx`.
    pub fn sign<T: TestTx>(&self, tx: T) -> CeloTxEnvelope {
        let signature = self.sign_hash(tx.signing_hash());
        tx.into_envelope(signature)
    }

    /// Signs `tx` and wraps it for the pool.
    pub fn pooled<T: TestTx>(&self, tx: T) -> PooledTx {
        PooledTx::new(self.sign(tx), self.address)
    }
}

/// A native dynamic fee transaction on mainnet transferring nothing to [`RECIPIENT`].
pub fn native_tx(nonce: u64, gas_limit: u64, fee_cap: u128, tip_cap: u128) -> TxEip1559 {
    TxEip1559 {
        chain_id: MAINNET_CHAIN_ID,
        nonce,
        gas_limit,
        max_fee_per_gas: fee_cap,
        max_priority_fee_per_gas: tip_cap,
        to: TxKind::Call(RECIPIENT),
        value: U256::ZERO,
        access_list: Default::default(),
        input: Bytes::new(),
    }
}

/// A CIP-64 transaction on mainnet transferring nothing to [`RECIPIENT`].
pub fn cip64_tx(
    nonce: u64,
    gas_limit: u64,
    fee_cap: u128,
    tip_cap: u128,
    fee_currency: Option<Address>,
) -> TxCip64 {
    TxCip64 {
        chain_id: MAINNET_CHAIN_ID,
        nonce,
        max_priority_fee_per_gas: tip_cap,
        max_fee_per_gas: fee_cap,
        gas_limit,
        to: TxKind::Call(RECIPIENT),
        value: U256::ZERO,
        input: Bytes::new(),
        access_list: Default::default(),
        fee_currency,
    }
}

/// A CIP-66 transaction on mainnet transferring nothing to [`RECIPIENT`].
pub fn cip66_tx(
    nonce: u64,
    gas_limit: u64,
    fee_cap: u128,
    tip_cap: u128,
    fee_currency: Option<Address>,
    max_fee_in_fee_currency: U256,
) -> TxCip66 {
    TxCip66 {
        chain_id: MAINNET_CHAIN_ID,
        nonce,
        max_priority_fee_per_gas: tip_cap,
        max_fee_per_gas: fee_cap,
        gas_limit,
        to: TxKind::Call(RECIPIENT),
        value: U256::ZERO,
        input: Bytes::new(),
        access_list: Default::default(),
        fee_currency,
        max_fee_in_fee_currency,
    }
}

/// A protected Celo legacy transaction on mainnet transferring nothing to [`RECIPIENT`].
pub fn celo_legacy_tx(
    nonce: u64,
    gas_limit: u64,
    gas_price: u128,
    fee_currency: Option<Address>,
) -> TxCeloLegacy {
    TxCeloLegacy {
        chain_id: Some(MAINNET_CHAIN_ID),
        nonce,
        gas_price,
        gas_limit,
        fee_currency,
        gateway_fee_recipient: None,
        gateway_fee: U256::ZERO,
        to: TxKind::Call(RECIPIENT),
        value: U256::ZERO,
        input: Bytes::new(),
    }
}
