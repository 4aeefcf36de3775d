//! Fork-gated transaction signing rules.
//!
//! Which transaction types are accepted, and how their senders are recovered, depends on the
//! forks active at the block being validated. Every [`SigningFork`] may declare a rule for a
//! transaction type: either the functions handling it, or that the type is deprecated. The
//! [`CeloSigner`] scans the active forks from the latest to the earliest and applies the first
//! rule it finds. Transaction types no fork declares a rule for are handled by the London signer
//! of Ethereum.
//!
//! | Fork         | Active            | `0x7b`   | `0x7a`     | Celo legacy |
//! |--------------|-------------------|----------|------------|-------------|
//! | `CeloLegacy` | always            | supports | supports   | supports    |
//! | `Cel2`       | from Cel2 onwards | -        | deprecates | deprecates  |

use alloy_primitives::{keccak256, uint, Address, ChainId, Signature, B256, U256};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};

use crate::{CeloChainConfig, CeloHardforks, CeloTxEnvelope, CeloTxType, SignerError};

/// Half the order of the secp256k1 curve. Homestead rejects signatures with a larger `s`.
const SECP256K1N_HALF: U256 =
    uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

/// Functions handling a transaction type under a fork.
#[derive(Debug, Clone, Copy)]
pub struct SigningFuncs {
    /// Computes the hash the sender signed.
    pub signature_hash: fn(&CeloTxEnvelope) -> B256,
    /// Recovers the sender, given the chain id of the signer.
    pub sender: fn(&CeloTxEnvelope, ChainId) -> Result<Address, SignerError>,
}

/// What a fork declares for a transaction type.
#[derive(Debug, Clone, Copy)]
pub enum SigningRule {
    /// The type is handled by these functions.
    Supported(SigningFuncs),
    /// The type is no longer accepted.
    Deprecated,
}

/// CIP-64 and CIP-66 transactions: chain id checked, y parity recovery.
const TYPED_FUNCS: SigningFuncs =
    SigningFuncs { signature_hash: CeloTxEnvelope::signature_hash, sender: typed_sender };

/// Celo legacy transactions, protected or not.
const CELO_LEGACY_FUNCS: SigningFuncs =
    SigningFuncs { signature_hash: CeloTxEnvelope::signature_hash, sender: legacy_sender };

/// The forks that change signing rules, in activation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningFork {
    /// Stands for all forks of the Celo L1. Sender recovery of historical transactions does not
    /// depend on which of them was active, so it is always active.
    CeloLegacy,
    /// The transition to an L2.
    Cel2,
}

impl SigningFork {
    /// All signing forks, in activation order.
    pub const ALL: [Self; 2] = [Self::CeloLegacy, Self::Cel2];

    /// Returns `true` if the fork is active at `timestamp`.
    pub fn is_active(&self, timestamp: u64, hardforks: impl CeloHardforks) -> bool {
        match self {
            Self::CeloLegacy => true,
            Self::Cel2 => hardforks.is_cel2_active_at_timestamp(timestamp),
        }
    }

    /// The rule the fork declares for `tx_type`, if any.
    pub const fn rule_for(&self, tx_type: CeloTxType) -> Option<SigningRule> {
        match (self, tx_type) {
            (Self::CeloLegacy, CeloTxType::CeloLegacy) => {
                Some(SigningRule::Supported(CELO_LEGACY_FUNCS))
            }
            (Self::CeloLegacy, CeloTxType::Cip64 | CeloTxType::Cip66) => {
                Some(SigningRule::Supported(TYPED_FUNCS))
            }
            (Self::Cel2, CeloTxType::CeloLegacy | CeloTxType::Cip66) => {
                Some(SigningRule::Deprecated)
            }
            _ => None,
        }
    }
}

/// Recovers transaction senders under the forks active at one block.
#[derive(Debug, Clone)]
pub struct CeloSigner<H> {
    chain_id: ChainId,
    hardforks: H,
    timestamp: u64,
}

impl<'a> CeloSigner<&'a CeloChainConfig> {
    /// The signer of `config`'s chain for a block at `timestamp`.
    pub const fn from_config(config: &'a CeloChainConfig, timestamp: u64) -> Self {
        Self { chain_id: config.chain_id, hardforks: config, timestamp }
    }
}

impl<H: CeloHardforks> CeloSigner<H> {
    /// Creates a signer for a block at `timestamp`.
    pub const fn new(chain_id: ChainId, hardforks: H, timestamp: u64) -> Self {
        Self { chain_id, hardforks, timestamp }
    }

    /// The chain id transactions must be signed for.
    pub const fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// The rule of the latest active fork that declares one for `tx_type`.
    pub fn rule_for(&self, tx_type: CeloTxType) -> Option<SigningRule> {
        SigningFork::ALL
            .iter()
            .rev()
            .filter(|fork| fork.is_active(self.timestamp, &self.hardforks))
            .find_map(|fork| fork.rule_for(tx_type))
    }

    /// The hash the sender of `tx` signed.
    pub fn signature_hash(&self, tx: &CeloTxEnvelope) -> Result<B256, SignerError> {
        match self.rule_for(tx.tx_type()) {
            Some(SigningRule::Supported(funcs)) => Ok((funcs.signature_hash)(tx)),
            Some(SigningRule::Deprecated) => Err(SignerError::DeprecatedTxType(tx.tx_type())),
            None => {
                london_check(tx, self.chain_id)?;
                Ok(tx.signature_hash())
            }
        }
    }

    /// Recovers the sender of `tx`.
    pub fn sender(&self, tx: &CeloTxEnvelope) -> Result<Address, SignerError> {
        match self.rule_for(tx.tx_type()) {
            Some(SigningRule::Supported(funcs)) => (funcs.sender)(tx, self.chain_id),
            Some(SigningRule::Deprecated) => Err(SignerError::DeprecatedTxType(tx.tx_type())),
            None => london_sender(tx, self.chain_id),
        }
    }
}

fn check_chain_id(tx: &CeloTxEnvelope, chain_id: ChainId) -> Result<(), SignerError> {
    match tx.chain_id() {
        Some(id) if id == chain_id => Ok(()),
        got => Err(SignerError::InvalidChainId { expected: chain_id, got }),
    }
}

fn typed_sender(tx: &CeloTxEnvelope, chain_id: ChainId) -> Result<Address, SignerError> {
    check_chain_id(tx, chain_id)?;
    recover_signature(tx.signature_hash(), tx.signature())
}

fn legacy_sender(tx: &CeloTxEnvelope, chain_id: ChainId) -> Result<Address, SignerError> {
    if tx.chain_id().is_some() {
        check_chain_id(tx, chain_id)?;
    }
    recover_signature(tx.signature_hash(), tx.signature())
}

/// The types the London signer accepts, with their chain id rules.
fn london_check(tx: &CeloTxEnvelope, chain_id: ChainId) -> Result<(), SignerError> {
    match tx.tx_type() {
        CeloTxType::Legacy if tx.chain_id().is_none() => Ok(()),
        CeloTxType::Legacy | CeloTxType::Eip2930 | CeloTxType::Eip1559 => {
            check_chain_id(tx, chain_id)
        }
        other => Err(SignerError::UnsupportedTxType(other)),
    }
}

fn london_sender(tx: &CeloTxEnvelope, chain_id: ChainId) -> Result<Address, SignerError> {
    london_check(tx, chain_id)?;
    recover_signature(tx.signature_hash(), tx.signature())
}

/// Recovers the signer of `hash` from an unprotected signature with `v` of 27 or 28. Signatures
/// with `s` above half the curve order are rejected.
pub fn recover_homestead(hash: B256, r: U256, s: U256, v: u64) -> Result<Address, SignerError> {
    if s > SECP256K1N_HALF {
        return Err(SignerError::SignatureError);
    }
    let recovery_id = match v {
        27 | 28 => RecoveryId::try_from((v - 27) as u8).map_err(|_| SignerError::SignatureError)?,
        _ => return Err(SignerError::SignatureError),
    };

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&r.to_be_bytes::<32>());
    sig_bytes[32..].copy_from_slice(&s.to_be_bytes::<32>());
    // Rejects zero and out of range scalars.
    let signature =
        EcdsaSignature::from_slice(&sig_bytes).map_err(|_| SignerError::SignatureError)?;

    let recovered_key = VerifyingKey::recover_from_prehash(&hash[..], &signature, recovery_id)
        .map_err(|_| SignerError::SignatureError)?;

    // Uncompressed point: 0x04 || x || y. The address is the tail of keccak256(x || y).
    let pubkey_point = recovered_key.to_encoded_point(false);
    let pubkey_hash = keccak256(&pubkey_point.as_bytes()[1..]);
    Ok(Address::from_slice(&pubkey_hash[12..]))
}

/// Recovers the signer of `hash` from an [`alloy_primitives::Signature`]. Its y parity is 0 or 1
/// whether or not the transaction is protected, so adding 27 turns it into an unprotected
/// homestead signature.
pub fn recover_signature(hash: B256, signature: &Signature) -> Result<Address, SignerError> {
    recover_homestead(hash, signature.r(), signature.s(), 27 + u64::from(signature.v()))
}
