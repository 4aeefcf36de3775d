use alloy_eips::eip2718::Eip2718Error;
use alloy_primitives::ChainId;

use crate::CeloTxType;

/// Errors of decoding a transaction from its wire form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TxDecodeError {
    /// Malformed RLP or an unknown type byte.
    #[error(transparent)]
    Eip2718(#[from] Eip2718Error),
    /// Bytes left over after the transaction.
    #[error("{0} trailing bytes after the transaction")]
    TrailingBytes(usize),
}

impl From<alloy_rlp::Error> for TxDecodeError {
    fn from(err: alloy_rlp::Error) -> Self {
        Self::Eip2718(err.into())
    }
}

/// Errors of recovering the sender of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    /// The transaction is signed for another chain.
    #[error("invalid chain id: expected {expected}, got {got:?}")]
    InvalidChainId {
        /// The signer's chain id
        expected: ChainId,
        /// The transaction's chain id
        got: Option<ChainId>,
    },
    /// The signature does not recover to a public key.
    #[error("invalid signature")]
    SignatureError,
    /// The transaction type is deprecated by an active fork.
    #[error("transaction type {0} is deprecated")]
    DeprecatedTxType(CeloTxType),
    /// No active fork and not the base signer handles the transaction type.
    #[error("transaction type {0} not supported")]
    UnsupportedTxType(CeloTxType),
}

impl SignerError {
    /// Returns `true` if the transaction can never be valid under the signer's forks.
    pub const fn is_type_rejected(&self) -> bool {
        matches!(self, Self::DeprecatedTxType(_) | Self::UnsupportedTxType(_))
    }
}
