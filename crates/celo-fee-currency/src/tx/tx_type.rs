use core::fmt;

use alloy_consensus::TxType;

/// Type byte of [`TxCip66`](crate::TxCip66).
pub const CIP66_TX_TYPE_ID: u8 = 0x7a;

/// Type byte of [`TxCip64`](crate::TxCip64).
pub const CIP64_TX_TYPE_ID: u8 = 0x7b;

/// Every transaction type known to the Celo signer.
///
/// [`CeloTxType::CeloLegacy`] shares the wire type byte `0` with [`CeloTxType::Legacy`] but has
/// its own signing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CeloTxType {
    /// Ethereum legacy transaction.
    Legacy,
    /// EIP-2930 access list transaction.
    Eip2930,
    /// EIP-1559 dynamic fee transaction.
    Eip1559,
    /// EIP-4844 blob transaction.
    Eip4844,
    /// EIP-7702 set code transaction.
    Eip7702,
    /// Pre-L2 legacy transaction with fee currency and gateway fields.
    CeloLegacy,
    /// CIP-66 fee currency denominated transaction.
    Cip66,
    /// CIP-64 fee currency dynamic fee transaction.
    Cip64,
}

impl CeloTxType {
    /// The EIP-2718 type byte. Both legacy types are `0`.
    pub const fn ty(&self) -> u8 {
        match self {
            Self::Legacy | Self::CeloLegacy => 0,
            Self::Eip2930 => 1,
            Self::Eip1559 => 2,
            Self::Eip4844 => 3,
            Self::Eip7702 => 4,
            Self::Cip66 => CIP66_TX_TYPE_ID,
            Self::Cip64 => CIP64_TX_TYPE_ID,
        }
    }

    /// Returns `true` for the types that carry a fee currency.
    pub const fn has_fee_currency(&self) -> bool {
        matches!(self, Self::CeloLegacy | Self::Cip64 | Self::Cip66)
    }
}

impl From<TxType> for CeloTxType {
    fn from(ty: TxType) -> Self {
        match ty {
            TxType::Legacy => Self::Legacy,
            TxType::Eip2930 => Self::Eip2930,
            TxType::Eip1559 => Self::Eip1559,
            TxType::Eip4844 => Self::Eip4844,
            TxType::Eip7702 => Self::Eip7702,
        }
    }
}

impl fmt::Display for CeloTxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CeloLegacy => f.write_str("celo legacy"),
            ty => write!(f, "{:#04x}", ty.ty()),
        }
    }
}
