//! Constants of the fee-currency subsystem: well-known system addresses, gas allowances for
//! the fee settlement calls and the default per-currency block gas fractions.

use alloy_primitives::{address, Address};

/// Temporary holding account that debited fees are parked at between the debit and the credit
/// of a transaction.
pub const HOLDING_ADDRESS: Address = address!("0x000000000000000000000000000000000ce106a5");

/// The address of the native CELO token contract.
pub const CELO_TOKEN_ADDRESS: Address = address!("0x471ece3750da237f93b8e339c536989b8978a438");

/// The account receiving the base fee portion of every transaction's fee.
pub const FEE_HANDLER_ADDRESS: Address = address!("0xcd437749e43a154c07f3553504c68fbfd56b8778");

/// The fee currency directory contract holding per-currency configuration.
pub const FEE_CURRENCY_DIRECTORY_ADDRESS: Address =
    address!("0x9212Fb72ae65367A7c887eC4Ad9bE310BAC611BF");

/// The native CELO token contract on the Alfajores testnet.
pub const CELO_TOKEN_ALFAJORES_ADDRESS: Address =
    address!("0xF194afDf50B03e69Bd7D057c1Aa9e10c9954E4C9");

/// The fee handler on the Alfajores testnet.
pub const FEE_HANDLER_ALFAJORES_ADDRESS: Address =
    address!("0xEAaFf71AB67B5d0eF34ba62Ea06Ac3d3E2dAAA38");

/// Chain id of the Alfajores testnet.
pub const ALFAJORES_CHAIN_ID: u64 = 44787;

/// Chain id of Celo mainnet.
pub const MAINNET_CHAIN_ID: u64 = 42220;

/// Gas allowance of the call debiting fees from the sender.
pub const MAX_GAS_FOR_DEBIT_GAS_FEES: u64 = 1_000_000;

/// Gas budget shared by all the calls crediting fees to their recipients.
pub const MAX_GAS_FOR_CREDIT_GAS_FEES: u64 = 1_000_000;

/// Gas allowance of read-only token calls such as `balanceOf`.
pub const MAX_GAS_FOR_READ: u64 = 100_000;

/// Gas allowance of each registry query made while building the fee currency context.
pub const MAX_GAS_FOR_REGISTRY_CALL: u64 = 2_000_000;

/// Default intrinsic gas surcharge of transactions paying for gas in a non-native currency.
/// Estimates one balance read, one debit and four credit calls.
pub const INTRINSIC_GAS_FOR_ALTERNATIVE_FEE_CURRENCY: u64 = 50_000;

/// Fraction of the block gas limit usable by a fee currency without an explicit override.
pub const DEFAULT_FEE_CURRENCY_LIMIT: f64 = 0.5;

/// Mainnet cUSD token.
pub const CUSD_ADDRESS: Address = address!("0x765DE816845861e75A25fCA122bb6898B8B1282a");

/// Mainnet cEUR token.
pub const CEUR_ADDRESS: Address = address!("0xD8763CBa276a3738E6DE85b4b3bF5FDed6D6cA73");

/// Mainnet cREAL token.
pub const CREAL_ADDRESS: Address = address!("0xe8537a3d056DA446677B9E9d6c5dB704EaAb4787");

/// Default block gas fraction of mainnet cUSD.
pub const CUSD_FEE_CURRENCY_LIMIT: f64 = 0.9;

/// Default block gas fraction of mainnet cEUR.
pub const CEUR_FEE_CURRENCY_LIMIT: f64 = 0.5;

/// Default block gas fraction of mainnet cREAL.
pub const CREAL_FEE_CURRENCY_LIMIT: f64 = 0.5;

/// Default price bump, in percent, a replacement transaction must offer over the one it replaces.
pub const DEFAULT_PRICE_BUMP: u64 = 10;

/// Default number of transactions a single account may keep in the pool.
pub const DEFAULT_ACCOUNT_SLOTS: usize = 64;

/// Intrinsic gas of a call transaction.
pub const TX_GAS: u64 = 21_000;

/// Intrinsic gas of a contract creation transaction.
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;

/// Intrinsic gas per zero byte of call data.
pub const TX_DATA_ZERO_GAS: u64 = 4;

/// Intrinsic gas per non-zero byte of call data.
pub const TX_DATA_NON_ZERO_GAS: u64 = 16;

/// Intrinsic gas per address of an access list.
pub const TX_ACCESS_LIST_ADDRESS_GAS: u64 = 2_400;

/// Intrinsic gas per storage key of an access list.
pub const TX_ACCESS_LIST_STORAGE_KEY_GAS: u64 = 1_900;
