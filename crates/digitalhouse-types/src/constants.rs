//! System-wide constants for the Digital House vault engine.

/// Decimal places of the settlement currency (PYUSD).
pub const CURRENCY_DECIMALS: u32 = 6;

/// Smallest currency units per whole token (10^6).
pub const UNITS_PER_TOKEN: u64 = 1_000_000;

/// Default settlement currency symbol.
pub const DEFAULT_CURRENCY_SYMBOL: &str = "PYUSD";

/// PYUSD token address on Sepolia, the default deployment network.
pub const DEFAULT_PYUSD_ADDRESS: &str = "0xCaC524BcA292aaade2DF8A05cC58F0a65B1B3bB9";

/// Basis-point denominator for fee rates.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default protocol share of the incremental value on a cede (30%).
pub const DEFAULT_PROTOCOL_FEE_BPS: u16 = 3_000;

/// Length in bytes of account identifiers and vault addresses.
pub const ADDRESS_LEN: usize = 20;

/// Domain separator for deterministic vault address derivation.
pub const VAULT_ADDRESS_DOMAIN: &[u8] = b"digitalhouse:vault:v1:";

/// Domain separator for access credential digests.
pub const CREDENTIAL_DOMAIN: &[u8] = b"digitalhouse:access:v1:";

/// Seconds in a day, used for stay length computations.
pub const SECONDS_PER_DAY: i64 = 86_400;
