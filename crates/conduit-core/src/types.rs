//! Core type definitions for Conduit

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw token amount (smallest unit). Wide enough for 18-decimal assets.
pub type Amount = u128;

/// Ledger time in unix seconds.
pub type Timestamp = u64;

/// Account address (20 bytes, hex-encoded as `0x…`)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address; never a valid recipient or fee sink.
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|e| format!("invalid address hex: {}", e))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| format!("address must be 20 bytes: {}", s))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_string()
    }
}

/// Token identifier (the token contract's address)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub Address);

impl TokenId {
    pub fn new(addr: Address) -> Self {
        Self(addr)
    }

    pub fn address(&self) -> Address {
        self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TokenId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Opaque pool handle assigned by the liquidity source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(pub String);

impl PoolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Swap fee tier of a liquidity pool.
///
/// The candidate set {100, 500, 3000, 10000} is fixed and ordered; a pool
/// carries exactly one tier for its whole lifetime. Tier values are in the
/// AMM's native unit, hundredths of a basis point: 100 = 0.01%, 10000 = 1%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum FeeTier {
    /// 0.01%, very stable pairs
    Lowest,
    /// 0.05%, stable pairs
    Low,
    /// 0.30%, most pairs
    Medium,
    /// 1.00%, exotic pairs
    High,
}

impl FeeTier {
    /// All tiers, ascending by fee. Pool location scans in this order.
    pub const ALL: [FeeTier; 4] = [
        FeeTier::Lowest,
        FeeTier::Low,
        FeeTier::Medium,
        FeeTier::High,
    ];

    /// The tier's raw value (hundredths of a basis point).
    pub fn value(&self) -> u32 {
        match self {
            Self::Lowest => 100,
            Self::Low => 500,
            Self::Medium => 3000,
            Self::High => 10000,
        }
    }

    /// Fee numerator over [`constants::FEE_DENOM`]: the share of input the
    /// pool keeps after its fee.
    pub fn fee_num(&self) -> u32 {
        constants::FEE_DENOM - self.value()
    }

    pub fn from_value(value: u32) -> Option<FeeTier> {
        Self::ALL.iter().copied().find(|t| t.value() == value)
    }
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.value() as f64 / 10_000.0)
    }
}

impl From<FeeTier> for u32 {
    fn from(tier: FeeTier) -> Self {
        tier.value()
    }
}

impl TryFrom<u32> for FeeTier {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or_else(|| format!("unknown fee tier: {}", value))
    }
}

/// Constants
pub mod constants {
    /// Basis-point denominator (10000 bps = 100%)
    pub const BPS_DENOM: u32 = 10_000;

    /// Upper bound for the protocol fee (10%)
    pub const MAX_FEE_BPS: u16 = 1_000;

    /// Denominator of pool fee fractions; tier values are hundredths of a
    /// basis point, so a tier's fee fraction is `value / FEE_DENOM`.
    pub const FEE_DENOM: u32 = 1_000_000;

    /// Decimals of the native asset and its wrapped representation
    pub const NATIVE_DECIMALS: u8 = 18;
}
