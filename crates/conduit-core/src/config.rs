//! Configuration types for Conduit

use serde::{Deserialize, Serialize};

use crate::errors::SwapError;
use crate::types::constants::{BPS_DENOM, MAX_FEE_BPS};
use crate::types::{Address, TokenId};

/// Protocol fee configuration. Mutated only through the admin surface,
/// read by every swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Fee in basis points taken off the input amount
    pub fee_bps: u16,

    /// Account credited with the fee leg
    pub fee_recipient: Address,
}

impl FeeConfig {
    pub fn new(fee_bps: u16, fee_recipient: Address) -> Result<Self, SwapError> {
        let config = Self {
            fee_bps,
            fee_recipient,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SwapError> {
        if self.fee_bps > MAX_FEE_BPS {
            return Err(SwapError::FeeConfigInvalid {
                reason: format!("fee {} bps exceeds maximum {}", self.fee_bps, MAX_FEE_BPS),
            });
        }
        if self.fee_recipient.is_zero() {
            return Err(SwapError::FeeConfigInvalid {
                reason: "fee recipient must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Slippage tolerance bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageConfig {
    /// Tolerance applied when a caller has no override, in basis points
    #[serde(default = "default_slippage_bps")]
    pub default_bps: u16,

    /// Hard ceiling for any caller-supplied tolerance
    #[serde(default = "default_max_slippage_bps")]
    pub max_bps: u16,
}

fn default_slippage_bps() -> u16 {
    50
}

fn default_max_slippage_bps() -> u16 {
    5_000
}

impl Default for SlippageConfig {
    fn default() -> Self {
        Self {
            default_bps: default_slippage_bps(),
            max_bps: default_max_slippage_bps(),
        }
    }
}

impl SlippageConfig {
    pub fn validate(&self) -> Result<(), SwapError> {
        if self.max_bps > BPS_DENOM as u16 {
            return Err(SwapError::SlippageConfigInvalid {
                bps: self.max_bps,
                max_bps: BPS_DENOM as u16,
            });
        }
        if self.default_bps == 0 || self.default_bps > self.max_bps {
            return Err(SwapError::SlippageConfigInvalid {
                bps: self.default_bps,
                max_bps: self.max_bps,
            });
        }
        Ok(())
    }
}

/// Router deployment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Admin identity; implicitly authorized, manages the agent registry
    pub admin: Address,

    /// Wrapped representation of the native asset
    pub wrapped_native: TokenId,

    /// Protocol fee settings
    pub fee: FeeConfig,

    /// Slippage bounds
    #[serde(default)]
    pub slippage: SlippageConfig,

    /// Intermediate tokens tried for the two-hop fallback route
    #[serde(default)]
    pub route_intermediates: Vec<TokenId>,
}

impl RouterConfig {
    pub fn validate(&self) -> Result<(), SwapError> {
        if self.admin.is_zero() {
            return Err(SwapError::InvalidRequest {
                reason: "admin must be non-zero".to_string(),
            });
        }
        self.fee.validate()?;
        self.slippage.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::new(bytes)
    }

    #[test]
    fn test_fee_config_bounds() {
        assert!(FeeConfig::new(MAX_FEE_BPS, addr(1)).is_ok());
        assert!(FeeConfig::new(MAX_FEE_BPS + 1, addr(1)).is_err());
        assert!(FeeConfig::new(30, Address::ZERO).is_err());
    }

    #[test]
    fn test_slippage_defaults() {
        let config = SlippageConfig::default();
        assert_eq!(config.default_bps, 50);
        assert_eq!(config.max_bps, 5_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_slippage_default_above_max_rejected() {
        let config = SlippageConfig {
            default_bps: 6_000,
            max_bps: 5_000,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_slippage_ceiling_cannot_exceed_full_range() {
        let config = SlippageConfig {
            default_bps: 50,
            max_bps: 10_001,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_router_config_serialization() {
        let config = RouterConfig {
            admin: addr(1),
            wrapped_native: TokenId::new(addr(2)),
            fee: FeeConfig {
                fee_bps: 25,
                fee_recipient: addr(3),
            },
            slippage: SlippageConfig::default(),
            route_intermediates: vec![TokenId::new(addr(4))],
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RouterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.admin, config.admin);
        assert_eq!(parsed.fee, config.fee);
        assert_eq!(parsed.route_intermediates, config.route_intermediates);
    }
}
