//! Fee Engine
//!
//! Splits a swap input into the protocol fee and the net amount routed to
//! the pool. The split is exact: no rounding loss ever escapes the pair.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use conduit_core::types::constants::BPS_DENOM;
use conduit_core::{Amount, FeeConfig};

/// Split `amount_in` into `(fee, net)`.
///
/// `fee = floor(amount_in * fee_bps / 10000)`; `fee + net == amount_in`
/// for every valid input.
pub fn split(amount_in: Amount, config: &FeeConfig) -> (Amount, Amount) {
    if amount_in == 0 || config.fee_bps == 0 {
        return (0, amount_in);
    }
    let fee = BigInt::from(amount_in) * config.fee_bps / BPS_DENOM;
    let fee = fee.to_u128().unwrap_or(0); // fee <= amount_in, always fits
    (fee, amount_in - fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::types::constants::MAX_FEE_BPS;
    use conduit_core::Address;

    fn config(fee_bps: u16) -> FeeConfig {
        let mut bytes = [0u8; 20];
        bytes[19] = 0xfe;
        FeeConfig {
            fee_bps,
            fee_recipient: Address::new(bytes),
        }
    }

    #[test]
    fn test_split_is_exact() {
        for fee_bps in [0u16, 1, 5, 30, 100, 999, MAX_FEE_BPS] {
            for amount in [0u128, 1, 3, 999, 10_000, u64::MAX as u128, u128::MAX] {
                let (fee, net) = split(amount, &config(fee_bps));
                assert_eq!(fee + net, amount, "fee_bps={} amount={}", fee_bps, amount);
                assert!(fee <= amount);
            }
        }
    }

    #[test]
    fn test_split_floors() {
        // 1 bps of 9999 = 0.9999 -> floors to 0, everything stays net
        let (fee, net) = split(9_999, &config(1));
        assert_eq!(fee, 0);
        assert_eq!(net, 9_999);

        let (fee, net) = split(10_000, &config(1));
        assert_eq!(fee, 1);
        assert_eq!(net, 9_999);
    }

    #[test]
    fn test_split_reference_scenario() {
        // 1 unit at 18 decimals, 5 bps fee
        let (fee, net) = split(1_000_000_000_000_000_000, &config(5));
        assert_eq!(fee, 500_000_000_000_000);
        assert_eq!(net, 999_500_000_000_000_000);
    }

    #[test]
    fn test_zero_fee_passes_through() {
        let (fee, net) = split(123_456, &config(0));
        assert_eq!(fee, 0);
        assert_eq!(net, 123_456);
    }
}
