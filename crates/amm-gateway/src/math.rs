//! Pool Math
//!
//! Swap math using the constant product formula (x * y = k).

use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// Calculate swap output for an exact input.
///
/// Formula: `output = (reserves_out * input * fee_num) / (reserves_in * fee_denom + input * fee_num)`
pub fn swap_output(
    reserves_in: u128,
    reserves_out: u128,
    input_amount: u128,
    fee_num: u32,
    fee_denom: u32,
) -> u128 {
    if reserves_in == 0 || reserves_out == 0 || input_amount == 0 || fee_num == 0 {
        return 0;
    }

    let numerator = BigInt::from(reserves_out) * BigInt::from(input_amount) * BigInt::from(fee_num);
    let denominator = BigInt::from(reserves_in) * BigInt::from(fee_denom)
        + BigInt::from(input_amount) * BigInt::from(fee_num);

    if denominator == BigInt::from(0) {
        return 0;
    }

    let result = numerator / denominator;
    result.try_into().unwrap_or(0)
}

/// Calculate required input for a desired output (reverse calculation).
///
/// Formula: `input = (reserves_in * output * fee_denom) / ((reserves_out - output) * fee_num)`,
/// rounded up. Returns `None` if the output cannot be taken from the reserves.
pub fn swap_input(
    reserves_in: u128,
    reserves_out: u128,
    output_amount: u128,
    fee_num: u32,
    fee_denom: u32,
) -> Option<u128> {
    if reserves_in == 0 || reserves_out == 0 || output_amount == 0 || fee_num == 0 {
        return None;
    }
    if output_amount >= reserves_out {
        return None; // Can't take more than reserves
    }

    let numerator =
        BigInt::from(reserves_in) * BigInt::from(output_amount) * BigInt::from(fee_denom);
    let denominator =
        (BigInt::from(reserves_out) - BigInt::from(output_amount)) * BigInt::from(fee_num);

    let result = (numerator / denominator) + BigInt::from(1); // Round up
    result.try_into().ok()
}

/// Spot price (reserves_out / reserves_in)
pub fn spot_price(reserves_in: u128, reserves_out: u128) -> f64 {
    if reserves_in == 0 {
        return 0.0;
    }
    reserves_out as f64 / reserves_in as f64
}

/// Price impact as a percentage
pub fn price_impact(
    reserves_in: u128,
    reserves_out: u128,
    input_amount: u128,
    output_amount: u128,
) -> f64 {
    if input_amount == 0 || output_amount == 0 {
        return 0.0;
    }

    let spot = spot_price(reserves_in, reserves_out);
    let execution = output_amount as f64 / input_amount as f64;

    if spot == 0.0 {
        return 0.0;
    }

    ((spot - execution) / spot).abs() * 100.0
}

/// Pool liquidity magnitude: the geometric mean of the reserves.
///
/// Uses BigInt since reserve_a * reserve_b can exceed u128::MAX.
/// Returns 0 if either side is empty, which marks the pool unusable.
pub fn pool_liquidity(reserve_a: u128, reserve_b: u128) -> u128 {
    if reserve_a == 0 || reserve_b == 0 {
        return 0;
    }
    let product = BigInt::from(reserve_a) * BigInt::from(reserve_b);
    product.sqrt().to_u128().unwrap_or(u128::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::types::constants::FEE_DENOM;
    use conduit_core::FeeTier;

    #[test]
    fn test_swap_output_small_trade() {
        // deep pool, 0.3% tier: output stays below 1% of reserves
        let tier = FeeTier::Medium;
        let output = swap_output(
            1_000_000_000_000,
            10_000_000_000,
            10_000_000_000,
            tier.fee_num(),
            FEE_DENOM,
        );
        assert!(output > 0);
        assert!(output < 100_000_000);
    }

    #[test]
    fn test_swap_output_empty_pool() {
        assert_eq!(swap_output(0, 1_000, 10, 997_000, FEE_DENOM), 0);
        assert_eq!(swap_output(1_000, 0, 10, 997_000, FEE_DENOM), 0);
        assert_eq!(swap_output(1_000, 1_000, 0, 997_000, FEE_DENOM), 0);
    }

    #[test]
    fn test_swap_output_higher_fee_pays_less() {
        let cheap = swap_output(
            1_000_000,
            2_000_000,
            10_000,
            FeeTier::Lowest.fee_num(),
            FEE_DENOM,
        );
        let pricey = swap_output(
            1_000_000,
            2_000_000,
            10_000,
            FeeTier::High.fee_num(),
            FEE_DENOM,
        );
        assert!(cheap > pricey);
    }

    #[test]
    fn test_swap_input_round_trips_forward() {
        let out = swap_output(1_000_000_000, 5_000_000_000, 10_000_000, 999_500, FEE_DENOM);
        let back = swap_input(1_000_000_000, 5_000_000_000, out, 999_500, FEE_DENOM).unwrap();
        // Rounded up, so the reverse never undershoots by more than a dust unit
        assert!(back >= 10_000_000 - 1);
        assert!(back <= 10_000_000 + 2);
    }

    #[test]
    fn test_swap_input_exceeds_reserves() {
        assert!(swap_input(1_000, 500, 500, 997_000, FEE_DENOM).is_none());
        assert!(swap_input(1_000, 500, 600, 997_000, FEE_DENOM).is_none());
    }

    #[test]
    fn test_price_impact() {
        let impact = price_impact(1000, 2000, 100, 180);
        // Spot price = 2.0, execution price = 1.8, impact = 10%
        assert!((impact - 10.0).abs() < 0.1);
    }

    #[test]
    fn test_pool_liquidity_geometric_mean() {
        assert_eq!(pool_liquidity(100, 400), 200);
        assert_eq!(pool_liquidity(1000, 1000), 1000);
        assert_eq!(pool_liquidity(0, 1000), 0);
    }

    #[test]
    fn test_pool_liquidity_overflow_safe() {
        let result = pool_liquidity(u128::MAX / 2, u128::MAX / 2);
        assert!(result > 0);
    }
}
