//! Share-price and entitlement arithmetic.
//!
//! All conversions in both directions go through this module so the two
//! withdrawal variants agree bit-for-bit on the resulting share price.

use agora_types::Amount;

/// Position value covered by the first entitlement tier
pub const TIER1_CEILING: u64 = 100;
/// Position value covered by the first two entitlement tiers
pub const TIER2_CEILING: u64 = 1_000;
/// Units of pooled value per governance token, tier 1
pub const TIER1_RATE: u64 = 10;
/// Units of pooled value per governance token, tier 2
pub const TIER2_RATE: u64 = 20;
/// Units of pooled value per governance token, tier 3
pub const TIER3_RATE: u64 = 50;

/// Value per share: total assets over total shares, truncating.
/// Degenerates to 1 when either operand is zero, so the divisor is never
/// zero and an empty pool prices shares one-to-one.
pub fn share_price(total_assets: Amount, total_shares: Amount) -> u64 {
    if total_assets.is_zero() || total_shares.is_zero() {
        return 1;
    }
    total_assets.to_units() / total_shares.to_units()
}

/// Base-asset value to shares at the given price, truncating.
pub fn to_shares(value: Amount, price: u64) -> Amount {
    Amount::from_units(value.to_units() / price.max(1))
}

/// Shares to base-asset value at the given price.
pub fn to_value(shares: Amount, price: u64) -> Amount {
    Amount::from_units(shares.to_units().saturating_mul(price.max(1)))
}

/// Theoretical governance-token entitlement for a position value.
///
/// Three-tier piecewise-linear schedule, each term truncating:
/// the first 100 units earn 1 GT per 10, the next 900 earn 1 per 20,
/// everything above 1000 earns 1 per 50.
pub fn entitlement(position_value: Amount) -> Amount {
    let v = position_value.to_units();
    let tier1 = v.min(TIER1_CEILING) / TIER1_RATE;
    let tier2 = v.saturating_sub(TIER1_CEILING).min(TIER2_CEILING - TIER1_CEILING) / TIER2_RATE;
    let tier3 = v.saturating_sub(TIER2_CEILING) / TIER3_RATE;
    Amount::from_units(tier1 + tier2 + tier3)
}
