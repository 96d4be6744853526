//! Strike targets and contract lot sizing.

use options_bot_core::CONTRACT_MULTIPLIER;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Minimum call strike: `price * (1 + margin)`.
pub fn call_strike(price: Decimal, margin: Decimal) -> Decimal {
    (price * (Decimal::ONE + margin)).normalize()
}

/// Minimum put strike: `price * (1 - margin)`.
pub fn put_strike(price: Decimal, margin: Decimal) -> Decimal {
    (price * (Decimal::ONE - margin)).normalize()
}

/// Strike bound sent to the broker: `strike` truncated to the cent.
///
/// Never above `strike`, so the exact comparison can run on the results.
pub fn query_floor(strike: Decimal) -> Decimal {
    strike
        .round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity)
        .normalize()
}

/// Calls coverable by `shares`: one contract per 100 shares held.
pub fn covered_call_lots(shares: Decimal) -> u32 {
    whole_lots(shares / Decimal::from(CONTRACT_MULTIPLIER))
}

/// Puts `cash` can secure at `strike`. Zero if it cannot cover one contract.
pub fn covered_put_lots(cash: Decimal, strike: Decimal) -> u32 {
    if strike <= Decimal::ZERO || cash < strike * Decimal::from(CONTRACT_MULTIPLIER) {
        return 0;
    }
    whole_lots(cash / strike / Decimal::from(CONTRACT_MULTIPLIER))
}

fn whole_lots(value: Decimal) -> u32 {
    if value <= Decimal::ZERO {
        return 0;
    }
    value.floor().to_u32().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn call_strike_adds_margin() {
        assert_eq!(call_strike(dec!(200.0), dec!(0.05)), dec!(210));
    }

    #[test]
    fn put_strike_subtracts_margin() {
        assert_eq!(put_strike(dec!(200.0), dec!(0.05)), dec!(190));
    }

    #[test]
    fn strikes_are_not_rounded() {
        assert_eq!(call_strike(dec!(123.45), dec!(0.07)), dec!(132.0915));
        assert_eq!(put_strike(dec!(101.01), dec!(0.03)), dec!(97.9797));
    }

    #[test]
    fn query_floor_truncates_to_cent() {
        assert_eq!(query_floor(dec!(97.9797)), dec!(97.97));
        assert_eq!(query_floor(dec!(189.99525)), dec!(189.99));
        assert_eq!(query_floor(dec!(210)), dec!(210));
    }

    #[test]
    fn call_lots_floor_by_hundred() {
        assert_eq!(covered_call_lots(dec!(300)), 3);
        assert_eq!(covered_call_lots(dec!(200)), 2);
        assert_eq!(covered_call_lots(dec!(150)), 1);
        assert_eq!(covered_call_lots(dec!(99)), 0);
        assert_eq!(covered_call_lots(dec!(-300)), 0);
    }

    #[test]
    fn put_lots_need_full_collateral() {
        assert_eq!(covered_put_lots(dec!(1000), dec!(190)), 0);
        assert_eq!(covered_put_lots(dec!(18999.99), dec!(190)), 0);
        assert_eq!(covered_put_lots(dec!(19000), dec!(190)), 1);
        assert_eq!(covered_put_lots(dec!(50000), dec!(190)), 2);
    }

    #[test]
    fn put_lots_use_unrounded_strike() {
        // 100 * 189.99525 = 18999.525, which 18999.60 covers.
        let strike = put_strike(dec!(199.995), dec!(0.05));
        assert_eq!(strike, dec!(189.99525));
        assert_eq!(covered_put_lots(dec!(18999.60), strike), 1);
        assert_eq!(covered_put_lots(dec!(18999.52), strike), 0);
    }

    #[test]
    fn put_lots_zero_strike() {
        assert_eq!(covered_put_lots(dec!(50000), dec!(0)), 0);
    }
}
