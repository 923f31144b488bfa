// src/engines/simulation/arbitrage.rs
use crate::liquidity::LiquidityVector;
use crate::types::ARB_THRESHOLD;

/// Outcome of one arbitrage step against the external price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArbCorrection {
    pub log_price: f64,
    /// Fees paid by the arbitrageur into the pool
    pub fee: f64,
    /// Value extracted by the arbitrageur, net of fees
    pub leakage: f64,
    /// Liquidity traded through to close the full gap
    pub volume: f64,
}

/// Pull the pool log-price toward the external log-price.
///
/// Gaps inside `ARB_THRESHOLD` are left alone. Otherwise the pool moves by
/// `responsiveness` of the gap (responsiveness 1 lands exactly on the external price).
/// Fee and leakage are priced off the whole gap, so they do not depend on
/// `responsiveness`; only the residual gap does.
pub fn arbitrage_correction(
    bins: &LiquidityVector,
    pool_log_price: f64,
    external_log_price: f64,
    responsiveness: f64,
    fee_rate: f64,
) -> ArbCorrection {
    let gap = external_log_price - pool_log_price;
    if !gap.is_finite() || gap.abs() <= ARB_THRESHOLD {
        return ArbCorrection {
            log_price: pool_log_price,
            fee: 0.0,
            leakage: 0.0,
            volume: 0.0,
        };
    }

    let responsiveness = responsiveness.clamp(f64::MIN_POSITIVE, 1.0);
    let log_price = if responsiveness >= 1.0 {
        external_log_price
    } else {
        pool_log_price + responsiveness * gap
    };

    let volume = bins.depth_between(pool_log_price, external_log_price);
    let fee = volume * fee_rate;
    let gross = 0.5 * volume * gap.abs();

    ArbCorrection {
        log_price,
        fee,
        leakage: (gross - fee).max(0.0),
        volume,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_deadband_is_untouched() {
        let bins = LiquidityVector::uniform();
        let result = arbitrage_correction(&bins, 0.0, ARB_THRESHOLD * 0.5, 1.0, 0.003);

        assert_eq!(result.log_price, 0.0);
        assert_eq!(result.fee, 0.0);
        assert_eq!(result.leakage, 0.0);
    }

    #[test]
    fn test_downward_gap_moves_pool_down() {
        let bins = LiquidityVector::uniform();
        let result = arbitrage_correction(&bins, 0.1, -0.1, 0.5, 0.003);

        assert!((result.log_price - 0.0).abs() < 1e-12);
        assert!(result.fee > 0.0);
        assert!(result.leakage > 0.0);
    }

    #[test]
    fn test_empty_range_has_no_volume() {
        let mut weights = vec![0.0; crate::types::NUM_BINS];
        weights[0] = 1.0;
        let bins = LiquidityVector::from_weights(weights).unwrap();
        let result = arbitrage_correction(&bins, 0.0, 0.5, 1.0, 0.003);

        assert_eq!(result.log_price, 0.5);
        assert_eq!(result.volume, 0.0);
        assert_eq!(result.fee, 0.0);
    }
}
