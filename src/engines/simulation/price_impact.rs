use super::execution::{execute_trade, TradeDirection};
use crate::liquidity::LiquidityVector;
use crate::types::{NUM_BINS, TOTAL_LIQUIDITY};
use serde::{Deserialize, Serialize};

const CURVE_POINTS: usize = 24;
const MIN_TRADE_FRACTION: f64 = 0.001;
const MAX_TRADE_FRACTION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceImpactPoint {
    pub trade_size: f64,
    /// Relative price move caused by the trade, e.g. 0.01 = 1%
    pub impact: f64,
}

/// Price impact of buys of increasing size executed from log-price 0.
///
/// Sizes are log-spaced between 0.1% and 50% of total liquidity. Read-only.
pub fn generate_price_impact_curve(bins: &LiquidityVector) -> Vec<PriceImpactPoint> {
    let ratio = (MAX_TRADE_FRACTION / MIN_TRADE_FRACTION).powf(1.0 / (CURVE_POINTS - 1) as f64);
    let mut scratch = vec![false; NUM_BINS];

    (0..CURVE_POINTS)
        .map(|i| {
            let trade_size = TOTAL_LIQUIDITY * MIN_TRADE_FRACTION * ratio.powi(i as i32);
            let fill = execute_trade(bins, 0.0, trade_size, TradeDirection::Buy, 0.0, &mut scratch);
            PriceImpactPoint {
                trade_size,
                impact: fill.end_log_price.exp() - 1.0,
            }
        })
        .collect()
}
