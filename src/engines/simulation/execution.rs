// src/engines/simulation/execution.rs
use crate::liquidity::LiquidityVector;
use crate::types::{BIN_WIDTH, LOG_PRICE_MAX, LOG_PRICE_MIN, NUM_BINS};

const EDGE_EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeDirection {
    /// Buys from the pool, pushing the price up
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TradeFill {
    pub end_log_price: f64,
    pub filled: f64,
    /// Notional-weighted distance between execution price and starting price
    pub slippage: f64,
    pub fee: f64,
}

/// Walk a trade through the bins starting at `start_log_price`.
///
/// The bin holding the current price is consumed first, then its neighbour in the
/// direction of the trade. A bin with weight `w` absorbs `w` notional over its full width.
/// Empty bins are crossed without filling. Whatever is left at the edge of the grid
/// goes unfilled.
pub fn execute_trade(
    bins: &LiquidityVector,
    start_log_price: f64,
    size: f64,
    direction: TradeDirection,
    fee_rate: f64,
    visited: &mut [bool],
) -> TradeFill {
    let start = start_log_price.clamp(LOG_PRICE_MIN, LOG_PRICE_MAX);
    let mut fill = TradeFill {
        end_log_price: start,
        ..Default::default()
    };
    if !(size > 0.0) || !size.is_finite() {
        return fill;
    }

    let weights = bins.weights();
    let mut price = start;
    let mut remaining = size;
    let mut idx = LiquidityVector::bin_index(price) as isize;
    let step: isize = match direction {
        TradeDirection::Buy => {
            if price >= LOG_PRICE_MAX {
                idx = NUM_BINS as isize;
            }
            1
        }
        TradeDirection::Sell => {
            if price - LiquidityVector::bin_lower(idx as usize) <= EDGE_EPS {
                idx -= 1;
            }
            -1
        }
    };

    while remaining > 0.0 && idx >= 0 && (idx as usize) < NUM_BINS {
        let i = idx as usize;
        let lower = LiquidityVector::bin_lower(i);
        let upper = lower + BIN_WIDTH;
        let (edge, room) = match direction {
            TradeDirection::Buy => (upper, (upper - price).max(0.0)),
            TradeDirection::Sell => (lower, (price - lower).max(0.0)),
        };

        let density = weights[i] / BIN_WIDTH;
        if density <= 0.0 {
            price = edge;
            idx += step;
            continue;
        }

        let capacity = density * room;
        let (chunk, next_price) = if remaining <= capacity {
            let moved = remaining / density;
            let next = match direction {
                TradeDirection::Buy => price + moved,
                TradeDirection::Sell => price - moved,
            };
            (remaining, next)
        } else {
            (capacity, edge)
        };

        if chunk > 0.0 {
            fill.slippage += chunk * ((price + next_price) / 2.0 - start).abs();
            fill.filled += chunk;
            if let Some(flag) = visited.get_mut(i) {
                *flag = true;
            }
        }
        remaining -= chunk;
        price = next_price;
        if remaining > 0.0 {
            idx += step;
        }
    }

    fill.end_log_price = price;
    fill.fee = fill.filled * fee_rate;
    fill
}
