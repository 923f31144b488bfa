// src/engines/simulation/market.rs
use super::arbitrage::arbitrage_correction;
use super::execution::{execute_trade, TradeDirection};
use crate::config::SimulationConfig;
use crate::liquidity::LiquidityVector;
use crate::types::{RegimeConfig, LOG_PRICE_MAX, LOG_PRICE_MIN, NUM_BINS, TOTAL_LIQUIDITY};
use rand::Rng;
use rand_distr::{Distribution, LogNormal, StandardNormal};

/// Keeps LP/HODL strictly positive so per-step returns stay finite
const EQUITY_FLOOR: f64 = 1e-6;

/// One simulated trajectory of the pool against the external market
#[derive(Debug, Clone, Default)]
pub struct PathOutcome {
    pub external_prices: Vec<f64>,
    pub pool_prices: Vec<f64>,
    /// LP value over HODL value, one point per step plus the starting 1.0
    pub equity_curve: Vec<f64>,
    pub fees: f64,
    pub slippage: f64,
    pub arb_leakage: f64,
    pub bins_visited: usize,
}

impl PathOutcome {
    pub fn lp_hodl(&self) -> f64 {
        self.equity_curve.last().copied().unwrap_or(1.0)
    }

    pub fn utilization(&self) -> f64 {
        self.bins_visited as f64 / NUM_BINS as f64
    }
}

/// Jump-diffusion step of the external log-price, clamped to the bin grid.
pub fn next_external_log_price<R: Rng + ?Sized>(
    current: f64,
    regime: &RegimeConfig,
    rng: &mut R,
) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    let mut increment =
        regime.drift - 0.5 * regime.volatility * regime.volatility + regime.volatility * z;

    if regime.jump_intensity > 0.0 && rng.gen::<f64>() < regime.jump_intensity {
        let jz: f64 = rng.sample(StandardNormal);
        increment += regime.jump_mean + regime.jump_std * jz;
    }

    (current + increment).clamp(LOG_PRICE_MIN, LOG_PRICE_MAX)
}

/// Replay `bins` against one random path of `regime`.
///
/// Each step the external price moves, arbitrageurs partially close the gap, then
/// `trades_per_step` noise trades of random size and side hit the pool.
pub fn simulate_path<R: Rng + ?Sized>(
    bins: &LiquidityVector,
    regime: &RegimeConfig,
    config: &SimulationConfig,
    fee_rate: f64,
    rng: &mut R,
) -> PathOutcome {
    let sigma = config.trade_size_sigma;
    let size_dist = LogNormal::new(-0.5 * sigma * sigma, sigma).ok();
    let base_size = config.trade_size_scale * TOTAL_LIQUIDITY;

    let mut outcome = PathOutcome {
        external_prices: Vec::with_capacity(config.steps + 1),
        pool_prices: Vec::with_capacity(config.steps + 1),
        equity_curve: Vec::with_capacity(config.steps + 1),
        ..Default::default()
    };
    let mut visited = vec![false; NUM_BINS];
    let mut external = 0.0;
    let mut pool = 0.0;

    outcome.external_prices.push(external);
    outcome.pool_prices.push(pool);
    outcome.equity_curve.push(1.0);

    for _ in 0..config.steps {
        external = next_external_log_price(external, regime, rng);

        let arb = arbitrage_correction(bins, pool, external, regime.arb_responsiveness, fee_rate);
        pool = arb.log_price;
        outcome.fees += arb.fee;
        outcome.arb_leakage += arb.leakage;

        for _ in 0..config.trades_per_step {
            let size = match &size_dist {
                Some(dist) => base_size * dist.sample(rng),
                None => base_size,
            };
            let direction = if rng.gen_bool(0.5) {
                TradeDirection::Buy
            } else {
                TradeDirection::Sell
            };
            let fill = execute_trade(bins, pool, size, direction, fee_rate, &mut visited);
            pool = fill.end_log_price;
            outcome.fees += fill.fee;
            outcome.slippage += fill.slippage;
        }

        let lp_value = TOTAL_LIQUIDITY + outcome.fees - outcome.arb_leakage;
        outcome
            .equity_curve
            .push((lp_value / TOTAL_LIQUIDITY).max(EQUITY_FLOOR));
        outcome.external_prices.push(external);
        outcome.pool_prices.push(pool);
    }

    outcome.bins_visited = visited.iter().filter(|v| **v).count();
    outcome
}
