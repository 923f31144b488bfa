pub mod arbitrage;
pub mod execution;
pub mod market;
pub mod price_impact;
pub mod simulator;

pub use arbitrage::{arbitrage_correction, ArbCorrection};
pub use execution::{execute_trade, TradeDirection, TradeFill};
pub use market::PathOutcome;
pub use price_impact::{generate_price_impact_curve, PriceImpactPoint};
pub use simulator::{EvaluationResult, Simulator};
