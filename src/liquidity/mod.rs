pub mod bins;
pub mod templates;

pub use bins::LiquidityVector;
pub use templates::ShapeTemplate;
