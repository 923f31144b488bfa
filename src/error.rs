use thiserror::Error;

#[derive(Error, Debug)]
pub enum CurveLabError {
    #[error("Degenerate liquidity: {0}")]
    DegenerateLiquidity(String),

    #[error("Invalid regime: {0}")]
    InvalidRegime(String),

    #[error("Invalid mechanism: {0}")]
    InvalidMechanism(String),

    #[error("Mechanism is missing required field `{0}`")]
    MissingField(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, CurveLabError>;
