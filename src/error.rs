use thiserror::Error;

/// Library error types.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: total category weight is zero")]
    ZeroTotalWeight,

    #[error("Configuration error: invalid weight {weight} for category {category}")]
    InvalidWeight { category: String, weight: f64 },

    #[error("Configuration error: invalid tier table: {0}")]
    InvalidTierTable(String),

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Invalid price series: {0}")]
    InvalidSeries(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error comes from caller-supplied configuration rather than data.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::ZeroTotalWeight
                | Error::InvalidWeight { .. }
                | Error::InvalidTierTable(_)
                | Error::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
