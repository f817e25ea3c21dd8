use thiserror::Error;

#[derive(Error, Debug)]
pub enum RatingError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Census error: {0}")]
    Census(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No state column found in census")]
    NoStateColumn,

    #[error("Fit score weights must sum to 100, got {sum}")]
    InvalidWeights { sum: u32 },

    #[error("Plan id '{plan_id}' is too short to carry a state code")]
    InvalidPlanId { plan_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RatingResult<T> = Result<T, RatingError>;
