use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid input for {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("ROI is undefined for a total investment of {total_investment}")]
    UndefinedRoi { total_investment: f64 },

    #[error("{stage} produced a non-finite value")]
    NonFinite { stage: &'static str },

    #[error("invalid projection config: {0}")]
    InvalidProjection(String),
}

impl EngineError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}
