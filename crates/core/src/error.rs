use vo_types::IdentifierError;

/// Calculator anomalies: upstream data problems the copayment calculator
/// refuses to paper over, kept distinct from programming errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalculatorAnomaly {
    #[error(
        "refund would be negative: completed count {completed} exceeds prescribed count {prescribed}"
    )]
    NegativeRefund { prescribed: u32, completed: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),
    #[error("unknown prescription: {0}")]
    UnknownPrescription(String),
    #[error("unknown {dimension} status value: {value}")]
    UnknownStatus { dimension: String, value: String },
    #[error("patient is exempt from copayment; no copayment data applies")]
    CopaymentNotApplicable,
    #[error("refund is not generatable in the current settlement state")]
    RefundNotEligible,
    #[error("no copayment document has been generated yet")]
    NoDocument,
    #[error(transparent)]
    Anomaly(#[from] CalculatorAnomaly),
    #[error("status store lock poisoned")]
    LockPoisoned,
    #[error("failed to read prescription dataset: {0}")]
    DatasetRead(std::io::Error),
    #[error("failed to deserialize prescription dataset: {0}")]
    DatasetDeserialization(serde_json::Error),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
