use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::MonthKey;

#[derive(Error, Debug)]
pub enum ReconciliationError {
    #[error("Invalid transaction record #{index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("User income is missing or invalid: {0}")]
    MissingIncome(String),

    #[error("Forecast service unavailable: {0}")]
    ForecastUnavailable(String),

    #[error("Allocation service unavailable: {0}")]
    AllocationUnavailable(String),

    #[error("Allocation for class '{class}' is inconsistent: top assets sum to {asset_total}, exceeding allocation {allocation}")]
    AllocationInconsistent {
        class: String,
        asset_total: Decimal,
        allocation: Decimal,
    },

    #[error("Month {0} appears in history but is also covered by the forecast")]
    OverlappingMonth(MonthKey),

    #[error("Invalid investment amount {0}: must be greater than zero")]
    InvalidAmount(Decimal),

    #[error("Invalid month label '{0}': expected YYYY-MM")]
    InvalidMonthLabel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ReconciliationError {
    /// Stable code the caller can map to a specific user-facing message.
    pub fn code(&self) -> ReasonCode {
        match self {
            Self::InvalidRecord { .. } => ReasonCode::InvalidRecord,
            Self::MissingIncome(_) => ReasonCode::MissingIncome,
            Self::ForecastUnavailable(_) => ReasonCode::ForecastUnavailable,
            Self::AllocationUnavailable(_) => ReasonCode::AllocationUnavailable,
            Self::AllocationInconsistent { .. } => ReasonCode::AllocationInconsistent,
            Self::OverlappingMonth(_) => ReasonCode::OverlappingMonth,
            Self::InvalidAmount(_) => ReasonCode::InvalidAmount,
            Self::InvalidMonthLabel(_) => ReasonCode::InvalidMonthLabel,
            Self::InvalidConfig(_) => ReasonCode::InvalidConfig,
            Self::ArithmeticOverflow(_) => ReasonCode::ArithmeticOverflow,
            Self::SerializationError(_) => ReasonCode::Serialization,
        }
    }

    /// Converts a non-fatal condition into a diagnostic attached to a result.
    pub fn to_diagnostic(&self, severity: Severity) -> Diagnostic {
        Diagnostic {
            code: self.code(),
            severity,
            message: self.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    InvalidRecord,
    MissingIncome,
    ForecastUnavailable,
    AllocationUnavailable,
    AllocationInconsistent,
    OverlappingMonth,
    InvalidAmount,
    InvalidMonthLabel,
    InvalidConfig,
    ArithmeticOverflow,
    Serialization,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRecord => "INVALID_RECORD",
            Self::MissingIncome => "MISSING_INCOME",
            Self::ForecastUnavailable => "FORECAST_UNAVAILABLE",
            Self::AllocationUnavailable => "ALLOCATION_UNAVAILABLE",
            Self::AllocationInconsistent => "ALLOCATION_INCONSISTENT",
            Self::OverlappingMonth => "OVERLAPPING_MONTH",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::InvalidMonthLabel => "INVALID_MONTH_LABEL",
            Self::InvalidConfig => "INVALID_CONFIG",
            Self::ArithmeticOverflow => "ARITHMETIC_OVERFLOW",
            Self::Serialization => "SERIALIZATION",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A condition reported next to a result instead of aborting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Diagnostic {
    pub code: ReasonCode,
    pub severity: Severity,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, ReconciliationError>;
