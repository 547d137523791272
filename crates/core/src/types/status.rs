//! Transaction lifecycle status.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a status string is not one of the known values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid status '{value}', expected one of: pending, completed, cancelled, failed")]
pub struct UnknownStatus {
    /// The rejected input.
    pub value: String,
}

/// Lifecycle status of a recorded transaction.
///
/// Every transaction starts as [`TransactionStatus::Pending`]. Any status can
/// be reached from any other; there are no terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.transaction_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
    Failed,
}

impl TransactionStatus {
    /// Every status, in display order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Completed,
        Self::Cancelled,
        Self::Failed,
    ];

    /// Lowercase wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// Wire names of every status.
    #[must_use]
    pub fn valid_values() -> Vec<&'static str> {
        Self::ALL.iter().map(|status| status.as_str()).collect()
    }

    /// Whether this is the completed state.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus {
                value: s.to_owned(),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_statuses() {
        for status in TransactionStatus::ALL {
            assert_eq!(status.as_str().parse::<TransactionStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("Completed".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_unknown_status_lists_valid_values() {
        let err = "shipped".parse::<TransactionStatus>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("shipped"));
        for value in TransactionStatus::valid_values() {
            assert!(message.contains(value));
        }
    }

    #[test]
    fn test_default_is_pending() {
        assert_eq!(TransactionStatus::default(), TransactionStatus::Pending);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&TransactionStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }
}
