//! Outcome of single-target mutations.

use crate::matcher::Criteria;
use serde::Serialize;
use std::fmt;

/// Status code reported on success.
pub const STATUS_OK: i32 = 0;
/// Status code reported on failure.
pub const STATUS_FAILED: i32 = -1;

/// Why a single-target mutation was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    /// No record matched the criteria.
    NoMatch,
    /// More than one record matched the criteria.
    AmbiguousMatch,
}

/// Result of [`crate::DataSpace::change`] and [`crate::DataSpace::replace`].
///
/// Match failures are expected input conditions, so they come back as a
/// status rather than an error and batch callers can keep going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    success: bool,
    status_code: i32,
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<FailureReason>,
}

impl OperationStatus {
    /// A successful status.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            status_code: STATUS_OK,
            error: None,
            reason: None,
        }
    }

    /// A failed status with the given reason and message.
    #[must_use]
    pub fn failed(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: STATUS_FAILED,
            error: Some(message.into()),
            reason: Some(reason),
        }
    }

    pub(crate) fn no_match(criteria: &Criteria) -> Self {
        Self::failed(
            FailureReason::NoMatch,
            format!("No items found for your request {criteria}"),
        )
    }

    pub(crate) fn ambiguous_match(criteria: &Criteria) -> Self {
        Self::failed(
            FailureReason::AmbiguousMatch,
            format!("Multiple items found for your request {criteria}"),
        )
    }

    /// Whether the operation was applied.
    #[must_use]
    pub fn success(&self) -> bool {
        self.success
    }

    /// `0` on success, negative on failure.
    #[must_use]
    pub fn status_code(&self) -> i32 {
        self.status_code
    }

    /// Failure message, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Failure reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<FailureReason> {
        self.reason
    }
}

impl Default for OperationStatus {
    fn default() -> Self {
        Self::ok()
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(error) => write!(f, "failed ({}): {}", self.status_code, error),
            None => write!(f, "ok"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_status() {
        let status = OperationStatus::ok();
        assert!(status.success());
        assert_eq!(status.status_code(), 0);
        assert!(status.error().is_none());
        assert!(status.reason().is_none());
        assert_eq!(status, OperationStatus::default());
    }

    #[test]
    fn failure_messages_name_the_criteria() {
        let criteria = Criteria::new().eq("name", "x");

        let status = OperationStatus::no_match(&criteria);
        assert!(!status.success());
        assert_eq!(status.status_code(), -1);
        assert_eq!(status.reason(), Some(FailureReason::NoMatch));
        assert_eq!(
            status.error(),
            Some(r#"No items found for your request {"name":"x"}"#)
        );

        let status = OperationStatus::ambiguous_match(&criteria);
        assert_eq!(status.reason(), Some(FailureReason::AmbiguousMatch));
        assert!(status.error().unwrap().starts_with("Multiple items found"));
    }

    #[test]
    fn serializes_wire_field_names() {
        let value = serde_json::to_value(OperationStatus::ok()).unwrap();
        assert_eq!(
            value,
            json!({"success": true, "statusCode": 0, "error": null})
        );
    }
}
