//! Validation severity levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The severity of a validation failure.
///
/// Levels are ordered by severity: Critical > Error > Warning > Info.
///
/// - **Critical**: the cell cannot be trusted at all. Rule execution errors
///   are always reported at this level.
/// - **Error**: the value is invalid and should block a save.
/// - **Warning**: the value is suspicious but acceptable.
/// - **Info**: an observation shown to the user without blocking anything.
///
/// # Examples
///
/// ```rust
/// use grid_guard::core::Severity;
///
/// assert!(Severity::Critical > Severity::Error);
/// assert!(Severity::Error.is_blocking());
/// assert!(!Severity::Warning.is_blocking());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational observation
    Info = 0,
    /// Potential issue that should be reviewed
    Warning = 1,
    /// Invalid value
    #[default]
    Error = 2,
    /// Invalid value or broken rule; always blocking
    Critical = 3,
}

impl Severity {
    /// Returns the string representation of the severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }

    /// Checks if this severity is at least as severe as another one.
    pub fn is_at_least(&self, other: Severity) -> bool {
        *self >= other
    }

    /// Returns true for Error and Critical.
    pub fn is_blocking(&self) -> bool {
        self.is_at_least(Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_severity_is_at_least() {
        assert!(Severity::Critical.is_at_least(Severity::Info));
        assert!(Severity::Error.is_at_least(Severity::Error));
        assert!(!Severity::Warning.is_at_least(Severity::Error));
        assert!(!Severity::Info.is_at_least(Severity::Warning));
    }

    #[test]
    fn test_severity_blocking() {
        assert!(Severity::Critical.is_blocking());
        assert!(Severity::Error.is_blocking());
        assert!(!Severity::Warning.is_blocking());
        assert!(!Severity::Info.is_blocking());
    }

    #[test]
    fn test_severity_serde() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");

        let level: Severity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(level, Severity::Warning);
    }
}
