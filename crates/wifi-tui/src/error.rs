//! Error types shared by backends, the resolver and the command layer.

use thiserror::Error;

/// Errors produced while talking to a network backend.
///
/// The variants are deliberately coarse: the UI decides how to present each
/// class, and `WirelessDisabled` is kept apart so the UI can offer to turn
/// the radio on instead of showing a generic failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WifiError {
    /// The referenced SSID or saved record does not exist.
    #[error("network not found: {0}")]
    NotFound(String),

    /// The backend structurally cannot provide this capability.
    #[error("not supported by this backend: {0}")]
    NotSupported(&'static str),

    /// The backend service could not be reached.
    #[error("backend not available: {0}")]
    NotAvailable(String),

    /// The backend call itself failed.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// The wireless radio is switched off.
    #[error("wireless is disabled")]
    WirelessDisabled,
}

impl WifiError {
    /// Shorthand for [`WifiError::OperationFailed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::OperationFailed(reason.into())
    }

    /// Whether this error only signals a missing capability.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported(_))
    }

    /// Whether the radio needs to be enabled before retrying.
    pub fn is_wireless_disabled(&self) -> bool {
        matches!(self, Self::WirelessDisabled)
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, WifiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_capability() {
        let err = WifiError::NotSupported("get_secret");
        assert_eq!(err.to_string(), "not supported by this backend: get_secret");
        assert!(err.is_not_supported());
        assert!(!err.is_wireless_disabled());
    }

    #[test]
    fn test_wireless_disabled_is_distinct() {
        assert!(WifiError::WirelessDisabled.is_wireless_disabled());
        assert!(!WifiError::failed("boom").is_wireless_disabled());
    }
}
