//! Error types for the XenAPI client crate.

use std::fmt;

/// Categorised error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XenErrorKind {
    /// Login rejected by the server
    AuthenticationError,
    /// Response shape violates the envelope contract, or bad wire data
    ProtocolError,
    /// No response or network-level failure
    ConnectivityError,
    /// Server returned a structured failure with a description
    RemoteError,
    /// Server returned a failure with no description
    UnknownRemoteError,
    /// Connect or total-request timeout
    Timeout,
}

/// Crate error type carrying a kind + human-readable message.
#[derive(Debug, Clone)]
pub struct XenError {
    pub kind: XenErrorKind,
    pub message: String,
}

impl XenError {
    pub fn new(kind: XenErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(XenErrorKind::AuthenticationError, msg)
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::new(XenErrorKind::ProtocolError, msg)
    }

    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::new(XenErrorKind::ConnectivityError, msg)
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::new(XenErrorKind::RemoteError, msg)
    }

    pub fn unknown_remote(msg: impl Into<String>) -> Self {
        Self::new(XenErrorKind::UnknownRemoteError, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(XenErrorKind::Timeout, msg)
    }
}

impl fmt::Display for XenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for XenError {}

impl From<reqwest::Error> for XenError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("HTTP timeout: {e}"))
        } else if e.is_connect() {
            Self::connectivity(format!("Connection failed: {e}"))
        } else {
            Self::connectivity(format!("HTTP error: {e}"))
        }
    }
}

impl From<quick_xml::Error> for XenError {
    fn from(e: quick_xml::Error) -> Self {
        Self::protocol(format!("XML error: {e}"))
    }
}

/// Convenience alias.
pub type XenResult<T> = Result<T, XenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let e = XenError::remote("VM_BAD_POWER_STATE halted running");
        assert_eq!(e.to_string(), "[RemoteError] VM_BAD_POWER_STATE halted running");
    }

    #[test]
    fn constructors_set_kind() {
        assert_eq!(XenError::auth("x").kind, XenErrorKind::AuthenticationError);
        assert_eq!(XenError::protocol("x").kind, XenErrorKind::ProtocolError);
        assert_eq!(XenError::connectivity("x").kind, XenErrorKind::ConnectivityError);
        assert_eq!(XenError::unknown_remote("x").kind, XenErrorKind::UnknownRemoteError);
    }
}
