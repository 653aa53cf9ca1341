//! Configuration issues
//!
//! Structured findings produced when validating operator configuration
//! (network seeds, organization credentials, pipeline settings). Issues carry
//! a severity so callers can warn on some and refuse to start on others.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: a default is used instead.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A string field holds a value outside its accepted set.
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    /// A channel lists an organization that has no `[[organizations]]` entry.
    UndefinedOrganization { channel: String, org: String },
    /// Two `[[organizations]]` entries share an id.
    DuplicateOrganization { org: String },
    /// An organization's signing seed is not 32 hex-encoded bytes.
    InvalidSigningSeed { org: String },
    /// An anchor peer is not `host:port`.
    InvalidAnchorPeer { org: String, value: String },
    /// `default_channel` names a channel that is not defined.
    UnknownDefaultChannel { channel: String },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
