// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Failure classification for the sync subsystem.
//!
//! Raw failures are turned into a [`ClassifiedError`] exactly once, at the
//! remote boundary. Everything downstream branches on
//! [`ClassifiedError::category`] and never re-parses message text.
//!
//! Classification rules, first match wins:
//!
//! | Signal                                   | Category       | Retry |
//! |------------------------------------------|----------------|-------|
//! | connection failure                       | `network`      | yes   |
//! | abort / timeout                          | `timeout`      | yes   |
//! | HTTP 401                                 | `authentication` | no  |
//! | HTTP 403 + rate-limit text               | `rate_limit`   | yes   |
//! | HTTP 403                                 | `permission`   | no    |
//! | HTTP 404                                 | `not_found`    | no    |
//! | HTTP 422                                 | `validation`   | no    |
//! | HTTP 500/502/503/504                     | `server_error` | yes   |
//! | "rate limit" in message                  | `rate_limit`   | yes   |
//! | "service unavailable" in message         | `gist_error`   | yes   |
//! | anything else                            | `unknown`      | no    |

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse failure category shared by every sync component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Timeout,
    Authentication,
    RateLimit,
    Permission,
    NotFound,
    Validation,
    ServerError,
    GistError,
    QuotaExceeded,
    QueueExhausted,
    Conflict,
    Storage,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Permission => "permission",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Validation => "validation",
            ErrorCategory::ServerError => "server_error",
            ErrorCategory::GistError => "gist_error",
            ErrorCategory::QuotaExceeded => "quota_exceeded",
            ErrorCategory::QueueExhausted => "queue_exhausted",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::Storage => "storage",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// Categories the retry policy handles locally.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::RateLimit
                | ErrorCategory::ServerError
                | ErrorCategory::GistError
        )
    }

    /// Short message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "Unable to reach the sync service. Check your connection.",
            ErrorCategory::Timeout => "The sync service took too long to respond.",
            ErrorCategory::Authentication => "Your access token was rejected.",
            ErrorCategory::RateLimit => "Too many requests were made to the sync service.",
            ErrorCategory::Permission => "You do not have access to this document.",
            ErrorCategory::NotFound => "The sync document could not be found.",
            ErrorCategory::Validation => "The data was rejected as invalid.",
            ErrorCategory::ServerError => "The sync service reported an internal error.",
            ErrorCategory::GistError => "The document service is temporarily unavailable.",
            ErrorCategory::QuotaExceeded => "Local storage is full.",
            ErrorCategory::QueueExhausted => "A pending change could not be synced and was dropped.",
            ErrorCategory::Conflict => "This device and another device both changed the catalog.",
            ErrorCategory::Storage => "Local storage could not be read or written.",
            ErrorCategory::Unknown => "An unexpected error occurred.",
        }
    }

    /// Suggested next steps, most useful first.
    pub fn recovery_actions(&self) -> &'static [&'static str] {
        match self {
            ErrorCategory::Network => &[
                "Check your internet connection",
                "Changes are kept locally and will sync when you are back online",
            ],
            ErrorCategory::Timeout => &["Try again in a moment", "Check your connection speed"],
            ErrorCategory::Authentication => &[
                "Check that your access token is set and has not expired",
                "Generate a new token with document access",
            ],
            ErrorCategory::RateLimit => &[
                "Wait a few minutes before syncing again",
                "Use an access token to raise the request limit",
            ],
            ErrorCategory::Permission => &[
                "Make sure the document is public",
                "Check that your token can access this document",
            ],
            ErrorCategory::NotFound => &[
                "Check the document id in your configuration",
                "Create a new document by syncing without an id",
            ],
            ErrorCategory::Validation => &["Check the catalog data for invalid fields"],
            ErrorCategory::ServerError => &["Try again later"],
            ErrorCategory::GistError => &["Try again later", "Check the service status page"],
            ErrorCategory::QuotaExceeded => &[
                "Old cached data was cleaned up; try the action again",
                "Remove large entries or images",
            ],
            ErrorCategory::QueueExhausted => &[
                "Re-apply the change manually",
                "Run a sync once the connection is stable",
            ],
            ErrorCategory::Conflict => &[
                "Keep this device's version",
                "Keep the other device's version",
                "Merge both versions",
            ],
            ErrorCategory::Storage => &["Check disk permissions and free space"],
            ErrorCategory::Unknown => &["Try again", "Report the problem if it persists"],
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A raw failure observed at an I/O boundary, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The connection could not be established or was dropped.
    Connect(String),
    /// The request was aborted or exceeded its deadline.
    Timeout(String),
    /// The server answered with a non-2xx status.
    Http { status: u16, message: String },
    /// Anything else, known only by its message.
    Message(String),
}

impl Failure {
    fn message(&self) -> &str {
        match self {
            Failure::Connect(m) | Failure::Timeout(m) | Failure::Message(m) => m,
            Failure::Http { message, .. } => message,
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            Failure::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result of classifying a [`Failure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: ErrorCategory,
    pub user_message: String,
    pub recovery_actions: Vec<String>,
    pub retryable: bool,
}

impl Classification {
    fn of(category: ErrorCategory, retryable: bool) -> Self {
        Classification {
            category,
            user_message: category.user_message().to_string(),
            recovery_actions: category.recovery_actions().iter().map(|s| s.to_string()).collect(),
            retryable,
        }
    }
}

const CONNECTIVITY_SIGNATURES: &[&str] = &[
    "failed to fetch",
    "network error",
    "networkerror",
    "connection refused",
    "connection reset",
    "dns error",
    "failed to lookup address",
    "error sending request",
];

const TIMEOUT_SIGNATURES: &[&str] = &["timed out", "timeout", "aborted", "deadline has elapsed"];

const RATE_LIMIT_SIGNATURES: &[&str] = &["rate limit", "rate-limit", "ratelimit"];

const UNAVAILABLE_SIGNATURES: &[&str] = &["gist service unavailable", "service unavailable"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Maps a raw failure to its category and retry decision.
pub fn classify(failure: &Failure) -> Classification {
    let message = failure.message().to_lowercase();

    if matches!(failure, Failure::Connect(_)) || contains_any(&message, CONNECTIVITY_SIGNATURES) {
        return Classification::of(ErrorCategory::Network, true);
    }
    if matches!(failure, Failure::Timeout(_)) || contains_any(&message, TIMEOUT_SIGNATURES) {
        return Classification::of(ErrorCategory::Timeout, true);
    }

    match failure.status() {
        Some(401) => return Classification::of(ErrorCategory::Authentication, false),
        Some(403) if contains_any(&message, RATE_LIMIT_SIGNATURES) => {
            return Classification::of(ErrorCategory::RateLimit, true)
        }
        Some(403) => return Classification::of(ErrorCategory::Permission, false),
        Some(404) => return Classification::of(ErrorCategory::NotFound, false),
        Some(422) => return Classification::of(ErrorCategory::Validation, false),
        Some(500 | 502 | 503 | 504) => return Classification::of(ErrorCategory::ServerError, true),
        _ => {}
    }

    if contains_any(&message, RATE_LIMIT_SIGNATURES) {
        return Classification::of(ErrorCategory::RateLimit, true);
    }
    if contains_any(&message, UNAVAILABLE_SIGNATURES) {
        return Classification::of(ErrorCategory::GistError, true);
    }

    Classification::of(ErrorCategory::Unknown, false)
}

/// A classified failure, the error type of every remote operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{category}: {message}")]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub http_status: Option<u16>,
    pub retryable: bool,
    pub message: String,
    pub recovery_actions: Vec<String>,
    /// Number of attempts made before giving up. Zero until enhanced.
    pub retry_attempts: u32,
    /// Name of the operation that failed, once enhanced by the retry policy.
    pub operation_type: Option<String>,
}

impl ClassifiedError {
    /// Creates an error of a known category. Retryability follows the category.
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        ClassifiedError {
            category,
            http_status: None,
            retryable: category.is_transient(),
            message: message.into(),
            recovery_actions: category.recovery_actions().iter().map(|s| s.to_string()).collect(),
            retry_attempts: 0,
            operation_type: None,
        }
    }

    /// Classifies a raw failure.
    pub fn from_failure(failure: Failure) -> Self {
        let classification = classify(&failure);
        let http_status = failure.status();
        let message = match failure {
            Failure::Connect(m) | Failure::Timeout(m) | Failure::Message(m) => m,
            Failure::Http { status, message } => format!("HTTP {status}: {message}"),
        };
        ClassifiedError {
            category: classification.category,
            http_status,
            retryable: classification.retryable,
            message,
            recovery_actions: classification.recovery_actions,
            retry_attempts: 0,
            operation_type: None,
        }
    }

    /// Precondition failures detected before any I/O.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, format!("invalid argument: {}", message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::NotFound, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Permission, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, message)
    }

    pub fn user_message(&self) -> &'static str {
        self.category.user_message()
    }

    /// Attaches retry accounting once the retry policy gives up.
    pub fn enhance(mut self, attempts: u32, operation_type: &str) -> Self {
        self.retry_attempts = attempts;
        self.operation_type = Some(operation_type.to_string());
        self
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
