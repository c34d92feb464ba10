//! Failure taxonomy shared by every component.

use std::fmt;

use serde::Serialize;

/// Classification of every failure the browser can meet.
///
/// Only `NetworkUnreachable`, `UpstreamStatusError` and `CredentialInvalid`
/// ever reach the user; the rest are recovered where they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NetworkUnreachable,
    UpstreamStatusError,
    CorruptCache,
    QuotaExceeded,
    CredentialInvalid,
    PosterNotFound,
}

impl ErrorKind {
    /// Whether this kind is surfaced to the user rather than recovered locally.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkUnreachable
                | ErrorKind::UpstreamStatusError
                | ErrorKind::CredentialInvalid
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NetworkUnreachable => "network_unreachable",
            ErrorKind::UpstreamStatusError => "upstream_status_error",
            ErrorKind::CorruptCache => "corrupt_cache",
            ErrorKind::QuotaExceeded => "quota_exceeded",
            ErrorKind::CredentialInvalid => "credential_invalid",
            ErrorKind::PosterNotFound => "poster_not_found",
        };
        f.write_str(s)
    }
}
