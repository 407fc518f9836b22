use std::fmt::Display;

use thiserror::Error;

/// Failures surfaced by the content engine.
///
/// `Clone` so a single failed in-flight bundle fetch can be handed to every
/// caller that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// Malformed key or prefix, rejected before any remote call.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    /// Storage boundary unreachable or returned a failure. Never cached.
    #[error("storage request failed: {0}")]
    Transport(String),
    /// A stored blob failed to parse or failed shape validation.
    #[error("malformed content in {key}: {reason}")]
    MalformedContent { key: String, reason: String },
    /// An edit action attempted without editor rights.
    #[error("editor rights required to {0}")]
    Authorization(String),
}

pub type Result<T, E = ContentError> = std::result::Result<T, E>;

impl ContentError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation { field, reason: reason.into() }
    }

    pub fn transport(err: impl Display) -> Self {
        // `{:#}` keeps anyhow context chains on one line
        Self::Transport(format!("{err:#}"))
    }

    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedContent { key: key.into(), reason: reason.into() }
    }

    /// Transport failures are the only ones worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<sqlx::Error> for ContentError {
    fn from(err: sqlx::Error) -> Self {
        Self::transport(err)
    }
}

impl From<reqwest::Error> for ContentError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_is_retryable() {
        assert!(ContentError::Transport("down".into()).is_retryable());
        assert!(!ContentError::validation("prefix", "empty").is_retryable());
        assert!(!ContentError::Authorization("publish".into()).is_retryable());
        assert!(!ContentError::malformed("home.sections.a", "not json").is_retryable());
    }

    #[test]
    fn transport_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("loading bundle");
        let ContentError::Transport(msg) = ContentError::transport(err) else { panic!("wrong variant") };
        assert_eq!(msg, "loading bundle: connection refused");
    }
}
