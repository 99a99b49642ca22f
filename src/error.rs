//! Error taxonomy for the store and the authentication chain.

use thiserror::Error;

/// Errors surfaced by the document store and schema manager.
///
/// Absence of a document or session is never an error; those reads return
/// `Option`. `Conflict` and `MalformedPayload` are the two insert failures a
/// caller must tell apart: the latter invites a retry with the sentinel
/// payload, the former does not.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A recipe already exists for this url.
    #[error("recipe already stored for this url")]
    Conflict,

    /// The summary payload failed JSON validation at the write.
    #[error("summary is not valid JSON")]
    MalformedPayload,

    /// A migration step failed; the persisted schema version stays at the
    /// last fully-applied step.
    #[error("schema migration to version {version} failed: {source}")]
    Migration {
        version: i64,
        #[source]
        source: sqlx::Error,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

/// Rejection reasons produced by the authentication chain.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential presented")]
    MissingCredential,

    #[error("malformed session cookie")]
    MalformedCredential,

    #[error("no registered session for {0}")]
    UnknownIdentity(String),

    #[error("stale session nonce for {0}")]
    StaleNonce(String),

    #[error("identity token rejected: {0}")]
    InvalidToken(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// HTTP status class the transport should map this rejection to. A
    /// registry read failure is the server's fault, everything else is a
    /// credential problem.
    pub fn status(&self) -> u16 {
        match self {
            AuthError::Store(_) => 500,
            _ => 401,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_map_to_401() {
        assert_eq!(AuthError::MissingCredential.status(), 401);
        assert_eq!(AuthError::StaleNonce("a@b.com".into()).status(), 401);
        assert_eq!(AuthError::InvalidToken("expired".into()).status(), 401);
    }

    #[test]
    fn registry_failures_map_to_500() {
        assert_eq!(AuthError::Store(StoreError::Conflict).status(), 500);
    }
}
