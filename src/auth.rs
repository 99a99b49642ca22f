//! Authentication fallback chain over the session registry.
//!
//! The transport layer extracts whatever credentials accompanied a request
//! and hands them over as a [`Credentials`] value; the chain decides. Three
//! validators run in a fixed order (trusted forwarded identity, then
//! session cookie, then bearer identity token) and each one either
//! authorizes, defers to the next, or fails the whole request. Only a
//! registry read failure stops the chain early; every other failure defers,
//! so a browser holding a stale cookie can still re-authenticate with a
//! fresh token on the same request.

use async_trait::async_trait;
use tracing::info;

use crate::error::AuthError;
use crate::store::Store;

/// Credentials extracted from a request by the (external) transport layer.
#[derive(Debug, Clone, Default)]
pub struct Credentials<'a> {
    /// Identity asserted by a trusted reverse proxy, if any.
    pub forwarded_user: Option<&'a str>,
    /// Raw value of the session cookie: `"<email> <nonce>"`.
    pub session_cookie: Option<&'a str>,
    /// Bearer token from the Authorization header, already stripped of its
    /// `Bearer ` prefix.
    pub bearer_token: Option<&'a str>,
}

/// Verifies a bearer identity token against its issuer and yields the
/// verified email claim. The real implementation calls out to the identity
/// provider; tests substitute a fake.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<String, AuthError>;
}

/// A fresh session cookie the caller should issue with its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub value: String,
    pub max_age_secs: u32,
}

/// Successful outcome of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    pub email: String,
    /// Set when the token validator matched: issuing this cookie lets later
    /// requests take the cheaper cookie path.
    pub issue_cookie: Option<SessionCookie>,
}

/// Outcome of a single validator. A validator that cannot decide defers,
/// optionally recording why, and the last recorded reason becomes the final
/// rejection if nothing downstream authorizes.
enum Step {
    Authorized(Authorized),
    Deferred(Option<AuthError>),
}

/// Run the fallback chain: forwarded identity, session cookie, bearer token.
pub async fn authenticate(
    store: &Store,
    verifier: &dyn TokenVerifier,
    creds: &Credentials<'_>,
    cookie_max_age_secs: u32,
) -> Result<Authorized, AuthError> {
    let mut last_reason = None;

    match check_forwarded(store, creds).await? {
        Step::Authorized(auth) => return Ok(auth),
        Step::Deferred(reason) => record(&mut last_reason, reason),
    }

    match check_cookie(store, creds).await? {
        Step::Authorized(auth) => return Ok(auth),
        Step::Deferred(reason) => record(&mut last_reason, reason),
    }

    match check_token(store, verifier, creds, cookie_max_age_secs).await? {
        Step::Authorized(auth) => {
            info!(email = %auth.email, "token auth succeeded");
            return Ok(auth);
        }
        Step::Deferred(reason) => record(&mut last_reason, reason),
    }

    Err(last_reason.unwrap_or(AuthError::MissingCredential))
}

fn record(last: &mut Option<AuthError>, reason: Option<AuthError>) {
    if let Some(reason) = reason {
        *last = Some(reason);
    }
}

async fn check_forwarded(store: &Store, creds: &Credentials<'_>) -> Result<Step, AuthError> {
    let Some(email) = creds.forwarded_user else {
        return Ok(Step::Deferred(None));
    };

    match store.get_session(email).await? {
        Some(_) => Ok(Step::Authorized(Authorized {
            email: email.to_string(),
            issue_cookie: None,
        })),
        None => Ok(Step::Deferred(Some(AuthError::UnknownIdentity(
            email.to_string(),
        )))),
    }
}

async fn check_cookie(store: &Store, creds: &Credentials<'_>) -> Result<Step, AuthError> {
    let Some(cookie) = creds.session_cookie else {
        return Ok(Step::Deferred(None));
    };

    let fields: Vec<&str> = cookie.split_whitespace().collect();
    let &[email, nonce] = fields.as_slice() else {
        return Ok(Step::Deferred(Some(AuthError::MalformedCredential)));
    };

    match store.get_session(email).await? {
        Some(stored) if stored == nonce => Ok(Step::Authorized(Authorized {
            email: email.to_string(),
            issue_cookie: None,
        })),
        Some(_) => Ok(Step::Deferred(Some(AuthError::StaleNonce(
            email.to_string(),
        )))),
        None => Ok(Step::Deferred(Some(AuthError::UnknownIdentity(
            email.to_string(),
        )))),
    }
}

async fn check_token(
    store: &Store,
    verifier: &dyn TokenVerifier,
    creds: &Credentials<'_>,
    cookie_max_age_secs: u32,
) -> Result<Step, AuthError> {
    let Some(token) = creds.bearer_token else {
        return Ok(Step::Deferred(None));
    };

    let email = match verifier.verify(token).await {
        Ok(email) => email,
        Err(err @ AuthError::Store(_)) => return Err(err),
        Err(err) => return Ok(Step::Deferred(Some(err))),
    };

    match store.get_session(&email).await? {
        Some(nonce) => Ok(Step::Authorized(Authorized {
            issue_cookie: Some(SessionCookie {
                value: format!("{email} {nonce}"),
                max_age_secs: cookie_max_age_secs,
            }),
            email,
        })),
        None => Ok(Step::Deferred(Some(AuthError::UnknownIdentity(email)))),
    }
}
