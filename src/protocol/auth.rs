//! Connection handshake.
//!
//! A client opens with `GET /<username>/<password> HTTP/1.1\r\nHost: <host>\r\n\r\n`.
//! Only the request line is inspected. A bad handshake closes the socket
//! without a reply, so clients cannot tell a wrong password from a garbled
//! request.

use crate::models::Credentials;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Malformed auth request: {0}")]
    Malformed(&'static str),

    #[error("Credentials rejected for user {0:?}")]
    Rejected(String),

    #[error("Client did not authenticate in time")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Username and password extracted from a request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Parse the request line of a handshake.
///
/// The path must split on `/` into exactly three parts. The first part is
/// whatever precedes the leading slash and is not checked.
pub fn parse_auth_request(request: &str) -> Result<AuthRequest<'_>, AuthError> {
    let line = request.split("\r\n").next().unwrap_or_default();
    let path = line
        .split_whitespace()
        .nth(1)
        .ok_or(AuthError::Malformed("missing request path"))?;

    let mut parts = path.split('/');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(username), Some(password), None) => Ok(AuthRequest { username, password }),
        _ => Err(AuthError::Malformed("path must be /<username>/<password>")),
    }
}

/// Check raw handshake bytes against the configured credentials.
pub fn verify(bytes: &[u8], credentials: &Credentials) -> Result<(), AuthError> {
    let request = std::str::from_utf8(bytes).map_err(|_| AuthError::Malformed("not UTF-8"))?;
    let parsed = parse_auth_request(request)?;
    if credentials.matches(parsed.username, parsed.password) {
        Ok(())
    } else {
        Err(AuthError::Rejected(parsed.username.to_string()))
    }
}

/// Build the handshake a client sends right after connecting.
pub fn build_auth_request(credentials: &Credentials, host: &str) -> String {
    format!(
        "GET /{}/{} HTTP/1.1\r\nHost: {host}\r\n\r\n",
        credentials.username, credentials.password
    )
}
