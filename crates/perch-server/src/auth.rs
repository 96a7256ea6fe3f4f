//! HTTP Basic-auth guard for the administrative routes.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;

use crate::error::Error;

/// Credentials accepted for admin requests.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

impl AuthConfig {
  /// Whether `username`/`password` match. An unparsable hash matches nothing.
  pub fn accepts(&self, username: &str, password: &str) -> bool {
    if username != self.username {
      return false;
    }
    PasswordHash::new(&self.password_hash).is_ok_and(|hash| {
      Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
    })
  }
}

/// The `(user, password)` pair of a `Basic` authorization header.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let decoded = B64.decode(value.strip_prefix("Basic ")?).ok()?;
  let pair = String::from_utf8(decoded).ok()?;
  let (user, password) = pair.split_once(':')?;
  Some((user.to_owned(), password.to_owned()))
}

/// Middleware rejecting requests without valid admin credentials.
pub async fn require_admin(
  State(auth): State<Arc<AuthConfig>>,
  req: Request,
  next: Next,
) -> Result<Response, Error> {
  match basic_credentials(req.headers()) {
    Some((user, password)) if auth.accepts(&user, &password) => Ok(next.run(req).await),
    _ => {
      tracing::warn!(path = %req.uri().path(), "rejected admin request");
      Err(Error::Unauthorized)
    }
  }
}
