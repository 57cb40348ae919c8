//! Identity boundary.
//!
//! Credential issuance and claim verification are out of scope (spec §1):
//! the core receives an already-validated `(userID, username)`. This
//! module is the seam where that external collaborator plugs in, the same
//! role `tallow-relay::auth::allow_connection` plays as a one-function
//! stand-in for a real check.

use axum::http::Uri;

/// An authenticated identity, immutable for the life of a connection
/// (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
}

/// Something that can turn an upgrade request into an [`Identity`].
///
/// A real deployment replaces [`QueryParamIdentity`] with an
/// implementation backed by the credential-issuance collaborator.
pub trait IdentitySource: Send + Sync + 'static {
    fn authenticate(&self, uri: &Uri) -> Option<Identity>;
}

/// Stand-in identity source for local testing: reads `user_id` and
/// `username` query parameters off the upgrade request.
///
/// Not a production authentication mechanism — it exists so `main.rs` is
/// runnable end-to-end without pretending to implement credential
/// issuance, the same spirit as the teacher's open-relay stub.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryParamIdentity;

impl IdentitySource for QueryParamIdentity {
    fn authenticate(&self, uri: &Uri) -> Option<Identity> {
        let query = uri.query()?;
        let mut user_id = None;
        let mut username = None;
        for pair in query.split('&') {
            let (key, value) = pair.split_once('=')?;
            match key {
                "user_id" => user_id = Some(value.to_string()),
                "username" => username = Some(value.to_string()),
                _ => {}
            }
        }
        let user_id = user_id.filter(|s| !s.is_empty())?;
        let username = username.filter(|s| !s.is_empty())?;
        Some(Identity { user_id, username })
    }
}
