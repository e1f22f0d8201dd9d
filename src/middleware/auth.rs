// SPDX-License-Identifier: MIT

//! Session credential codec: JWT in an HTTP-only cookie.
//!
//! The credential is a snapshot of the user record at issuance time. The
//! `active` claim can go stale for up to the 7-day validity window after a
//! subscription change; only cancellation and first-payment activation
//! reissue it. That trade is deliberate: it saves a store lookup on every
//! request.

use crate::models::User;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Cookie that carries the session credential.
pub const SESSION_COOKIE: &str = "jwt";

/// Session lifetime: 7 days, for both the JWT `exp` and the cookie.
pub const SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (Google identity subject id)
    pub sub: String,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Profile picture URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Subscription-active snapshot at issuance time
    pub active: bool,
    /// Admin flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<bool>,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Session extracted from a request cookie. Always well-formed: an absent or
/// invalid credential yields `authed: false` with no claims.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub authed: bool,
    pub user: Option<SessionClaims>,
}

impl Session {
    fn anonymous() -> Self {
        Self::default()
    }
}

/// Create a session JWT from a user record.
pub fn create_session_token(user: &User, signing_key: &[u8]) -> anyhow::Result<String> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = SessionClaims {
        sub: user.id.clone(),
        name: user.username.clone(),
        email: user.email.clone(),
        picture: user.picture.clone(),
        active: user.subscription_active,
        admin: None,
        iat: now,
        exp: now + SESSION_TTL_SECS as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Verify a session JWT, returning its claims.
///
/// Fails on tampered signatures and on tokens past their 7-day expiry.
pub fn verify_session_token(
    token: &str,
    signing_key: &[u8],
) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);
    decode::<SessionClaims>(token, &key, &validation).map(|data| data.claims)
}

/// Read the session from the request's cookie jar.
///
/// Never fails: verification errors are swallowed and the caller gets an
/// anonymous session.
pub fn read_session(jar: &CookieJar, signing_key: &[u8]) -> Session {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Session::anonymous();
    };

    match verify_session_token(cookie.value(), signing_key) {
        Ok(claims) => Session {
            authed: true,
            user: Some(claims),
        },
        Err(e) => {
            tracing::debug!(error = %e, "Session cookie rejected");
            Session::anonymous()
        }
    }
}

/// Build a 302 response that sets the session cookie and a Location header
/// in one step. Any previous cookie value is fully overwritten.
pub fn session_redirect(token: &str, location: &str) -> Response {
    let cookie = format!(
        "{SESSION_COOKIE}={token}; Max-Age={SESSION_TTL_SECS}; Path=/; HttpOnly; Secure"
    );

    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::SET_COOKIE, cookie)
        .header(header::LOCATION, location)
        .body(axum::body::Body::empty())
        .unwrap_or_default()
}

/// Build the logout response: overwrite the cookie with a near-immediate
/// expiry and redirect to "/". This is the only revocation mechanism; there
/// is no server-side blacklist, so an exfiltrated token stays valid until
/// expiry.
pub fn logout_redirect() -> Response {
    let cookie = format!("{SESSION_COOKIE}=\"\"; Max-Age=1; Path=/; HttpOnly; Secure");

    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::SET_COOKIE, cookie)
        .header(header::LOCATION, "/")
        .body(axum::body::Body::empty())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    const KEY: &[u8] = b"test_jwt_key_32_bytes_minimum!!";

    fn test_user() -> User {
        User::new("sub-1", "Ada", "ada@example.com", Some("p.png".to_string()))
    }

    fn jar_with_cookie(value: &str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("{SESSION_COOKIE}={value}").parse().unwrap(),
        );
        CookieJar::from_headers(&headers)
    }

    #[test]
    fn round_trip_preserves_claims() {
        let token = create_session_token(&test_user(), KEY).unwrap();
        let claims = verify_session_token(&token, KEY).unwrap();

        assert_eq!(claims.sub, "sub-1");
        assert_eq!(claims.name, "Ada");
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.picture.as_deref(), Some("p.png"));
        assert!(!claims.active);
        assert_eq!(claims.exp - claims.iat, SESSION_TTL_SECS as usize);
    }

    #[test]
    fn tampered_token_fails() {
        let token = create_session_token(&test_user(), KEY).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(verify_session_token(&tampered, KEY).is_err());
        assert!(verify_session_token(&token, b"wrong_key_wrong_key_wrong_key!!").is_err());
    }

    #[test]
    fn expired_token_fails() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as usize;
        let claims = SessionClaims {
            sub: "sub-1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            picture: None,
            active: false,
            admin: None,
            iat: now - SESSION_TTL_SECS as usize - 600,
            exp: now - 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(KEY),
        )
        .unwrap();

        assert!(verify_session_token(&token, KEY).is_err());
    }

    #[test]
    fn read_session_is_total() {
        assert!(!read_session(&CookieJar::new(), KEY).authed);
        assert!(!read_session(&jar_with_cookie("not-a-jwt"), KEY).authed);
        assert!(!read_session(&jar_with_cookie(""), KEY).authed);

        let token = create_session_token(&test_user(), KEY).unwrap();
        let session = read_session(&jar_with_cookie(&token), KEY);
        assert!(session.authed);
        assert_eq!(session.user.unwrap().sub, "sub-1");
    }

    #[test]
    fn session_redirect_sets_cookie_and_location() {
        let response = session_redirect("tok", "/mollie/cb?code=FIRST_PAYMENT_OK");
        assert_eq!(response.status(), StatusCode::FOUND);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("jwt=tok"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains(&format!("Max-Age={SESSION_TTL_SECS}")));

        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/mollie/cb?code=FIRST_PAYMENT_OK"
        );
    }

    #[test]
    fn logout_expires_cookie() {
        let response = logout_redirect();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.contains("Max-Age=1"));
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    }
}
