//! Cookie-based owner identity.
//!
//! Every request that needs an owner passes through [`identify`]. A request
//! without the `auth-token` cookie is treated as a new user: a fresh owner id
//! is minted and a signed token for it is returned in `Set-Cookie`. A cookie
//! that fails verification is rejected with 401.

use std::time::Duration;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use burrow_core::OwnerId;
use jiff::Timestamp;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{GatewayError, Result};
use crate::state::AppState;

pub const AUTH_COOKIE: &str = "auth-token";

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3 * 60 * 60);

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user_id: String,
    exp: i64,
}

/// Issues and verifies HS256 identity tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, DEFAULT_TOKEN_TTL)
    }

    pub fn with_ttl(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, owner: &OwnerId) -> Result<String> {
        let claims = Claims {
            user_id: owner.as_str().to_string(),
            exp: Timestamp::now().as_second() + self.ttl.as_secs() as i64,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Returns the owner named by a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Option<OwnerId> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .inspect_err(|err| debug!(error = %err, "rejected auth token"))
            .ok()?;
        OwnerId::new(data.claims.user_id).ok()
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Resolves the caller's [`OwnerId`] and stores it in request extensions.
pub async fn identify(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    if let Some(token) = cookie_value(request.headers(), AUTH_COOKIE) {
        let owner = state
            .tokens()
            .verify(&token)
            .ok_or(GatewayError::Unauthorized)?;
        request.extensions_mut().insert(owner);
        return Ok(next.run(request).await);
    }

    let owner = OwnerId::new(Uuid::new_v4().to_string())
        .map_err(|err| GatewayError::Internal(err.to_string()))?;
    let token = state.tokens().issue(&owner)?;
    debug!(owner = %owner, "issued new identity");

    request.extensions_mut().insert(owner);
    let mut response = next.run(request).await;

    let cookie = format!("{AUTH_COOKIE}={token}; Path=/; HttpOnly");
    let cookie =
        HeaderValue::from_str(&cookie).map_err(|err| GatewayError::Internal(err.to_string()))?;
    response.headers_mut().append(SET_COOKIE, cookie);

    Ok(response)
}

/// Extractor for the owner resolved by [`identify`].
#[derive(Debug, Clone)]
pub struct Owner(pub OwnerId);

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<OwnerId>()
            .cloned()
            .map(Owner)
            .ok_or(GatewayError::Unauthorized)
    }
}
