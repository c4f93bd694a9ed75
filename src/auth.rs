//! Bearer token verification.
//!
//! Tokens are issued by the account service and shared through a common
//! secret: `base64url(claims_json) "." base64url(HMAC-SHA256(secret, base64url(claims_json)))`.
//! This service only ever verifies them; [`issue_token`] exists for tooling
//! and tests.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use base64::prelude::*;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::actor::{Actor, Role};
use crate::errors::AppError;

type Signer = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
    /// Expiry as unix seconds.
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed token")]
    Malformed,
    #[error("bad token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

fn signer(secret: &str, msg: &str) -> Result<Signer, AuthError> {
    let mut mac = Signer::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::BadSignature)?;
    mac.update(msg.as_bytes());
    Ok(mac)
}

pub fn issue_token(secret: &str, claims: &Claims) -> Result<String, AuthError> {
    let json = serde_json::to_vec(claims).map_err(|_| AuthError::Malformed)?;
    let msg = BASE64_URL_SAFE_NO_PAD.encode(json);
    let signature = signer(secret, &msg)?.finalize().into_bytes();
    Ok(format!("{msg}.{}", BASE64_URL_SAFE_NO_PAD.encode(signature)))
}

pub fn verify_token(secret: &str, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
    let (msg, signature) = token.split_once('.').ok_or(AuthError::Malformed)?;
    let signature = BASE64_URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| AuthError::Malformed)?;
    signer(secret, msg)?
        .verify_slice(&signature)
        .map_err(|_| AuthError::BadSignature)?;

    let json = BASE64_URL_SAFE_NO_PAD
        .decode(msg)
        .map_err(|_| AuthError::Malformed)?;
    let claims: Claims = serde_json::from_slice(&json).map_err(|_| AuthError::Malformed)?;
    if claims.exp <= now.timestamp() {
        return Err(AuthError::Expired);
    }
    Ok(claims)
}

/// The verified caller of a request.
///
/// Reads `Authorization: Bearer <token>`. Browsers cannot set headers on an
/// `EventSource`, so an `access_token` query parameter is accepted as well.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Actor);

fn bearer(req: &HttpRequest) -> Option<String> {
    if let Some(token) = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string());
    }
    web::Query::<TokenQuery>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.into_inner().access_token)
}

#[derive(Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let config = req
        .app_data::<web::Data<AuthConfig>>()
        .ok_or_else(|| AppError::Internal("auth config missing from app data".to_string()))?;
    let token = bearer(req).ok_or(AppError::Unauthorized)?;
    let claims = verify_token(&config.secret, &token, Utc::now()).map_err(|e| {
        debug!("Rejected token for {}: {e}", req.path());
        AppError::Unauthorized
    })?;
    Ok(AuthenticatedUser(Actor::new(
        claims.user_id,
        claims.role,
        claims.name,
    )))
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn claims(exp: i64) -> Claims {
        Claims {
            user_id: Uuid::new_v4(),
            name: "Ravi".to_string(),
            role: Role::Driver,
            exp,
        }
    }

    #[test]
    fn issued_tokens_verify() {
        let now = Utc::now();
        let c = claims((now + Duration::hours(1)).timestamp());
        let token = issue_token("s3cret", &c).unwrap();
        assert_eq!(verify_token("s3cret", &token, now).unwrap(), c);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = issue_token("s3cret", &claims((now + Duration::hours(1)).timestamp())).unwrap();
        assert_eq!(verify_token("other", &token, now), Err(AuthError::BadSignature));
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let now = Utc::now();
        let token = issue_token("s3cret", &claims((now + Duration::hours(1)).timestamp())).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let mut forged = claims((now + Duration::hours(1)).timestamp());
        forged.role = Role::Admin;
        let forged_msg = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let forged_token = format!("{forged_msg}.{signature}");
        assert_eq!(verify_token("s3cret", &forged_token, now), Err(AuthError::BadSignature));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let now = Utc::now();
        let token = issue_token("s3cret", &claims((now - Duration::seconds(1)).timestamp())).unwrap();
        assert_eq!(verify_token("s3cret", &token, now), Err(AuthError::Expired));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(verify_token("s3cret", "not-a-token", Utc::now()), Err(AuthError::Malformed));
        assert_eq!(verify_token("s3cret", "abc.!!!", Utc::now()), Err(AuthError::Malformed));
    }
}
