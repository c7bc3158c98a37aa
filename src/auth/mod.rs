//! Actor identity.
//!
//! Tokens are issued elsewhere; this service only verifies HS256 bearer
//! tokens and turns their claims into an [`Actor`] bound to one area.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::models::Area;

/// JWT claims carried by actor tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub area: String,
    pub exp: i64,
}

/// The authenticated user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Actor {
    pub id: String,
    pub name: Option<String>,
    pub area: Area,
}

impl Actor {
    pub fn new(id: impl Into<String>, area: Area) -> Self {
        Self {
            id: id.into(),
            name: None,
            area,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.area.is_admin()
    }

    /// Ok when the actor works in `area`.
    pub fn require_area(&self, area: Area, action: &str) -> Result<(), ServiceError> {
        if self.area == area {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "only {} may {action}; actor belongs to {}",
                area.display_name(),
                self.area.display_name()
            )))
        }
    }

    /// Ok when the actor works in `area` or is an administrator.
    pub fn require_area_or_admin(&self, area: Area, action: &str) -> Result<(), ServiceError> {
        if self.is_admin() {
            return Ok(());
        }
        self.require_area(area, action)
    }

    pub fn require_admin(&self, action: &str) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "only administrators may {action}"
            )))
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token names unknown area {0}")]
    UnknownArea(String),

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

/// Verifies (and, for tooling and tests, issues) actor tokens.
#[derive(Clone)]
pub struct JwtVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Actor, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })?
            .claims;

        let area =
            Area::from_code(&claims.area).map_err(|_| AuthError::UnknownArea(claims.area.clone()))?;

        Ok(Actor {
            id: claims.sub,
            name: claims.name,
            area,
        })
    }

    /// Signs a token for `actor` valid for `ttl_secs` seconds.
    pub fn issue(&self, actor: &Actor, ttl_secs: i64) -> Result<String, AuthError> {
        let claims = Claims {
            sub: actor.id.clone(),
            name: actor.name.clone(),
            area: actor.area.code().to_string(),
            exp: Utc::now().timestamp() + ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidToken)
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
    Arc<JwtVerifier>: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<JwtVerifier>::from_ref(state);
        let token = bearer_token(parts)?;
        let actor = verifier.verify(token)?;
        tracing::debug!(actor = %actor.id, area = %actor.area, "actor authenticated");
        Ok(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "floor_tracking_secret_with_enough_length_42";

    #[test]
    fn issued_tokens_verify_to_the_same_actor() {
        let verifier = JwtVerifier::new(SECRET);
        let mut actor = Actor::new("u-17", Area::Bordado);
        actor.name = Some("Lucía".into());
        let token = verifier.issue(&actor, 300).unwrap();
        assert_eq!(verifier.verify(&token).unwrap(), actor);
    }

    #[test]
    fn pattern_and_design_areas_are_accepted() {
        let verifier = JwtVerifier::new(SECRET);
        for area in [Area::Patronaje, Area::Diseno] {
            let actor = Actor::new("u-30", area);
            let token = verifier.issue(&actor, 300).unwrap();
            assert_eq!(verifier.verify(&token).unwrap().area, area);
        }
    }

    #[test]
    fn expired_and_foreign_tokens_are_rejected() {
        let verifier = JwtVerifier::new(SECRET);
        let actor = Actor::new("u-1", Area::Corte);

        let expired = verifier.issue(&actor, -3600).unwrap();
        assert_matches!(verifier.verify(&expired), Err(AuthError::TokenExpired));

        let other = JwtVerifier::new("another_secret_that_is_also_long_enough_99");
        let foreign = other.issue(&actor, 300).unwrap();
        assert_matches!(verifier.verify(&foreign), Err(AuthError::InvalidToken));
    }

    #[test]
    fn unknown_area_claim_is_unauthorized() {
        let claims = Claims {
            sub: "u-2".into(),
            name: None,
            area: "lavanderia".into(),
            exp: Utc::now().timestamp() + 300,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        let err = JwtVerifier::new(SECRET).verify(&token).unwrap_err();
        assert_matches!(err, AuthError::UnknownArea(ref area) if area == "lavanderia");
        assert_matches!(ServiceError::from(err), ServiceError::Unauthorized(_));
    }

    #[test]
    fn area_checks() {
        let corte = Actor::new("c", Area::Corte);
        let admin = Actor::new("a", Area::Admin);
        assert!(corte.require_area(Area::Corte, "transfer").is_ok());
        assert_matches!(
            corte.require_area(Area::Envios, "complete"),
            Err(ServiceError::Forbidden(_))
        );
        assert!(admin.require_area_or_admin(Area::Envios, "transfer").is_ok());
        assert!(admin.require_area(Area::Envios, "complete").is_err());
        assert!(corte.require_admin("view metrics").is_err());
        assert!(admin.require_admin("view metrics").is_ok());
    }
}
