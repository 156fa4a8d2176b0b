//! Authentication / Authorization primitives.
//!
//! Bearer tokens are HS256 JWTs issued by the school's identity service. The
//! middleware validates them and attaches a [`Principal`]; handlers extract it
//! with [`AuthenticatedPrincipal`].

use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::{config::AuthConfig, models::UserRef, state::AppState, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Nurse,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token claims accepted by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: Role,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub name: Option<String>,
    pub role: Role,
}

impl Principal {
    pub fn user_ref(&self) -> UserRef {
        UserRef {
            id: self.user_id.clone(),
            name: self.name.clone(),
            role: Some(self.role),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.user_id)
    }

    /// Role gate; short-circuits before any persistence.
    pub fn require_role(&self, allowed: &[Role], action: &str) -> crate::Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "Role '{}' is not allowed to {}",
                self.role, action
            )))
        }
    }
}

#[derive(Clone)]
pub struct AuthManager {
    config: Arc<AuthConfig>,
    decoding_key: DecodingKey,
}

impl AuthManager {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            config: Arc::new(config.clone()),
        }
    }

    pub fn is_public_path(&self, path: &str) -> bool {
        self.config.public_paths.iter().any(|p| p == path)
    }

    pub fn authenticate_headers(&self, headers: &HeaderMap) -> crate::Result<Principal> {
        let authz = headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| Error::Unauthorized("Missing bearer token".to_string()))?;

        let authz = authz.to_str().map_err(|_| {
            Error::Unauthorized("Authorization header is not valid UTF-8".to_string())
        })?;

        let token = authz
            .strip_prefix("Bearer ")
            .or_else(|| authz.strip_prefix("bearer "))
            .ok_or_else(|| {
                Error::Unauthorized("Authorization header must be 'Bearer <token>'".to_string())
            })?;

        self.decode_token(token)
    }

    pub fn decode_token(&self, token: &str) -> crate::Result<Principal> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.config.leeway_seconds;
        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| Error::Unauthorized(format!("Invalid bearer token: {e}")))?;

        if data.claims.sub.trim().is_empty() {
            return Err(Error::Unauthorized(
                "Invalid bearer token: empty subject".to_string(),
            ));
        }

        Ok(Principal {
            user_id: data.claims.sub,
            name: data.claims.name,
            role: data.claims.role,
        })
    }
}

/// Extractor for the authenticated principal attached by middleware.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthenticatedPrincipal)
            .ok_or_else(|| {
                Error::Unauthorized("Missing bearer token".to_string()).into_response()
            })
    }
}

/// Middleware for attaching `Principal` (or rejecting) on protected routes.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    if state.auth.is_public_path(req.uri().path()) || req.method() == axum::http::Method::OPTIONS
    {
        return next.run(req).await;
    }

    match state.auth.authenticate_headers(req.headers()) {
        Ok(principal) => {
            req.extensions_mut().insert::<Principal>(principal);
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!(path = %req.uri().path(), error = %err, "Rejected request");
            err.into_response()
        }
    }
}
