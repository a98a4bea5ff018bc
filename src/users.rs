use actix_web::HttpRequest;
use jsonwebtoken::{decode, DecodingKey, Validation};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::roles::{Caller, Role};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // username
    pub exp: usize,         // expiration time
    pub roles: Vec<String>, // user roles
}

/// Extract and validate the bearer token from the request.
pub fn verify_token(req: &HttpRequest, app_state: &AppState) -> Result<Claims, ApiError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    let header_str = header.to_str().unwrap_or("");
    let token = header_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header".to_string()))?;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(app_state.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))
}

/// Resolve the request's bearer token to a `Caller` with its linked profiles.
pub async fn authenticate(req: &HttpRequest, app_state: &AppState) -> Result<Caller, ApiError> {
    let claims = verify_token(req, app_state)?;

    let profile = app_state
        .homeworks
        .user_profile(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    let mut roles = Vec::with_capacity(claims.roles.len());
    for name in &claims.roles {
        match Role::parse(name) {
            Some(role) => roles.push(role),
            None => warn!("Ignoring unknown role '{}' for {}", name, claims.sub),
        }
    }

    Ok(Caller::new(claims.sub, roles, profile))
}
