use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
    extractors::AuthUser,
    jwt::JwtKeys,
    password::{hash_password, verify_dummy, verify_password},
    repo::{CreateUserError, UserStore},
    repo_types::NewUser,
};
use crate::error::{AppError, AppResult};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// A field counts as present only if it holds something besides whitespace.
fn present(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty())
}

pub async fn register(
    users: &dyn UserStore,
    keys: &JwtKeys,
    payload: RegisterRequest,
) -> AppResult<AuthResponse> {
    let (Some(name), Some(email), Some(password)) = (
        present(payload.name),
        present(payload.email),
        present(payload.password),
    ) else {
        warn!("register with missing fields");
        return Err(AppError::Validation("Please add all fields".into()));
    };

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    if users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("User already exists".into()));
    }

    let hash = hash_password(&password)?;
    let new_user = NewUser {
        name: &name,
        email: &email,
        password_hash: &hash,
    };
    let user = match users.create(new_user).await {
        Ok(u) => u,
        // lost a race with a concurrent registration
        Err(CreateUserError::EmailTaken) => {
            warn!(email = %email, "email already registered");
            return Err(AppError::Conflict("User already exists".into()));
        }
        Err(CreateUserError::Store(e)) => return Err(e.into()),
    };

    let token = keys.sign(user.id, &user.email).context("sign token")?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(AuthResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        token,
    })
}

pub async fn authenticate(
    users: &dyn UserStore,
    keys: &JwtKeys,
    payload: LoginRequest,
) -> AppResult<AuthResponse> {
    let (Some(email), Some(password)) = (present(payload.email), payload.password) else {
        warn!("login with missing fields");
        return Err(AppError::InvalidCredentials);
    };

    let Some(user) = users.find_by_email(&email).await? else {
        verify_dummy(&password);
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = keys.sign(user.id, &user.email).context("sign token")?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(AuthResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        token,
    })
}

/// Resolves a bearer token to the caller. Every failure is the same
/// `Unauthorized`; the reason only reaches the log.
pub fn identify_caller(keys: &JwtKeys, token: Option<&str>) -> AppResult<AuthUser> {
    let Some(token) = token else {
        warn!("missing or malformed Authorization header");
        return Err(AppError::Unauthorized);
    };
    match keys.verify(token) {
        Ok(claims) => Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
        }),
        Err(e) => {
            warn!(error = %e, "invalid or expired token");
            Err(AppError::Unauthorized)
        }
    }
}

pub async fn get_profile(users: &dyn UserStore, caller_id: Uuid) -> AppResult<PublicUser> {
    let user = users
        .find_by_id(caller_id)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;
    Ok(PublicUser {
        id: user.id,
        name: user.name,
        email: user.email,
    })
}
