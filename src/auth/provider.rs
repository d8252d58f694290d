use async_trait::async_trait;
use oauth2::{AccessToken, RefreshToken};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AuthError;

/// The logged-in user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A fresh token pair issued by the auth service.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: AuthUser,
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub expires_in: Option<Duration>,
}

/// External session authority. Every method is one network round trip.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Validate an access token and return its user.
    async fn get_user(&self, access_token: &AccessToken) -> Result<AuthUser, AuthError>;

    /// Exchange a refresh token for a rotated token pair.
    async fn refresh_session(&self, refresh_token: &RefreshToken)
    -> Result<AuthSession, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_out(&self, access_token: &AccessToken) -> Result<(), AuthError>;
}
