use async_trait::async_trait;
use oauth2::{
    AccessToken, ExtraTokenFields, RefreshToken, StandardTokenResponse, TokenResponse,
    basic::BasicTokenType,
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::provider::{AuthProvider, AuthSession, AuthUser};
use crate::config::AuthConfig;
use crate::error::{AuthError, ConfigError};

const API_KEY_HEADER: &str = "apikey";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(super) struct GoTrueTokenFields {
    pub user: AuthUser,
}
impl ExtraTokenFields for GoTrueTokenFields {}

pub(super) type GoTrueTokenResponse = StandardTokenResponse<GoTrueTokenFields, BasicTokenType>;

/// Auth provider backed by a GoTrue (Supabase Auth) server.
pub struct GoTrueProvider {
    http: reqwest::Client,
    base: Url,
    api_key: String,
}

impl GoTrueProvider {
    pub fn new(cfg: &AuthConfig) -> Result<Self, ConfigError> {
        let (url, key) = cfg.service()?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("bandhub/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(cfg.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base: directory_url(url),
            api_key: key.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        Ok(self.base.join(path)?)
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<GoTrueTokenResponse, AuthError> {
        let resp = self
            .http
            .post(self.endpoint("auth/v1/token")?)
            .query(&[("grant_type", grant_type)])
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        read_json(resp).await
    }
}

#[async_trait]
impl AuthProvider for GoTrueProvider {
    async fn get_user(&self, access_token: &AccessToken) -> Result<AuthUser, AuthError> {
        let resp = self
            .http
            .get(self.endpoint("auth/v1/user")?)
            .header(API_KEY_HEADER, &self.api_key)
            .bearer_auth(access_token.secret())
            .send()
            .await?;
        read_json(resp).await
    }

    async fn refresh_session(
        &self,
        refresh_token: &RefreshToken,
    ) -> Result<AuthSession, AuthError> {
        let resp = self
            .token_grant(
                "refresh_token",
                json!({ "refresh_token": refresh_token.secret() }),
            )
            .await?;
        debug!(user_id = %resp.extra_fields().user.id, "auth session refreshed");
        into_session(resp, Some(refresh_token))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let resp = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;
        into_session(resp, None)
    }

    async fn sign_out(&self, access_token: &AccessToken) -> Result<(), AuthError> {
        let resp = self
            .http
            .post(self.endpoint("auth/v1/logout")?)
            .header(API_KEY_HEADER, &self.api_key)
            .bearer_auth(access_token.secret())
            .send()
            .await?;
        classify(resp.status()).map(|_| ())
    }
}

/// `Url::join` replaces the last segment unless the base ends with `/`.
fn directory_url(url: &Url) -> Url {
    let mut base = url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

/// GoTrue may omit the refresh token on refresh; keep the one we sent then.
fn into_session(
    resp: GoTrueTokenResponse,
    previous: Option<&RefreshToken>,
) -> Result<AuthSession, AuthError> {
    let refresh_token = resp
        .refresh_token()
        .or(previous)
        .cloned()
        .ok_or(AuthError::MissingRefreshToken)?;
    Ok(AuthSession {
        user: resp.extra_fields().user.clone(),
        access_token: resp.access_token().clone(),
        refresh_token,
        expires_in: resp.expires_in(),
    })
}

fn classify(status: StatusCode) -> Result<StatusCode, AuthError> {
    match status {
        s if s.is_success() => Ok(s),
        StatusCode::BAD_REQUEST
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::NOT_FOUND
        | StatusCode::UNPROCESSABLE_ENTITY => Err(AuthError::Rejected(status)),
        s => Err(AuthError::Status(s)),
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, AuthError> {
    classify(resp.status())?;
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
