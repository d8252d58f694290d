use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use oauth2::{AccessToken, RefreshToken};
use serde_json::Value;
use time::Duration;
use tracing::{debug, warn};

use super::provider::{AuthProvider, AuthSession, AuthUser};
use crate::config::AuthConfig;

/// Access tokens expiring within this many seconds are refreshed up front.
const EXPIRY_SKEW_SECS: i64 = 10;

/// Tokens found on an incoming request.
#[derive(Debug, Clone, Default)]
pub struct SessionTokens {
    pub access_token: Option<AccessToken>,
    pub refresh_token: Option<RefreshToken>,
}

/// Names and attributes of the two session cookies.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    access_name: String,
    refresh_name: String,
    max_age: Duration,
    secure: bool,
}

impl SessionCookies {
    pub fn from_config(cfg: &AuthConfig) -> Self {
        Self {
            access_name: cfg.access_cookie.clone(),
            refresh_name: cfg.refresh_cookie.clone(),
            max_age: Duration::days(cfg.cookie_max_age_days.max(1)),
            secure: !cfg.insecure_cookie,
        }
    }

    pub fn read(&self, jar: &CookieJar) -> SessionTokens {
        let value = |name: &str| {
            jar.get(name)
                .map(|c| c.value().to_owned())
                .filter(|v| !v.is_empty())
        };
        SessionTokens {
            access_token: value(&self.access_name).map(AccessToken::new),
            refresh_token: value(&self.refresh_name).map(RefreshToken::new),
        }
    }

    pub fn store(&self, jar: CookieJar, session: &AuthSession) -> CookieJar {
        jar.add(self.build(&self.access_name, session.access_token.secret().clone()))
            .add(self.build(&self.refresh_name, session.refresh_token.secret().clone()))
    }

    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.remove(self.removal(&self.access_name))
            .remove(self.removal(&self.refresh_name))
    }

    fn build(&self, name: &str, value: String) -> Cookie<'static> {
        Cookie::build(Cookie::new(name.to_string(), value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(self.max_age)
            .build()
    }

    fn removal(&self, name: &str) -> Cookie<'static> {
        Cookie::build(Cookie::new(name.to_string(), ""))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .build()
    }
}

/// Bring the cookie session up to date.
///
/// Returns the jar carrying any rotation or removal, and the user when a valid
/// session remains. Auth service failures never fail the request: they read as
/// "no session", and only an explicit rejection clears the cookies.
pub async fn refresh_session(
    provider: &dyn AuthProvider,
    cookies: &SessionCookies,
    jar: CookieJar,
) -> (CookieJar, Option<AuthUser>) {
    let SessionTokens {
        access_token,
        refresh_token,
    } = cookies.read(&jar);

    let rejected_access = match access_token {
        None => false,
        Some(access) if !access_token_expired(access.secret(), chrono::Utc::now().timestamp()) => {
            match provider.get_user(&access).await {
                Ok(user) => return (jar, Some(user)),
                Err(e) => {
                    debug!(error = %e, "access token not accepted");
                    e.is_rejection()
                }
            }
        }
        Some(_) => true,
    };

    let Some(refresh) = refresh_token else {
        if rejected_access {
            return (cookies.clear(jar), None);
        }
        return (jar, None);
    };

    match provider.refresh_session(&refresh).await {
        Ok(session) => {
            debug!(user_id = %session.user.id, "session tokens rotated");
            let user = session.user.clone();
            (cookies.store(jar, &session), Some(user))
        }
        Err(e) if e.is_rejection() => {
            debug!(error = %e, "refresh token rejected; clearing session");
            (cookies.clear(jar), None)
        }
        Err(e) => {
            warn!(error = %e, "auth service unavailable during session refresh");
            (jar, None)
        }
    }
}

/// Whether the JWT's `exp` claim is already past (with skew). Tokens whose payload
/// cannot be read are left for the auth service to judge.
pub fn access_token_expired(token: &str, now: i64) -> bool {
    let Some(payload_b64) = token.split('.').nth(1) else {
        return false;
    };
    let Ok(decoded) = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload_b64) else {
        return false;
    };
    let Ok(payload) = serde_json::from_slice::<Value>(&decoded) else {
        return false;
    };
    let Some(exp) = payload.get("exp").and_then(Value::as_i64) else {
        return false;
    };
    exp <= now + EXPIRY_SKEW_SECS
}
