use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};

use crate::router::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// POST /auth/login -> signs in against the auth service and stores the session cookies.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.auth.sign_in(form.email.trim(), &form.password).await {
        Ok(session) => {
            info!(user_id = %session.user.id, "user signed in");
            let jar = state.cookies.store(jar, &session);
            (jar, Redirect::to(state.guard.home_path())).into_response()
        }
        Err(e) => {
            warn!(error = %e, "sign-in failed");
            let reason = if e.is_rejection() {
                "invalid_credentials"
            } else {
                "unavailable"
            };
            let target = format!("{}?error={reason}", state.guard.login_path());
            Redirect::to(&target).into_response()
        }
    }
}

/// POST /auth/logout -> revokes the session best-effort and clears the cookies.
pub async fn logout_handler(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(access) = state.cookies.read(&jar).access_token
        && let Err(e) = state.auth.sign_out(&access).await
    {
        warn!(error = %e, "sign-out call failed; clearing cookies anyway");
    }
    let jar = state.cookies.clear(jar);
    (jar, Redirect::to(state.guard.login_path())).into_response()
}
