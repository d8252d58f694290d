use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::auth::refresh_session;
use crate::config::AuthConfig;
use crate::router::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    RedirectToLogin,
    RedirectToHome,
    PassThrough,
}

/// Protected/login route split.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    protected: Vec<String>,
    login_path: String,
    home_path: String,
}

impl RouteGuard {
    pub fn new(protected: Vec<String>, login_path: String, home_path: String) -> Self {
        Self {
            protected,
            login_path,
            home_path,
        }
    }

    pub fn from_config(cfg: &AuthConfig) -> Self {
        Self::new(
            cfg.protected_paths.clone(),
            cfg.login_path.clone(),
            cfg.home_path.clone(),
        )
    }

    pub fn protected_paths(&self) -> &[String] {
        &self.protected
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn home_path(&self) -> &str {
        &self.home_path
    }

    /// `/` protects only itself; any other entry also covers its sub-paths.
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected.iter().any(|p| {
            let p = p.trim_end_matches('/');
            if p.is_empty() {
                return path == "/";
            }
            path == p
                || path
                    .strip_prefix(p)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    pub fn is_login(&self, path: &str) -> bool {
        path == self.login_path
    }

    pub fn decide(&self, path: &str, has_session: bool) -> GuardDecision {
        match (has_session, self.is_login(path)) {
            (true, true) => GuardDecision::RedirectToHome,
            (false, false) if self.is_protected(path) => GuardDecision::RedirectToLogin,
            _ => GuardDecision::PassThrough,
        }
    }
}

/// Refresh the cookie session, then enforce the route split. Cookie rotation from
/// the refresh is carried on every outcome, redirects included.
pub async fn session_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let (jar, user) = refresh_session(state.auth.as_ref(), &state.cookies, jar).await;
    let path = req.uri().path().to_owned();
    let decision = state.guard.decide(&path, user.is_some());
    debug!(path = %path, session = user.is_some(), ?decision, "session guard");

    match decision {
        GuardDecision::RedirectToLogin => {
            (jar, Redirect::temporary(state.guard.login_path())).into_response()
        }
        GuardDecision::RedirectToHome => {
            (jar, Redirect::temporary(state.guard.home_path())).into_response()
        }
        GuardDecision::PassThrough => {
            if let Some(user) = user {
                req.extensions_mut().insert(user);
            }
            (jar, next.run(req).await).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> RouteGuard {
        RouteGuard::from_config(&AuthConfig::default())
    }

    #[test]
    fn decision_table() {
        let g = guard();
        assert_eq!(g.decide("/", false), GuardDecision::RedirectToLogin);
        assert_eq!(g.decide("/fotos", false), GuardDecision::RedirectToLogin);
        assert_eq!(g.decide("/login", true), GuardDecision::RedirectToHome);
        assert_eq!(g.decide("/canciones", true), GuardDecision::PassThrough);
        assert_eq!(g.decide("/login", false), GuardDecision::PassThrough);
        assert_eq!(g.decide("/chat", false), GuardDecision::PassThrough);
    }

    #[test]
    fn sub_paths_are_protected_but_prefixes_are_not() {
        let g = guard();
        assert!(g.is_protected("/canciones/42"));
        assert!(!g.is_protected("/cancionesx"));
        assert!(!g.is_protected("/chat"));
        assert!(!g.is_protected("/assets/app.css"));
    }
}
