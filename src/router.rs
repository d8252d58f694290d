use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;

use crate::auth::{AuthProvider, GoTrueProvider, SessionCookies};
use crate::config::{Config, Environment};
use crate::error::ConfigError;
use crate::google_drive::GoogleDriveClient;
use crate::handlers::{auth, drive, pages};
use crate::middleware::{RouteGuard, session_guard};
use crate::service::{DriveGateway, DriveStore};

/// Shared, read-only state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<DriveGateway>,
    pub auth: Arc<dyn AuthProvider>,
    pub cookies: Arc<SessionCookies>,
    pub guard: Arc<RouteGuard>,
    pub environment: Environment,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wire the gateway and guard around the given store and auth provider.
    pub fn new(store: Arc<dyn DriveStore>, auth: Arc<dyn AuthProvider>, cfg: &Config) -> Self {
        let gateway = DriveGateway::new(store, cfg.drive.root_folder_id.clone())
            .with_timeout(cfg.drive.request_timeout())
            .with_folder_lock(cfg.drive.serialize_folder_resolution);
        Self {
            gateway: Arc::new(gateway),
            auth,
            cookies: Arc::new(SessionCookies::from_config(&cfg.auth)),
            guard: Arc::new(RouteGuard::from_config(&cfg.auth)),
            environment: cfg.basic.environment,
            max_upload_bytes: cfg.drive.max_upload_bytes,
        }
    }

    /// Production wiring: Google Drive client plus GoTrue provider.
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let drive = GoogleDriveClient::new(&cfg.drive).map_err(|e| ConfigError::Invalid {
            field: "drive",
            reason: e.to_string(),
        })?;
        let auth = GoTrueProvider::new(&cfg.auth)?;
        Ok(Self::new(Arc::new(drive), Arc::new(auth), cfg))
    }
}

pub fn app_router(state: AppState) -> Router {
    let mut guarded: Router<AppState> =
        Router::new().route(state.guard.login_path(), get(pages::login_page));
    for path in state.guard.protected_paths() {
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            guarded = guarded.route("/", get(pages::page_shell));
            continue;
        }
        guarded = guarded
            .route(path, get(pages::page_shell))
            .route(&format!("{path}/{{*rest}}"), get(pages::page_shell));
    }
    let guarded = guarded.route_layer(from_fn_with_state(state.clone(), session_guard));

    let drive_routes = Router::new()
        .route(
            "/drive",
            get(drive::list_files_handler).post(drive::upload_file_handler),
        )
        .route("/drive/batch", post(drive::upload_batch_handler))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes));

    Router::new()
        .merge(guarded)
        .merge(drive_routes)
        .route("/chat", get(pages::page_shell))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .with_state(state)
}
