use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{ConfigError, MissingCredential};
use crate::google_drive::credentials::ServiceCredential;

pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
pub const DRIVE_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/drive.file",
];

/// Folder under which every photo session folder is created.
pub const DEFAULT_ROOT_FOLDER_ID: &str = "1yH0gAupFxeQsPCllgECRAs_yhXlZBQ8Z";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub drive: DriveConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub loglevel: String,
    pub environment: Environment,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            environment: Environment::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DriveConfig {
    pub service_account_email: Option<String>,
    /// PEM key, usually with `\n` escaped as a literal backslash-n.
    pub private_key: Option<String>,
    pub root_folder_id: String,
    pub token_uri: String,
    pub api_base: String,
    pub upload_base: String,
    pub request_timeout_secs: u64,
    pub max_upload_bytes: usize,
    /// Serialize the find-or-create step per session date within this process.
    pub serialize_folder_resolution: bool,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            service_account_email: None,
            private_key: None,
            root_folder_id: DEFAULT_ROOT_FOLDER_ID.to_string(),
            token_uri: GOOGLE_TOKEN_URI.to_string(),
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: DRIVE_UPLOAD_BASE.to_string(),
            request_timeout_secs: 15,
            max_upload_bytes: 25 * 1024 * 1024,
            serialize_folder_resolution: false,
        }
    }
}

impl DriveConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Both the principal and the key must be present and non-blank.
    pub fn service_credential(&self) -> Result<ServiceCredential, MissingCredential> {
        let email = non_blank(self.service_account_email.as_deref())
            .ok_or(MissingCredential("drive.service_account_email"))?;
        let key =
            non_blank(self.private_key.as_deref()).ok_or(MissingCredential("drive.private_key"))?;
        Ok(ServiceCredential::new(email, key, &DRIVE_SCOPES))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub url: Option<Url>,
    pub anon_key: Option<String>,
    pub access_cookie: String,
    pub refresh_cookie: String,
    pub cookie_max_age_days: i64,
    pub insecure_cookie: bool,
    pub request_timeout_secs: u64,
    pub login_path: String,
    pub home_path: String,
    pub protected_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            access_cookie: "bandhub-access-token".to_string(),
            refresh_cookie: "bandhub-refresh-token".to_string(),
            cookie_max_age_days: 30,
            insecure_cookie: false,
            request_timeout_secs: 10,
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
            protected_paths: ["/", "/canciones", "/calendario", "/tareas", "/ideas", "/fotos"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl AuthConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// The auth service base URL and public key; both are required to start.
    pub fn service(&self) -> Result<(&Url, &str), ConfigError> {
        let url = self.url.as_ref().ok_or(ConfigError::Missing("auth.url"))?;
        let key = non_blank(self.anon_key.as_deref()).ok_or(ConfigError::Missing("auth.anon_key"))?;
        Ok((url, key))
    }
}

impl Config {
    /// Defaults, then `config.toml`, then `BANDHUB_*` variables, then the legacy names.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("BANDHUB_").split("__"))
            .merge(legacy_env())
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let cfg: Config = figment.extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.auth.service()?;
        let paths = self
            .auth
            .protected_paths
            .iter()
            .chain([&self.auth.login_path, &self.auth.home_path]);
        for path in paths {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid {
                    field: "auth.protected_paths",
                    reason: format!("`{path}` must start with '/'"),
                });
            }
        }
        if self.drive.root_folder_id.trim().is_empty() {
            return Err(ConfigError::Missing("drive.root_folder_id"));
        }
        Ok(())
    }
}

/// Environment names used by the original deployment.
fn legacy_env() -> Env {
    Env::raw().filter_map(|key| {
        let mapped = match key.as_str().to_ascii_uppercase().as_str() {
            "GOOGLE_SERVICE_ACCOUNT_EMAIL" => "drive.service_account_email",
            "GOOGLE_PRIVATE_KEY" => "drive.private_key",
            "NEXT_PUBLIC_SUPABASE_URL" | "SUPABASE_URL" => "auth.url",
            "NEXT_PUBLIC_SUPABASE_ANON_KEY" | "SUPABASE_ANON_KEY" => "auth.anon_key",
            _ => return None,
        };
        Some(mapped.into())
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
