//! Delegated session handling against an external GoTrue-compatible auth service.

pub mod gotrue;
pub mod provider;
pub mod session;

pub use gotrue::GoTrueProvider;
pub use provider::{AuthProvider, AuthSession, AuthUser};
pub use session::{SessionCookies, SessionTokens, refresh_session};
