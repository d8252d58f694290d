pub mod session_guard;
pub mod upload_form;

pub use session_guard::{GuardDecision, RouteGuard, session_guard};
pub use upload_form::{BatchUploadForm, UploadForm};
