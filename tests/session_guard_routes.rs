mod common;

use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use base64::Engine;
use common::{MockAuth, MockStore, test_app, test_config};
use std::sync::Arc;
use tower::ServiceExt;

const ACCESS: &str = "bandhub-access-token";
const REFRESH: &str = "bandhub-refresh-token";

fn app(auth: &Arc<MockAuth>) -> axum::Router {
    test_app(Arc::new(MockStore::new()), auth.clone(), &test_config())
}

fn get(uri: &str, cookies: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::get(uri);
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookie_header(cookies));
    }
    builder.body(Body::empty()).unwrap()
}

fn cookie_header(cookies: &[(&str, &str)]) -> String {
    cookies
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

fn location(headers: &HeaderMap) -> &str {
    headers[header::LOCATION].to_str().unwrap()
}

/// `name=value` pairs from every Set-Cookie header.
fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| {
            v.to_str()
                .unwrap()
                .split(';')
                .next()
                .unwrap()
                .to_string()
        })
        .collect()
}

fn expired_jwt() -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!(
        "{}.{}.sig",
        engine.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
        engine.encode(br#"{"sub":"user-1","exp":1000}"#)
    )
}

#[tokio::test]
async fn protected_page_without_session_redirects_to_login() {
    let auth = Arc::new(MockAuth::new());
    let resp = app(&auth).oneshot(get("/", &[])).await.unwrap();

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(resp.headers()), "/login");
    assert!(set_cookies(resp.headers()).is_empty());
    assert!(auth.calls().is_empty());
}

#[tokio::test]
async fn protected_sub_path_is_guarded_too() {
    let auth = Arc::new(MockAuth::new());
    let resp = app(&auth).oneshot(get("/canciones/42", &[])).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(resp.headers()), "/login");
}

#[tokio::test]
async fn valid_session_passes_and_reaches_the_page() {
    let auth = Arc::new(MockAuth::new().accepting("good-access"));
    let resp = app(&auth)
        .oneshot(get("/fotos", &[(ACCESS, "good-access"), (REFRESH, "r-1")]))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookies(resp.headers()).is_empty());
    let html = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(html.to_vec()).unwrap();
    assert!(html.contains("Fotos"));
    assert!(html.contains("bateria@banda.test"));
    assert_eq!(auth.calls(), vec!["get_user:good-access"]);
}

#[tokio::test]
async fn login_page_with_session_redirects_home() {
    let auth = Arc::new(MockAuth::new().accepting("good-access"));
    let resp = app(&auth)
        .oneshot(get("/login", &[(ACCESS, "good-access")]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(resp.headers()), "/");
}

#[tokio::test]
async fn login_page_without_session_is_served() {
    let auth = Arc::new(MockAuth::new());
    let resp = app(&auth).oneshot(get("/login", &[])).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn unguarded_routes_never_consult_the_auth_service() {
    let auth = Arc::new(MockAuth::new());
    let resp = app(&auth)
        .oneshot(get("/chat", &[(ACCESS, "whatever"), (REFRESH, "r-1")]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookies(resp.headers()).is_empty());
    assert!(auth.calls().is_empty());
}

#[tokio::test]
async fn expired_access_token_is_refreshed_without_validation() {
    let auth = Arc::new(MockAuth::new().rotating("r-1", "a-2", "r-2"));
    let expired = expired_jwt();
    let resp = app(&auth)
        .oneshot(get("/tareas", &[(ACCESS, expired.as_str()), (REFRESH, "r-1")]))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let cookies = set_cookies(resp.headers());
    assert!(cookies.contains(&format!("{ACCESS}=a-2")));
    assert!(cookies.contains(&format!("{REFRESH}=r-2")));
    assert_eq!(auth.calls(), vec!["refresh:r-1"]);
}

#[tokio::test]
async fn rotated_cookies_survive_a_redirect() {
    let auth = Arc::new(MockAuth::new().rotating("r-1", "a-2", "r-2"));
    let resp = app(&auth)
        .oneshot(get("/login", &[(ACCESS, "stale-access"), (REFRESH, "r-1")]))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(resp.headers()), "/");
    let cookies = set_cookies(resp.headers());
    assert!(cookies.contains(&format!("{ACCESS}=a-2")));
    assert!(cookies.contains(&format!("{REFRESH}=r-2")));
    assert_eq!(auth.calls(), vec!["get_user:stale-access", "refresh:r-1"]);
}

#[tokio::test]
async fn rejected_refresh_clears_the_session() {
    let auth = Arc::new(MockAuth::new());
    let resp = app(&auth)
        .oneshot(get("/ideas", &[(ACCESS, "stale-access"), (REFRESH, "revoked")]))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(resp.headers()), "/login");
    let cookies = set_cookies(resp.headers());
    assert!(cookies.contains(&format!("{ACCESS}=")));
    assert!(cookies.contains(&format!("{REFRESH}=")));
}

#[tokio::test]
async fn unavailable_auth_service_keeps_the_cookies() {
    let auth = Arc::new(MockAuth::new().unavailable());
    let resp = app(&auth)
        .oneshot(get("/calendario", &[(ACCESS, "good-access"), (REFRESH, "r-1")]))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(resp.headers()), "/login");
    assert!(set_cookies(resp.headers()).is_empty());
}

fn post_form(uri: &str, body: &str, cookies: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookie_header(cookies));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn sign_in_sets_cookies_and_goes_home() {
    let auth = Arc::new(MockAuth::new());
    let resp = app(&auth)
        .oneshot(post_form(
            "/auth/login",
            "email=bateria%40banda.test&password=correcta",
            &[],
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(resp.headers()), "/");
    let cookies = set_cookies(resp.headers());
    assert!(cookies.contains(&format!("{ACCESS}=signed-in-access")));
    assert!(cookies.contains(&format!("{REFRESH}=signed-in-refresh")));
    assert_eq!(auth.calls(), vec!["sign_in:bateria@banda.test"]);
}

#[tokio::test]
async fn wrong_password_returns_to_login_with_reason() {
    let auth = Arc::new(MockAuth::new());
    let resp = app(&auth)
        .oneshot(post_form(
            "/auth/login",
            "email=bateria%40banda.test&password=mala",
            &[],
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(resp.headers()), "/login?error=invalid_credentials");
    assert!(set_cookies(resp.headers()).is_empty());
}

#[tokio::test]
async fn sign_out_clears_cookies_even_if_revocation_fails() {
    let auth = Arc::new(MockAuth::new().unavailable());
    let resp = app(&auth)
        .oneshot(post_form(
            "/auth/logout",
            "",
            &[(ACCESS, "good-access"), (REFRESH, "r-1")],
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(resp.headers()), "/login");
    let cookies = set_cookies(resp.headers());
    assert!(cookies.contains(&format!("{ACCESS}=")));
    assert!(cookies.contains(&format!("{REFRESH}=")));
    assert_eq!(auth.calls(), vec!["sign_out:good-access"]);
}
