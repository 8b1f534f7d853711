//! End-to-end session scenarios against the full router, with an in-memory
//! identity provider standing in for the HTTP one.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Method, Request, StatusCode,
        header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
    response::Response,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use secrecy::SecretString;
use stagecall::{
    api,
    auth::{AuthConfig, AuthState},
    provider::{IdentityProvider, ProviderError, ProviderFuture, ProviderUser, Session},
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tower::ServiceExt;

#[derive(Clone, Copy)]
enum SignIn {
    Token(&'static str),
    NoSession,
    Rejected,
}

struct FakeProvider {
    sign_in: SignIn,
    live_token: Option<&'static str>,
    session_check_down: bool,
    sign_out_fails: bool,
    sign_in_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl FakeProvider {
    fn new(sign_in: SignIn) -> Self {
        Self {
            sign_in,
            live_token: None,
            session_check_down: false,
            sign_out_fails: false,
            sign_in_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
        }
    }

    fn with_live_token(mut self, token: &'static str) -> Self {
        self.live_token = Some(token);
        self
    }

    fn with_session_check_down(mut self) -> Self {
        self.session_check_down = true;
        self
    }

    fn with_failing_sign_out(mut self) -> Self {
        self.sign_out_fails = true;
        self
    }
}

fn session(token: &str) -> Session {
    Session {
        access_token: Some(token.to_string()),
        expires_at: Some(1_900_000_000),
        user: ProviderUser {
            id: "u-1".to_string(),
            email: Some("sm@example.com".to_string()),
            display_name: Some("Stage Manager".to_string()),
        },
    }
}

impl IdentityProvider for FakeProvider {
    fn sign_in_with_password<'a>(
        &'a self,
        _email: &'a str,
        _password: &'a SecretString,
    ) -> ProviderFuture<'a, Option<Session>> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        let sign_in = self.sign_in;
        Box::pin(async move {
            match sign_in {
                SignIn::Token(token) => Ok(Some(session(token))),
                SignIn::NoSession => Ok(None),
                SignIn::Rejected => Err(ProviderError::Rejected {
                    status: 400,
                    message: "Invalid login credentials".to_string(),
                }),
            }
        })
    }

    fn get_session<'a>(&'a self, access_token: &'a str) -> ProviderFuture<'a, Option<Session>> {
        Box::pin(async move {
            if self.session_check_down {
                return Err(ProviderError::Unavailable("connection refused".to_string()));
            }
            Ok(self
                .live_token
                .filter(|live| *live == access_token)
                .map(session))
        })
    }

    fn sign_out<'a>(&'a self, _access_token: &'a str) -> ProviderFuture<'a, ()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        let fails = self.sign_out_fails;
        Box::pin(async move {
            if fails {
                Err(ProviderError::Unavailable("connection refused".to_string()))
            } else {
                Ok(())
            }
        })
    }
}

fn app(provider: &Arc<FakeProvider>) -> Router {
    let config = AuthConfig::new("https://stagecall.dev".to_string());
    let provider: Arc<dyn IdentityProvider> = provider.clone();
    api::router(Arc::new(AuthState::new(config, provider)))
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    match app.clone().oneshot(request).await {
        Ok(response) => response,
        Err(err) => match err {},
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(ToString::to_string)
        .collect()
}

fn is_deletion(cookie: &str) -> bool {
    cookie.contains("Max-Age=0")
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn token_for(claims: &str) -> String {
    format!(
        "eyJhbGciOiJIUzI1NiJ9.{}.c2lnbmF0dXJl",
        Base64UrlUnpadded::encode_string(claims.as_bytes())
    )
}

#[tokio::test]
async fn gated_path_without_cookie_redirects_to_login() {
    let provider = Arc::new(FakeProvider::new(SignIn::NoSession));
    let response = send(&app(&provider), get("/tasks", None)).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/login?from=%2Ftasks"));
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn gate_redirect_keeps_the_query_for_the_return_trip() {
    let provider = Arc::new(FakeProvider::new(SignIn::Token("abc.def.ghi")));
    let app = app(&provider);

    let gated = send(&app, get("/projects?id=7", None)).await;
    assert_eq!(gated.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&gated), Some("/login?from=%2Fprojects%3Fid%3D7"));

    let response = send(
        &app,
        post_form(
            "/login",
            "email=sm%40example.com&password=pw&from=%2Fprojects%3Fid%3D7",
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/projects?id=7"));
}

#[tokio::test]
async fn malformed_cookie_is_deleted_and_redirected_idempotently() {
    let provider = Arc::new(FakeProvider::new(SignIn::NoSession));
    let app = app(&provider);

    let first = send(&app, get("/tasks", Some("stagecall_session=not-a-jwt"))).await;
    let second = send(&app, get("/tasks", Some("stagecall_session=not-a-jwt"))).await;

    for response in [&first, &second] {
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(response), Some("/login?from=%2Ftasks"));
        let cookies = set_cookies(response);
        assert!(!cookies.is_empty());
        assert!(cookies.iter().all(|c| c.starts_with("stagecall_session=;")));
        assert!(cookies.iter().all(|c| is_deletion(c)));
    }
    assert_eq!(set_cookies(&first), set_cookies(&second));
}

#[tokio::test]
async fn public_paths_skip_the_gate() {
    let provider = Arc::new(FakeProvider::new(SignIn::NoSession));
    let app = app(&provider);

    let health = send(&app, get("/health", None)).await;
    assert_eq!(health.status(), StatusCode::OK);

    let login = send(&app, get("/login", None)).await;
    assert_eq!(login.status(), StatusCode::OK);

    let asset = send(&app, get("/favicon.ico", None)).await;
    assert_eq!(asset.status(), StatusCode::NOT_FOUND);

    let openapi = send(&app, get("/api/openapi.json", None)).await;
    assert_eq!(openapi.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_path_is_gated_then_not_found() {
    let provider = Arc::new(FakeProvider::new(SignIn::NoSession));
    let app = app(&provider);

    let anonymous = send(&app, get("/nowhere", None)).await;
    assert_eq!(anonymous.status(), StatusCode::TEMPORARY_REDIRECT);

    let signed_in = send(&app, get("/nowhere", Some("stagecall_session=abc.def.ghi"))).await;
    assert_eq!(signed_in.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_email_never_reaches_the_provider() {
    let provider = Arc::new(FakeProvider::new(SignIn::Token("abc.def.ghi")));
    let response = send(
        &app(&provider),
        post_form("/login", "email=&password=hunter2&from=%2Ftasks", None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(location(&response).is_none());
    assert!(body_text(response).await.contains("Missing information."));
    assert_eq!(provider.sign_in_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sign_in_commits_cookie_and_opens_the_workspace() {
    let provider = Arc::new(FakeProvider::new(SignIn::Token("abc.def.ghi")));
    let app = app(&provider);

    let response = send(
        &app,
        post_form(
            "/login",
            "email=sm%40example.com&password=pw&from=%2Fprojects",
            None,
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/projects"));
    let cookies = set_cookies(&response);
    let committed = cookies.last().unwrap();
    assert!(committed.starts_with("stagecall_session=abc.def.ghi;"));
    assert!(committed.contains("HttpOnly"));
    assert!(committed.contains("SameSite=Lax"));
    assert!(committed.contains("Secure"));
    assert!(committed.contains("Max-Age=604800"));

    let page = send(&app, get("/projects", Some("stagecall_session=abc.def.ghi"))).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert_eq!(
        page.headers().get(CACHE_CONTROL).unwrap(),
        "no-store, no-cache, must-revalidate"
    );
    assert!(body_text(page).await.contains("<h1>Projects</h1>"));
}

#[tokio::test]
async fn sign_in_without_session_reports_missing_token() {
    let provider = Arc::new(FakeProvider::new(SignIn::NoSession));
    let response = send(
        &app(&provider),
        post_form("/login", "email=sm%40example.com&password=pw", None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(location(&response).is_none());
    assert!(set_cookies(&response).iter().all(|c| is_deletion(c)));
    assert!(
        body_text(response)
            .await
            .contains("Authentication succeeded but no access token was received")
    );
}

#[tokio::test]
async fn rejected_credentials_show_provider_message() {
    let provider = Arc::new(FakeProvider::new(SignIn::Rejected));
    let response = send(
        &app(&provider),
        post_form("/login", "email=sm%40example.com&password=wrong", None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_text(response).await;
    assert!(body.contains("Invalid login credentials"));
    assert!(body.contains("value=\"sm@example.com\""));
}

#[tokio::test]
async fn foreign_destination_falls_back_to_root() {
    let provider = Arc::new(FakeProvider::new(SignIn::Token("abc.def.ghi")));
    let response = send(
        &app(&provider),
        post_form(
            "/login",
            "email=sm%40example.com&password=pw&from=%2F%2Fevil.example",
            None,
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/"));
}

#[tokio::test]
async fn login_page_resumes_live_session() {
    let provider = Arc::new(FakeProvider::new(SignIn::NoSession).with_live_token("abc.def.ghi"));
    let response = send(
        &app(&provider),
        get(
            "/login?from=%2Fschedule",
            Some("stagecall_session=abc.def.ghi; idp-auth-token=stale"),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/schedule"));
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("idp-auth-token=;")));
    assert!(
        cookies
            .last()
            .unwrap()
            .starts_with("stagecall_session=abc.def.ghi;")
    );
}

#[tokio::test]
async fn login_page_purges_expired_session_and_shows_form() {
    let provider = Arc::new(FakeProvider::new(SignIn::NoSession));
    let response = send(
        &app(&provider),
        get("/login", Some("stagecall_session=abc.def.ghi; idp-refresh=1")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert!(cookies.iter().all(|c| is_deletion(c)));
    assert!(cookies.iter().any(|c| c.starts_with("stagecall_session=;")));
    assert!(cookies.iter().any(|c| c.starts_with("idp-refresh=;")));
    assert!(body_text(response).await.contains("action=\"/login\""));
}

#[tokio::test]
async fn login_page_fails_open_when_session_check_fails() {
    let provider = Arc::new(FakeProvider::new(SignIn::NoSession).with_session_check_down());
    let response = send(
        &app(&provider),
        get("/login", Some("stagecall_session=abc.def.ghi")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        body_text(response)
            .await
            .contains("Your session could not be verified")
    );
}

#[tokio::test]
async fn logout_clears_everything_and_lands_on_login() {
    let provider = Arc::new(FakeProvider::new(SignIn::NoSession));
    let request = post_form("/logout", "", Some("stagecall_session=abc.def.ghi; idp-auth=1"));
    let response = send(&app(&provider), request).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login?notice=signed-out"));
    assert_eq!(
        response.headers().get("clear-site-data").unwrap(),
        "\"storage\""
    );
    let cookies = set_cookies(&response);
    assert!(cookies.iter().all(|c| is_deletion(c)));
    assert!(cookies.iter().any(|c| c.starts_with("idp-auth=;")));
    assert!(cookies.iter().any(|c| c.contains("Expires=Thu, 01 Jan 1970")));
    assert_eq!(provider.sign_out_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn logout_survives_provider_failure() {
    let provider = Arc::new(FakeProvider::new(SignIn::NoSession).with_failing_sign_out());
    let app = app(&provider);
    let response = send(&app, get("/logout", Some("stagecall_session=abc.def.ghi"))).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login?notice=signed-out-locally"));
    assert!(set_cookies(&response).iter().all(|c| is_deletion(c)));

    let login = send(&app, get("/login?notice=signed-out-locally", None)).await;
    assert!(body_text(login).await.contains("signed out on this device"));
}

#[tokio::test]
async fn workspace_greets_user_from_token_claims() {
    let provider = Arc::new(FakeProvider::new(SignIn::NoSession));
    let token = token_for(
        r#"{"sub":"u-1","email":"sm@example.com","user_metadata":{"full_name":"Stage Manager"}}"#,
    );
    let cookie = format!("stagecall_session={token}");
    let response = send(&app(&provider), get("/tasks", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Signed in as Stage Manager"));
}

#[tokio::test]
async fn session_api_reports_live_session() {
    let provider = Arc::new(FakeProvider::new(SignIn::NoSession).with_live_token("abc.def.ghi"));
    let app = app(&provider);

    let by_cookie = send(&app, get("/api/session", Some("stagecall_session=abc.def.ghi"))).await;
    assert_eq!(by_cookie.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(by_cookie).await).unwrap();
    assert_eq!(body["user_id"], "u-1");
    assert_eq!(body["email"], "sm@example.com");
    assert_eq!(body["expires_at"], 1_900_000_000);

    let by_bearer = Request::builder()
        .uri("/api/session")
        .header(AUTHORIZATION, "Bearer abc.def.ghi")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, by_bearer).await.status(), StatusCode::OK);

    let anonymous = send(&app, get("/api/session", None)).await;
    assert_eq!(anonymous.status(), StatusCode::NO_CONTENT);

    let stale = send(&app, get("/api/session", Some("stagecall_session=old.token.value"))).await;
    assert_eq!(stale.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn session_api_reports_provider_outage() {
    let provider = Arc::new(FakeProvider::new(SignIn::NoSession).with_session_check_down());
    let response = send(
        &app(&provider),
        get("/api/session", Some("stagecall_session=abc.def.ghi")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let provider = Arc::new(FakeProvider::new(SignIn::NoSession));
    let response = send(&app(&provider), get("/health", None)).await;
    let request_id = response.headers().get("x-request-id").unwrap();
    assert_eq!(request_id.len(), 26);
}
