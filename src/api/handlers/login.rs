//! `GET /login` and `POST /login`.

use super::page;
use crate::auth::{
    AuthState, CookieJar, LoginFlow, LoginOutcome, LoginState, Notice,
    cookies::append_set_cookies,
    gate::{no_cache, redirect},
    login::Credentials,
};
use axum::{
    Form,
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use std::{fmt, sync::Arc};

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub from: Option<String>,
    pub notice: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub from: Option<String>,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

pub async fn login_page(
    headers: HeaderMap,
    auth: Extension<Arc<AuthState>>,
    Query(query): Query<LoginQuery>,
) -> Response {
    let jar = CookieJar::from_headers(&headers);
    let notice = Notice::from_query(query.notice.as_deref());
    let outcome = LoginFlow::new(&auth, query.from.as_deref())
        .mount(&jar, notice)
        .await;
    respond(outcome)
}

pub async fn login_submit(
    headers: HeaderMap,
    auth: Extension<Arc<AuthState>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let jar = CookieJar::from_headers(&headers);
    let credentials = Credentials {
        email: form.email,
        password: SecretString::from(form.password),
    };
    let outcome = LoginFlow::new(&auth, form.from.as_deref())
        .submit(&jar, credentials)
        .await;
    respond(outcome)
}

fn respond(outcome: LoginOutcome) -> Response {
    let status = outcome.status_code();
    let LoginOutcome {
        state,
        cookies,
        destination,
        email,
    } = outcome;

    match state {
        LoginState::Redirecting { location } => redirect(status, &location, &cookies),
        LoginState::FormVisible { notice } => {
            form_response(status, notice.as_ref(), &destination, email.as_deref(), &cookies)
        }
        LoginState::Initializing | LoginState::CheckingSession => {
            form_response(StatusCode::OK, None, &destination, None, &cookies)
        }
    }
}

fn form_response(
    status: StatusCode,
    notice: Option<&Notice>,
    destination: &str,
    email: Option<&str>,
    cookies: &[crate::auth::SetCookie],
) -> Response {
    let html = page::login(notice, destination, email);
    let mut response = (status, Html(html)).into_response();
    append_set_cookies(response.headers_mut(), cookies);
    no_cache(response.headers_mut());
    response
}
