//! `GET /logout` and `POST /logout`.

use crate::auth::{
    AuthState, CookieJar,
    gate::redirect,
    logout::{CLEAR_SITE_DATA, run},
};
use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use std::sync::Arc;

const CLEAR_SITE_DATA_HEADER: &str = "clear-site-data";

pub async fn logout(headers: HeaderMap, auth: Extension<Arc<AuthState>>) -> Response {
    let jar = CookieJar::from_headers(&headers);
    let report = run(&auth, &jar).await;

    let mut response = redirect(StatusCode::SEE_OTHER, &report.location(), &report.cookies);
    response.headers_mut().insert(
        HeaderName::from_static(CLEAR_SITE_DATA_HEADER),
        HeaderValue::from_static(CLEAR_SITE_DATA),
    );
    response
}
