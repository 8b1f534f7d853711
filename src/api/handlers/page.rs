//! Server-rendered HTML for the login form and the workspace shell.

use crate::auth::{AuthenticatedUser, Notice};
use std::fmt::Write;

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;background:#f6f5f2;color:#1f1d1a}\
main{max-width:28rem;margin:4rem auto;padding:2rem;background:#fff;border-radius:8px}\
nav a{margin-right:1rem}label{display:block;margin-top:1rem}input{width:100%;padding:.5rem}\
button{margin-top:1.5rem;padding:.5rem 1rem}.notice{padding:.75rem;border-radius:4px;background:#e7f1e7}\
.notice.error{background:#f8e1e1}";

/// Escape text for element content and double-quoted attributes.
pub(crate) fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn document(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\
<title>{} | Stagecall</title><style>{STYLE}</style></head><body><main>{body}</main></body></html>",
        html_escape(title)
    )
}

pub(crate) fn login(notice: Option<&Notice>, destination: &str, email: Option<&str>) -> String {
    let mut body = String::from("<h1>Sign in</h1>");
    if let Some(notice) = notice {
        let class = if notice.is_error() { "notice error" } else { "notice" };
        let role = if notice.is_error() { "alert" } else { "status" };
        let _ = write!(
            body,
            "<p class=\"{class}\" role=\"{role}\">{}</p>",
            html_escape(&notice.message())
        );
    }
    let _ = write!(
        body,
        "<form method=\"post\" action=\"/login\">\
<input type=\"hidden\" name=\"from\" value=\"{}\">\
<label for=\"email\">Email</label>\
<input id=\"email\" name=\"email\" type=\"email\" autocomplete=\"username\" value=\"{}\">\
<label for=\"password\">Password</label>\
<input id=\"password\" name=\"password\" type=\"password\" autocomplete=\"current-password\">\
<button type=\"submit\">Sign in</button></form>",
        html_escape(destination),
        html_escape(email.unwrap_or_default())
    );
    document("Sign in", &body)
}

pub(crate) fn workspace(title: &str, summary: &str, user: Option<&AuthenticatedUser>) -> String {
    let greeting = user.map_or_else(
        || "Signed in".to_string(),
        |user| format!("Signed in as {}", html_escape(user.label())),
    );
    let body = format!(
        "<nav><a href=\"/\">Overview</a><a href=\"/projects\">Projects</a>\
<a href=\"/files\">Files</a><a href=\"/practice\">Practice</a>\
<a href=\"/tasks\">Tasks</a><a href=\"/schedule\">Schedule</a></nav>\
<h1>{}</h1><p>{}</p><p>{greeting}</p>\
<form method=\"post\" action=\"/logout\"><button type=\"submit\">Sign out</button></form>",
        html_escape(title),
        html_escape(summary),
    );
    document(title, &body)
}

pub(crate) fn not_found() -> String {
    document(
        "Not found",
        "<h1>Not found</h1><p>This page does not exist.</p><p><a href=\"/\">Back to the workspace</a></p>",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthError;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            html_escape("<a href=\"x\">Tom & Jerry's</a>"),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn login_keeps_destination_and_email() {
        let html = login(None, "/tasks?view=\"week\"", Some("sm@example.com"));
        assert!(html.contains("name=\"from\" value=\"/tasks?view=&quot;week&quot;\""));
        assert!(html.contains("value=\"sm@example.com\""));
        assert!(!html.contains("role=\"alert\""));
    }

    #[test]
    fn login_renders_error_notice_as_alert() {
        let notice = Notice::Failed(AuthError::Rejected("<b>nope</b>".to_string()));
        let html = login(Some(&notice), "/", None);
        assert!(html.contains("role=\"alert\""));
        assert!(html.contains("&lt;b&gt;nope&lt;/b&gt;"));
    }

    #[test]
    fn workspace_greets_user() {
        let user = AuthenticatedUser {
            identifier: "sm@example.com".to_string(),
            email: Some("sm@example.com".to_string()),
            display_name: Some("Stage Manager".to_string()),
        };
        let html = workspace("Tasks", "Cues and checklists.", Some(&user));
        assert!(html.contains("Signed in as Stage Manager"));
        assert!(html.contains("action=\"/logout\""));
    }
}
