//! Workspace sections. Pages here only run after the route gate let the
//! request through.

use super::page;
use crate::auth::AuthenticatedUser;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{Html, IntoResponse},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Overview,
    Projects,
    Files,
    Practice,
    Tasks,
    Schedule,
}

impl Section {
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Projects => "Projects",
            Self::Files => "Files",
            Self::Practice => "Practice",
            Self::Tasks => "Tasks",
            Self::Schedule => "Schedule",
        }
    }

    #[must_use]
    pub const fn summary(self) -> &'static str {
        match self {
            Self::Overview => "Everything happening across your productions.",
            Self::Projects => "Productions in development, rehearsal and performance.",
            Self::Files => "Scripts, scores and design documents.",
            Self::Practice => "Rehearsal and practice sessions.",
            Self::Tasks => "Cues, checklists and assignments.",
            Self::Schedule => "Calls, rehearsals and show dates.",
        }
    }
}

fn render(section: Section, user: Option<Extension<AuthenticatedUser>>) -> Html<String> {
    let user = user.map(|Extension(user)| user);
    Html(page::workspace(section.title(), section.summary(), user.as_ref()))
}

pub async fn overview(user: Option<Extension<AuthenticatedUser>>) -> Html<String> {
    render(Section::Overview, user)
}

pub async fn projects(user: Option<Extension<AuthenticatedUser>>) -> Html<String> {
    render(Section::Projects, user)
}

pub async fn files(user: Option<Extension<AuthenticatedUser>>) -> Html<String> {
    render(Section::Files, user)
}

pub async fn practice(user: Option<Extension<AuthenticatedUser>>) -> Html<String> {
    render(Section::Practice, user)
}

pub async fn tasks(user: Option<Extension<AuthenticatedUser>>) -> Html<String> {
    render(Section::Tasks, user)
}

pub async fn schedule(user: Option<Extension<AuthenticatedUser>>) -> Html<String> {
    render(Section::Schedule, user)
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(page::not_found()))
}
