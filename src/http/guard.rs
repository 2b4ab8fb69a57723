//! Session extraction and the authentication guard.
//!
//! # Responsibilities
//! - Resolve the browser's session record from its cookie (creating an
//!   anonymous one when absent, so pre-login upstream cookies have a home)
//! - Enforce "user data present AND authenticated" on protected routes
//!   in exactly one place
//! - Destroy invalid sessions and answer with a redirect (pages) or a
//!   JSON failure body (API routes)
//!
//! # Design Decisions
//! - "Never logged in" and "session corrupted" are indistinguishable:
//!   both destroy the session and land on the login page
//! - The guard returns a typed context (profile + session handle) so
//!   handlers never re-derive identity from raw session keys

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{request::Parts, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::gateway::{UpstreamCookies, UserProfile};
use crate::http::server::AppState;
use crate::session::{Notice, NoticeLevel, SessionStore};

/// Notice shown when a protected route is hit without a valid session.
pub const MSG_SESSION_EXPIRED: &str = "Su sesión ha expirado. Inicie sesión nuevamente.";

/// Handle on the caller's session record.
///
/// Extracting it never fails: a browser without a (valid) session cookie
/// gets a fresh anonymous record, and [`SessionHandle::attach`] sets the
/// cookie on the way out.
pub struct SessionHandle {
    id: String,
    is_new: bool,
    sessions: Arc<SessionStore>,
}

impl SessionHandle {
    fn resolve(sessions: Arc<SessionStore>, parts: &Parts) -> Self {
        let from_cookie = cookie_value(parts, sessions.cookie_name());
        match from_cookie {
            Some(id) if sessions.exists(&id) => Self {
                id,
                is_new: false,
                sessions,
            },
            _ => {
                let id = sessions.create();
                Self {
                    id,
                    is_new: true,
                    sessions,
                }
            }
        }
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.sessions
            .with_record(&self.id, |r| r.user.clone())
            .flatten()
    }

    pub fn is_authenticated(&self) -> bool {
        self.sessions
            .with_record(&self.id, |r| r.user.is_some() && r.is_authenticated)
            .unwrap_or(false)
    }

    /// Upstream cookie jar carrying this browser's API identity.
    pub fn upstream(&self) -> Arc<UpstreamCookies> {
        self.sessions
            .with_record(&self.id, |r| r.upstream.clone())
            .unwrap_or_default()
    }

    /// Store the backend profile; `authenticated` stays false for the
    /// pending-password-change state.
    pub fn set_user(&self, user: UserProfile, authenticated: bool) {
        self.sessions.with_record(&self.id, |r| {
            r.user = Some(user);
            r.is_authenticated = authenticated;
        });
    }

    /// Drop the stored profile but keep the session (temporary-password
    /// flow: the browser must log in again with the new credential).
    pub fn clear_user(&self) {
        self.sessions.with_record(&self.id, |r| {
            r.user = None;
            r.is_authenticated = false;
        });
    }

    /// Queue a one-shot notice for the next rendered page.
    pub fn flash(&self, level: NoticeLevel, text: impl Into<String>) {
        let text = text.into();
        self.sessions.with_record(&self.id, |r| {
            r.flash.push(Notice { level, text });
        });
    }

    /// Drain queued notices for rendering.
    pub fn take_notices(&self) -> Vec<Notice> {
        self.sessions
            .with_record(&self.id, |r| std::mem::take(&mut r.flash))
            .unwrap_or_default()
    }

    /// Destroy this session entirely and start a fresh anonymous one.
    pub fn rotate(&mut self) {
        self.sessions.destroy(&self.id);
        self.id = self.sessions.create();
        self.is_new = true;
    }

    /// Set the session cookie on the response when this handle minted a
    /// new session id.
    pub fn attach(&self, mut response: Response) -> Response {
        if self.is_new {
            let cookie = format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax",
                self.sessions.cookie_name(),
                self.id
            );
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }
        response
    }
}

impl FromRequestParts<AppState> for SessionHandle {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::resolve(state.sessions.clone(), parts))
    }
}

/// Authenticated page context: the guard for every protected HTML route.
pub struct AuthContext {
    pub user: UserProfile,
    pub session: SessionHandle,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let mut session = SessionHandle::resolve(state.sessions.clone(), parts);

        let user = session.user();
        if let (Some(user), true) = (user, session.is_authenticated()) {
            return Ok(Self { user, session });
        }

        tracing::warn!(path = %parts.uri.path(), "unauthenticated access, destroying session");
        session.rotate();
        session.flash(NoticeLevel::Warning, MSG_SESSION_EXPIRED);
        Err(session.attach(redirect_to_login()))
    }
}

/// Authenticated JSON context: same check, JSON failure instead of redirect.
pub struct ApiAuthContext {
    pub user: UserProfile,
    pub session: SessionHandle,
}

impl FromRequestParts<AppState> for ApiAuthContext {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = SessionHandle::resolve(state.sessions.clone(), parts);

        let user = session.user();
        if let (Some(user), true) = (user, session.is_authenticated()) {
            return Ok(Self { user, session });
        }

        tracing::warn!(path = %parts.uri.path(), "unauthenticated API access");
        Err(Json(json!({ "success": false, "message": "No autenticado" })).into_response())
    }
}

fn redirect_to_login() -> Response {
    (
        StatusCode::SEE_OTHER,
        [(LOCATION, HeaderValue::from_static("/auth/login"))],
    )
        .into_response()
}

fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    for header in parts.headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some((k, v)) = pair.trim().split_once('=') {
                if k == name {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use crate::config::SessionConfig;

    fn parts_with_cookie(cookie: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn store() -> Arc<SessionStore> {
        Arc::new(SessionStore::new(&SessionConfig::default()))
    }

    #[test]
    fn missing_cookie_creates_anonymous_session() {
        let sessions = store();
        let parts = parts_with_cookie(None);
        let handle = SessionHandle::resolve(sessions.clone(), &parts);
        assert!(handle.is_new);
        assert!(!handle.is_authenticated());
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn forged_cookie_is_replaced() {
        let sessions = store();
        let parts = parts_with_cookie(Some("portal_session=forged-id"));
        let handle = SessionHandle::resolve(sessions, &parts);
        assert!(handle.is_new);
        assert_ne!(handle.id, "forged-id");
    }

    #[test]
    fn existing_session_is_reused() {
        let sessions = store();
        let id = sessions.create();
        let cookie = format!("portal_session={id}");
        let parts = parts_with_cookie(Some(&cookie));
        let handle = SessionHandle::resolve(sessions, &parts);
        assert!(!handle.is_new);
        assert_eq!(handle.id, id);
    }

    #[test]
    fn rotate_destroys_previous_record() {
        let sessions = store();
        let id = sessions.create();
        let cookie = format!("portal_session={id}");
        let parts = parts_with_cookie(Some(&cookie));
        let mut handle = SessionHandle::resolve(sessions.clone(), &parts);

        handle.rotate();
        assert!(!sessions.exists(&id));
        assert!(sessions.exists(&handle.id));
    }
}
