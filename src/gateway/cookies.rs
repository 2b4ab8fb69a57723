//! Per-session upstream cookie jar.
//!
//! # Responsibilities
//! - Merge `Set-Cookie` response headers into a name→value store
//! - Render the store as a single `Cookie` request header
//!
//! # Design Decisions
//! - The jar is scoped to one browser session, never to the process.
//!   The backend tracks login attempts through these cookies, so two
//!   browsers must never share a jar.
//! - Connection pooling stays on the shared reqwest client; cookie
//!   identity lives here. The two concerns are separated on purpose.
//! - Only name and value are kept. Expiry and path attributes are the
//!   backend's concern; an empty value removes the cookie.

use std::collections::BTreeMap;
use std::sync::Mutex;

/// Cookie store for one browser session's upstream identity.
#[derive(Debug, Default)]
pub struct UpstreamCookies {
    inner: Mutex<BTreeMap<String, String>>,
}

impl UpstreamCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every `Set-Cookie` header of a response into the jar.
    pub fn merge_response(&self, headers: &reqwest::header::HeaderMap) {
        let mut inner = self.inner.lock().expect("cookie jar poisoned");
        for value in headers.get_all(reqwest::header::SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let Some((name, value)) = parse_set_cookie(raw) else {
                continue;
            };
            if value.is_empty() {
                inner.remove(&name);
            } else {
                inner.insert(name, value);
            }
        }
    }

    /// Render the jar as a `Cookie` header value, or None when empty.
    pub fn header_value(&self) -> Option<String> {
        let inner = self.inner.lock().expect("cookie jar poisoned");
        if inner.is_empty() {
            return None;
        }
        Some(
            inner
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Drop every stored cookie.
    pub fn clear(&self) {
        self.inner.lock().expect("cookie jar poisoned").clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

/// Extract the cookie-pair from a `Set-Cookie` header, ignoring attributes.
fn parse_set_cookie(raw: &str) -> Option<(String, String)> {
    let pair = raw.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}
