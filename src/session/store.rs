//! In-memory browser session store.
//!
//! # Responsibilities
//! - Hold one record per browser, keyed by an opaque UUID cookie value
//! - Carry the backend-provided user profile and the authenticated flag
//! - Queue one-shot page notices (flash messages)
//! - Evict records idle past the configured TTL
//!
//! # Design Decisions
//! - Records are mutated through short closures; guards are never held
//!   across await points
//! - Each record owns its upstream cookie jar, so the backend's
//!   attempt-tracking cookies stay scoped to one browser

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::gateway::{UpstreamCookies, UserProfile};

/// Severity of a one-shot page notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    /// CSS class suffix used when rendering.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// A one-shot notice shown on the next rendered page.
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// Per-browser session state.
#[derive(Debug)]
pub struct SessionRecord {
    /// Backend-provided user attributes; present while pending a forced
    /// password change as well as when fully logged in.
    pub user: Option<UserProfile>,

    /// True only after a completed login.
    pub is_authenticated: bool,

    /// Queued one-shot notices, drained on next render.
    pub flash: Vec<Notice>,

    /// Upstream cookie jar for this browser's API identity.
    pub upstream: Arc<UpstreamCookies>,

    touched_at: Instant,
}

impl SessionRecord {
    fn new() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            flash: Vec::new(),
            upstream: Arc::new(UpstreamCookies::new()),
            touched_at: Instant::now(),
        }
    }
}

/// Concurrent session store shared across request handlers.
pub struct SessionStore {
    records: DashMap<String, SessionRecord>,
    ttl: Duration,
    cookie_name: String,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            records: DashMap::new(),
            ttl: Duration::from_secs(config.ttl_secs),
            cookie_name: config.cookie_name.clone(),
        }
    }

    /// Name of the browser cookie carrying the session id.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Create a fresh anonymous session and return its id.
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.records.insert(id.clone(), SessionRecord::new());
        id
    }

    /// True when a record exists for this id.
    pub fn exists(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Run `f` against the record, refreshing its idle timer.
    ///
    /// Returns None when the id is unknown (expired or forged cookie).
    pub fn with_record<T>(&self, id: &str, f: impl FnOnce(&mut SessionRecord) -> T) -> Option<T> {
        let mut entry = self.records.get_mut(id)?;
        entry.touched_at = Instant::now();
        Some(f(&mut entry))
    }

    /// Destroy a session entirely.
    pub fn destroy(&self, id: &str) {
        self.records.remove(id);
    }

    /// Evict records idle past the TTL. Returns the eviction count.
    pub fn sweep(&self) -> usize {
        let ttl = self.ttl;
        let before = self.records.len();
        self.records
            .retain(|_, record| record.touched_at.elapsed() < ttl);
        before - self.records.len()
    }

    /// Interval at which the background sweeper should run.
    pub fn sweep_interval(&self) -> Duration {
        (self.ttl / 10).max(Duration::from_secs(30))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.len()
    }
}
