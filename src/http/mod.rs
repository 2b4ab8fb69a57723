//! HTTP subsystem: server, routes, handlers and the session guard.
//!
//! # Data Flow
//! ```text
//! Request → server (router + layers)
//!         → guard (session cookie → SessionHandle / AuthContext)
//!         → auth | portal | api handlers
//!         → gateway (backend call with the session's upstream cookies)
//!         → pages (HTML) or JSON envelope
//! ```
//!
//! # Design Decisions
//! - All authentication checks live in the guard extractors, not handlers
//! - Pages are rendered server-side; the api module only serves the
//!   page scripts, never third parties

pub mod api;
pub mod auth;
pub mod guard;
pub mod pages;
pub mod portal;
pub mod server;

pub use server::{AppState, PortalServer};
