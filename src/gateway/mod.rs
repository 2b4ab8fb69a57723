//! Upstream API gateway subsystem.
//!
//! # Data Flow
//! ```text
//! handler (with the caller's session)
//!     → client.rs (build request, attach session's upstream cookies)
//!     → MediSys API over HTTPS
//!     → client.rs (merge Set-Cookie, normalize status/body)
//!     → envelope.rs (uniform {success, message, data, code?, timestamp?})
//!     → handler branches on `success`
//! ```

pub mod client;
pub mod cookies;
pub mod envelope;

pub use client::{ApiGateway, FilterParams};
pub use cookies::UpstreamCookies;
pub use envelope::{ApiEnvelope, LoginData, TransportError, UserProfile};
