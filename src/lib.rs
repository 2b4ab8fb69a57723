//! MediSys Portal (v1)
//!
//! A server-rendered web front-end for the MediSys clinical backend,
//! built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 MEDISYS PORTAL                │
//!                        │                                               │
//!     Browser Request    │  ┌─────────┐   ┌─────────┐   ┌────────────┐  │
//!     ───────────────────┼─▶│  http   │──▶│  guard  │──▶│  handlers  │  │
//!                        │  │ server  │   │(session)│   │ auth/portal│  │
//!                        │  └─────────┘   └────┬────┘   └─────┬──────┘  │
//!                        │                     │              │         │
//!                        │                     ▼              ▼         │
//!                        │              ┌───────────┐   ┌───────────┐   │
//!                        │              │  session  │   │  gateway  │───┼──── Backend
//!     Browser Response   │              │   store   │   │(API calls)│   │      API
//!     ◀──────────────────┼──────────────┤ + cookies │   └───────────┘   │
//!                        │              └───────────┘                   │
//!                        │                                               │
//!                        │  ┌─────────────────────────────────────────┐ │
//!                        │  │          Cross-Cutting Concerns          │ │
//!                        │  │  ┌────────┐ ┌─────────────┐ ┌─────────┐ │ │
//!                        │  │  │ config │ │observability│ │lifecycle│ │ │
//!                        │  │  └────────┘ └─────────────┘ └─────────┘ │ │
//!                        │  └─────────────────────────────────────────┘ │
//!                        └──────────────────────────────────────────────┘
//! ```
//!
//! The portal holds no clinical data and makes no business decisions: it
//! renders pages, keeps browser sessions, and forwards every operation to
//! the backend API, normalizing responses into one envelope shape.

// Core subsystems
pub mod config;
pub mod gateway;
pub mod http;
pub mod session;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::{load_config, ConfigError, PortalConfig};
pub use gateway::{ApiEnvelope, ApiGateway};
pub use http::{AppState, PortalServer};
pub use lifecycle::Shutdown;
