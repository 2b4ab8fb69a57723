//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parseable)
//! - Check the upstream base URL is a usable http(s) origin
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: PortalConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::PortalConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a valid socket address")]
    BindAddress(String),

    #[error("listener.request_timeout_secs must be greater than zero")]
    RequestTimeout,

    #[error("api.base_url '{0}' is not a valid URL: {1}")]
    BaseUrl(String, url::ParseError),

    #[error("api.base_url '{0}' must use http or https")]
    BaseUrlScheme(String),

    #[error("api.timeout_secs must be greater than zero")]
    ApiTimeout,

    #[error("session.cookie_name must be a non-empty token")]
    CookieName,

    #[error("session.ttl_secs must be greater than zero")]
    SessionTtl,

    #[error("observability.metrics_address '{0}' is not a valid socket address")]
    MetricsAddress(String),
}

/// Validate a configuration, collecting every violation.
pub fn validate_config(config: &PortalConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    match Url::parse(&config.api.base_url) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                errors.push(ValidationError::BaseUrlScheme(config.api.base_url.clone()));
            }
        }
        Err(e) => errors.push(ValidationError::BaseUrl(config.api.base_url.clone(), e)),
    }
    if config.api.timeout_secs == 0 {
        errors.push(ValidationError::ApiTimeout);
    }

    let cookie_ok = !config.session.cookie_name.is_empty()
        && config
            .session
            .cookie_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !cookie_ok {
        errors.push(ValidationError::CookieName);
    }
    if config.session.ttl_secs == 0 {
        errors.push(ValidationError::SessionTtl);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
