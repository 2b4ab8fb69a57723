//! The normalized result envelope every gateway call returns.
//!
//! # Responsibilities
//! - Round-trip the backend's `{success, message, data, code?, timestamp?}` shape
//! - Synthesize failure envelopes for transport and format errors
//! - Classify transport failures into a tagged error before rendering them
//!
//! # Design Decisions
//! - `success == true` iff the backend returned HTTP 200 AND its own
//!   success flag was true; everything else is a failure envelope
//! - Backend-provided messages are carried verbatim (they are the
//!   user-visible security signal on lockouts)
//! - List-returning operations normalize failure data to `[]`, not null

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fixed user-facing message for an upstream call that timed out.
pub const MSG_TIMEOUT: &str = "Tiempo de espera agotado. Intente nuevamente.";

/// Fixed user-facing message for a failed connection to the upstream.
pub const MSG_CONNECTION: &str = "Error de conexión con el servidor. Verifique su conexión.";

/// Fixed user-facing message for a 200 response whose body was not valid JSON.
pub const MSG_FORMAT: &str = "Error de formato en la respuesta del servidor";

/// Normalized response shape for every upstream operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub message: String,

    /// Opaque payload, shape defined by the backend endpoint. Null when absent.
    #[serde(default)]
    pub data: Value,

    /// HTTP status code, present on error envelopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,

    /// Backend-provided timestamp, passed through when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ApiEnvelope {
    /// Failure envelope with a message and no payload.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Value::Null,
            code: None,
            timestamp: None,
        }
    }

    /// Failure envelope for a non-200 status whose body was not parseable.
    pub fn server_error(status: u16) -> Self {
        let mut envelope = Self::failure(format!("Error del servidor (Código: {status})"));
        envelope.code = Some(status);
        envelope
    }

    /// Replace a null failure payload with an empty list, so callers that
    /// iterate the payload never need to branch on null.
    pub fn with_empty_list_fallback(mut self) -> Self {
        if !self.success && self.data.is_null() {
            self.data = Value::Array(Vec::new());
        }
        self
    }

    /// Deserialize the payload into a typed shape, when the schema is known.
    pub fn decode_data<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.data.clone()).ok()
    }
}

impl From<TransportError> for ApiEnvelope {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => ApiEnvelope::failure(MSG_TIMEOUT),
            TransportError::Connect => ApiEnvelope::failure(MSG_CONNECTION),
            TransportError::Format => ApiEnvelope::failure(MSG_FORMAT),
            TransportError::Other(detail) => {
                ApiEnvelope::failure(format!("Error inesperado: {detail}"))
            }
        }
    }
}

/// Classification of an upstream call that never produced a usable envelope.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed")]
    Connect,

    #[error("response body was not valid JSON")]
    Format,

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Payload of a successful login response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub usuario: UserProfile,
}

/// Backend-provided user attributes stored in the session record.
///
/// Only the fields the portal branches on are typed; anything else the
/// backend sends is preserved in `extra` and rendered opaquely.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserProfile {
    #[serde(default)]
    pub id_usuario: Option<i64>,

    #[serde(default)]
    pub correo: String,

    #[serde(default)]
    pub nombres: Option<String>,

    #[serde(default)]
    pub apellidos: Option<String>,

    #[serde(default)]
    pub rol: Option<String>,

    #[serde(default)]
    pub tipo_usuario: Option<String>,

    #[serde(default)]
    pub id_doctor: Option<i64>,

    #[serde(default)]
    pub nombre_completo: Option<String>,

    #[serde(default)]
    pub especialidad: Option<String>,

    #[serde(default)]
    pub requiere_cambio_password: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// True when this profile may use doctor-only views.
    pub fn is_doctor(&self) -> bool {
        self.tipo_usuario.as_deref() == Some("doctor") && self.id_doctor.is_some()
    }

    /// Display name for greetings, falling back to a generic label.
    pub fn display_name(&self) -> &str {
        self.nombres.as_deref().unwrap_or("Usuario")
    }
}
