//! Outbound client for the MediSys API.
//!
//! # Responsibilities
//! - Single point of outbound communication with the upstream API
//! - Uniform normalization of every response into an [`ApiEnvelope`]
//! - Upstream cookie continuity per browser session
//!
//! # Design Decisions
//! - Fixed per-call timeout (config, default 15 s); no retries. Every
//!   failure is a terminal envelope for that call.
//! - The reqwest client is shared for connection pooling only and is
//!   built without a cookie store; cookie identity travels in the
//!   caller's [`UpstreamCookies`].
//! - Empty filter values are stripped before transmission.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Value};

use crate::config::ApiConfig;
use crate::gateway::cookies::UpstreamCookies;
use crate::gateway::envelope::{ApiEnvelope, TransportError};
use crate::observability::metrics;

/// Filter criteria sent as query parameters. Empty values are stripped.
pub type FilterParams = Vec<(String, String)>;

/// Stateless handle on the upstream API. Cheap to clone.
#[derive(Clone)]
pub struct ApiGateway {
    client: reqwest::Client,
    base_url: String,
}

impl ApiGateway {
    /// Build a gateway from the API section of the config.
    pub fn new(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .user_agent(config.client_id.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ---- authentication -------------------------------------------------

    pub async fn login(
        &self,
        cookies: &UpstreamCookies,
        correo: &str,
        password: &str,
    ) -> ApiEnvelope {
        let body = json!({ "correo": correo, "password": password });
        let req = self.client.post(self.url("/auth/login")).json(&body);
        self.execute("login", req, cookies).await
    }

    pub async fn send_temporary_password(
        &self,
        cookies: &UpstreamCookies,
        correo: &str,
    ) -> ApiEnvelope {
        let body = json!({ "correo": correo });
        let req = self
            .client
            .post(self.url("/auth/enviar-clave-temporal"))
            .json(&body);
        self.execute("send_temporary_password", req, cookies).await
    }

    pub async fn change_temporary_password(
        &self,
        cookies: &UpstreamCookies,
        correo: &str,
        password_actual: &str,
        password_nueva: &str,
        confirmar_password: &str,
    ) -> ApiEnvelope {
        let body = json!({
            "correo": correo,
            "password_actual": password_actual,
            "password_nueva": password_nueva,
            "confirmar_password": confirmar_password,
        });
        let req = self
            .client
            .post(self.url("/auth/change-password"))
            .json(&body);
        self.execute("change_temporary_password", req, cookies)
            .await
    }

    pub async fn change_logged_in_password(
        &self,
        cookies: &UpstreamCookies,
        id_usuario: i64,
        password_actual: &str,
        password_nueva: &str,
        confirmar_password: &str,
    ) -> ApiEnvelope {
        let body = json!({
            "id_usuario": id_usuario,
            "password_actual": password_actual,
            "password_nueva": password_nueva,
            "confirmar_password": confirmar_password,
        });
        let req = self
            .client
            .post(self.url("/auth/change-password-logged"))
            .json(&body);
        self.execute("change_logged_in_password", req, cookies)
            .await
    }

    // ---- clinical history & patients ------------------------------------

    pub async fn clinical_history(
        &self,
        cookies: &UpstreamCookies,
        cedula: &str,
    ) -> ApiEnvelope {
        let req = self
            .client
            .get(self.url(&format!("/historial/paciente/{cedula}")));
        self.execute("clinical_history", req, cookies).await
    }

    pub async fn clinical_history_filtered(
        &self,
        cookies: &UpstreamCookies,
        cedula: &str,
        filters: FilterParams,
    ) -> ApiEnvelope {
        let req = self
            .client
            .get(self.url(&format!("/historial/{cedula}/filtros")))
            .query(&strip_empty(filters));
        self.execute("clinical_history_filtered", req, cookies)
            .await
    }

    pub async fn find_patient_by_national_id(
        &self,
        cookies: &UpstreamCookies,
        cedula: &str,
    ) -> ApiEnvelope {
        let req = self
            .client
            .get(self.url(&format!("/pacientes/buscar/{cedula}")));
        self.execute("find_patient_by_national_id", req, cookies)
            .await
    }

    // ---- appointments ----------------------------------------------------

    pub async fn appointment_detail(
        &self,
        cookies: &UpstreamCookies,
        id_cita: i64,
    ) -> ApiEnvelope {
        let req = self
            .client
            .get(self.url(&format!("/citas/{id_cita}/detalle")));
        self.execute("appointment_detail", req, cookies).await
    }

    pub async fn query_appointments_general(
        &self,
        cookies: &UpstreamCookies,
        filters: FilterParams,
    ) -> ApiEnvelope {
        let req = self
            .client
            .get(self.url("/citas/consulta-general"))
            .query(&strip_empty(filters));
        self.execute("query_appointments_general", req, cookies)
            .await
    }

    pub async fn search_appointments_by_patient_id(
        &self,
        cookies: &UpstreamCookies,
        cedula: &str,
    ) -> ApiEnvelope {
        let filters = vec![("cedula_paciente".to_string(), cedula.to_string())];
        self.query_appointments_general(cookies, filters).await
    }

    /// General appointment statistics, derived from the consulta-general
    /// endpoint with a minimal page and re-wrapped as the envelope payload.
    pub async fn appointment_statistics(&self, cookies: &UpstreamCookies) -> ApiEnvelope {
        let filters = vec![("per_page".to_string(), "1".to_string())];
        let result = self.query_appointments_general(cookies, filters).await;
        if !result.success {
            return result;
        }
        let estadisticas = result
            .data
            .get("estadisticas")
            .cloned()
            .unwrap_or(Value::Null);
        ApiEnvelope {
            success: true,
            message: "Estadísticas obtenidas exitosamente".to_string(),
            data: estadisticas,
            code: None,
            timestamp: None,
        }
    }

    pub async fn my_appointments(
        &self,
        cookies: &UpstreamCookies,
        id_doctor: i64,
        filters: FilterParams,
    ) -> ApiEnvelope {
        let mut params = vec![("id_doctor".to_string(), id_doctor.to_string())];
        params.extend(filters);
        let req = self
            .client
            .get(self.url("/citas/mis-citas"))
            .query(&strip_empty(params));
        self.execute("my_appointments", req, cookies).await
    }

    pub async fn search_appointments_by_date_range_and_doctor(
        &self,
        cookies: &UpstreamCookies,
        fecha_inicio: &str,
        fecha_fin: &str,
        cedula_medico: &str,
        filters: FilterParams,
    ) -> ApiEnvelope {
        let mut body = serde_json::Map::new();
        body.insert("fecha_inicio".into(), json!(fecha_inicio));
        body.insert("fecha_fin".into(), json!(fecha_fin));
        body.insert("cedula_medico".into(), json!(cedula_medico));
        for (key, value) in strip_empty(filters) {
            body.insert(key, json!(value));
        }
        let req = self
            .client
            .post(self.url("/citas/rango-fechas-medico-cedula"))
            .json(&Value::Object(body));
        self.execute("search_appointments_by_date_range_and_doctor", req, cookies)
            .await
    }

    // ---- filter options (list fallback) ----------------------------------

    pub async fn specialties(&self, cookies: &UpstreamCookies) -> ApiEnvelope {
        let req = self.client.get(self.url("/especialidades"));
        self.execute("specialties", req, cookies)
            .await
            .with_empty_list_fallback()
    }

    pub async fn doctors_by_specialty(
        &self,
        cookies: &UpstreamCookies,
        id_especialidad: i64,
    ) -> ApiEnvelope {
        let req = self
            .client
            .get(self.url(&format!("/doctores/especialidad/{id_especialidad}")));
        self.execute("doctors_by_specialty", req, cookies)
            .await
            .with_empty_list_fallback()
    }

    pub async fn branches(&self, cookies: &UpstreamCookies) -> ApiEnvelope {
        let req = self.client.get(self.url("/sucursales"));
        self.execute("branches", req, cookies)
            .await
            .with_empty_list_fallback()
    }

    // ---- normalization ----------------------------------------------------

    /// Issue a request and normalize whatever comes back.
    ///
    /// The contract, applied uniformly to every operation:
    /// timeout / connection / unexpected transport errors become fixed
    /// failure envelopes; a 200 body is trusted as the envelope itself
    /// (a malformed one is a format error, not a business failure); any
    /// other status carries through a parseable error body verbatim and
    /// synthesizes a generic message otherwise.
    async fn execute(
        &self,
        operation: &'static str,
        req: RequestBuilder,
        cookies: &UpstreamCookies,
    ) -> ApiEnvelope {
        let start = Instant::now();

        let req = match cookies.header_value() {
            Some(value) => req.header(COOKIE, value),
            None => req,
        };

        let envelope = match req.send().await {
            Ok(response) => {
                cookies.merge_response(response.headers());
                let status = response.status();
                match response.text().await {
                    Ok(body) => Self::normalize(status, &body),
                    Err(e) => TransportError::from(e).into(),
                }
            }
            Err(e) => {
                let err = TransportError::from(e);
                tracing::warn!(operation, error = %err, "upstream call failed");
                err.into()
            }
        };

        tracing::debug!(
            operation,
            success = envelope.success,
            code = envelope.code,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "upstream call normalized"
        );
        metrics::record_gateway_call(operation, envelope.success, start.elapsed());

        envelope
    }

    fn normalize(status: StatusCode, body: &str) -> ApiEnvelope {
        if status == StatusCode::OK {
            // Trust the backend's own envelope on 200.
            return match serde_json::from_str::<ApiEnvelope>(body) {
                Ok(envelope) => envelope,
                Err(_) => TransportError::Format.into(),
            };
        }

        match serde_json::from_str::<Value>(body) {
            Ok(error_body) => ApiEnvelope {
                success: false,
                message: error_body
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        format!("Error del servidor (Código: {})", status.as_u16())
                    }),
                data: error_body.get("data").cloned().unwrap_or(Value::Null),
                code: Some(status.as_u16()),
                timestamp: error_body
                    .get("timestamp")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            Err(_) => ApiEnvelope::server_error(status.as_u16()),
        }
    }
}

/// Drop filter entries with empty values before transmission.
fn strip_empty(filters: FilterParams) -> FilterParams {
    filters.into_iter().filter(|(_, v)| !v.is_empty()).collect()
}
