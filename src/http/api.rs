//! JSON endpoints consumed by the portal's client-side scripts.
//!
//! Responses keep the upstream envelope shape so the scripts can branch
//! on `success` the same way the handlers do.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::gateway::FilterParams;
use crate::http::guard::ApiAuthContext;
use crate::http::server::AppState;

/// Filter query accepted by the appointment endpoints.
#[derive(Debug, Deserialize, Default)]
pub struct CitasQuery {
    #[serde(default)]
    pub fecha_desde: String,
    #[serde(default)]
    pub fecha_hasta: String,
    #[serde(default)]
    pub id_especialidad: String,
    #[serde(default)]
    pub id_doctor: String,
    #[serde(default)]
    pub estado: String,
    #[serde(default)]
    pub id_sucursal: String,
    #[serde(default)]
    pub cedula_paciente: String,
    #[serde(default)]
    pub nombre_paciente: String,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl CitasQuery {
    fn filters(&self) -> FilterParams {
        vec![
            ("fecha_desde".to_string(), self.fecha_desde.clone()),
            ("fecha_hasta".to_string(), self.fecha_hasta.clone()),
            ("id_especialidad".to_string(), self.id_especialidad.clone()),
            ("id_doctor".to_string(), self.id_doctor.clone()),
            ("estado".to_string(), self.estado.clone()),
            ("id_sucursal".to_string(), self.id_sucursal.clone()),
            ("cedula_paciente".to_string(), self.cedula_paciente.clone()),
            ("nombre_paciente".to_string(), self.nombre_paciente.clone()),
            ("page".to_string(), self.page.unwrap_or(1).to_string()),
            (
                "per_page".to_string(),
                self.per_page.unwrap_or(20).to_string(),
            ),
        ]
    }

    /// Subset accepted by the doctor-scoped endpoint.
    fn doctor_filters(&self) -> FilterParams {
        vec![
            ("fecha_desde".to_string(), self.fecha_desde.clone()),
            ("fecha_hasta".to_string(), self.fecha_hasta.clone()),
            ("estado".to_string(), self.estado.clone()),
            ("cedula_paciente".to_string(), self.cedula_paciente.clone()),
            ("nombre_paciente".to_string(), self.nombre_paciente.clone()),
            ("page".to_string(), self.page.unwrap_or(1).to_string()),
            (
                "per_page".to_string(),
                self.per_page.unwrap_or(20).to_string(),
            ),
        ]
    }
}

/// Doctors of one specialty, reshaped for the filter dropdowns.
pub async fn doctores_por_especialidad(
    State(state): State<AppState>,
    ctx: ApiAuthContext,
    Path(id_especialidad): Path<i64>,
) -> Response {
    let result = state
        .gateway
        .doctors_by_specialty(&ctx.session.upstream(), id_especialidad)
        .await;

    if result.success {
        let doctores: Vec<Value> = result
            .data
            .as_array()
            .map(|doctors| {
                doctors
                    .iter()
                    .map(|doctor| {
                        let nombres = doctor.get("nombres").and_then(Value::as_str).unwrap_or("");
                        let apellidos =
                            doctor.get("apellidos").and_then(Value::as_str).unwrap_or("");
                        json!({
                            "id_doctor": doctor.get("id_doctor"),
                            "nombre_completo": format!("{nombres} {apellidos}").trim(),
                            "titulo_profesional": doctor
                                .get("titulo_profesional")
                                .and_then(Value::as_str)
                                .unwrap_or(""),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Json(json!({ "success": true, "doctores": doctores })).into_response()
    } else {
        let message = if result.message.is_empty() {
            "Error obteniendo doctores".to_string()
        } else {
            result.message
        };
        Json(json!({ "success": false, "message": message, "doctores": [] })).into_response()
    }
}

/// Full detail of one appointment.
pub async fn detalle_cita(
    State(state): State<AppState>,
    ctx: ApiAuthContext,
    Path(id_cita): Path<i64>,
) -> Response {
    let result = state
        .gateway
        .appointment_detail(&ctx.session.upstream(), id_cita)
        .await;

    if result.success {
        Json(json!({ "success": true, "detalle": result.data })).into_response()
    } else {
        let message = if result.message.is_empty() {
            "Error obteniendo detalle de cita".to_string()
        } else {
            result.message
        };
        Json(json!({ "success": false, "message": message })).into_response()
    }
}

/// General appointment query with the full filter set.
pub async fn consulta_general_citas(
    State(state): State<AppState>,
    ctx: ApiAuthContext,
    Query(query): Query<CitasQuery>,
) -> Response {
    tracing::info!(correo = %ctx.user.correo, "general appointment query");

    let result = state
        .gateway
        .query_appointments_general(&ctx.session.upstream(), query.filters())
        .await;

    if result.success {
        Json(result).into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(result)).into_response()
    }
}

/// The logged-in doctor's own appointments.
pub async fn mis_citas_medico(
    State(state): State<AppState>,
    ctx: ApiAuthContext,
    Query(query): Query<CitasQuery>,
) -> Response {
    let Some(id_doctor) = ctx.user.id_doctor.filter(|_| ctx.user.is_doctor()) else {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "success": false,
                "message": "Solo los médicos pueden acceder a esta función"
            })),
        )
            .into_response();
    };

    tracing::info!(id_doctor, "doctor appointment query");

    let result = state
        .gateway
        .my_appointments(&ctx.session.upstream(), id_doctor, query.doctor_filters())
        .await;

    if result.success {
        Json(result).into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(result)).into_response()
    }
}
