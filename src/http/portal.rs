//! Protected portal pages: dashboard, profile, clinical history and the
//! appointment search views.

use axum::extract::{Form, State};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use serde_json::Value;

use crate::gateway::{ApiGateway, FilterParams, UpstreamCookies};
use crate::http::guard::AuthContext;
use crate::http::pages::{self, FilterOptions, HistorialResults};
use crate::http::server::AppState;
use crate::session::NoticeLevel;

pub async fn dashboard(ctx: AuthContext) -> Response {
    tracing::info!(correo = %ctx.user.correo, "dashboard access");
    let notices = ctx.session.take_notices();
    ctx.session
        .attach(pages::dashboard_page(&notices, &ctx.user).into_response())
}

pub async fn profile(ctx: AuthContext) -> Response {
    tracing::info!(correo = %ctx.user.correo, "profile access");
    let notices = ctx.session.take_notices();
    ctx.session
        .attach(pages::profile_page(&notices, &ctx.user).into_response())
}

/// Load the option lists for the filter forms. Failures degrade to empty
/// lists; the page stays usable without them.
async fn load_filter_options(
    gateway: &ApiGateway,
    upstream: &UpstreamCookies,
    id_especialidad: Option<i64>,
) -> FilterOptions {
    let especialidades = gateway.specialties(upstream).await;
    let sucursales = gateway.branches(upstream).await;

    let doctores = match id_especialidad {
        Some(id) => gateway
            .doctors_by_specialty(upstream, id)
            .await
            .data
            .as_array()
            .cloned()
            .unwrap_or_default(),
        None => Vec::new(),
    };

    FilterOptions {
        especialidades: especialidades.data.as_array().cloned().unwrap_or_default(),
        sucursales: sucursales.data.as_array().cloned().unwrap_or_default(),
        doctores,
    }
}

// ---- clinical history -----------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct HistorialForm {
    #[serde(default)]
    pub cedula: String,
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
}

impl HistorialForm {
    fn filters(&self) -> FilterParams {
        vec![
            ("fecha_desde".to_string(), self.fecha_desde.clone()),
            ("fecha_hasta".to_string(), self.fecha_hasta.clone()),
            ("id_especialidad".to_string(), self.id_especialidad.clone()),
            ("id_doctor".to_string(), self.id_doctor.clone()),
            ("estado".to_string(), self.estado.clone()),
            ("id_sucursal".to_string(), self.id_sucursal.clone()),
        ]
    }
}

pub async fn historial_form(State(state): State<AppState>, ctx: AuthContext) -> Response {
    tracing::info!(correo = %ctx.user.correo, "clinical history access");
    let upstream = ctx.session.upstream();
    let options = load_filter_options(&state.gateway, &upstream, None).await;
    let notices = ctx.session.take_notices();
    ctx.session
        .attach(pages::historial_page(&notices, &ctx.user, &options, None).into_response())
}

pub async fn historial_submit(
    State(state): State<AppState>,
    ctx: AuthContext,
    Form(form): Form<HistorialForm>,
) -> Response {
    let AuthContext { user, session } = ctx;
    let cedula = form.cedula.trim().to_string();

    if cedula.is_empty() {
        session.flash(NoticeLevel::Error, "La cédula es requerida");
        return session.attach(Redirect::to("/historial-clinico").into_response());
    }

    let upstream = session.upstream();
    tracing::info!(cedula = %cedula, "clinical history search");

    // Step 1: the patient must exist before we query history.
    let paciente_result = state
        .gateway
        .find_patient_by_national_id(&upstream, &cedula)
        .await;
    if !paciente_result.success {
        let message = if paciente_result.message.is_empty() {
            "Paciente no encontrado".to_string()
        } else {
            paciente_result.message
        };
        session.flash(NoticeLevel::Error, message);
        return session.attach(Redirect::to("/historial-clinico").into_response());
    }

    // Step 2: history with the requested filters.
    let historial_result = state
        .gateway
        .clinical_history_filtered(&upstream, &cedula, form.filters())
        .await;
    if !historial_result.success {
        let message = if historial_result.message.is_empty() {
            "Error obteniendo historial clínico".to_string()
        } else {
            historial_result.message
        };
        session.flash(NoticeLevel::Error, message);
        return session.attach(Redirect::to("/historial-clinico").into_response());
    }

    let id_especialidad = form.id_especialidad.parse::<i64>().ok();
    let options = load_filter_options(&state.gateway, &upstream, id_especialidad).await;

    let paciente = paciente_result
        .data
        .get("paciente")
        .cloned()
        .unwrap_or(Value::Null);
    let citas = historial_result
        .data
        .get("citas")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let estadisticas = historial_result
        .data
        .get("estadisticas")
        .cloned()
        .unwrap_or(Value::Null);

    tracing::info!(cedula = %cedula, citas = citas.len(), "clinical history found");

    let results = HistorialResults {
        cedula,
        paciente,
        citas,
        estadisticas,
    };
    let notices = session.take_notices();
    session.attach(
        pages::historial_page(&notices, &user, &options, Some(&results)).into_response(),
    )
}

// ---- appointment search pages ---------------------------------------------

pub async fn consulta_citas(State(state): State<AppState>, ctx: AuthContext) -> Response {
    tracing::info!(correo = %ctx.user.correo, "appointment query access");
    let upstream = ctx.session.upstream();
    let options = load_filter_options(&state.gateway, &upstream, None).await;
    let notices = ctx.session.take_notices();
    ctx.session
        .attach(pages::consulta_citas_page(&notices, &ctx.user, &options).into_response())
}

pub async fn mis_citas(ctx: AuthContext) -> Response {
    let AuthContext { user, session } = ctx;

    // Role check before any data is touched.
    if !user.is_doctor() {
        session.flash(
            NoticeLevel::Error,
            "Solo los médicos pueden acceder a esta sección",
        );
        return session.attach(Redirect::to("/").into_response());
    }

    tracing::info!(
        id_doctor = user.id_doctor,
        nombre = ?user.nombre_completo,
        "doctor appointments access"
    );
    let notices = session.take_notices();
    session.attach(pages::mis_citas_page(&notices, &user).into_response())
}
