//! Gateway behavior against a real socket backend: response
//! normalization, filter stripping and per-jar cookie continuity.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::json;

use common::{start_api_backend, BackendReply};
use medisys_portal::config::ApiConfig;
use medisys_portal::gateway::envelope::{MSG_CONNECTION, MSG_FORMAT, MSG_TIMEOUT};
use medisys_portal::gateway::{ApiGateway, UpstreamCookies};

fn gateway_for(addr: SocketAddr) -> ApiGateway {
    let config = ApiConfig {
        base_url: format!("http://{addr}"),
        ..ApiConfig::default()
    };
    ApiGateway::new(&config).unwrap()
}

#[tokio::test]
async fn success_envelope_is_trusted_as_is() {
    let (addr, _) = start_api_backend(|_| async {
        BackendReply::json(
            200,
            json!({
                "success": true,
                "message": "Login exitoso",
                "data": {"usuario": {"correo": "a@b.com"}},
                "timestamp": "2026-01-01T00:00:00Z"
            }),
        )
    })
    .await;

    let gateway = gateway_for(addr);
    let jar = UpstreamCookies::default();
    let result = gateway.login(&jar, "a@b.com", "secret").await;

    assert!(result.success);
    assert_eq!(result.message, "Login exitoso");
    assert_eq!(result.timestamp.as_deref(), Some("2026-01-01T00:00:00Z"));
}

#[tokio::test]
async fn error_status_body_passes_through_verbatim() {
    let (addr, _) = start_api_backend(|_| async {
        BackendReply::json(
            401,
            json!({
                "success": false,
                "message": "Credenciales inválidas. Le quedan 2 intentos.",
                "data": {"bloqueado": false},
                "timestamp": "2026-01-01T00:00:00Z"
            }),
        )
    })
    .await;

    let gateway = gateway_for(addr);
    let jar = UpstreamCookies::default();
    let result = gateway.login(&jar, "a@b.com", "wrong").await;

    assert!(!result.success);
    assert_eq!(result.message, "Credenciales inválidas. Le quedan 2 intentos.");
    assert_eq!(result.data, json!({"bloqueado": false}));
    assert_eq!(result.code, Some(401));
    assert_eq!(result.timestamp.as_deref(), Some("2026-01-01T00:00:00Z"));
}

#[tokio::test]
async fn timeout_yields_fixed_message() {
    let (addr, _) = start_api_backend(|_| async {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        BackendReply::json(200, json!({"success": true}))
    })
    .await;

    let config = ApiConfig {
        base_url: format!("http://{addr}"),
        timeout_secs: 1,
        ..ApiConfig::default()
    };
    let gateway = ApiGateway::new(&config).unwrap();
    let jar = UpstreamCookies::default();
    let result = gateway.specialties(&jar).await;

    assert!(!result.success);
    assert_eq!(result.message, MSG_TIMEOUT);
}

#[tokio::test]
async fn unreachable_backend_yields_connection_message() {
    // Bind then drop, so the port is known-dead.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = gateway_for(addr);
    let jar = UpstreamCookies::default();
    let result = gateway.login(&jar, "a@b.com", "secret").await;

    assert!(!result.success);
    assert_eq!(result.message, MSG_CONNECTION);
}

#[tokio::test]
async fn malformed_success_body_is_a_format_error() {
    let (addr, _) = start_api_backend(|_| async { BackendReply::raw(200, "<html>oops</html>") }).await;

    let gateway = gateway_for(addr);
    let jar = UpstreamCookies::default();
    let result = gateway.find_patient_by_national_id(&jar, "0102030405").await;

    assert!(!result.success);
    assert_eq!(result.message, MSG_FORMAT);
}

#[tokio::test]
async fn unparseable_error_body_synthesizes_coded_message() {
    let (addr, _) = start_api_backend(|_| async { BackendReply::raw(503, "Service Unavailable") }).await;

    let gateway = gateway_for(addr);
    let jar = UpstreamCookies::default();
    let result = gateway.appointment_detail(&jar, 42).await;

    assert!(!result.success);
    assert_eq!(result.message, "Error del servidor (Código: 503)");
    assert_eq!(result.code, Some(503));
}

#[tokio::test]
async fn list_operations_fall_back_to_empty_array() {
    let (addr, _) = start_api_backend(|_| async { BackendReply::raw(500, "boom") }).await;

    let gateway = gateway_for(addr);
    let jar = UpstreamCookies::default();
    let result = gateway.branches(&jar).await;

    assert!(!result.success);
    assert_eq!(result.data, json!([]));
}

#[tokio::test]
async fn empty_filter_values_are_stripped_from_the_query() {
    let (addr, captured) =
        start_api_backend(|_| async { BackendReply::json(200, json!({"success": true, "data": {}})) })
            .await;

    let gateway = gateway_for(addr);
    let jar = UpstreamCookies::default();
    let filters = vec![
        ("estado".to_string(), String::new()),
        ("id_doctor".to_string(), "4".to_string()),
        ("fecha_desde".to_string(), String::new()),
    ];
    gateway.query_appointments_general(&jar, filters).await;

    let requests = captured.lock().unwrap();
    let path = &requests[0].path;
    assert!(path.contains("id_doctor=4"), "query was {path}");
    assert!(!path.contains("estado"), "query was {path}");
    assert!(!path.contains("fecha_desde"), "query was {path}");
}

#[tokio::test]
async fn statistics_rewrap_the_general_query_payload() {
    let (addr, captured) = start_api_backend(|_| async {
        BackendReply::json(
            200,
            json!({
                "success": true,
                "message": "ok",
                "data": {"citas": [{"id_cita": 1}], "estadisticas": {"total": 5}}
            }),
        )
    })
    .await;

    let gateway = gateway_for(addr);
    let jar = UpstreamCookies::default();
    let result = gateway.appointment_statistics(&jar).await;

    assert!(result.success);
    assert_eq!(result.message, "Estadísticas obtenidas exitosamente");
    assert_eq!(result.data, json!({"total": 5}));

    let requests = captured.lock().unwrap();
    assert!(requests[0].path.starts_with("/citas/consulta-general"));
    assert!(requests[0].path.contains("per_page=1"));
}

#[tokio::test]
async fn patient_search_delegates_to_the_general_query() {
    let (addr, captured) =
        start_api_backend(|_| async { BackendReply::json(200, json!({"success": true, "data": {}})) })
            .await;

    let gateway = gateway_for(addr);
    let jar = UpstreamCookies::default();
    gateway.search_appointments_by_patient_id(&jar, "0102030405").await;
    gateway.clinical_history(&jar, "0102030405").await;

    let requests = captured.lock().unwrap();
    assert!(requests[0].path.starts_with("/citas/consulta-general"));
    assert!(requests[0].path.contains("cedula_paciente=0102030405"));
    assert_eq!(requests[1].path, "/historial/paciente/0102030405");
}

#[tokio::test]
async fn date_range_search_posts_a_json_body() {
    let (addr, captured) =
        start_api_backend(|_| async { BackendReply::json(200, json!({"success": true, "data": []})) })
            .await;

    let gateway = gateway_for(addr);
    let jar = UpstreamCookies::default();
    let filters = vec![
        ("estado".to_string(), "Confirmada".to_string()),
        ("id_sucursal".to_string(), String::new()),
    ];
    gateway
        .search_appointments_by_date_range_and_doctor(
            &jar,
            "2026-01-01",
            "2026-01-31",
            "0912345678",
            filters,
        )
        .await;

    let requests = captured.lock().unwrap();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/citas/rango-fechas-medico-cedula");
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(body["fecha_inicio"], json!("2026-01-01"));
    assert_eq!(body["fecha_fin"], json!("2026-01-31"));
    assert_eq!(body["cedula_medico"], json!("0912345678"));
    assert_eq!(body["estado"], json!("Confirmada"));
    assert!(body.get("id_sucursal").is_none());
}

#[tokio::test]
async fn upstream_cookies_stay_with_their_jar() {
    let (addr, captured) = start_api_backend(|request| async move {
        if request.path.starts_with("/auth/login") {
            BackendReply::json(200, json!({"success": true, "data": {}}))
                .with_cookie("sessionid=abc123; Path=/; HttpOnly")
        } else {
            BackendReply::json(200, json!({"success": true, "data": []}))
        }
    })
    .await;

    let gateway = gateway_for(addr);

    let jar_a = UpstreamCookies::default();
    gateway.login(&jar_a, "a@b.com", "secret").await;
    gateway.specialties(&jar_a).await;

    let jar_b = UpstreamCookies::default();
    gateway.specialties(&jar_b).await;

    let requests = captured.lock().unwrap();
    assert_eq!(requests.len(), 3);

    // Login itself carried no cookie yet.
    assert!(requests[0].header("cookie").is_none());
    // The same jar replays what login set.
    assert_eq!(requests[1].header("cookie"), Some("sessionid=abc123"));
    // A different jar shares nothing.
    assert!(requests[2].header("cookie").is_none());
}
