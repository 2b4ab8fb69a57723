//! Minimal server-side page rendering.
//!
//! No template engine: pages are small, escaped HTML strings assembled
//! here so handlers stay free of markup. Queued session notices are
//! rendered at the top of every page.

use axum::response::Html;
use serde_json::Value;

use crate::gateway::UserProfile;
use crate::session::Notice;

/// Escape text for safe interpolation into HTML.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn notices_html(notices: &[Notice]) -> String {
    notices
        .iter()
        .map(|n| {
            format!(
                "<div class=\"notice notice-{}\">{}</div>\n",
                n.level.as_str(),
                escape(&n.text)
            )
        })
        .collect()
}

fn nav_html(user: Option<&UserProfile>) -> String {
    match user {
        Some(user) => {
            let doctor_link = if user.is_doctor() {
                "<a href=\"/mis-citas\">Mis Citas</a>"
            } else {
                ""
            };
            format!(
                concat!(
                    "<nav><a href=\"/\">Dashboard</a>",
                    "<a href=\"/historial-clinico\">Historial Clínico</a>",
                    "<a href=\"/consulta-citas\">Consulta de Citas</a>",
                    "{doctor}",
                    "<a href=\"/profile\">Mi Perfil</a>",
                    "<a href=\"/auth/logout\">Cerrar Sesión</a></nav>"
                ),
                doctor = doctor_link
            )
        }
        None => String::new(),
    }
}

fn layout(title: &str, user: Option<&UserProfile>, notices: &[Notice], body: &str) -> Html<String> {
    Html(format!(
        concat!(
            "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n",
            "<meta charset=\"utf-8\">\n",
            "<title>{title} - MediSys</title>\n",
            "</head>\n<body>\n{nav}\n{notices}\n{body}\n</body>\n</html>\n"
        ),
        title = escape(title),
        nav = nav_html(user),
        notices = notices_html(notices),
        body = body
    ))
}

pub fn login_page(notices: &[Notice], correo: &str) -> Html<String> {
    let body = format!(
        concat!(
            "<h1>Iniciar Sesión</h1>\n",
            "<form method=\"post\" action=\"/auth/login\">\n",
            "<label>Correo electrónico ",
            "<input type=\"email\" name=\"correo\" value=\"{correo}\"></label>\n",
            "<label>Contraseña <input type=\"password\" name=\"password\"></label>\n",
            "<button type=\"submit\">Ingresar</button>\n",
            "</form>\n",
            "<a href=\"/auth/forgot-password\">¿Olvidó su contraseña?</a>"
        ),
        correo = escape(correo)
    );
    layout("Iniciar Sesión", None, notices, &body)
}

pub fn forgot_password_page(notices: &[Notice], correo: &str) -> Html<String> {
    let body = format!(
        concat!(
            "<h1>Recuperar Contraseña</h1>\n",
            "<form method=\"post\" action=\"/auth/forgot-password\">\n",
            "<label>Correo electrónico ",
            "<input type=\"email\" name=\"correo\" value=\"{correo}\"></label>\n",
            "<button type=\"submit\">Enviar clave temporal</button>\n",
            "</form>\n",
            "<a href=\"/auth/login\">Volver</a>"
        ),
        correo = escape(correo)
    );
    layout("Recuperar Contraseña", None, notices, &body)
}

pub fn change_password_page(notices: &[Notice], correo: &str) -> Html<String> {
    let body = format!(
        concat!(
            "<h1>Cambiar Contraseña Temporal</h1>\n",
            "<p>Cuenta: {correo}</p>\n",
            "<form method=\"post\" action=\"/auth/change-password\">\n",
            "<label>Contraseña temporal ",
            "<input type=\"password\" name=\"password_temporal\"></label>\n",
            "<label>Nueva contraseña ",
            "<input type=\"password\" name=\"password_nueva\"></label>\n",
            "<label>Confirmar contraseña ",
            "<input type=\"password\" name=\"confirmar_password\"></label>\n",
            "<button type=\"submit\">Cambiar contraseña</button>\n",
            "</form>"
        ),
        correo = escape(correo)
    );
    layout("Cambiar Contraseña", None, notices, &body)
}

pub fn change_password_logged_page(notices: &[Notice], user: &UserProfile) -> Html<String> {
    let body = concat!(
        "<h1>Cambiar Contraseña</h1>\n",
        "<form method=\"post\" action=\"/auth/change-password-logged\">\n",
        "<label>Contraseña actual ",
        "<input type=\"password\" name=\"password_actual\"></label>\n",
        "<label>Nueva contraseña ",
        "<input type=\"password\" name=\"password_nueva\"></label>\n",
        "<label>Confirmar contraseña ",
        "<input type=\"password\" name=\"confirmar_password\"></label>\n",
        "<button type=\"submit\">Cambiar contraseña</button>\n",
        "</form>"
    );
    layout("Cambiar Contraseña", Some(user), notices, body)
}

pub fn dashboard_page(notices: &[Notice], user: &UserProfile) -> Html<String> {
    let body = format!(
        concat!(
            "<h1>Dashboard</h1>\n",
            "<p>Sesión iniciada como <strong>{correo}</strong> ({rol})</p>"
        ),
        correo = escape(&user.correo),
        rol = escape(user.rol.as_deref().unwrap_or("N/A"))
    );
    layout("Dashboard", Some(user), notices, &body)
}

pub fn profile_page(notices: &[Notice], user: &UserProfile) -> Html<String> {
    let body = format!(
        concat!(
            "<h1>Mi Perfil</h1>\n<dl>\n",
            "<dt>Nombres</dt><dd>{nombres}</dd>\n",
            "<dt>Apellidos</dt><dd>{apellidos}</dd>\n",
            "<dt>Correo</dt><dd>{correo}</dd>\n",
            "<dt>Rol</dt><dd>{rol}</dd>\n",
            "</dl>\n",
            "<a href=\"/auth/change-password-logged\">Cambiar contraseña</a>"
        ),
        nombres = escape(user.nombres.as_deref().unwrap_or("-")),
        apellidos = escape(user.apellidos.as_deref().unwrap_or("-")),
        correo = escape(&user.correo),
        rol = escape(user.rol.as_deref().unwrap_or("-")),
    );
    layout("Mi Perfil", Some(user), notices, &body)
}

/// Option lists for the search filter forms.
#[derive(Debug, Default)]
pub struct FilterOptions {
    pub especialidades: Vec<Value>,
    pub sucursales: Vec<Value>,
    pub doctores: Vec<Value>,
}

/// Result block for a clinical-history search.
#[derive(Debug)]
pub struct HistorialResults {
    pub cedula: String,
    pub paciente: Value,
    pub citas: Vec<Value>,
    pub estadisticas: Value,
}

fn options_html(items: &[Value], id_key: &str, label_key: &str) -> String {
    let mut out = String::from("<option value=\"\">Todos</option>");
    for item in items {
        let id = item
            .get(id_key)
            .map(|v| v.to_string().trim_matches('"').to_string())
            .unwrap_or_default();
        let label = item
            .get(label_key)
            .and_then(Value::as_str)
            .unwrap_or("-");
        out.push_str(&format!(
            "<option value=\"{}\">{}</option>",
            escape(&id),
            escape(label)
        ));
    }
    out
}

fn value_or_dash(item: &Value, key: &str) -> String {
    match item.get(key) {
        Some(Value::String(s)) => escape(s),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => escape(&other.to_string()),
    }
}

fn citas_table(citas: &[Value]) -> String {
    let mut rows = String::new();
    for cita in citas {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            value_or_dash(cita, "fecha"),
            value_or_dash(cita, "hora"),
            value_or_dash(cita, "doctor"),
            value_or_dash(cita, "especialidad"),
            value_or_dash(cita, "estado"),
        ));
    }
    format!(
        concat!(
            "<table>\n<thead><tr><th>Fecha</th><th>Hora</th><th>Doctor</th>",
            "<th>Especialidad</th><th>Estado</th></tr></thead>\n",
            "<tbody>\n{rows}</tbody>\n</table>"
        ),
        rows = rows
    )
}

pub fn historial_page(
    notices: &[Notice],
    user: &UserProfile,
    options: &FilterOptions,
    results: Option<&HistorialResults>,
) -> Html<String> {
    let mut body = format!(
        concat!(
            "<h1>Historial Clínico</h1>\n",
            "<form method=\"post\" action=\"/historial-clinico\">\n",
            "<label>Cédula del paciente <input type=\"text\" name=\"cedula\"></label>\n",
            "<label>Desde <input type=\"date\" name=\"fecha_desde\"></label>\n",
            "<label>Hasta <input type=\"date\" name=\"fecha_hasta\"></label>\n",
            "<label>Especialidad <select name=\"id_especialidad\">{especialidades}</select></label>\n",
            "<label>Doctor <select name=\"id_doctor\">{doctores}</select></label>\n",
            "<label>Estado <input type=\"text\" name=\"estado\"></label>\n",
            "<label>Sucursal <select name=\"id_sucursal\">{sucursales}</select></label>\n",
            "<button type=\"submit\">Buscar</button>\n",
            "</form>\n"
        ),
        especialidades = options_html(&options.especialidades, "id_especialidad", "nombre"),
        doctores = options_html(&options.doctores, "id_doctor", "nombres"),
        sucursales = options_html(&options.sucursales, "id_sucursal", "nombre"),
    );

    if let Some(results) = results {
        let paciente = format!(
            "{} {}",
            value_or_dash(&results.paciente, "nombres"),
            value_or_dash(&results.paciente, "apellidos")
        );
        body.push_str(&format!(
            concat!(
                "<h2>Resultados para {cedula}</h2>\n",
                "<p>Paciente: {paciente}</p>\n",
                "<p>Total de citas: {total}</p>\n",
                "{tabla}\n"
            ),
            cedula = escape(&results.cedula),
            paciente = paciente,
            total = results.citas.len(),
            tabla = if results.citas.is_empty() {
                "<p>No se encontraron citas para los filtros aplicados</p>".to_string()
            } else {
                citas_table(&results.citas)
            }
        ));
    }

    layout("Historial Clínico", Some(user), notices, &body)
}

pub fn consulta_citas_page(
    notices: &[Notice],
    user: &UserProfile,
    options: &FilterOptions,
) -> Html<String> {
    let body = format!(
        concat!(
            "<h1>Consulta General de Citas</h1>\n",
            "<form id=\"consulta-filtros\" data-endpoint=\"/api/citas/consulta-general\">\n",
            "<label>Desde <input type=\"date\" name=\"fecha_desde\"></label>\n",
            "<label>Hasta <input type=\"date\" name=\"fecha_hasta\"></label>\n",
            "<label>Especialidad <select name=\"id_especialidad\">{especialidades}</select></label>\n",
            "<label>Sucursal <select name=\"id_sucursal\">{sucursales}</select></label>\n",
            "<label>Estado <input type=\"text\" name=\"estado\"></label>\n",
            "<label>Cédula del paciente <input type=\"text\" name=\"cedula_paciente\"></label>\n",
            "<label>Nombre del paciente <input type=\"text\" name=\"nombre_paciente\"></label>\n",
            "<button type=\"submit\">Consultar</button>\n",
            "</form>\n",
            "<div id=\"resultados\"></div>"
        ),
        especialidades = options_html(&options.especialidades, "id_especialidad", "nombre"),
        sucursales = options_html(&options.sucursales, "id_sucursal", "nombre"),
    );
    layout("Consulta General de Citas", Some(user), notices, &body)
}

pub fn mis_citas_page(notices: &[Notice], user: &UserProfile) -> Html<String> {
    let body = format!(
        concat!(
            "<h1>Mis Citas Médicas</h1>\n",
            "<p>Dr. {nombre} — {especialidad}</p>\n",
            "<form id=\"mis-citas-filtros\" data-endpoint=\"/api/mis-citas\">\n",
            "<label>Desde <input type=\"date\" name=\"fecha_desde\"></label>\n",
            "<label>Hasta <input type=\"date\" name=\"fecha_hasta\"></label>\n",
            "<label>Estado <input type=\"text\" name=\"estado\"></label>\n",
            "<label>Cédula del paciente <input type=\"text\" name=\"cedula_paciente\"></label>\n",
            "<button type=\"submit\">Consultar</button>\n",
            "</form>\n",
            "<div id=\"resultados\"></div>"
        ),
        nombre = escape(
            user.nombre_completo
                .as_deref()
                .unwrap_or_else(|| user.display_name())
        ),
        especialidad = escape(user.especialidad.as_deref().unwrap_or("-")),
    );
    layout("Mis Citas Médicas", Some(user), notices, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::NoticeLevel;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn login_page_preserves_typed_email() {
        let page = login_page(&[], "a@b.com");
        assert!(page.0.contains("value=\"a@b.com\""));
    }

    #[test]
    fn notices_are_rendered_with_level_class() {
        let notices = vec![Notice {
            level: NoticeLevel::Error,
            text: "2 intentos restantes".into(),
        }];
        let page = login_page(&notices, "");
        assert!(page.0.contains("notice-error"));
        assert!(page.0.contains("2 intentos restantes"));
    }
}
