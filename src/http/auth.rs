//! Authentication flows: login, logout, password recovery and the two
//! password-change variants.
//!
//! All business rules (attempt counting, lockouts, password policy) live
//! in the backend; these handlers validate field presence locally, forward
//! through the gateway, and surface the backend's messages verbatim.

use axum::extract::{Form, State};
use axum::http::header::{HeaderValue, CACHE_CONTROL, EXPIRES, PRAGMA};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::gateway::{LoginData, UserProfile};
use crate::http::guard::{AuthContext, SessionHandle};
use crate::http::pages;
use crate::http::server::AppState;
use crate::session::NoticeLevel;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub correo: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    #[serde(default)]
    pub correo: String,
}

#[derive(Debug, Deserialize)]
pub struct TemporaryChangeForm {
    #[serde(default)]
    pub password_temporal: String,
    #[serde(default)]
    pub password_nueva: String,
    #[serde(default)]
    pub confirmar_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoggedChangeForm {
    #[serde(default)]
    pub password_actual: String,
    #[serde(default)]
    pub password_nueva: String,
    #[serde(default)]
    pub confirmar_password: String,
}

// ---- login ----------------------------------------------------------------

pub async fn login_form(session: SessionHandle) -> Response {
    if session.is_authenticated() {
        return session.attach(Redirect::to("/").into_response());
    }
    let notices = session.take_notices();
    session.attach(pages::login_page(&notices, "").into_response())
}

pub async fn login_submit(
    State(state): State<AppState>,
    session: SessionHandle,
    Form(form): Form<LoginForm>,
) -> Response {
    let correo = form.correo.trim().to_string();

    if correo.is_empty() || form.password.is_empty() {
        session.flash(NoticeLevel::Error, "Complete todos los campos requeridos");
        let notices = session.take_notices();
        return session.attach(pages::login_page(&notices, &correo).into_response());
    }
    if !correo.contains('@') {
        session.flash(NoticeLevel::Error, "Ingrese un formato de correo válido");
        let notices = session.take_notices();
        return session.attach(pages::login_page(&notices, &correo).into_response());
    }

    tracing::info!(correo = %correo, "login attempt");
    let result = state
        .gateway
        .login(&session.upstream(), &correo, &form.password)
        .await;

    if result.success {
        let user = result
            .decode_data::<LoginData>()
            .map(|d| d.usuario)
            .unwrap_or_else(UserProfile::default);

        if user.requiere_cambio_password {
            session.set_user(user, false);
            session.flash(
                NoticeLevel::Info,
                "Debe cambiar su contraseña temporal para continuar",
            );
            return session.attach(Redirect::to("/auth/change-password").into_response());
        }

        tracing::info!(correo = %correo, rol = ?user.rol, "login success");
        let nombres = user.display_name().to_string();
        session.set_user(user, true);
        session.flash(NoticeLevel::Success, format!("¡Bienvenido, {nombres}!"));
        session.attach(Redirect::to("/").into_response())
    } else {
        let message = if result.message.is_empty() {
            "Error de autenticación".to_string()
        } else {
            result.message.clone()
        };
        tracing::warn!(
            correo = %correo,
            code = ?result.code,
            message = %message,
            "login failed"
        );

        // The backend's message is the user-visible security signal
        // (remaining attempts, lockout duration); shown verbatim.
        session.flash(NoticeLevel::Error, message);
        let notices = session.take_notices();
        session.attach(pages::login_page(&notices, &correo).into_response())
    }
}

// ---- logout ---------------------------------------------------------------

pub async fn logout(mut session: SessionHandle) -> Response {
    if let Some(user) = session.user() {
        tracing::info!(correo = %user.correo, "logout");
    }

    session.rotate();
    session.flash(NoticeLevel::Info, "Sesión cerrada correctamente");

    let mut response = Redirect::to("/auth/login").into_response();
    let headers = response.headers_mut();
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));

    session.attach(response)
}

// ---- forgot password ------------------------------------------------------

pub async fn forgot_password_form(session: SessionHandle) -> Response {
    let notices = session.take_notices();
    session.attach(pages::forgot_password_page(&notices, "").into_response())
}

pub async fn forgot_password_submit(
    State(state): State<AppState>,
    session: SessionHandle,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    let correo = form.correo.trim().to_string();

    if correo.is_empty() {
        session.flash(NoticeLevel::Error, "El correo electrónico es requerido");
        let notices = session.take_notices();
        return session.attach(pages::forgot_password_page(&notices, &correo).into_response());
    }
    if !correo.contains('@') {
        session.flash(NoticeLevel::Error, "Ingrese un formato de correo válido");
        let notices = session.take_notices();
        return session.attach(pages::forgot_password_page(&notices, &correo).into_response());
    }

    let result = state
        .gateway
        .send_temporary_password(&session.upstream(), &correo)
        .await;
    tracing::info!(correo = %correo, success = result.success, "recovery request");

    if result.success {
        let message = result
            .data
            .get("mensaje_usuario")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("Si el correo existe, recibirás una clave temporal.")
            .to_string();
        session.flash(NoticeLevel::Success, message);
    } else {
        let message = if result.message.is_empty() {
            "Error procesando la solicitud".to_string()
        } else {
            result.message
        };
        session.flash(NoticeLevel::Error, message);
    }

    let notices = session.take_notices();
    session.attach(pages::forgot_password_page(&notices, &correo).into_response())
}

// ---- temporary password change (pending state) ----------------------------

/// The pending profile stored by a login that demanded a password change.
/// Absent (or unflagged) means this flow is not reachable.
fn pending_user(session: &SessionHandle) -> Option<UserProfile> {
    session.user().filter(|u| u.requiere_cambio_password)
}

pub async fn change_password_form(session: SessionHandle) -> Response {
    let Some(user) = pending_user(&session) else {
        session.flash(NoticeLevel::Warning, "Acceso no autorizado");
        return session.attach(Redirect::to("/auth/login").into_response());
    };
    let notices = session.take_notices();
    session.attach(pages::change_password_page(&notices, &user.correo).into_response())
}

pub async fn change_password_submit(
    State(state): State<AppState>,
    session: SessionHandle,
    Form(form): Form<TemporaryChangeForm>,
) -> Response {
    let Some(user) = pending_user(&session) else {
        return session.attach(Redirect::to("/auth/login").into_response());
    };

    let mut errors = Vec::new();
    if form.password_temporal.is_empty() {
        errors.push("La contraseña temporal es requerida");
    }
    if form.password_nueva.is_empty() {
        errors.push("La nueva contraseña es requerida");
    }
    if form.confirmar_password.is_empty() {
        errors.push("Debe confirmar la nueva contraseña");
    }
    if form.password_nueva != form.confirmar_password {
        errors.push("Las contraseñas no coinciden");
    }
    if !errors.is_empty() {
        for error in errors {
            session.flash(NoticeLevel::Error, error);
        }
        let notices = session.take_notices();
        return session
            .attach(pages::change_password_page(&notices, &user.correo).into_response());
    }

    let result = state
        .gateway
        .change_temporary_password(
            &session.upstream(),
            &user.correo,
            &form.password_temporal,
            &form.password_nueva,
            &form.confirmar_password,
        )
        .await;
    tracing::info!(correo = %user.correo, success = result.success, "temporary password change");

    if result.success {
        // Force a fresh login with the new credential.
        session.clear_user();
        session.flash(
            NoticeLevel::Success,
            "Contraseña cambiada exitosamente. Puede iniciar sesión con su nueva contraseña.",
        );
        session.attach(Redirect::to("/auth/login").into_response())
    } else {
        let message = if result.message.is_empty() {
            "Error cambiando contraseña".to_string()
        } else {
            result.message
        };
        session.flash(NoticeLevel::Error, message);
        let notices = session.take_notices();
        session.attach(pages::change_password_page(&notices, &user.correo).into_response())
    }
}

// ---- logged-in password change --------------------------------------------

pub async fn change_password_logged_form(ctx: AuthContext) -> Response {
    tracing::info!(correo = %ctx.user.correo, "change password access");
    let notices = ctx.session.take_notices();
    ctx.session
        .attach(pages::change_password_logged_page(&notices, &ctx.user).into_response())
}

pub async fn change_password_logged_submit(
    State(state): State<AppState>,
    ctx: AuthContext,
    Form(form): Form<LoggedChangeForm>,
) -> Response {
    let AuthContext { user, session } = ctx;

    let mut errors = Vec::new();
    if form.password_actual.is_empty() {
        errors.push("La contraseña actual es requerida");
    }
    if form.password_nueva.is_empty() {
        errors.push("La nueva contraseña es requerida");
    }
    if form.confirmar_password.is_empty() {
        errors.push("Debe confirmar la nueva contraseña");
    }
    if !form.password_nueva.is_empty()
        && !form.confirmar_password.is_empty()
        && form.password_nueva != form.confirmar_password
    {
        errors.push("Las contraseñas no coinciden");
    }
    if !form.password_actual.is_empty()
        && !form.password_nueva.is_empty()
        && form.password_actual == form.password_nueva
    {
        errors.push("La nueva contraseña debe ser diferente a la actual");
    }
    if !errors.is_empty() {
        for error in errors {
            session.flash(NoticeLevel::Error, error);
        }
        let notices = session.take_notices();
        return session
            .attach(pages::change_password_logged_page(&notices, &user).into_response());
    }

    let result = state
        .gateway
        .change_logged_in_password(
            &session.upstream(),
            user.id_usuario.unwrap_or_default(),
            &form.password_actual,
            &form.password_nueva,
            &form.confirmar_password,
        )
        .await;

    if result.success {
        tracing::info!(correo = %user.correo, "password changed");
        // Unlike the temporary flow, the session stays intact.
        session.flash(NoticeLevel::Success, "Contraseña cambiada exitosamente.");
        session.attach(Redirect::to("/profile").into_response())
    } else {
        let message = if result.message.is_empty() {
            "Error cambiando contraseña".to_string()
        } else {
            result.message.clone()
        };
        tracing::warn!(correo = %user.correo, message = %message, "password change failed");

        // Field-validation details arrive as a list in the payload.
        match result.data.as_array() {
            Some(details) if !details.is_empty() => {
                for detail in details {
                    let text = detail.as_str().map(str::to_string).unwrap_or_else(|| detail.to_string());
                    session.flash(NoticeLevel::Error, text);
                }
            }
            _ => session.flash(NoticeLevel::Error, message),
        }

        let notices = session.take_notices();
        session.attach(pages::change_password_logged_page(&notices, &user).into_response())
    }
}
