use axum::{
    extract::{Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use service_core::error::AppError;

use crate::services::principal;
use crate::AppState;

/// Resolves the session cookie to a principal, slides the session and
/// re-issues the cookie on the way out.
///
/// Missing, expired or orphaned sessions are `401`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = state.sessions.load(&jar).await?;
    let principal = principal::load(state.store.as_ref(), session.user_id).await?;
    let session = state.sessions.refresh(&session).await?;

    tracing::debug!(user_id = %principal.id(), "Request authenticated");

    req.extensions_mut().insert(principal);
    req.extensions_mut().insert(session.clone());

    let response = next.run(req).await;

    // Handlers that rewrite the cookie themselves (logout) win.
    let prefix = format!("{}=", state.config.session.cookie_name);
    let handler_set_cookie = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .any(|v| v.to_str().is_ok_and(|s| s.starts_with(&prefix)));
    if handler_set_cookie {
        return Ok(response);
    }

    Ok((jar.add(state.sessions.cookie(&session)), response).into_response())
}
