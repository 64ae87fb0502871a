//! Session, registration and MFA endpoints under `/authentication`.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::Value;

use service_core::error::{AppError, UNAUTHORIZED_MESSAGE};

use crate::dtos::auth::{LoginRequest, MfaVerifyRequest, RegisterRequest};
use crate::dtos::MessageResponse;
use crate::middleware::RequestContext;
use crate::models::{Organization, Role, User, UserType, ORGANIZATIONS_USERS, USERS_ROLES};
use crate::services::{mfa, principal, seed::BUSINESS_OWNER_ROLE};
use crate::store::{record, AuditScope, Filter};
use crate::utils::{password, ValidatedJson};
use crate::AppState;

fn invalid_credentials() -> AppError {
    AppError::unauthorized(UNAUTHORIZED_MESSAGE)
}

/// POST /authentication/login
///
/// Unknown email and wrong password are indistinguishable. A successful
/// login always clears `mfaVerified`.
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<Value>), AppError> {
    let email = req.email.trim().to_lowercase();

    let mut tx = state.store.begin(AuditScope::anonymous()).await?;
    let user: Option<User> = record::find_by(tx.as_mut(), &Filter::eq("email", email)).await?;
    tx.rollback().await?;

    let Some(mut user) = user else {
        password::verify_decoy(req.password).await;
        tracing::info!("Login failed: unknown email");
        return Err(invalid_credentials());
    };

    if !password::verify_blocking(req.password, user.password_hash.clone()).await? {
        tracing::info!(user_id = %user.id, "Login failed: wrong password");
        return Err(invalid_credentials());
    }

    if user.mfa_verified {
        let mut tx = state
            .store
            .begin(AuditScope::acting(user.id).ignoring_audit())
            .await?;
        user.mfa_verified = false;
        record::update(tx.as_mut(), user.clone()).await?;
        tx.commit().await?;
    }

    let session = state.sessions.create(user.id).await?;
    let principal = principal::load(state.store.as_ref(), user.id).await?;

    tracing::info!(user_id = %user.id, "Login succeeded");

    Ok((
        jar.add(state.sessions.cookie(&session)),
        Json(principal.to_json()?),
    ))
}

/// POST /authentication/logout
///
/// Succeeds whether or not a session exists.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    if let Some(cookie) = jar.get(&state.config.session.cookie_name) {
        state.sessions.destroy(cookie.value()).await?;
        tracing::info!("Session destroyed");
    }

    Ok((
        jar.add(state.sessions.removal_cookie()),
        Json(MessageResponse::new("Logged out")),
    ))
}

/// GET /authentication/check
pub async fn check(ctx: RequestContext) -> Result<Json<Value>, AppError> {
    Ok(Json(ctx.principal.to_json()?))
}

/// POST /authentication/register
///
/// Business registrations also create the organization, make it the
/// user's primary organization and grant the owner role. Every write is
/// attributed to the new user.
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<Value>), AppError> {
    if state.sessions.load(&jar).await.is_ok() {
        return Err(AppError::bad_request("Already authenticated"));
    }

    let organization = match req.user_type {
        UserType::System => {
            return Err(AppError::forbidden("System users cannot self-register"));
        }
        UserType::Collector => None,
        UserType::Business => match (req.organization_name, req.organization_domain) {
            (Some(name), Some(domain)) => Some((name, domain.trim().to_lowercase())),
            _ => {
                return Err(AppError::bad_request(
                    "organizationName and organizationDomain are required for business accounts",
                ))
            }
        },
    };

    let hash = password::hash_blocking(req.password).await?;
    let user = User::new(req.email.trim().to_lowercase(), hash, req.name, req.user_type);

    let mut tx = state.store.begin(AuditScope::acting(user.id)).await?;
    let mut user = record::insert(tx.as_mut(), user).await?;

    if let Some((name, domain)) = organization {
        let org = record::insert(tx.as_mut(), Organization::new(name, domain, Some(user.id))).await?;
        record::link(tx.as_mut(), &ORGANIZATIONS_USERS, "users", &org, user.id).await?;

        user.primary_organization_id = Some(org.id);
        user = record::update(tx.as_mut(), user).await?;

        let owner_role: Option<Role> =
            record::find_by(tx.as_mut(), &Filter::eq("name", BUSINESS_OWNER_ROLE)).await?;
        match owner_role {
            Some(role) => {
                record::link(tx.as_mut(), &USERS_ROLES, "roles", &user, role.id).await?;
            }
            None => tracing::warn!("Business Owner role missing; registration continues without it"),
        }
    }

    tx.commit().await?;

    let session = state.sessions.create(user.id).await?;
    let principal = principal::load(state.store.as_ref(), user.id).await?;

    tracing::info!(user_id = %user.id, user_type = ?user.user_type, "User registered");

    Ok((
        StatusCode::CREATED,
        jar.add(state.sessions.cookie(&session)),
        Json(principal.to_json()?),
    ))
}

/// GET /authentication/mfa/enable
///
/// Generates and stores the TOTP secret on first call, then returns the
/// provisioning QR code as PNG. Secret writes are not audited.
#[tracing::instrument(skip_all, fields(user_id = %ctx.user_id()))]
pub async fn mfa_enable(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = state
        .store
        .begin(AuditScope::acting(ctx.user_id()).ignoring_audit())
        .await?;

    let mut user: User = record::find_by(tx.as_mut(), &Filter::id(ctx.user_id()))
        .await?
        .ok_or_else(|| AppError::unauthorized(UNAUTHORIZED_MESSAGE))?;

    let secret = match &user.mfa_secret {
        Some(secret) => secret.clone(),
        None => {
            let secret = mfa::generate_secret();
            user.mfa_secret = Some(secret.clone());
            record::update(tx.as_mut(), user.clone()).await?;
            tracing::info!("MFA secret generated");
            secret
        }
    };
    tx.commit().await?;

    let uri = mfa::provisioning_uri(&state.config.mfa.issuer, &user.email, &secret);
    let png = mfa::qr_png(&uri)?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

/// POST /authentication/mfa/verify
#[tracing::instrument(skip_all, fields(user_id = %ctx.user_id()))]
pub async fn mfa_verify(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(req): ValidatedJson<MfaVerifyRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let mut tx = state
        .store
        .begin(AuditScope::acting(ctx.user_id()).ignoring_audit())
        .await?;

    let mut user: User = record::find_by(tx.as_mut(), &Filter::id(ctx.user_id()))
        .await?
        .ok_or_else(|| AppError::unauthorized(UNAUTHORIZED_MESSAGE))?;

    let secret = user.mfa_secret.clone().ok_or(mfa::MfaError::NoSecret)?;
    mfa::verify_code(&secret, &req.code, state.clock.now().timestamp())?;

    user.mark_mfa_verified();
    record::update(tx.as_mut(), user).await?;
    tx.commit().await?;

    tracing::info!("MFA verified");
    Ok(Json(MessageResponse::new("MFA verified")))
}
