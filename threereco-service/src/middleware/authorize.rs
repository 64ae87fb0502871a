use std::sync::Arc;

use axum::{
    extract::Request,
    middleware::{from_fn, Next},
    response::Response,
    routing::MethodRouter,
};

use service_core::error::{AppError, FORBIDDEN_MESSAGE, INTERNAL_MESSAGE, UNAUTHORIZED_MESSAGE};

use super::Policies;
use crate::services::{policy, PolicyKind, Principal};

/// What a route demands of the authenticated principal.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    /// Any-of. Empty admits every authenticated principal.
    pub permissions: Vec<String>,
    pub policies: &'static [PolicyKind],
    pub requires_mfa: bool,
}

impl RouteGuard {
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
            policies: &[],
            requires_mfa: true,
        }
    }

    /// Authenticated principal, no permission needed.
    pub fn authenticated() -> Self {
        Self::new(Vec::<String>::new())
    }

    pub fn with_policies(mut self, policies: &'static [PolicyKind]) -> Self {
        self.policies = policies;
        self
    }

    /// Reachable while MFA is enabled but not yet verified.
    pub fn allow_partial_mfa(mut self) -> Self {
        self.requires_mfa = false;
        self
    }
}

/// Checks MFA completion, then permissions, then compiles the route's
/// policies into a row filter published as [`Policies`].
pub async fn authorize(guard: Arc<RouteGuard>, mut req: Request, next: Next) -> Result<Response, AppError> {
    let filter = {
        let principal = req.extensions().get::<Principal>().ok_or_else(|| {
            tracing::error!("Route guard reached without an authenticated principal");
            AppError::InternalError(anyhow::anyhow!(INTERNAL_MESSAGE))
        })?;

        if guard.requires_mfa && !principal.user.mfa_satisfied() {
            tracing::debug!(user_id = %principal.id(), "MFA verification pending");
            return Err(AppError::unauthorized(UNAUTHORIZED_MESSAGE));
        }

        if !principal.is_allowed(&guard.permissions) {
            tracing::warn!(
                user_id = %principal.id(),
                required = ?guard.permissions,
                "Insufficient permissions"
            );
            return Err(AppError::forbidden(FORBIDDEN_MESSAGE));
        }

        policy::compile(principal, guard.policies)?
    };

    req.extensions_mut().insert(Policies(filter));
    Ok(next.run(req).await)
}

/// Wraps every method currently in `route` with `guard`.
pub fn guarded<S>(route: MethodRouter<S>, guard: RouteGuard) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    let guard = Arc::new(guard);
    route.route_layer(from_fn(move |req: Request, next: Next| {
        authorize(guard.clone(), req, next)
    }))
}
