use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use service_core::error::{AppError, UNAUTHORIZED_MESSAGE};

use crate::services::Principal;
use crate::store::{AuditScope, Filter, Store, StoreError, Transaction};

/// Row filter compiled for the current route.
#[derive(Debug, Clone)]
pub struct Policies(pub Filter);

/// Everything a handler learns about the caller.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub principal: Principal,
    pub policies: Filter,
}

impl RequestContext {
    pub fn user_id(&self) -> Uuid {
        self.principal.id()
    }

    /// Opens a transaction whose mutations are attributed to the caller.
    pub async fn begin(&self, store: &dyn Store) -> Result<Box<dyn Transaction>, StoreError> {
        store.begin(AuditScope::acting(self.user_id())).await
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized(UNAUTHORIZED_MESSAGE))?;

        let policies = parts
            .extensions
            .get::<Policies>()
            .map(|p| p.0.clone())
            .unwrap_or(Filter::True);

        Ok(Self {
            principal,
            policies,
        })
    }
}
