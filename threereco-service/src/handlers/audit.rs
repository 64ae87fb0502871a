//! Read-only audit trail.

use axum::Router;

use super::resource::read_routes;
use crate::models::AuditLog;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    read_routes::<AuditLog>("/audit-logs")
}
