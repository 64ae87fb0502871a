use axum::Json;

use crate::services::catalogue::{PermissionGroup, CATALOGUE};

/// GET /roles/available-permissions
pub async fn available_permissions() -> Json<&'static [PermissionGroup]> {
    Json(CATALOGUE)
}
