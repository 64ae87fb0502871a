use serde::Deserialize;
use validator::Validate;

use crate::models::UserType;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub user_type: UserType,

    #[validate(length(min = 1, max = 255))]
    pub organization_name: Option<String>,

    #[validate(length(min = 1, max = 255))]
    pub organization_domain: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MfaVerifyRequest {
    #[validate(length(equal = 6, message = "Code must be exactly 6 digits"))]
    pub code: String,
}
