use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Address;
use crate::store::{ForeignKey, JoinTable, OnDelete, Record, TableDescriptor};

pub const USERS_ROLES: JoinTable = JoinTable {
    name: "users_roles",
    left_table: "users",
    left: "user_id",
    right_table: "roles",
    right: "role_id",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    System,
    Collector,
    Business,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub job_title: Option<String>,
    pub password_hash: String,
    /// Set when the password was generated and must be replaced.
    pub password_reset: bool,
    pub mfa_secret: Option<String>,
    pub mfa_enabled: bool,
    pub mfa_verified: bool,
    pub permissions: Vec<String>,
    #[serde(rename = "type")]
    pub user_type: UserType,
    pub address: Option<Address>,
    pub id_number: Option<String>,
    pub primary_organization_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub modified_by_id: Option<Uuid>,
}

impl User {
    pub fn new(email: String, password_hash: String, name: Option<String>, user_type: UserType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            phone: None,
            image: None,
            job_title: None,
            password_hash,
            password_reset: false,
            mfa_secret: None,
            mfa_enabled: false,
            mfa_verified: false,
            permissions: Vec::new(),
            user_type,
            address: None,
            id_number: None,
            primary_organization_id: None,
            created_at: now,
            updated_at: now,
            modified_by_id: None,
        }
    }

    /// True once this session's holder has passed the TOTP check, or when
    /// MFA is not enabled at all.
    pub fn mfa_satisfied(&self) -> bool {
        !self.mfa_enabled || self.mfa_verified
    }

    /// Marks MFA as enabled and passed. Requires a stored secret.
    pub fn mark_mfa_verified(&mut self) -> bool {
        if self.mfa_secret.is_none() {
            return false;
        }
        self.mfa_enabled = true;
        self.mfa_verified = true;
        true
    }
}

impl Record for User {
    const TABLE: &'static TableDescriptor = &TableDescriptor {
        name: "users",
        audited: true,
        unique: &["email"],
        searchable: &["email", "name", "job_title"],
        policies: &[],
        permission_domain: "users",
        references: &[ForeignKey {
            column: "primary_organization_id",
            table: "organizations",
            on_delete: OnDelete::Restrict,
        }],
    };

    const SECRET_FIELDS: &'static [&'static str] = &["passwordHash", "mfaSecret"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self, modified_by: Option<Uuid>, at: DateTime<Utc>) {
        self.updated_at = at;
        self.modified_by_id = modified_by;
    }
}
