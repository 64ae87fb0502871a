//! Row-visibility policies.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use service_core::error::{AppError, FORBIDDEN_MESSAGE};

use super::Principal;
use crate::models::UserType;
use crate::store::Filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Collections,
    Transactions,
    System,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Collections => "collections",
            PolicyKind::Transactions => "transactions",
            PolicyKind::System => "system",
        }
    }

    /// Predicate for `principal`, or `None` when the guard does not match.
    fn predicate(&self, principal: &Principal) -> Option<Filter> {
        let user = &principal.user;
        match (self, user.user_type) {
            (PolicyKind::Collections, UserType::Collector) => {
                Some(Filter::eq("seller_id", user.id.to_string()))
            }
            (PolicyKind::Collections, UserType::Business) => user
                .primary_organization_id
                .map(|org| Filter::eq("buyer_id", org.to_string())),
            (PolicyKind::Transactions, UserType::Business) => {
                user.primary_organization_id.map(|org| {
                    Filter::Or(vec![
                        Filter::eq("seller_id", org.to_string()),
                        Filter::eq("buyer_id", org.to_string()),
                    ])
                })
            }
            (PolicyKind::System, UserType::System) => Some(Filter::True),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("no policy among {0:?} applies to user {1}")]
    NoMatch(Vec<PolicyKind>, uuid::Uuid),
}

impl From<PolicyError> for AppError {
    fn from(err: PolicyError) -> Self {
        tracing::debug!(error = %err, "Policy rejected request");
        AppError::forbidden(FORBIDDEN_MESSAGE)
    }
}

/// Compiles the row predicate for `principal` over `kinds`.
///
/// The first kind whose guard matches wins. With no kinds the predicate is
/// `True`. System users fall back to `True` when nothing matches.
pub fn compile(principal: &Principal, kinds: &[PolicyKind]) -> Result<Filter, PolicyError> {
    if kinds.is_empty() {
        return Ok(Filter::True);
    }

    if let Some(filter) = kinds.iter().find_map(|kind| kind.predicate(principal)) {
        return Ok(filter);
    }

    if principal.user.user_type == UserType::System {
        return Ok(Filter::True);
    }

    Err(PolicyError::NoMatch(kinds.to_vec(), principal.id()))
}
