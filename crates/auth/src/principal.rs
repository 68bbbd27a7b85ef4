use serde::{Deserialize, Serialize};

use adminhub_core::EntityId;

use crate::{AccessClaims, Role};

/// Identity of the authenticated caller, reconstructed from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: EntityId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<AccessClaims> for AuthUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            id: EntityId::new(claims.id),
            username: claims.username,
            email: claims.email,
            role: claims.role,
        }
    }
}
