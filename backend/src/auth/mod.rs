//! Authentication primitives: password hashing and bearer tokens.

pub mod jwt;
pub mod password;

pub use jwt::{Claims, IssuedToken, JwtKeys, TokenError};
pub use password::{verify_password, PasswordHasher};

use serde::{Deserialize, Serialize};

use crate::models::{UserId, UserRole};

/// Identity of the caller, taken from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: UserId,
    pub username: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = TokenError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            id: claims.user_id()?,
            username: claims.username,
            role: claims.role,
        })
    }
}
