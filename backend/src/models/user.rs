use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{StaffId, UserId};
use crate::paging::{any_field_contains, Pageable, SortValue};

crate::define_code_enum!(
    UserRole {
        Admin => "admin",
        Manager => "manager",
        Doctor => "doctor",
        Nurse => "nurse",
        Receptionist => "receptionist",
    }
);

/// Stored user account, including the password hash. Never serialized to
/// clients; see [`UserInfo`].
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub password_hash: String,
    pub staff_id: Option<StaffId>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub staff_id: Option<StaffId>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserAccount> for UserInfo {
    fn from(user: &UserAccount) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
            staff_id: user.staff_id,
            is_active: user.is_active,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

impl From<UserAccount> for UserInfo {
    fn from(user: UserAccount) -> Self {
        UserInfo::from(&user)
    }
}

/// Account creation request. The password is hashed by the service layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub password: String,
    #[serde(default)]
    pub staff_id: Option<StaffId>,
}

/// Account update request. `password` is only changed when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    #[serde(default)]
    pub staff_id: Option<StaffId>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Storage-level account fields handed to repositories.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDraft {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub password_hash: String,
    pub staff_id: Option<StaffId>,
    pub is_active: bool,
}

impl Pageable for UserAccount {
    const SORT_COLUMNS: &'static [&'static str] =
        &["id", "username", "email", "displayName", "role", "lastLogin"];
    const GROUP_COLUMNS: &'static [&'static str] = &["role", "isActive"];

    fn record_id(&self) -> i64 {
        self.id.value()
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn matches_search(&self, needle: &str) -> bool {
        any_field_contains(
            &[
                Some(self.username.as_str()),
                Some(self.email.as_str()),
                Some(self.display_name.as_str()),
            ],
            needle,
        )
    }

    fn sort_value(&self, column: &str) -> Option<SortValue> {
        Some(match column {
            "id" => SortValue::Int(self.id.value()),
            "username" => SortValue::text(&self.username),
            "email" => SortValue::text(&self.email),
            "displayName" => SortValue::text(&self.display_name),
            "role" => SortValue::text(self.role.as_str()),
            "lastLogin" => self
                .last_login
                .map(SortValue::Timestamp)
                .unwrap_or(SortValue::Missing),
            _ => return None,
        })
    }

    fn group_key(&self, column: &str) -> Option<String> {
        match column {
            "role" => Some(self.role.as_str().to_string()),
            "isActive" => Some(self.is_active.to_string()),
            _ => None,
        }
    }
}
