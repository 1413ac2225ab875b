//! Login, token verification and first-run admin seeding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ServiceError, ServiceResult};
use crate::auth::{verify_password, AuthUser, JwtKeys, PasswordHasher, TokenError};
use crate::db::repository::UserRepository;
use crate::models::{UserDraft, UserInfo, UserRole};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserInfo,
}

/// Token keys plus the password hashing policy.
#[derive(Debug, Clone)]
pub struct AuthService {
    keys: JwtKeys,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(keys: JwtKeys, hasher: PasswordHasher) -> Self {
        Self { keys, hasher }
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    /// Verify credentials and issue a token. Unknown users, wrong passwords
    /// and inactive accounts all fail with the same message.
    pub async fn login<R: UserRepository + ?Sized>(
        &self,
        repo: &R,
        request: &LoginRequest,
    ) -> ServiceResult<LoginResponse> {
        let username = request.username.trim();
        if username.is_empty() || request.password.is_empty() {
            return Err(ServiceError::validation(
                "Username and password are required",
            ));
        }

        let Some(user) = repo.find_user_by_username(username).await? else {
            log::info!("Login failed for unknown user '{}'", username);
            return Err(ServiceError::unauthorized(INVALID_CREDENTIALS));
        };
        if !verify_password(&request.password, &user.password_hash) {
            log::info!("Login failed for '{}': wrong password", user.username);
            return Err(ServiceError::unauthorized(INVALID_CREDENTIALS));
        }
        if !user.is_active {
            log::info!("Login refused for inactive user '{}'", user.username);
            return Err(ServiceError::unauthorized(INVALID_CREDENTIALS));
        }

        let issued = self
            .keys
            .issue(&user)
            .map_err(|e| ServiceError::internal(e.to_string()))?;
        let now = Utc::now();
        repo.record_login(user.id, now).await?;
        log::info!("User '{}' logged in", user.username);

        let mut info = UserInfo::from(&user);
        info.last_login = Some(now);
        Ok(LoginResponse {
            token: issued.token,
            token_type: "Bearer".to_string(),
            expires_at: issued.expires_at,
            user: info,
        })
    }

    /// Resolve a bearer token into the calling user.
    pub fn authenticate(&self, token: &str) -> ServiceResult<AuthUser> {
        let claims = self.keys.verify(token).map_err(|e| match e {
            TokenError::Expired => ServiceError::unauthorized("Session has expired"),
            other => {
                log::debug!("Rejected token: {}", other);
                ServiceError::unauthorized("Invalid authentication token")
            }
        })?;
        AuthUser::try_from(claims)
            .map_err(|_| ServiceError::unauthorized("Invalid authentication token"))
    }

    /// Profile of the calling user; fails if the account was deactivated
    /// after the token was issued.
    pub async fn current_user<R: UserRepository + ?Sized>(
        &self,
        repo: &R,
        caller: &AuthUser,
    ) -> ServiceResult<UserInfo> {
        let user = repo.get_user(caller.id).await?;
        if !user.is_active {
            return Err(ServiceError::unauthorized("Account is inactive"));
        }
        Ok(user.into())
    }

    /// Create the `admin` account when the user store is empty.
    ///
    /// Returns the generated password when none was supplied, so the caller
    /// can show it once.
    pub async fn ensure_admin_user<R: UserRepository + ?Sized>(
        &self,
        repo: &R,
        password: Option<&str>,
    ) -> ServiceResult<Option<String>> {
        if repo.count_users().await? > 0 {
            return Ok(None);
        }

        let generated = password.is_none();
        let password = password
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let draft = UserDraft {
            username: "admin".to_string(),
            email: "admin@valyanmed.local".to_string(),
            display_name: "Administrator".to_string(),
            role: UserRole::Admin,
            password_hash: self.hasher.hash(&password),
            staff_id: None,
            is_active: true,
        };
        repo.create_user(&draft).await?;
        log::info!("Seeded initial admin account");
        Ok(generated.then_some(password))
    }
}
