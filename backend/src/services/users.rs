//! User account administration.
//!
//! Accounts are returned as [`UserInfo`]; password hashes never leave this
//! layer.

use super::validation::{Validator, MIN_PASSWORD_LENGTH};
use super::{check_listing_query, ServiceError, ServiceErrorKind, ServiceResult};
use crate::auth::{AuthUser, PasswordHasher};
use crate::db::repository::{StaffRepository, UserRepository};
use crate::models::{NewUser, StaffId, UserAccount, UserDraft, UserId, UserInfo, UserUpdate};
use crate::paging::{GroupedResult, PagedQuery, PagedResult};

fn is_valid_username(username: &str) -> bool {
    (3..=50).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

fn check_password(v: &mut Validator, password: &str) {
    v.check(
        password.chars().count() >= MIN_PASSWORD_LENGTH,
        format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ),
    );
}

async fn check_staff_link<R: StaffRepository + ?Sized>(
    repo: &R,
    staff_id: Option<StaffId>,
) -> ServiceResult<()> {
    let Some(staff_id) = staff_id else {
        return Ok(());
    };
    match repo.get_staff(staff_id).await {
        Ok(_) => Ok(()),
        Err(err) => match ServiceError::from(err) {
            e if e.is(ServiceErrorKind::NotFound) => Err(ServiceError::validation(format!(
                "Staff member {} does not exist",
                staff_id
            ))),
            e => Err(e),
        },
    }
}

pub async fn create_user<R>(
    repo: &R,
    hasher: &PasswordHasher,
    request: &NewUser,
) -> ServiceResult<UserInfo>
where
    R: UserRepository + StaffRepository + ?Sized,
{
    let username = request.username.trim().to_string();
    let email = request.email.trim().to_string();
    let display_name = request.display_name.trim().to_string();

    let mut v = Validator::new();
    v.check(
        is_valid_username(&username),
        "Username must be 3-50 characters: letters, digits, '.', '_' or '-'",
    )
    .required("Email", &email)
    .email("Email", Some(email.as_str()).filter(|e| !e.is_empty()))
    .name("Display name", &display_name);
    check_password(&mut v, &request.password);
    v.finish()?;

    check_staff_link(repo, request.staff_id).await?;

    let draft = UserDraft {
        username,
        email,
        display_name,
        role: request.role,
        password_hash: hasher.hash(&request.password),
        staff_id: request.staff_id,
        is_active: true,
    };
    let user = repo.create_user(&draft).await?;
    log::info!("Created user '{}' with role {}", user.username, user.role);
    Ok(UserInfo::from(user))
}

pub async fn get_user<R: UserRepository + ?Sized>(repo: &R, id: UserId) -> ServiceResult<UserInfo> {
    Ok(repo.get_user(id).await?.into())
}

/// Update profile fields; the password changes only when one is supplied.
/// The active flag is left alone: accounts are deactivated through
/// [`delete_user`] only.
pub async fn update_user<R>(
    repo: &R,
    hasher: &PasswordHasher,
    id: UserId,
    request: &UserUpdate,
) -> ServiceResult<UserInfo>
where
    R: UserRepository + StaffRepository + ?Sized,
{
    let email = request.email.trim().to_string();
    let display_name = request.display_name.trim().to_string();

    let mut v = Validator::new();
    v.required("Email", &email)
        .email("Email", Some(email.as_str()).filter(|e| !e.is_empty()))
        .name("Display name", &display_name);
    if let Some(password) = &request.password {
        check_password(&mut v, password);
    }
    v.finish()?;

    let current = repo.get_user(id).await?;
    check_staff_link(repo, request.staff_id).await?;

    let draft = UserDraft {
        username: current.username,
        email,
        display_name,
        role: request.role,
        password_hash: match &request.password {
            Some(password) => hasher.hash(password),
            None => current.password_hash,
        },
        staff_id: request.staff_id,
        is_active: current.is_active,
    };
    Ok(repo.update_user(id, &draft).await?.into())
}

/// Deactivate an account. Users cannot deactivate themselves.
pub async fn delete_user<R: UserRepository + ?Sized>(
    repo: &R,
    acting: &AuthUser,
    id: UserId,
) -> ServiceResult<()> {
    if acting.id == id {
        return Err(ServiceError::conflict("You cannot deactivate your own account"));
    }
    repo.deactivate_user(id).await?;
    log::info!("User {} deactivated by '{}'", id, acting.username);
    Ok(())
}

pub async fn list_users<R: UserRepository + ?Sized>(
    repo: &R,
    include_inactive: bool,
) -> ServiceResult<Vec<UserInfo>> {
    let users = repo.list_users(include_inactive).await?;
    Ok(users.iter().map(UserInfo::from).collect())
}

pub async fn get_users_paged<R: UserRepository + ?Sized>(
    repo: &R,
    query: &PagedQuery,
) -> ServiceResult<PagedResult<UserInfo>> {
    let query = check_listing_query::<UserAccount>(query, false)?;
    Ok(repo.get_users_paged(&query).await?.map(UserInfo::from))
}

pub async fn get_users_grouped<R: UserRepository + ?Sized>(
    repo: &R,
    query: &PagedQuery,
) -> ServiceResult<GroupedResult<UserInfo>> {
    let query = check_listing_query::<UserAccount>(query, true)?;
    Ok(repo.get_users_grouped(&query).await?.map(UserInfo::from))
}
