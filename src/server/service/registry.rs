//! Role group membership. Callers are expected to have gated the request.

use log::info;
use crate::server::controller::error::ApiError;
use crate::server::database::Store;
use crate::server::model::user::{Membership, Role, User, UserId};

pub(crate) async fn list_by_role<S: Store>(store: &S, role: Role) -> Result<Vec<User>, ApiError> {
    Ok(store.users_in_group(role).await?)
}

/// Adding an existing member is a successful no-op reported as `AlreadyMember`.
pub(crate) async fn add_user_to_role<S: Store>(
    store: &S,
    username: &str,
    role: Role,
) -> Result<(User, Membership), ApiError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ApiError::validation("username", "this field may not be blank"));
    }
    let user = store
        .user_by_username(username)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    let membership = match store.add_to_group(user.id, role).await? {
        true => {
            info!("user {} added to group {}", user.id, role);
            Membership::Added
        }
        false => Membership::AlreadyMember,
    };
    Ok((user, membership))
}

/// Removing a user that is not a member succeeds without change.
pub(crate) async fn remove_user_from_role<S: Store>(store: &S, user_id: UserId, role: Role) -> Result<User, ApiError> {
    let user = store.user_by_id(user_id).await?.ok_or(ApiError::NotFound("user"))?;
    if store.remove_from_group(user.id, role).await? {
        info!("user {} removed from group {}", user.id, role);
    }
    Ok(user)
}
