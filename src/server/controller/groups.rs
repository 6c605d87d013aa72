use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::server::auth::{gate, Credentials};
use crate::server::controller::error::ApiError;
use crate::server::controller::json_body;
use crate::server::database::Store;
use crate::server::model::user::{AddGroupMemberRequest, Membership, Role, User, UserId};
use crate::server::policy::Operation;
use crate::server::service::registry;

/// `{group}` path segment of `/groups/{group}/users`
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) enum GroupPath {
    #[serde(rename = "managers")]
    Managers,
    #[serde(rename = "delivery-crew")]
    DeliveryCrew,
}

impl From<GroupPath> for Role {
    fn from(group: GroupPath) -> Self {
        match group {
            GroupPath::Managers => Role::Manager,
            GroupPath::DeliveryCrew => Role::DeliveryCrew,
        }
    }
}

#[derive(Debug, Serialize)]
struct MembershipResponse {
    message: String,
    user: User,
}

pub(crate) async fn list_members<S: Store>(
    store: web::Data<S>,
    credentials: Credentials,
    group: web::Path<GroupPath>,
) -> Result<HttpResponse, ApiError> {
    gate(store.get_ref(), &credentials, Operation::ListGroupMembers).await?;
    let users = registry::list_by_role(store.get_ref(), group.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(users))
}

pub(crate) async fn add_member<S: Store>(
    store: web::Data<S>,
    credentials: Credentials,
    group: web::Path<GroupPath>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    gate(store.get_ref(), &credentials, Operation::AddGroupMember).await?;
    let body = json_body::<AddGroupMemberRequest>(&body)?;
    let role: Role = group.into_inner().into();
    let (user, membership) = registry::add_user_to_role(store.get_ref(), &body.username, role).await?;
    let response = match membership {
        Membership::Added => HttpResponse::Created().json(MembershipResponse {
            message: format!("User added to {role} group."),
            user,
        }),
        Membership::AlreadyMember => HttpResponse::Ok().json(MembershipResponse {
            message: format!("User is already in {role} group."),
            user,
        }),
    };
    Ok(response)
}

pub(crate) async fn remove_member<S: Store>(
    store: web::Data<S>,
    credentials: Credentials,
    path: web::Path<(GroupPath, UserId)>,
) -> Result<HttpResponse, ApiError> {
    gate(store.get_ref(), &credentials, Operation::RemoveGroupMember).await?;
    let (group, user_id) = path.into_inner();
    let role: Role = group.into();
    let user = registry::remove_user_from_role(store.get_ref(), user_id, role).await?;
    Ok(HttpResponse::Ok().json(MembershipResponse {
        message: format!("User removed from {role} group."),
        user,
    }))
}
