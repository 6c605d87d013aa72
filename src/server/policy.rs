//! Access policy: which requester may run which operation.
//!
//! Both the operation gate and the order read scope are plain tables so
//! every endpoint consults the same rules.

use std::collections::BTreeSet;

use crate::server::controller::error::ApiError;
use crate::server::model::order::OrderScope;
use crate::server::model::user::{Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Operation {
    ListCategories,
    CreateCategory,
    ListMenuItems,
    ViewMenuItem,
    CreateMenuItem,
    UpdateMenuItem,
    DeleteMenuItem,
    ListGroupMembers,
    AddGroupMember,
    RemoveGroupMember,
    ViewCart,
    AddToCart,
    ClearCart,
    ListOrders,
    PlaceOrder,
    ViewOrder,
    AssignDeliveryCrew,
    UpdateOrderStatus,
    DeleteOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Anyone,
    Authenticated,
    AnyOf(&'static [Role]),
}

const MANAGER: &[Role] = &[Role::Manager];
const MANAGER_OR_CREW: &[Role] = &[Role::Manager, Role::DeliveryCrew];

const POLICY: &[(Operation, Access)] = &[
    (Operation::ListCategories, Access::Anyone),
    (Operation::CreateCategory, Access::AnyOf(MANAGER)),
    (Operation::ListMenuItems, Access::Anyone),
    (Operation::ViewMenuItem, Access::Anyone),
    (Operation::CreateMenuItem, Access::AnyOf(MANAGER)),
    (Operation::UpdateMenuItem, Access::AnyOf(MANAGER)),
    (Operation::DeleteMenuItem, Access::AnyOf(MANAGER)),
    (Operation::ListGroupMembers, Access::AnyOf(MANAGER)),
    (Operation::AddGroupMember, Access::AnyOf(MANAGER)),
    (Operation::RemoveGroupMember, Access::AnyOf(MANAGER)),
    (Operation::ViewCart, Access::Authenticated),
    (Operation::AddToCart, Access::Authenticated),
    (Operation::ClearCart, Access::Authenticated),
    (Operation::ListOrders, Access::Authenticated),
    (Operation::PlaceOrder, Access::Authenticated),
    (Operation::ViewOrder, Access::Authenticated),
    (Operation::AssignDeliveryCrew, Access::AnyOf(MANAGER)),
    (Operation::UpdateOrderStatus, Access::AnyOf(MANAGER_OR_CREW)),
    (Operation::DeleteOrder, Access::AnyOf(MANAGER)),
];

/// Order visibility by role, first matching row wins.
const ORDER_SCOPES: &[(Role, ScopeKind)] = &[
    (Role::Manager, ScopeKind::All),
    (Role::DeliveryCrew, ScopeKind::Assigned),
    (Role::Customer, ScopeKind::Own),
];

#[derive(Debug, Clone, Copy)]
enum ScopeKind {
    All,
    Assigned,
    Own,
}

/// Who is calling, resolved once per request.
#[derive(Debug, Clone)]
pub(crate) enum Requester {
    Anonymous,
    Authenticated { user: User, roles: BTreeSet<Role> },
}

impl Requester {
    pub fn from_user(user: User) -> Self {
        let roles = user.effective_roles();
        Requester::Authenticated { user, roles }
    }

    pub fn user(&self) -> Result<&User, ApiError> {
        match self {
            Requester::Anonymous => Err(ApiError::Unauthenticated),
            Requester::Authenticated { user, .. } => Ok(user),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        match self {
            Requester::Anonymous => false,
            Requester::Authenticated { roles, .. } => roles.contains(&role),
        }
    }
}

pub(crate) fn access(operation: Operation) -> Access {
    POLICY
        .iter()
        .find(|(op, _)| *op == operation)
        .map(|(_, access)| *access)
        // an operation missing from the table is closed to everyone
        .unwrap_or(Access::AnyOf(&[]))
}

/// Gate an operation, anonymous callers of protected operations get
/// `Unauthenticated`, authenticated callers lacking a role get `Forbidden`.
pub(crate) fn authorize(operation: Operation, requester: &Requester) -> Result<(), ApiError> {
    match (access(operation), requester) {
        (Access::Anyone, _) => Ok(()),
        (_, Requester::Anonymous) => Err(ApiError::Unauthenticated),
        (Access::Authenticated, Requester::Authenticated { .. }) => Ok(()),
        (Access::AnyOf(allowed), Requester::Authenticated { roles, .. }) => {
            match allowed.iter().any(|r| roles.contains(r)) {
                true => Ok(()),
                false => Err(ApiError::Forbidden),
            }
        }
    }
}

/// Orders the requester may see and act upon.
pub(crate) fn order_scope(requester: &Requester) -> Result<OrderScope, ApiError> {
    let user = requester.user()?;
    let kind = ORDER_SCOPES
        .iter()
        .find(|(role, _)| requester.has_role(*role))
        .map(|(_, kind)| *kind)
        .unwrap_or(ScopeKind::Own);
    Ok(match kind {
        ScopeKind::All => OrderScope::All,
        ScopeKind::Assigned => OrderScope::AssignedTo(user.id),
        ScopeKind::Own => OrderScope::PlacedBy(user.id),
    })
}
