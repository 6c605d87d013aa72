use std::collections::BTreeSet;
use std::fmt;
use serde::{Deserialize, Serialize};

pub(crate) type UserId = i64;

/// Capability group a user can belong to. `Customer` is never stored, it is
/// what a user without any group membership acts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum Role {
    Manager,
    DeliveryCrew,
    Customer,
}

impl Role {
    /// name of the group row backing this role
    pub fn group_name(self) -> &'static str {
        match self {
            Role::Manager => "Manager",
            Role::DeliveryCrew => "Delivery crew",
            Role::Customer => "Customer",
        }
    }

    pub fn from_group_name(name: &str) -> Option<Self> {
        match name {
            "Manager" => Some(Role::Manager),
            "Delivery crew" => Some(Role::DeliveryCrew),
            _ => None,
        }
    }

    pub fn is_group(self) -> bool {
        !matches!(self, Role::Customer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.group_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub is_staff: bool,
    #[serde(skip)]
    pub groups: BTreeSet<Role>,
}

impl User {
    pub fn is_member(&self, role: Role) -> bool {
        self.groups.contains(&role)
    }

    /// Roles the access policy evaluates against. Staff users act as managers
    /// and a user without any group acts as a customer.
    pub fn effective_roles(&self) -> BTreeSet<Role> {
        let mut roles = self.groups.clone();
        if self.is_staff {
            roles.insert(Role::Manager);
        }
        if !roles.iter().any(|r| r.is_group()) {
            roles.insert(Role::Customer);
        }
        roles
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddGroupMemberRequest {
    pub username: String,
}

/// Outcome of adding a user to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Membership {
    Added,
    AlreadyMember,
}
