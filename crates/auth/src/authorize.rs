use std::collections::HashSet;

use thiserror::Error;

use stardust_core::UserId;

use crate::Role;

/// A resolved actor for authorization decisions: a user plus the set of roles
/// granted to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: HashSet<Role>,
}

impl Principal {
    pub fn new(user_id: UserId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(&Role::ADMIN) || self.roles.contains(role)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing role '{0}'")]
    MissingRole(String),

    #[error("forbidden: requires one of [{0}]")]
    MissingAnyRole(String),
}

/// Require a single role (pure set membership, no IO).
pub fn authorize(principal: &Principal, required: &Role) -> Result<(), AuthzError> {
    if principal.has_role(required) {
        Ok(())
    } else {
        Err(AuthzError::MissingRole(required.as_str().to_string()))
    }
}

/// Require at least one of `accepted`.
pub fn authorize_any(principal: &Principal, accepted: &[Role]) -> Result<(), AuthzError> {
    if accepted.iter().any(|r| principal.has_role(r)) {
        return Ok(());
    }
    let names = accepted
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    Err(AuthzError::MissingAnyRole(names))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_grants_role() {
        let coo = Principal::new(UserId::new(), [Role::COO]);
        assert!(authorize(&coo, &Role::COO).is_ok());
        assert_eq!(
            authorize(&coo, &Role::MD),
            Err(AuthzError::MissingRole("purchasing.md".to_string()))
        );
    }

    #[test]
    fn admin_satisfies_everything() {
        let admin = Principal::new(UserId::new(), [Role::ADMIN]);
        assert!(authorize(&admin, &Role::MD).is_ok());
        assert!(authorize_any(&admin, &[Role::PROCUREMENT]).is_ok());
    }

    #[test]
    fn authorize_any_lists_accepted_roles() {
        let vendor = Principal::new(UserId::new(), [Role::VENDOR]);
        let err = authorize_any(&vendor, &[Role::COO, Role::MD]).unwrap_err();
        assert_eq!(err.to_string(), "forbidden: requires one of [purchasing.coo, purchasing.md]");
    }
}
