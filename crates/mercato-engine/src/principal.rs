//! Caller identity and authorization checks.
//!
//! Every engine operation takes a [`Principal`] describing who is asking.
//! Administrative surfaces call [`Principal::require_admin`]; customer
//! surfaces call [`Principal::can_access`] with the resource owner so
//! customers only reach their own records while admins reach everything.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Role attached to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Back-office staff. Full access.
    Admin,
    /// Storefront user. Access limited to their own records.
    Customer,
}

/// The authenticated caller of an engine operation.
///
/// `id` is the external user identifier (what `customers.user_id` and
/// `orders.user_id` store), not a customer row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

impl Principal {
    /// An administrative caller.
    pub fn admin(id: impl Into<String>) -> Self {
        Principal {
            id: id.into(),
            role: Role::Admin,
        }
    }

    /// A storefront customer.
    pub fn customer(id: impl Into<String>) -> Self {
        Principal {
            id: id.into(),
            role: Role::Customer,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Errors with [`EngineError::Forbidden`] unless the caller is an admin.
    pub fn require_admin(&self) -> EngineResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(EngineError::Forbidden("admin role required".to_string()))
        }
    }

    /// Whether this caller may read a resource owned by `owner`.
    ///
    /// Admins may always. Customers only when the resource is linked to
    /// their own user id; an unowned resource (`None`) is admin-only.
    pub fn can_access(&self, owner: Option<&str>) -> bool {
        self.is_admin() || owner == Some(self.id.as_str())
    }

    /// Errors with [`EngineError::Forbidden`] unless [`Self::can_access`].
    pub fn require_access(&self, owner: Option<&str>) -> EngineResult<()> {
        if self.can_access(owner) {
            Ok(())
        } else {
            Err(EngineError::Forbidden(
                "resource belongs to another user".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_admin() {
        assert!(Principal::admin("staff-1").require_admin().is_ok());

        let err = Principal::customer("user-1").require_admin().unwrap_err();
        assert!(err.is_forbidden());
    }

    #[test]
    fn test_customer_access() {
        let p = Principal::customer("user-1");
        assert!(p.can_access(Some("user-1")));
        assert!(!p.can_access(Some("user-2")));
        assert!(!p.can_access(None));
    }

    #[test]
    fn test_admin_access() {
        let p = Principal::admin("staff-1");
        assert!(p.can_access(Some("user-1")));
        assert!(p.can_access(None));
    }
}
