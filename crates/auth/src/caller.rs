use serde::{Deserialize, Serialize};

use crate::identity::IdentityProvider;
use crate::roles::{Role, RoleTable, resolve_role};

/// Identity and role of whoever is invoking an operation.
///
/// Threaded explicitly into every operation that needs authorization; there is
/// no ambient "current user".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    email: Option<String>,
    role: Role,
}

impl Caller {
    /// Resolve against the built-in role table.
    pub fn from_email(email: Option<&str>) -> Self {
        Self {
            email: signed_in_email(email),
            role: resolve_role(email),
        }
    }

    pub fn with_table(email: Option<&str>, table: &RoleTable) -> Self {
        Self {
            email: signed_in_email(email),
            role: table.resolve(email),
        }
    }

    /// Snapshot the provider's current identity.
    pub fn from_identity<P: IdentityProvider + ?Sized>(provider: &P) -> Self {
        Self::from_email(provider.current_email().as_deref())
    }

    /// Caller with no signed-in identity.
    pub fn anonymous() -> Self {
        Self::from_email(None)
    }

    /// Caller with an explicit role (tests, service accounts).
    pub fn with_role(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: Some(email.into()),
            role,
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_signed_in(&self) -> bool {
        self.email.is_some()
    }
}

/// A blank email is no identity at all.
fn signed_in_email(email: Option<&str>) -> Option<String> {
    email.map(str::trim).filter(|e| !e.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_caller_is_staff_and_signed_out() {
        let caller = Caller::anonymous();
        assert_eq!(caller.role(), Role::Staff);
        assert!(!caller.is_signed_in());
    }

    #[test]
    fn blank_email_is_not_signed_in() {
        let caller = Caller::from_email(Some("  "));
        assert!(!caller.is_signed_in());
        assert_eq!(caller.role(), Role::Staff);
    }

    #[test]
    fn email_resolves_role() {
        let caller = Caller::from_email(Some("admin@gmail.com"));
        assert_eq!(caller.role(), Role::Admin);
        assert_eq!(caller.email(), Some("admin@gmail.com"));
    }
}
