//! Role Resolver: identity email → permission role.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Permission level of a signed-in identity, most privileged first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Admin,
    Owner,
    Staff,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Superadmin, Role::Admin, Role::Owner, Role::Staff];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Admin => "admin",
            Role::Owner => "owner",
            Role::Staff => "staff",
        }
    }

    /// Superadmin and admin may read the movement history and reports.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Superadmin | Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in email → role table. Keys are lower-case.
pub const DEFAULT_EMAIL_ROLES: &[(&str, Role)] = &[
    ("superadmin@gmail.com", Role::Superadmin),
    ("admin@gmail.com", Role::Admin),
    ("owner@gmail.com", Role::Owner),
    ("staff@gmail.com", Role::Staff),
    ("staff2@gmail.com", Role::Staff),
];

/// Case-insensitive email → role lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTable {
    entries: HashMap<String, Role>,
}

impl RoleTable {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with(mut self, email: &str, role: Role) -> Self {
        self.entries.insert(email.to_lowercase(), role);
        self
    }

    /// Total: unknown, empty or absent emails resolve to [`Role::Staff`].
    pub fn resolve(&self, email: Option<&str>) -> Role {
        match email {
            Some(email) if !email.is_empty() => self
                .entries
                .get(&email.to_lowercase())
                .copied()
                .unwrap_or(Role::Staff),
            _ => Role::Staff,
        }
    }
}

impl Default for RoleTable {
    fn default() -> Self {
        DEFAULT_EMAIL_ROLES
            .iter()
            .fold(Self::empty(), |table, (email, role)| table.with(email, *role))
    }
}

/// Resolve a role against the built-in table.
pub fn resolve_role(email: Option<&str>) -> Role {
    match email {
        Some(email) if !email.is_empty() => {
            let key = email.to_lowercase();
            DEFAULT_EMAIL_ROLES
                .iter()
                .find(|(known, _)| *known == key)
                .map(|(_, role)| *role)
                .unwrap_or(Role::Staff)
        }
        _ => Role::Staff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_emails_resolve_case_insensitively() {
        assert_eq!(resolve_role(Some("Admin@Gmail.com")), Role::Admin);
        assert_eq!(resolve_role(Some("SUPERADMIN@GMAIL.COM")), Role::Superadmin);
        assert_eq!(resolve_role(Some("owner@gmail.com")), Role::Owner);
    }

    #[test]
    fn unknown_empty_and_absent_fall_back_to_staff() {
        assert_eq!(resolve_role(Some("barista@cafe.test")), Role::Staff);
        assert_eq!(resolve_role(Some("")), Role::Staff);
        assert_eq!(resolve_role(None), Role::Staff);
    }

    #[test]
    fn custom_table_overrides_builtin() {
        let table = RoleTable::empty().with("Head.Barista@cafe.test", Role::Owner);
        assert_eq!(table.resolve(Some("head.barista@CAFE.test")), Role::Owner);
        assert_eq!(table.resolve(Some("admin@gmail.com")), Role::Staff);
    }

    #[test]
    fn default_table_agrees_with_free_function() {
        let table = RoleTable::default();
        for (email, _) in DEFAULT_EMAIL_ROLES {
            assert_eq!(table.resolve(Some(email)), resolve_role(Some(email)));
        }
    }

    #[test]
    fn roles_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Superadmin).unwrap(), "\"superadmin\"");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: every string (including non-ASCII) resolves to a member of the closed set.
        #[test]
        fn resolve_is_total(email in ".*") {
            let role = resolve_role(Some(&email));
            prop_assert!(Role::ALL.contains(&role));
            prop_assert_eq!(role, RoleTable::default().resolve(Some(&email)));
        }
    }
}
