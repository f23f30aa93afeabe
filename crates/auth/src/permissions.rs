//! Permission identifiers and the role → permission table.

use serde::{Deserialize, Serialize};

use crate::roles::Role;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ProductsRead,
    ProductsWrite,
    StockAdjust,
    LotsManage,
    HistoryRead,
    ReportsRead,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ProductsRead => "products.read",
            Permission::ProductsWrite => "products.write",
            Permission::StockAdjust => "stock.adjust",
            Permission::LotsManage => "lots.manage",
            Permission::HistoryRead => "history.read",
            Permission::ReportsRead => "reports.read",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

const ALL: &[Permission] = &[
    Permission::ProductsRead,
    Permission::ProductsWrite,
    Permission::StockAdjust,
    Permission::LotsManage,
    Permission::HistoryRead,
    Permission::ReportsRead,
];

const OWNER: &[Permission] = &[
    Permission::ProductsRead,
    Permission::ProductsWrite,
    Permission::StockAdjust,
    Permission::LotsManage,
];

// The products page is open to every signed-in user, including adding
// products and adjusting stock from it.
const STAFF: &[Permission] = &[
    Permission::ProductsRead,
    Permission::ProductsWrite,
    Permission::StockAdjust,
];

pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::Superadmin | Role::Admin => ALL,
        Role::Owner => OWNER,
        Role::Staff => STAFF,
    }
}

pub fn role_has(role: Role, permission: Permission) -> bool {
    role_permissions(role).contains(&permission)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admins_read_history() {
        assert!(role_has(Role::Superadmin, Permission::HistoryRead));
        assert!(role_has(Role::Admin, Permission::HistoryRead));
        assert!(!role_has(Role::Owner, Permission::HistoryRead));
        assert!(!role_has(Role::Staff, Permission::HistoryRead));
    }

    #[test]
    fn staff_cannot_manage_lots() {
        assert!(!role_has(Role::Staff, Permission::LotsManage));
        assert!(role_has(Role::Owner, Permission::LotsManage));
    }
}
