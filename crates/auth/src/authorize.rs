use serde::{Deserialize, Serialize};
use thiserror::Error;

use brewstock_core::DomainError;

use crate::caller::Caller;
use crate::permissions::{Permission, role_has};
use crate::roles::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("not signed in")]
    NotSignedIn,

    #[error("forbidden: role '{role}' lacks '{required}'")]
    Forbidden { role: Role, required: String },
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        DomainError::permission_denied(value.to_string())
    }
}

/// Check a caller against the role → permission table.
///
/// A caller with no signed-in identity is refused before any lookup, even
/// though its role resolves to staff.
///
/// - No IO
/// - No panics
pub fn authorize(caller: &Caller, required: Permission) -> Result<(), AuthzError> {
    if !caller.is_signed_in() {
        tracing::warn!(permission = %required, "refused: not signed in");
        return Err(AuthzError::NotSignedIn);
    }
    if role_has(caller.role(), required) {
        Ok(())
    } else {
        tracing::warn!(role = %caller.role(), permission = %required, "permission denied");
        Err(AuthzError::Forbidden {
            role: caller.role(),
            required: required.as_str().to_string(),
        })
    }
}

/// Navigable area of the application.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Products,
    Inventory,
    Lots,
    History,
    Reports,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Products,
        Section::Inventory,
        Section::Lots,
        Section::History,
        Section::Reports,
    ];

    /// Where a signed-in caller lands when a section is refused.
    pub fn landing() -> Section {
        Section::Products
    }
}

/// Roles allowed into a section.
pub fn section_access(section: Section) -> &'static [Role] {
    match section {
        Section::Products => &Role::ALL,
        Section::Inventory | Section::Lots => &[Role::Superadmin, Role::Admin, Role::Owner],
        Section::History | Section::Reports => &[Role::Superadmin, Role::Admin],
    }
}

/// Gate navigation: signed-out callers are sent to sign-in, signed-in callers
/// without the role are refused (and should land on [`Section::landing`]).
pub fn authorize_section(caller: &Caller, section: Section) -> Result<(), AuthzError> {
    if !caller.is_signed_in() {
        return Err(AuthzError::NotSignedIn);
    }
    if section_access(section).contains(&caller.role()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role: caller.role(),
            required: format!("section:{section:?}").to_lowercase(),
        })
    }
}

/// Sections the caller may open, in menu order.
pub fn visible_sections(caller: &Caller) -> Vec<Section> {
    Section::ALL
        .into_iter()
        .filter(|s| authorize_section(caller, *s).is_ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_cannot_read_history() {
        let caller = Caller::with_role("staff@gmail.com", Role::Staff);
        let err = authorize(&caller, Permission::HistoryRead).unwrap_err();
        assert!(matches!(err, AuthzError::Forbidden { role: Role::Staff, .. }));

        let domain: DomainError = err.into();
        assert!(matches!(domain, DomainError::PermissionDenied(_)));
    }

    #[test]
    fn signed_out_caller_is_refused_every_permission() {
        let caller = Caller::anonymous();
        for permission in [Permission::ProductsRead, Permission::ProductsWrite, Permission::StockAdjust] {
            assert_eq!(authorize(&caller, permission), Err(AuthzError::NotSignedIn));
        }

        let domain: DomainError = AuthzError::NotSignedIn.into();
        assert!(matches!(domain, DomainError::PermissionDenied(_)));
    }

    #[test]
    fn admin_reads_history() {
        let caller = Caller::from_email(Some("admin@gmail.com"));
        assert!(authorize(&caller, Permission::HistoryRead).is_ok());
    }

    #[test]
    fn signed_out_caller_is_sent_to_sign_in() {
        assert_eq!(
            authorize_section(&Caller::anonymous(), Section::Products),
            Err(AuthzError::NotSignedIn)
        );
    }

    #[test]
    fn section_table_matches_roles() {
        let owner = Caller::with_role("owner@gmail.com", Role::Owner);
        assert_eq!(
            visible_sections(&owner),
            vec![Section::Products, Section::Inventory, Section::Lots]
        );

        let staff = Caller::with_role("staff@gmail.com", Role::Staff);
        assert_eq!(visible_sections(&staff), vec![Section::Products]);

        let admin = Caller::with_role("admin@gmail.com", Role::Admin);
        assert_eq!(visible_sections(&admin), Section::ALL.to_vec());
    }
}
