//! `brewstock-auth`: role resolution and permission checks.
//!
//! Roles are derived from the caller's email; nothing here touches storage.

pub mod authorize;
pub mod caller;
pub mod identity;
pub mod permissions;
pub mod roles;

pub use authorize::{AuthzError, Section, authorize, authorize_section, section_access, visible_sections};
pub use caller::Caller;
pub use identity::{IdentityChange, IdentityProvider, InMemoryIdentityProvider};
pub use permissions::{Permission, role_has, role_permissions};
pub use roles::{DEFAULT_EMAIL_ROLES, Role, RoleTable, resolve_role};
