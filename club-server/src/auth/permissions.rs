//! Permission Definitions
//!
//! Role based. Reading needs only a login; every write is guarded by one
//! module permission.

pub const MEMBERS_MANAGE: &str = "members:manage";
pub const PAYMENTS_MANAGE: &str = "payments:manage";
pub const RESERVATIONS_MANAGE: &str = "reservations:manage";
pub const REFINANCINGS_MANAGE: &str = "refinancings:manage";
pub const CATALOG_MANAGE: &str = "catalog:manage";
pub const CHARGES_MANAGE: &str = "charges:manage";
pub const USERS_MANAGE: &str = "users:manage";

/// Every grantable permission
pub const ALL_PERMISSIONS: &[&str] = &[
    MEMBERS_MANAGE,
    PAYMENTS_MANAGE,
    RESERVATIONS_MANAGE,
    REFINANCINGS_MANAGE,
    CATALOG_MANAGE,
    CHARGES_MANAGE,
    USERS_MANAGE,
];

pub const DEFAULT_ADMIN_PERMISSIONS: &[&str] = &["all"];

/// Front desk: everything except users
pub const DEFAULT_OPERADOR_PERMISSIONS: &[&str] = &[
    MEMBERS_MANAGE,
    PAYMENTS_MANAGE,
    RESERVATIONS_MANAGE,
    REFINANCINGS_MANAGE,
    CATALOG_MANAGE,
    CHARGES_MANAGE,
];

pub const DEFAULT_COBRADOR_PERMISSIONS: &[&str] = &[PAYMENTS_MANAGE];

use shared::models::Role;

/// Permissions granted to a role
pub fn role_permissions(role: Role) -> Vec<String> {
    let permissions = match role {
        Role::Admin => DEFAULT_ADMIN_PERMISSIONS,
        Role::Operador => DEFAULT_OPERADOR_PERMISSIONS,
        Role::Cobrador => DEFAULT_COBRADOR_PERMISSIONS,
    };
    permissions.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permissions() {
        assert_eq!(role_permissions(Role::Admin), vec!["all"]);
        assert!(role_permissions(Role::Operador).contains(&CHARGES_MANAGE.to_string()));
        assert!(!role_permissions(Role::Operador).contains(&USERS_MANAGE.to_string()));
        assert_eq!(role_permissions(Role::Cobrador), vec![PAYMENTS_MANAGE]);
    }

    #[test]
    fn test_role_permissions_are_known() {
        for role in [Role::Operador, Role::Cobrador] {
            for permission in role_permissions(role) {
                assert!(ALL_PERMISSIONS.contains(&permission.as_str()));
            }
        }
    }
}
