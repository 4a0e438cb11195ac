//! Permission Definitions
//!
//! 权限字符串格式 `resource:action`，支持:
//! - `resource:*` 通配
//! - `all` 超级权限
//! - `:own` 后缀: 仅限与自身档案关联的资源 (见 [`crate::auth::Policy`])

use shared::models::Role;

/// Default role permissions
pub const DEFAULT_ADMIN_PERMISSIONS: &[&str] = &["all"];

/// 店长：所有业务资源
pub const DEFAULT_MANAGER_PERMISSIONS: &[&str] = &[
    "appointments:*",
    "commissions:*",
    "barbers:*",
    "services:*",
    "clients:*",
    "blocks:*",
];

/// 理发师：自己的预约、佣金和休息时段
pub const DEFAULT_BARBER_PERMISSIONS: &[&str] = &[
    "appointments:read:own",
    "appointments:update:own",
    "appointments:status:own",
    "appointments:cancel:own",
    "commissions:read:own",
    "blocks:read",
    "blocks:manage:own",
    "clients:read",
    "services:read",
    "barbers:read",
];

/// 顾客：只能为自己预约
pub const DEFAULT_CLIENT_PERMISSIONS: &[&str] = &[
    "appointments:create:own",
    "appointments:read:own",
    "appointments:update:own",
    "appointments:cancel:own",
    "services:read",
    "barbers:read",
];

/// Get permissions for a role
pub fn get_default_permissions(role: Role) -> Vec<String> {
    let perms = match role {
        Role::Admin => DEFAULT_ADMIN_PERMISSIONS,
        Role::Manager => DEFAULT_MANAGER_PERMISSIONS,
        Role::Barber => DEFAULT_BARBER_PERMISSIONS,
        Role::Client => DEFAULT_CLIENT_PERMISSIONS,
    };
    perms.iter().map(|s| s.to_string()).collect()
}

/// 检查权限列表是否包含指定权限
///
/// 1. `"all"` 拥有所有权限
/// 2. 精确匹配
/// 3. 前缀匹配 (`:*` 通配符)，`"appointments:*"` 匹配 `"appointments:read:own"`
pub fn has_permission(permissions: &[String], permission: &str) -> bool {
    permissions.iter().any(|p| {
        if p == "all" || p == permission {
            return true;
        }
        if let Some(prefix) = p.strip_suffix(":*") {
            permission.starts_with(&format!("{}:", prefix))
        } else {
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_match() {
        let perms = get_default_permissions(Role::Manager);
        assert!(has_permission(&perms, "appointments:create"));
        assert!(has_permission(&perms, "commissions:manage"));
        assert!(!has_permission(&perms, "users:manage"));
    }

    #[test]
    fn test_admin_has_all_permissions() {
        let perms = get_default_permissions(Role::Admin);
        assert!(has_permission(&perms, "anything:at_all"));
    }

    #[test]
    fn test_own_permissions_are_distinct() {
        let perms = get_default_permissions(Role::Barber);
        assert!(!has_permission(&perms, "appointments:read"));
        assert!(has_permission(&perms, "appointments:read:own"));
        assert!(!has_permission(&perms, "appointments:create:own"));
    }
}
