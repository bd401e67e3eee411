//! Permission store
//!
//! Maps users to roles and roles to permissions, and answers "what may this
//! user do". Mutations are gated by the caller's [`AuthorizationGuard`],
//! replace their target set atomically, invalidate the caller's session
//! cache and leave an audit entry.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::cache::CacheScope;
use super::guard::AuthorizationGuard;
use super::perms;
use super::policy::{NameResolution, clean_names};
use crate::errors::{BiolinkerError, Result};
use crate::services::audit::{AuditLog, Severity};
use crate::storage::{SaveRoleRecord, SeaOrmStorage};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleWithPermissions {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionInfo {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionGroup {
    pub module: String,
    pub permissions: Vec<PermissionInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveRoleRequest {
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleSaved {
    pub role_id: i64,
    /// Requested permission names that matched nothing
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolesAssigned {
    pub user_id: i64,
    pub roles: Vec<String>,
    /// Requested role names that matched nothing
    pub unresolved: Vec<String>,
}

pub struct PermissionStore {
    storage: Arc<SeaOrmStorage>,
    audit: AuditLog,
    policy: NameResolution,
}

impl PermissionStore {
    pub fn new(storage: Arc<SeaOrmStorage>, audit: AuditLog, policy: NameResolution) -> Self {
        Self {
            storage,
            audit,
            policy,
        }
    }

    pub fn policy(&self) -> NameResolution {
        self.policy
    }

    pub async fn list_roles(&self) -> Result<Vec<RoleWithPermissions>> {
        let rows = self.storage.list_roles().await?;
        Ok(rows
            .into_iter()
            .map(|r| RoleWithPermissions {
                id: r.id,
                name: r.name,
                description: r.description,
                permissions: r.permissions,
            })
            .collect())
    }

    /// Seeded permissions grouped by module, modules ascending
    pub async fn list_permissions(&self) -> Result<Vec<PermissionGroup>> {
        let mut groups: BTreeMap<String, Vec<PermissionInfo>> = BTreeMap::new();
        for p in self.storage.list_permissions().await? {
            groups.entry(p.module).or_default().push(PermissionInfo {
                name: p.name,
                description: p.description,
            });
        }
        Ok(groups
            .into_iter()
            .map(|(module, permissions)| PermissionGroup {
                module,
                permissions,
            })
            .collect())
    }

    /// Create (no `id`) or update a role and replace its permission set.
    ///
    /// Requires `rbac:manage`. One role edit can change what many users may
    /// do, so the caller's whole session cache is dropped.
    pub async fn save_role(
        &self,
        guard: &AuthorizationGuard,
        request: SaveRoleRequest,
    ) -> Result<RoleSaved> {
        let actor = guard.require_permission(perms::RBAC_MANAGE).await?;

        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(BiolinkerError::validation("role name must not be empty"));
        }

        let requested = clean_names(&request.permissions);
        let found = self.storage.resolve_permission_ids(&requested).await?;
        let resolved = self.policy.apply("permission", &requested, found)?;

        let granted = resolved.ids.len();
        let role_id = self
            .storage
            .save_role(SaveRoleRecord {
                id: request.id,
                name: name.clone(),
                description: request.description.trim().to_string(),
                permission_ids: resolved.ids,
            })
            .await?;

        guard.cache().invalidate(CacheScope::All);

        let verb = if request.id.is_some() { "updated" } else { "created" };
        info!(
            "Role '{}' (id={}) {} by user {} with {} permissions",
            name, role_id, verb, actor, granted
        );
        self.audit
            .record(
                Some(actor),
                &format!(
                    "Role '{}' (id={}) {} with {} permission(s)",
                    name, role_id, verb, granted
                ),
                Severity::Warning,
            )
            .await;

        Ok(RoleSaved {
            role_id,
            unresolved: resolved.unresolved,
        })
    }

    /// Replace the roles of `user_id`. Requires `rbac:manage` or `users:edit`.
    pub async fn assign_roles(
        &self,
        guard: &AuthorizationGuard,
        user_id: i64,
        role_names: &[String],
    ) -> Result<RolesAssigned> {
        let actor = guard
            .require_any_permission(&[perms::RBAC_MANAGE, perms::USERS_EDIT])
            .await?;

        let requested = clean_names(role_names);
        let found = self.storage.resolve_role_ids(&requested).await?;
        let resolved = self.policy.apply("role", &requested, found.clone())?;

        self.storage
            .replace_user_roles(user_id, resolved.ids.clone())
            .await?;

        guard.cache().invalidate(CacheScope::User(user_id));

        let mut roles: Vec<String> = found.into_iter().map(|(name, _)| name).collect();
        roles.sort();
        roles.dedup();

        info!(
            "Roles of user {} set to {:?} by user {}",
            user_id, roles, actor
        );
        self.audit
            .record(
                Some(actor),
                &format!("Roles of user {} set to [{}]", user_id, roles.join(", ")),
                Severity::Warning,
            )
            .await;

        Ok(RolesAssigned {
            user_id,
            roles,
            unresolved: resolved.unresolved,
        })
    }

    /// Distinct union over all of the user's roles, ascending. No roles, no
    /// permissions.
    pub async fn get_effective_permissions(&self, user_id: i64) -> Result<Vec<String>> {
        self.storage.effective_permissions(user_id).await
    }

    /// Whether the account may still act; unknown ids are not active
    pub async fn is_active(&self, user_id: i64) -> Result<bool> {
        self.storage.is_user_active(user_id).await
    }

    pub async fn has_permission(&self, user_id: i64, permission: &str) -> Result<bool> {
        Ok(self
            .get_effective_permissions(user_id)
            .await?
            .iter()
            .any(|p| p == permission))
    }

    pub async fn roles_of(&self, user_id: i64) -> Result<Vec<String>> {
        self.storage.user_role_names(user_id).await
    }
}
