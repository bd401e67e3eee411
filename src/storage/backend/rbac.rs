//! RBAC persistence
//!
//! Permission resolution is a single join over
//! permissions -> role_permissions -> roles -> user_roles. Membership and
//! grant replacement run delete-then-insert inside one transaction.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, TransactionTrait,
};
use tracing::{debug, info};

use super::SeaOrmStorage;
use crate::errors::{BiolinkerError, Result};

use migration::entities::{permission, role, role_permission, user, user_role};

/// A role with the names of the permissions it grants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

/// Role write with names already resolved to ids
#[derive(Debug, Clone)]
pub struct SaveRoleRecord {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub permission_ids: Vec<i64>,
}

impl SeaOrmStorage {
    /// Every role with its permission names, roles by name, permissions ascending
    pub async fn list_roles(&self) -> Result<Vec<RoleRow>> {
        let roles = role::Entity::find()
            .order_by_asc(role::Column::Name)
            .all(&self.db)
            .await?;

        let grants: Vec<(i64, String)> = role_permission::Entity::find()
            .select_only()
            .column(role_permission::Column::RoleId)
            .column(permission::Column::Name)
            .join(
                JoinType::InnerJoin,
                role_permission::Relation::Permission.def(),
            )
            .order_by_asc(permission::Column::Name)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut by_role: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        for (role_id, name) in grants {
            by_role.entry(role_id).or_default().push(name);
        }

        Ok(roles
            .into_iter()
            .map(|r| RoleRow {
                permissions: by_role.remove(&r.id).unwrap_or_default(),
                id: r.id,
                name: r.name,
                description: r.description,
            })
            .collect())
    }

    pub async fn list_permissions(&self) -> Result<Vec<permission::Model>> {
        Ok(permission::Entity::find()
            .order_by_asc(permission::Column::Module)
            .order_by_asc(permission::Column::Name)
            .all(&self.db)
            .await?)
    }

    /// `(name, id)` for the permission names that exist
    pub async fn resolve_permission_ids(&self, names: &[String]) -> Result<Vec<(String, i64)>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        Ok(permission::Entity::find()
            .select_only()
            .column(permission::Column::Name)
            .column(permission::Column::Id)
            .filter(permission::Column::Name.is_in(names.iter().cloned()))
            .into_tuple()
            .all(&self.db)
            .await?)
    }

    /// `(name, id)` for the role names that exist
    pub async fn resolve_role_ids(&self, names: &[String]) -> Result<Vec<(String, i64)>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        Ok(role::Entity::find()
            .select_only()
            .column(role::Column::Name)
            .column(role::Column::Id)
            .filter(role::Column::Name.is_in(names.iter().cloned()))
            .into_tuple()
            .all(&self.db)
            .await?)
    }

    /// Create or update a role and replace its grants atomically.
    ///
    /// Fails with `Validation` when another role already has the name and
    /// with `NotFound` when `id` names no role. Returns the role id.
    pub async fn save_role(&self, record: SaveRoleRecord) -> Result<i64> {
        let txn = self.db.begin().await?;

        let clash = role::Entity::find()
            .filter(role::Column::Name.eq(record.name.as_str()))
            .one(&txn)
            .await?;
        if let Some(existing) = clash
            && Some(existing.id) != record.id
        {
            return Err(BiolinkerError::validation(format!(
                "role name must be unique: '{}' already exists",
                record.name
            )));
        }

        let now = Utc::now();
        let role_id = match record.id {
            Some(id) => {
                let existing = role::Entity::find_by_id(id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| BiolinkerError::not_found(format!("role {} not found", id)))?;
                let mut active: role::ActiveModel = existing.into();
                active.name = Set(record.name.clone());
                active.description = Set(record.description.clone());
                active.updated_at = Set(now);
                active.update(&txn).await?;
                id
            }
            None => {
                role::ActiveModel {
                    name: Set(record.name.clone()),
                    description: Set(record.description.clone()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
                .id
            }
        };

        role_permission::Entity::delete_many()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .exec(&txn)
            .await?;

        let ids: BTreeSet<i64> = record.permission_ids.into_iter().collect();
        let granted = ids.len();
        if !ids.is_empty() {
            let rows = ids.into_iter().map(|permission_id| role_permission::ActiveModel {
                role_id: Set(role_id),
                permission_id: Set(permission_id),
            });
            role_permission::Entity::insert_many(rows)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        info!(
            "Role saved: id={} name={} permissions={}",
            role_id, record.name, granted
        );
        Ok(role_id)
    }

    /// Replace a user's role membership atomically
    pub async fn replace_user_roles(&self, user_id: i64, role_ids: Vec<i64>) -> Result<()> {
        let txn = self.db.begin().await?;

        if user::Entity::find_by_id(user_id).one(&txn).await?.is_none() {
            return Err(BiolinkerError::not_found(format!(
                "user {} not found",
                user_id
            )));
        }

        user_role::Entity::delete_many()
            .filter(user_role::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        let ids: BTreeSet<i64> = role_ids.into_iter().collect();
        let assigned = ids.len();
        if !ids.is_empty() {
            let rows = ids.into_iter().map(|role_id| user_role::ActiveModel {
                user_id: Set(user_id),
                role_id: Set(role_id),
            });
            user_role::Entity::insert_many(rows)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        info!("Roles replaced: user={} roles={}", user_id, assigned);
        Ok(())
    }

    /// Distinct permission names granted through all of a user's roles, ascending
    pub async fn effective_permissions(&self, user_id: i64) -> Result<Vec<String>> {
        let names: Vec<String> = permission::Entity::find()
            .select_only()
            .column(permission::Column::Name)
            .distinct()
            .join(
                JoinType::InnerJoin,
                permission::Relation::RolePermission.def(),
            )
            .join(JoinType::InnerJoin, role_permission::Relation::Role.def())
            .join(JoinType::InnerJoin, role::Relation::UserRole.def())
            .filter(user_role::Column::UserId.eq(user_id))
            .order_by_asc(permission::Column::Name)
            .into_tuple()
            .all(&self.db)
            .await?;
        debug!(
            "effective_permissions({}) -> {} permissions",
            user_id,
            names.len()
        );
        Ok(names)
    }

    pub async fn user_role_names(&self, user_id: i64) -> Result<Vec<String>> {
        Ok(role::Entity::find()
            .select_only()
            .column(role::Column::Name)
            .join(JoinType::InnerJoin, role::Relation::UserRole.def())
            .filter(user_role::Column::UserId.eq(user_id))
            .order_by_asc(role::Column::Name)
            .into_tuple()
            .all(&self.db)
            .await?)
    }

    /// Add one membership if absent. Returns whether a row was inserted.
    pub async fn grant_role_if_absent(&self, user_id: i64, role_name: &str) -> Result<bool> {
        grant_role_in(&self.db, user_id, role_name).await
    }

    /// Move an account whose flat role is still `legacy_role` into
    /// `role_name` and overwrite the flat role with `cleared_role`, in one
    /// transaction. Returns false when the flat role no longer matches.
    pub async fn migrate_legacy_role(
        &self,
        user_id: i64,
        legacy_role: &str,
        role_name: &str,
        cleared_role: &str,
    ) -> Result<bool> {
        let txn = self.db.begin().await?;

        let rewritten = user::Entity::update_many()
            .col_expr(user::Column::Role, Expr::value(cleared_role))
            .filter(user::Column::Id.eq(user_id))
            .filter(user::Column::Role.eq(legacy_role))
            .exec(&txn)
            .await?
            .rows_affected;
        if rewritten == 0 {
            return Ok(false);
        }

        grant_role_in(&txn, user_id, role_name).await?;
        txn.commit().await?;
        info!(
            "Legacy role migrated: user={} {} -> {}",
            user_id, legacy_role, role_name
        );
        Ok(true)
    }
}

/// Membership insert on any connection, so callers can run it inside their
/// own transaction
pub(super) async fn grant_role_in<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    role_name: &str,
) -> Result<bool> {
    let Some(role) = role::Entity::find()
        .filter(role::Column::Name.eq(role_name))
        .one(conn)
        .await?
    else {
        return Err(BiolinkerError::not_found(format!(
            "role '{}' not found",
            role_name
        )));
    };

    let inserted = user_role::Entity::insert(user_role::ActiveModel {
        user_id: Set(user_id),
        role_id: Set(role.id),
    })
    .on_conflict(
        OnConflict::columns([user_role::Column::UserId, user_role::Column::RoleId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    Ok(inserted > 0)
}
