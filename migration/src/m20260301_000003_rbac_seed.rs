//! Seed permissions and the built-in roles
//!
//! Rows are inserted by name and joined by name so the generated ids stay
//! under the database's own sequence on every backend.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

use super::m20260301_000002_rbac::{Permissions, Roles};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// (name, module, description)
const PERMISSIONS: &[(&str, &str, &str)] = &[
    ("users:view", "users", "View user accounts"),
    ("users:edit", "users", "Edit user accounts and role membership"),
    ("users:delete", "users", "Deactivate user accounts"),
    ("pages:view", "pages", "View bio pages"),
    ("pages:edit", "pages", "Edit bio pages"),
    ("links:view", "links", "View links"),
    ("links:create", "links", "Create links"),
    ("links:edit", "links", "Edit links"),
    ("links:delete", "links", "Delete links"),
    ("analytics:view", "analytics", "View analytics of any user"),
    ("billing:view", "billing", "View billing records"),
    ("billing:manage", "billing", "Manage billing records"),
    ("plans:manage", "plans", "Manage subscription plans"),
    ("rbac:view", "rbac", "View roles and permissions"),
    ("rbac:manage", "rbac", "Create and edit roles"),
    ("seo:manage", "seo", "Manage SEO metadata"),
    ("settings:manage", "settings", "Manage platform settings and the IP blocklist"),
    ("logs:view", "logs", "View the audit log"),
    ("logs:manage", "logs", "Purge the audit log"),
];

/// (role, description, granted permissions; empty slice means all)
const ROLES: &[(&str, &str, &[&str])] = &[
    ("SuperAdmin", "Full platform access", &[]),
    (
        "Manager",
        "Day-to-day platform management",
        &[
            "users:view",
            "users:edit",
            "pages:view",
            "pages:edit",
            "links:view",
            "links:create",
            "links:edit",
            "links:delete",
            "analytics:view",
            "billing:view",
            "rbac:view",
            "logs:view",
        ],
    ),
    (
        "Support",
        "Read access for customer support",
        &[
            "users:view",
            "pages:view",
            "links:view",
            "analytics:view",
            "billing:view",
            "logs:view",
        ],
    ),
    (
        "Editor",
        "Content moderation",
        &[
            "pages:view",
            "pages:edit",
            "links:view",
            "links:create",
            "links:edit",
            "links:delete",
            "seo:manage",
        ],
    ),
    (
        "User",
        "Regular creator account",
        &["pages:view", "links:view", "links:create", "links:edit"],
    ),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        let mut insert = Query::insert()
            .into_table(Permissions::Table)
            .columns([
                Permissions::Name,
                Permissions::Module,
                Permissions::Description,
            ])
            .to_owned();
        for (name, module, description) in PERMISSIONS {
            insert.values_panic([(*name).into(), (*module).into(), (*description).into()]);
        }
        db.execute(&insert).await?;

        let mut insert = Query::insert()
            .into_table(Roles::Table)
            .columns([
                Roles::Name,
                Roles::Description,
                Roles::CreatedAt,
                Roles::UpdatedAt,
            ])
            .to_owned();
        for (name, description, _) in ROLES {
            insert.values_panic([
                (*name).into(),
                (*description).into(),
                Expr::current_timestamp(),
                Expr::current_timestamp(),
            ]);
        }
        db.execute(&insert).await?;

        for (role, _, granted) in ROLES {
            let mut select = Query::select()
                .expr(Expr::col((Alias::new("r"), Roles::Id)))
                .expr(Expr::col((Alias::new("p"), Permissions::Id)))
                .from_as(Roles::Table, Alias::new("r"))
                .from_as(Permissions::Table, Alias::new("p"))
                .and_where(Expr::col((Alias::new("r"), Roles::Name)).eq(*role))
                .to_owned();
            if !granted.is_empty() {
                select.and_where(
                    Expr::col((Alias::new("p"), Permissions::Name)).is_in(granted.iter().copied()),
                );
            }

            let insert = Query::insert()
                .into_table(Alias::new("role_permissions"))
                .columns([Alias::new("role_id"), Alias::new("permission_id")])
                .select_from(select)
                .map_err(|e| DbErr::Migration(e.to_string()))?
                .to_owned();
            db.execute(&insert).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let role_names: Vec<&str> = ROLES.iter().map(|(name, _, _)| *name).collect();
        let delete = Query::delete()
            .from_table(Roles::Table)
            .and_where(Expr::col(Roles::Name).is_in(role_names))
            .to_owned();
        db.execute(&delete).await?;

        let names: Vec<&str> = PERMISSIONS.iter().map(|(name, _, _)| *name).collect();
        let delete = Query::delete()
            .from_table(Permissions::Table)
            .and_where(Expr::col(Permissions::Name).is_in(names))
            .to_owned();
        db.execute(&delete).await?;
        Ok(())
    }
}
