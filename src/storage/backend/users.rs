use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    TransactionTrait,
};
use tracing::info;

use super::SeaOrmStorage;
use super::rbac::grant_role_in;
use crate::errors::{BiolinkerError, Result};

use migration::entities::user;

pub const ACTIVE_STATUS: &str = "active";

/// Account row to insert; `password_hash` is already an argon2 PHC string
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: String,
}

impl SeaOrmStorage {
    pub async fn find_user(&self, user_id: i64) -> Result<Option<user::Model>> {
        Ok(user::Entity::find_by_id(user_id).one(&self.db).await?)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await?)
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<user::Model> {
        insert_user(&self.db, new_user).await
    }

    /// Insert the account and its first role membership together; neither
    /// exists if either write fails
    pub async fn create_user_with_role(
        &self,
        new_user: NewUser,
        role_name: &str,
    ) -> Result<user::Model> {
        let txn = self.db.begin().await?;
        let model = insert_user(&txn, new_user).await?;
        grant_role_in(&txn, model.id, role_name).await?;
        txn.commit().await?;
        Ok(model)
    }

    /// Whether the account exists and its status is `active`
    pub async fn is_user_active(&self, user_id: i64) -> Result<bool> {
        Ok(self
            .find_user(user_id)
            .await?
            .is_some_and(|u| u.status == ACTIVE_STATUS))
    }

    /// Flip `status` between `active` and `inactive`
    pub async fn set_user_status(&self, user_id: i64, status: &str) -> Result<()> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::Status, Expr::value(status))
            .filter(user::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(BiolinkerError::not_found(format!("user {} not found", user_id)));
        }
        Ok(())
    }
}

async fn insert_user<C: ConnectionTrait>(conn: &C, new_user: NewUser) -> Result<user::Model> {
    let email = new_user.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(BiolinkerError::validation("email must not be empty"));
    }
    let taken = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(conn)
        .await?
        .is_some();
    if taken {
        return Err(BiolinkerError::validation(format!(
            "email already registered: {}",
            email
        )));
    }

    let model = user::ActiveModel {
        email: Set(email),
        password_hash: Set(new_user.password_hash),
        display_name: Set(new_user.display_name),
        bio: Set(None),
        avatar_url: Set(None),
        role: Set(new_user.role),
        status: Set(ACTIVE_STATUS.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    info!("User created: id={} role={}", model.id, model.role);
    Ok(model)
}
