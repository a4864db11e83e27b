//! Users repository for database operations

use sqlx::{Pool, Postgres};

use super::{like_pattern, where_clause};
use crate::{
    error::{AppError, AppResult},
    models::{
        user::{CreateUser, UpdateUser, UserQuery, UserStats},
        Page, StatEntry, User,
    },
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List users with pagination
    pub async fn list(&self, query: &UserQuery, page: Page) -> AppResult<(Vec<User>, i64)> {
        let search = like_pattern(&query.search);

        let mut conditions = Vec::new();
        let mut idx = 1;

        if search.is_some() {
            conditions.push(format!(
                "(LOWER(username) LIKE ${0} OR LOWER(COALESCE(display_name, '')) LIKE ${0} OR LOWER(COALESCE(email, '')) LIKE ${0})",
                idx
            ));
            idx += 1;
        }
        if query.role.is_some() {
            conditions.push(format!("role = ${}", idx));
            idx += 1;
        }
        if query.is_active.is_some() {
            conditions.push(format!("is_active = ${}", idx));
        }

        let where_clause = where_clause(&conditions);

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut builder = $builder;
                if let Some(ref v) = search { builder = builder.bind(v); }
                if let Some(v) = query.role { builder = builder.bind(v); }
                if let Some(v) = query.is_active { builder = builder.bind(v); }
                builder
            }};
        }

        let count_q = format!("SELECT COUNT(*) FROM users {}", where_clause);
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_q))
            .fetch_one(&self.pool)
            .await?;

        let select_q = format!(
            "SELECT * FROM users {} ORDER BY username LIMIT {} OFFSET {}",
            where_clause,
            page.per_page,
            page.offset()
        );
        let users = bind_filters!(sqlx::query_as::<_, User>(&select_q))
            .fetch_all(&self.pool)
            .await?;

        Ok((users, total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Case-insensitive username lookup, ignoring `exclude_id`
    pub async fn username_exists(&self, username: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1) AND ($2::int IS NULL OR id != $2))",
        )
        .bind(username)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn create(&self, user: &CreateUser) -> AppResult<User> {
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, display_name, email, role, reader_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user.username.trim())
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(user.role)
        .bind(user.reader_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update user
    pub async fn update(&self, id: i32, user: &UpdateUser) -> AppResult<User> {
        let mut sets = vec!["updated_at = NOW()".to_string()];
        let mut idx = 1;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(user.username, "username");
        add_field!(user.display_name, "display_name");
        add_field!(user.email, "email");
        add_field!(user.role, "role");
        add_field!(user.reader_id, "reader_id");
        add_field!(user.is_active, "is_active");

        let query = format!("UPDATE users SET {} WHERE id = {} RETURNING *", sets.join(", "), id);

        let mut builder = sqlx::query_as::<_, User>(&query);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(user.username);
        bind_field!(user.display_name);
        bind_field!(user.email);
        bind_field!(user.role);
        bind_field!(user.reader_id);
        bind_field!(user.is_active);

        builder
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    pub async fn stats(&self) -> AppResult<UserStats> {
        let (total, active): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM users")
                .fetch_one(&self.pool)
                .await?;

        let by_role = sqlx::query_as::<_, StatEntry>(
            "SELECT role AS label, COUNT(*)::bigint AS value FROM users GROUP BY 1 ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(UserStats {
            total,
            active,
            by_role,
        })
    }
}
