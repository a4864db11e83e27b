//! User account service

use crate::{
    error::{AppError, AppResult},
    models::{
        user::{CreateUser, UpdateUser, UserQuery, UserStats},
        Page, Role, User,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &UserQuery, page: Page) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.list(query, page).await
    }

    pub async fn get(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn create(&self, data: &CreateUser) -> AppResult<User> {
        if self.repository.users.username_exists(data.username.trim(), None).await? {
            return Err(AppError::Conflict(format!("Username '{}' is already taken", data.username)));
        }
        self.check_reader_link(data.role, data.reader_id).await?;

        let user = self.repository.users.create(data).await?;
        tracing::info!("User {} created with role {}", user.username, user.role);
        Ok(user)
    }

    pub async fn update(&self, id: i32, data: &UpdateUser) -> AppResult<User> {
        let current = self.repository.users.get_by_id(id).await?;

        if let Some(ref username) = data.username {
            if self.repository.users.username_exists(username.trim(), Some(id)).await? {
                return Err(AppError::Conflict(format!("Username '{}' is already taken", username)));
            }
        }

        let role = data.role.unwrap_or(current.role);
        let reader_id = data.reader_id.or(current.reader_id);
        self.check_reader_link(role, reader_id).await?;

        self.repository.users.update(id, data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.users.delete(id).await
    }

    pub async fn stats(&self) -> AppResult<UserStats> {
        self.repository.users.stats().await
    }

    /// Reader accounts must point at an existing reader
    async fn check_reader_link(&self, role: Role, reader_id: Option<i32>) -> AppResult<()> {
        match (role, reader_id) {
            (Role::Reader, None) => Err(AppError::Validation(
                "A reader account requires reader_id".to_string(),
            )),
            (_, Some(reader_id)) => {
                self.repository.readers.get_by_id(reader_id).await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
