//! User management service (admin operations)

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, Role, UpdateUser, User, UserQuery},
    repository::Repository,
    services::auth::{generate_library_id, hash_password},
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List users with pagination
    pub async fn list_users(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.list(query).await
    }

    /// Get user by ID
    pub async fn get_user(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Create a user on behalf of an administrator
    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        if self.repository.users.email_exists(&user.email, None).await? {
            return Err(AppError::Conflict("Email already registered.".to_string()));
        }

        let password_hash = hash_password(&user.password)?;
        let library_id = generate_library_id(&self.repository).await?;
        let role = user.role.unwrap_or(Role::User);

        self.repository
            .users
            .create(&user.name, &user.email, &password_hash, &library_id, role)
            .await
    }

    /// Update a user
    pub async fn update_user(&self, id: i32, changes: UpdateUser) -> AppResult<User> {
        if let Some(ref email) = changes.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict("Email already registered.".to_string()));
            }
        }

        let password_hash = match changes.password {
            Some(ref password) => Some(hash_password(password)?),
            None => None,
        };

        self.repository.users.update(id, &changes, password_hash).await
    }

    /// Delete a user. Refused while the user holds open borrow records.
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.repository.users.get_by_id(id).await?;

        if self.repository.users.has_open_borrows(id).await? {
            return Err(AppError::Conflict(
                "Cannot delete a user with open borrow records.".to_string(),
            ));
        }

        self.repository.users.delete(id).await
    }
}
