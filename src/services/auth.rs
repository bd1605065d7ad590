//! Authentication service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rand::Rng;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{RegisterRequest, Role, User, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new library member and return the user with a token
    pub async fn register(&self, request: RegisterRequest) -> AppResult<(User, String)> {
        if self.repository.users.email_exists(&request.email, None).await? {
            return Err(AppError::Conflict("Email already registered.".to_string()));
        }

        let password_hash = hash_password(&request.password)?;
        let library_id = generate_library_id(&self.repository).await?;
        let role = request.role.unwrap_or(Role::User);

        let user = self
            .repository
            .users
            .create(&request.name, &request.email, &password_hash, &library_id, role)
            .await?;

        tracing::info!("Registered user {} ({})", user.id, user.library_id);

        let token = self.token_for_user(&user)?;
        Ok((user, token))
    }

    /// Authenticate by email and password, returning the user with a token
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(User, String)> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

        if !verify_password(&user.password, password)? {
            return Err(AppError::Authentication("Invalid credentials".to_string()));
        }

        let token = self.token_for_user(&user)?;
        Ok((user, token))
    }

    /// Current user for a validated token
    pub async fn me(&self, user_id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(user_id).await
    }

    /// Create a JWT token for a user
    pub fn token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}

/// Hash a password with argon2
pub(crate) fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against its argon2 hash
pub(crate) fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generate a unique library card id in the format LIB-####.
///
/// Random four-digit attempts, with a timestamp-based fallback once the
/// attempt budget runs out.
pub(crate) async fn generate_library_id(repository: &Repository) -> AppResult<String> {
    const MAX_ATTEMPTS: u32 = 100;

    for _ in 0..MAX_ATTEMPTS {
        let number: u32 = rand::thread_rng().gen_range(1000..=9999);
        let library_id = format!("LIB-{:04}", number);
        if !repository.users.library_id_exists(&library_id).await? {
            return Ok(library_id);
        }
    }

    let fallback = format!("LIB-{:04}", Utc::now().timestamp() % 10_000);
    if repository.users.library_id_exists(&fallback).await? {
        return Err(AppError::Internal(
            "Failed to generate a unique library id".to_string(),
        ));
    }
    Ok(fallback)
}
