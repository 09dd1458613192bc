//! Domain service for admin authentication and admin account management.
//!
//! Handles login, bearer token verification, the static server API key,
//! password changes, and superadmin-only admin management.

use serde::Serialize;
use thiserror::Error;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Could not validate credentials")]
    InvalidToken,

    #[error("Invalid or missing API key.")]
    InvalidApiKey,

    #[error("Only superadmins can perform this action")]
    Forbidden,

    #[error("Admin already exists: {0}")]
    AdminExists(String),

    #[error("Admin not found: {0}")]
    AdminNotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Store failures arrive as `anyhow` errors from the repositories.
impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

/// The authenticated admin behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminIdentity {
    pub username: String,
    pub is_super_admin: bool,
}

/// Successful login response body.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
}

impl IssuedToken {
    #[must_use]
    pub const fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer",
        }
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and issues an access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError>;

    /// Resolves a bearer token to the admin it was issued for.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for bad, expired, or subject-less
    /// tokens and for admins that no longer exist.
    async fn authenticate(&self, token: &str) -> Result<AdminIdentity, AuthError>;

    /// Checks the static key presented by downstream services.
    fn verify_server_api_key(&self, presented: Option<&str>) -> Result<(), AuthError>;

    /// Changes the calling admin's own password.
    async fn change_password(
        &self,
        admin: &AdminIdentity,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    /// Creates a regular admin. Superadmin only.
    async fn create_admin(
        &self,
        actor: &AdminIdentity,
        username: &str,
        password: &str,
    ) -> Result<AdminIdentity, AuthError>;

    /// Resets another admin's password. Superadmin only.
    async fn set_admin_password(
        &self,
        actor: &AdminIdentity,
        username: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    /// Creates the configured superadmin when no admin exists yet.
    /// Returns whether an account was created.
    async fn ensure_bootstrap_admin(&self) -> Result<bool, AuthError>;
}
