//! `SeaORM` implementation of the `AuthService` trait.

use crate::config::{AuthConfig, SecurityConfig};
use crate::db::Store;
use crate::domain::events::{AuditEvent, EventType, MAX_ADMIN_ID_LEN};
use crate::services::audit::AuditLog;
use crate::services::auth_service::{AdminIdentity, AuthError, AuthService, IssuedToken};
use crate::services::token::TokenCodec;
use async_trait::async_trait;
use tracing::{info, warn};

pub struct SeaOrmAuthService {
    store: Store,
    audit: AuditLog,
    tokens: TokenCodec,
    auth: AuthConfig,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, audit: AuditLog, auth: AuthConfig, security: SecurityConfig) -> Self {
        Self {
            store,
            audit,
            tokens: TokenCodec::new(&auth),
            auth,
            security,
        }
    }

    fn check_new_password(&self, new_password: &str) -> Result<(), AuthError> {
        if new_password.chars().count() < self.security.min_password_length {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                self.security.min_password_length
            )));
        }
        Ok(())
    }

    fn require_super_admin(
        &self,
        actor: &AdminIdentity,
        event_type: EventType,
        action: &str,
    ) -> Result<(), AuthError> {
        if actor.is_super_admin {
            return Ok(());
        }
        self.audit.record(
            AuditEvent::failure(event_type, format!("{action} denied - not a superadmin"))
                .by(&actor.username),
        );
        Err(AuthError::Forbidden)
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let admin = self
            .store
            .verify_admin_password(username, password, &self.security)
            .await?;

        let Some(admin) = admin else {
            // Unvalidated input; keep it within the audit column.
            let attempted: String = username.chars().take(MAX_ADMIN_ID_LEN).collect();
            self.audit.record(
                AuditEvent::failure(EventType::Login, "Login failed - incorrect username or password")
                    .by(attempted),
            );
            return Err(AuthError::InvalidCredentials);
        };

        let token = self
            .tokens
            .issue(&admin.username, admin.is_super_admin)
            .map_err(|e| AuthError::Internal(format!("Failed to issue token: {e}")))?;

        self.audit
            .record(AuditEvent::success(EventType::Login, "Login successful").by(&admin.username));

        Ok(IssuedToken::bearer(token))
    }

    async fn authenticate(&self, token: &str) -> Result<AdminIdentity, AuthError> {
        let claims = self.tokens.decode(token).map_err(|_| AuthError::InvalidToken)?;
        let username = claims.sub.ok_or(AuthError::InvalidToken)?;

        // Privileges come from the database, not the token.
        let admin = self
            .store
            .get_admin_by_username(&username)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        Ok(AdminIdentity {
            username: admin.username,
            is_super_admin: admin.is_super_admin,
        })
    }

    fn verify_server_api_key(&self, presented: Option<&str>) -> Result<(), AuthError> {
        let expected = self.auth.server_api_key.as_str();
        let presented = presented
            .map(str::trim)
            .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).trim());

        match presented {
            Some(key) if !expected.is_empty() && key == expected => Ok(()),
            _ => Err(AuthError::InvalidApiKey),
        }
    }

    async fn change_password(
        &self,
        admin: &AdminIdentity,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let verified = self
            .store
            .verify_admin_password(&admin.username, old_password, &self.security)
            .await?;

        if verified.is_none() {
            self.audit.record(
                AuditEvent::failure(
                    EventType::PasswordChange,
                    "Password change failed - incorrect old password",
                )
                .by(&admin.username),
            );
            return Err(AuthError::Validation("Old password is incorrect".to_string()));
        }

        if old_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from the old password".to_string(),
            ));
        }
        self.check_new_password(new_password)?;

        self.store
            .update_admin_password(&admin.username, new_password, &self.security)
            .await?;

        self.audit.record(
            AuditEvent::success(EventType::PasswordChange, "Password changed successfully")
                .by(&admin.username),
        );

        Ok(())
    }

    async fn create_admin(
        &self,
        actor: &AdminIdentity,
        username: &str,
        password: &str,
    ) -> Result<AdminIdentity, AuthError> {
        self.require_super_admin(actor, EventType::AdminCreate, "Admin creation")?;
        self.check_new_password(password)?;

        let created = self
            .store
            .create_admin(username, password, false, &self.security)
            .await?;

        let Some(created) = created else {
            self.audit.record(
                AuditEvent::failure(
                    EventType::AdminCreate,
                    format!("Failed to create admin - username already exists: {username}"),
                )
                .by(&actor.username),
            );
            return Err(AuthError::AdminExists(username.to_string()));
        };

        self.audit.record(
            AuditEvent::success(
                EventType::AdminCreate,
                format!("Admin created successfully: {}", created.username),
            )
            .by(&actor.username),
        );

        Ok(AdminIdentity {
            username: created.username,
            is_super_admin: created.is_super_admin,
        })
    }

    async fn set_admin_password(
        &self,
        actor: &AdminIdentity,
        username: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.require_super_admin(actor, EventType::PasswordChange, "Password reset")?;
        self.check_new_password(new_password)?;

        let updated = self
            .store
            .update_admin_password(username, new_password, &self.security)
            .await?;

        if !updated {
            self.audit.record(
                AuditEvent::failure(
                    EventType::PasswordChange,
                    format!("Password reset failed - admin not found: {username}"),
                )
                .by(&actor.username),
            );
            return Err(AuthError::AdminNotFound(username.to_string()));
        }

        self.audit.record(
            AuditEvent::success(
                EventType::PasswordChange,
                format!("Password reset for admin: {username}"),
            )
            .by(&actor.username),
        );

        Ok(())
    }

    async fn ensure_bootstrap_admin(&self) -> Result<bool, AuthError> {
        if self.store.count_admins().await? > 0 {
            return Ok(false);
        }

        let username = &self.auth.bootstrap_admin_username;
        self.store
            .create_admin(
                username,
                &self.auth.bootstrap_admin_password,
                true,
                &self.security,
            )
            .await?;

        if self.auth.bootstrap_admin_password == AuthConfig::default().bootstrap_admin_password {
            warn!("Bootstrap superadmin '{username}' uses the default password, change it now");
        }
        info!("Created bootstrap superadmin '{username}'");

        Ok(true)
    }
}
