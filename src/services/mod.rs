pub mod audit;
pub use audit::{AuditLog, AuditLogService};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AdminIdentity, AuthError, AuthService, IssuedToken};
pub use auth_service_impl::SeaOrmAuthService;

pub mod key_provisioner;
pub use key_provisioner::{KeyProvisioner, LiteLlmKeyProvisioner, LocalKeyProvisioner};

pub mod token;
pub use token::{Claims, TokenCodec};

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{CreateUser, UserError, UserService, UserUpdate};
pub use user_service_impl::SeaOrmUserService;
