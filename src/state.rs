use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::key_provisioner;
use crate::services::{
    AuditLog, AuditLogService, AuthService, KeyProvisioner, SeaOrmAuthService, SeaOrmUserService,
    UserService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub audit: AuditLog,

    pub audit_service: Arc<AuditLogService>,

    pub keys: Arc<dyn KeyProvisioner>,

    pub auth_service: Arc<dyn AuthService>,

    pub user_service: Arc<dyn UserService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let keys = key_provisioner::from_config(&config.litellm)?;
        Self::with_key_provisioner(config, keys).await
    }

    /// Builds the state around an explicit key provisioner.
    pub async fn with_key_provisioner(
        config: Config,
        keys: Arc<dyn KeyProvisioner>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_url,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let audit = AuditLog::new(config.general.event_bus_buffer_size);

        let audit_service = Arc::new(AuditLogService::new(store.clone(), audit.clone()));
        audit_service.clone().start_listener();

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            audit.clone(),
            config.auth.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        let user_service = Arc::new(SeaOrmUserService::new(
            store.clone(),
            audit.clone(),
            keys.clone(),
        )) as Arc<dyn UserService>;

        Ok(Self {
            config: Arc::new(config),
            store,
            audit,
            audit_service,
            keys,
            auth_service,
            user_service,
        })
    }
}
