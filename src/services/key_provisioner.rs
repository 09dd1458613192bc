//! Strategies for issuing the access key stored on each user.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::clients::litellm::{LiteLlmClient, LiteLlmError};
use crate::config::{KeyProvisioning, LiteLlmConfig};
use crate::domain::keys::generate_bird_key;

#[async_trait]
pub trait KeyProvisioner: Send + Sync {
    /// Whether keys live in the gateway and must be kept in sync with it.
    fn is_remote(&self) -> bool;

    async fn provision(&self, user_id: &str, models: &[String]) -> Result<String, LiteLlmError>;

    async fn revoke(&self, key: &str) -> Result<(), LiteLlmError>;

    async fn update_models(&self, key: &str, models: &[String]) -> Result<(), LiteLlmError>;

    async fn update_alias(&self, key: &str, alias: &str) -> Result<(), LiteLlmError>;

    /// Models attached to the key on the gateway, `None` when unknown or unrestricted.
    async fn key_models(&self, key: &str) -> Result<Option<Vec<String>>, LiteLlmError>;

    async fn available_models(&self) -> Result<Vec<Value>, LiteLlmError>;
}

/// Builds the provisioner selected by `litellm.key_provisioning`.
pub fn from_config(config: &LiteLlmConfig) -> Result<Arc<dyn KeyProvisioner>, LiteLlmError> {
    Ok(match config.key_provisioning {
        KeyProvisioning::Local => Arc::new(LocalKeyProvisioner),
        KeyProvisioning::Litellm => Arc::new(LiteLlmKeyProvisioner::new(LiteLlmClient::new(
            config,
        )?)),
    })
}

/// Generates `<bird>-<NNNN>` placeholder keys without contacting any gateway.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalKeyProvisioner;

#[async_trait]
impl KeyProvisioner for LocalKeyProvisioner {
    fn is_remote(&self) -> bool {
        false
    }

    async fn provision(&self, _user_id: &str, _models: &[String]) -> Result<String, LiteLlmError> {
        Ok(generate_bird_key())
    }

    async fn revoke(&self, _key: &str) -> Result<(), LiteLlmError> {
        Ok(())
    }

    async fn update_models(&self, _key: &str, _models: &[String]) -> Result<(), LiteLlmError> {
        Ok(())
    }

    async fn update_alias(&self, _key: &str, _alias: &str) -> Result<(), LiteLlmError> {
        Ok(())
    }

    async fn key_models(&self, _key: &str) -> Result<Option<Vec<String>>, LiteLlmError> {
        Ok(None)
    }

    async fn available_models(&self) -> Result<Vec<Value>, LiteLlmError> {
        Ok(vec![])
    }
}

/// Issues real keys through the LiteLLM proxy, aliased by `user_id`.
#[derive(Debug, Clone)]
pub struct LiteLlmKeyProvisioner {
    client: LiteLlmClient,
}

impl LiteLlmKeyProvisioner {
    #[must_use]
    pub const fn new(client: LiteLlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeyProvisioner for LiteLlmKeyProvisioner {
    fn is_remote(&self) -> bool {
        true
    }

    async fn provision(&self, user_id: &str, models: &[String]) -> Result<String, LiteLlmError> {
        self.client
            .generate_key(models, Some(user_id), None, Some(user_id))
            .await
    }

    async fn revoke(&self, key: &str) -> Result<(), LiteLlmError> {
        self.client.delete_key(key).await
    }

    async fn update_models(&self, key: &str, models: &[String]) -> Result<(), LiteLlmError> {
        self.client.update_key_models(key, models).await
    }

    async fn update_alias(&self, key: &str, alias: &str) -> Result<(), LiteLlmError> {
        self.client.update_key_alias(key, alias).await
    }

    async fn key_models(&self, key: &str) -> Result<Option<Vec<String>>, LiteLlmError> {
        self.client.get_key_models(key).await
    }

    async fn available_models(&self) -> Result<Vec<Value>, LiteLlmError> {
        self.client.list_models().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_provisioner_issues_bird_keys() {
        let provisioner = from_config(&LiteLlmConfig::default()).unwrap();
        assert!(!provisioner.is_remote());

        let key = provisioner.provision("alice", &[]).await.unwrap();
        assert!(key.contains('-'));
        assert!(provisioner.revoke(&key).await.is_ok());
        assert_eq!(provisioner.key_models(&key).await.unwrap(), None);
        assert!(provisioner.available_models().await.unwrap().is_empty());
    }

    #[test]
    fn litellm_provisioner_selected_by_config() {
        let config = LiteLlmConfig {
            key_provisioning: KeyProvisioning::Litellm,
            ..LiteLlmConfig::default()
        };
        assert!(from_config(&config).unwrap().is_remote());
    }
}
