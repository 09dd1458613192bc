use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub litellm: LiteLlmConfig,

    pub security: SecurityConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// `sqlite:` or `postgres://` connection URL
    pub database_url: String,

    pub log_level: String,

    /// Audit event bus buffer size (default: 256)
    pub event_bus_buffer_size: usize,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/mama.db".to_string(),
            log_level: "info".to_string(),
            event_bus_buffer_size: 256,
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Directory holding the built admin UI (served under `/static`)
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:8000".to_string(),
                "http://127.0.0.1:8000".to_string(),
            ],
            static_dir: "frontend/dist".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret for admin access tokens
    pub jwt_secret: String,

    pub jwt_expire_minutes: i64,

    /// Static key accepted on the `/key` endpoints. Empty disables them.
    pub server_api_key: String,

    /// Superadmin created on startup when no admin exists yet.
    pub bootstrap_admin_username: String,

    pub bootstrap_admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-this-jwt-secret".to_string(),
            jwt_expire_minutes: 60,
            server_api_key: String::new(),
            bootstrap_admin_username: "mama".to_string(),
            bootstrap_admin_password: "change-me-now".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyProvisioning {
    /// Placeholder `<bird>-<number>` keys generated locally
    #[default]
    Local,
    /// Keys issued by the LiteLLM proxy
    Litellm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiteLlmConfig {
    pub key_provisioning: KeyProvisioning,

    pub url: String,

    pub master_key: String,

    pub timeout_seconds: u64,

    /// Retries for requests that never reached the proxy (connection errors)
    pub max_retries: u32,

    pub retry_delay_ms: u64,
}

impl Default for LiteLlmConfig {
    fn default() -> Self {
        Self {
            key_provisioning: KeyProvisioning::Local,
            url: "http://localhost:4000".to_string(),
            master_key: "sk-1234".to_string(),
            timeout_seconds: 10,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,

    /// Rehash legacy bcrypt passwords with Argon2id after a successful login
    pub auto_migrate_password_hashes: bool,

    pub min_password_length: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            auto_migrate_password_hashes: true,
            min_password_length: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "mama".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    /// Loads the first config file found, then applies `.env` / environment overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::load_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    /// Environment variable names shared with the deployment `.env` file.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_URL") {
            self.general.database_url = url;
        }
        if let Some(secret) = lookup("JWT_SECRET_KEY") {
            self.auth.jwt_secret = secret;
        }
        if let Some(key) = lookup("SERVER_API_KEY") {
            self.auth.server_api_key = key;
        }
        if let Some(url) = lookup("LITELLM_URL") {
            self.litellm.url = url;
        }
        if let Some(key) = lookup("LITELLM_MASTER_KEY") {
            self.litellm.master_key = key;
        }
        if let Some(timeout) = lookup("LITELLM_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.litellm.timeout_seconds = timeout;
        }
        if let Some(retries) = lookup("LITELLM_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.litellm.max_retries = retries;
        }
        // Seconds as a float, as written in existing `.env` files
        if let Some(delay) = lookup("LITELLM_RETRY_DELAY").and_then(|v| v.parse::<f64>().ok())
            && delay >= 0.0
        {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let millis = (delay * 1000.0) as u64;
            self.litellm.retry_delay_ms = millis;
        }
        if let Some(mode) = lookup("LITELLM_KEY_PROVISIONING") {
            match mode.to_ascii_lowercase().as_str() {
                "litellm" => self.litellm.key_provisioning = KeyProvisioning::Litellm,
                "local" => self.litellm.key_provisioning = KeyProvisioning::Local,
                other => tracing::warn!("Ignoring unknown LITELLM_KEY_PROVISIONING: {other}"),
            }
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("mama").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".mama").join("config.toml"));
        }

        paths
    }

    #[must_use]
    pub fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            anyhow::bail!("auth.jwt_secret cannot be empty");
        }

        if self.auth.jwt_expire_minutes <= 0 {
            anyhow::bail!("auth.jwt_expire_minutes must be > 0");
        }

        if self.litellm.key_provisioning == KeyProvisioning::Litellm {
            if self.litellm.url.is_empty() {
                anyhow::bail!("litellm.url cannot be empty when key_provisioning = \"litellm\"");
            }
            if self.litellm.master_key.is_empty() {
                anyhow::bail!(
                    "litellm.master_key cannot be empty when key_provisioning = \"litellm\""
                );
            }
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("general.min_db_connections exceeds max_db_connections");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.jwt_expire_minutes, 60);
        assert_eq!(config.litellm.key_provisioning, KeyProvisioning::Local);
        assert_eq!(config.litellm.timeout_seconds, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[auth]"));
        assert!(toml_str.contains("[litellm]"));
        assert!(toml_str.contains("key_provisioning = \"local\""));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [litellm]
            key_provisioning = "litellm"
            url = "http://gateway:4000"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.litellm.key_provisioning, KeyProvisioning::Litellm);
        assert_eq!(config.litellm.url, "http://gateway:4000");
        assert_eq!(config.litellm.master_key, "sk-1234");
        assert_eq!(config.auth.bootstrap_admin_username, "mama");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "postgres://mama:pw@db/mama"),
            ("JWT_SECRET_KEY", "s3cret"),
            ("SERVER_API_KEY", "server-key"),
            ("LITELLM_TIMEOUT", "25"),
            ("LITELLM_RETRY_DELAY", "0.5"),
            ("LITELLM_MAX_RETRIES", "not-a-number"),
            ("LITELLM_KEY_PROVISIONING", "LiteLLM"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.general.database_url, "postgres://mama:pw@db/mama");
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.auth.server_api_key, "server-key");
        assert_eq!(config.litellm.timeout_seconds, 25);
        assert_eq!(config.litellm.retry_delay_ms, 500);
        assert_eq!(config.litellm.max_retries, 3);
        assert_eq!(config.litellm.key_provisioning, KeyProvisioning::Litellm);
    }

    #[test]
    fn test_validate_rejects_missing_master_key() {
        let mut config = Config::default();
        config.litellm.key_provisioning = KeyProvisioning::Litellm;
        config.litellm.master_key.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.auth.jwt_secret.clear();
        assert!(config.validate().is_err());
    }
}
