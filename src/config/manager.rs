//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config = Self::parse(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config.validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!("Configuration file not found at {}, using defaults", path.display());
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Config> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();
        Self::apply_env(&mut config, |key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override `config` with any `SESSIONGATE_*` values `lookup` returns
    pub fn apply_env<F>(config: &mut Config, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind_addr) = lookup("SESSIONGATE_BIND_ADDR") {
            config.server.bind_addr = bind_addr.parse::<SocketAddr>()
                .with_context(|| format!("Invalid SESSIONGATE_BIND_ADDR: {}", bind_addr))?;
        }

        if let Some(path) = lookup("SESSIONGATE_DATABASE") {
            config.storage.database_path = PathBuf::from(path);
        }

        if let Some(timeout) = lookup("SESSIONGATE_SESSION_IDLE_TIMEOUT") {
            config.sessions.idle_timeout = Some(
                humantime::parse_duration(&timeout)
                    .with_context(|| format!("Invalid SESSIONGATE_SESSION_IDLE_TIMEOUT: {}", timeout))?,
            );
        }

        if let Some(memory) = lookup("SESSIONGATE_HASH_MEMORY_KIB") {
            config.hashing.memory_kib = memory.parse::<u32>()
                .with_context(|| format!("Invalid SESSIONGATE_HASH_MEMORY_KIB: {}", memory))?;
        }

        if let Some(iterations) = lookup("SESSIONGATE_HASH_ITERATIONS") {
            config.hashing.iterations = iterations.parse::<u32>()
                .with_context(|| format!("Invalid SESSIONGATE_HASH_ITERATIONS: {}", iterations))?;
        }

        if let Some(conceal) = lookup("SESSIONGATE_CONCEAL_UNKNOWN_USERS") {
            config.policy.conceal_unknown_users = conceal.parse::<bool>()
                .with_context(|| format!("Invalid SESSIONGATE_CONCEAL_UNKNOWN_USERS: {}", conceal))?;
        }

        if let Some(log_level) = lookup("SESSIONGATE_LOG_LEVEL") {
            config.monitoring.log_level = log_level;
        }

        Ok(())
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_server_config()
            .with_context(|| "Server configuration validation failed")?;

        self.validate_storage_config()
            .with_context(|| "Storage configuration validation failed")?;

        self.validate_hashing_config()
            .with_context(|| "Hashing configuration validation failed")?;

        self.validate_session_config()
            .with_context(|| "Session configuration validation failed")?;

        self.validate_policy_config()
            .with_context(|| "Policy configuration validation failed")?;

        self.validate_monitoring_config()
            .with_context(|| "Monitoring configuration validation failed")?;

        Ok(())
    }

    fn validate_server_config(&self) -> Result<()> {
        if self.server.shutdown_timeout.as_secs() > 600 {
            bail!("shutdown_timeout cannot exceed 10 minutes");
        }
        Ok(())
    }

    fn validate_storage_config(&self) -> Result<()> {
        if self.storage.database_path.as_os_str().is_empty() {
            bail!("storage.database_path must not be empty");
        }
        Ok(())
    }

    fn validate_hashing_config(&self) -> Result<()> {
        if self.hashing.parallelism == 0 {
            bail!("hashing.parallelism must be greater than 0");
        }

        if self.hashing.iterations == 0 {
            bail!("hashing.iterations must be greater than 0");
        }

        if self.hashing.memory_kib < 8 * self.hashing.parallelism {
            bail!("hashing.memory_kib must be at least 8 * parallelism");
        }

        if self.hashing.memory_kib > 4 * 1024 * 1024 {
            bail!("hashing.memory_kib cannot exceed 4 GiB");
        }

        Ok(())
    }

    fn validate_session_config(&self) -> Result<()> {
        if let Some(timeout) = self.sessions.idle_timeout {
            if timeout.is_zero() {
                bail!("sessions.idle_timeout must be greater than 0 when set");
            }
        }

        if self.sessions.purge_interval.is_zero() {
            bail!("sessions.purge_interval must be greater than 0");
        }

        Ok(())
    }

    fn validate_policy_config(&self) -> Result<()> {
        if self.policy.min_username_len == 0 {
            bail!("policy.min_username_len must be at least 1");
        }

        if self.policy.min_password_len == 0 {
            bail!("policy.min_password_len must be at least 1");
        }

        Ok(())
    }

    fn validate_monitoring_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.monitoring.log_level.as_str()) {
            bail!("monitoring.log_level must be one of: {}", valid_log_levels.join(", "));
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        bind: Option<&str>,
        port: Option<u16>,
        database: Option<&Path>,
    ) {
        if let Some(bind_str) = bind {
            if let Ok(addr) = bind_str.parse::<SocketAddr>() {
                self.server.bind_addr = addr;
                tracing::info!("CLI override: bind address set to {}", addr);
            } else {
                tracing::warn!("Invalid bind address provided: {}", bind_str);
            }
        }

        if let Some(port) = port {
            self.server.bind_addr.set_port(port);
            tracing::info!("CLI override: port set to {}", port);
        }

        if let Some(path) = database {
            self.storage.database_path = path.to_path_buf();
            tracing::info!("CLI override: database set to {}", path.display());
        }
    }
}
