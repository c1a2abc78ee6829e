use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serenity::prelude::GatewayIntents;

use crate::{FerodError, Result, api::RegistrationScope, reconcile::ReconcileOptions};

/// Name of the project-local configuration file
pub const CONFIG_FILE: &str = "ferod.toml";

/// Environment variable the bot token is read from
pub const TOKEN_ENV: &str = "DISCORD_TOKEN";

/// Resolve a path relative to a base directory
/// If the path is absolute, return it as-is
/// If the path is relative, resolve it relative to the base directory
fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FerodConfig {
    /// Register commands in `dev_guild_id` instead of globally
    pub dev: bool,

    pub dev_guild_id: Option<u64>,

    pub commands_path: PathBuf,

    pub event_listeners_path: PathBuf,

    /// Glob, relative to each module directory
    pub module_pattern: String,

    pub edit_commands: bool,

    pub delete_unused_commands: bool,

    pub log_loaded_commands: bool,

    /// Route command interactions to their handlers
    pub dispatch_commands: bool,

    /// Request the privileged message content intent
    pub message_content_intent: bool,
}

impl Default for FerodConfig {
    fn default() -> Self {
        Self {
            dev: false,
            dev_guild_id: None,
            commands_path: PathBuf::from("commands"),
            event_listeners_path: PathBuf::from("listeners"),
            module_pattern: crate::loader::DEFAULT_PATTERN.to_string(),
            edit_commands: true,
            delete_unused_commands: false,
            log_loaded_commands: true,
            dispatch_commands: true,
            message_content_intent: false,
        }
    }
}

impl FerodConfig {
    /// Check settings that depend on each other
    pub fn validate(&self) -> Result<()> {
        let mut missing_fields = Vec::new();
        let mut issues = Vec::new();

        if self.dev && self.dev_guild_id.is_none() {
            missing_fields.push("dev_guild_id".to_string());
            issues.push("`dev_guild_id` is required when `dev` is enabled".to_string());
        }
        if self.dev_guild_id == Some(0) {
            issues.push("`dev_guild_id` must be a non-zero snowflake".to_string());
        }
        if self.module_pattern.trim().is_empty() {
            missing_fields.push("module_pattern".to_string());
            issues.push("`module_pattern` must not be empty".to_string());
        } else if let Err(e) = glob::Pattern::new(&self.module_pattern) {
            issues.push(format!("`module_pattern` is not a valid glob: {}", e));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(FerodError::InvalidConfiguration {
                issues: issues.join("; "),
                config_path: None,
                missing_fields,
            })
        }
    }

    /// Where commands are registered and reconciled
    pub fn active_scope(&self) -> RegistrationScope {
        RegistrationScope::from_dev(self.dev, self.dev_guild_id)
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            edit: self.edit_commands,
            delete_unused: self.delete_unused_commands,
        }
    }

    /// Intents every client asks for; listeners may add more
    pub fn intents(&self) -> GatewayIntents {
        let mut intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::GUILD_MESSAGE_REACTIONS
            | GatewayIntents::DIRECT_MESSAGES;
        if self.message_content_intent {
            intents |= GatewayIntents::MESSAGE_CONTENT;
        }
        intents
    }

    /// Make relative module directories relative to `base_dir`
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        self.commands_path = resolve_path(base_dir, &self.commands_path);
        self.event_listeners_path = resolve_path(base_dir, &self.event_listeners_path);
    }
}

/// Load configuration from a TOML file
pub async fn load_config(path: &Path) -> Result<FerodConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FerodError::ConfigIo {
            config_path: path.to_path_buf(),
            expected: "a readable TOML file".to_string(),
            cause: Box::new(e),
        })?;

    let mut config: FerodConfig = toml::from_str(&content).map_err(|e| FerodError::ConfigIo {
        config_path: path.to_path_buf(),
        expected: "a valid ferod configuration".to_string(),
        cause: Box::new(e),
    })?;

    // Resolve paths relative to the config file's directory
    let base_dir = path.parent().unwrap_or(Path::new("."));
    config.resolve_paths(base_dir);

    config.validate().map_err(|e| match e {
        FerodError::InvalidConfiguration {
            issues,
            missing_fields,
            ..
        } => FerodError::InvalidConfiguration {
            issues,
            config_path: Some(path.to_path_buf()),
            missing_fields,
        },
        other => other,
    })?;

    Ok(config)
}

/// Save configuration to a TOML file
pub async fn save_config(config: &FerodConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).map_err(|e| FerodError::ConfigIo {
        config_path: path.to_path_buf(),
        expected: "a serializable configuration".to_string(),
        cause: Box::new(e),
    })?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FerodError::Io {
                path: parent.to_path_buf(),
                cause: e,
            })?;
    }

    tokio::fs::write(path, content)
        .await
        .map_err(|e| FerodError::Io {
            path: path.to_path_buf(),
            cause: e,
        })?;

    Ok(())
}

/// Read the bot token from [`TOKEN_ENV`]
pub fn token_from_env() -> Result<String> {
    match std::env::var(TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(FerodError::InvalidConfiguration {
            issues: format!("`{}` is not set", TOKEN_ENV),
            config_path: None,
            missing_fields: vec![TOKEN_ENV.to_string()],
        }),
    }
}

/// Get the default configuration file paths in order of precedence
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // Project-specific config
    paths.push(PathBuf::from(CONFIG_FILE));

    // User config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("ferod").join("config.toml"));
    }

    paths
}

/// Load configuration from the first file found in the standard locations
pub async fn load_config_from_standard_locations() -> Result<FerodConfig> {
    for path in config_paths() {
        if path.exists() {
            return load_config(&path).await;
        }
    }

    // No config found, return default
    Ok(FerodConfig::default())
}
