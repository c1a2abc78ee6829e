//! The remote side of command registration
//!
//! [`CommandApi`] is the seam between the reconciler and Discord. The
//! production implementation lives in [`discord`]; tests substitute mocks.

pub mod discord;

use std::fmt;

use async_trait::async_trait;
use serenity::model::id::{CommandId, GuildId};
use thiserror::Error;

use crate::command::{CommandData, CommandType, OptionSpec, PermissionBits};

pub use discord::SerenityCommandApi;

/// Where a command is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationScope {
    Global,
    Guild(GuildId),
}

impl RegistrationScope {
    /// Guild scope in dev mode with a usable guild id, global otherwise
    pub fn from_dev(dev: bool, dev_guild_id: Option<u64>) -> Self {
        match (dev, dev_guild_id) {
            (true, Some(id)) if id != 0 => Self::Guild(GuildId::new(id)),
            _ => Self::Global,
        }
    }
}

impl fmt::Display for RegistrationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Guild(id) => write!(f, "guild {}", id),
        }
    }
}

/// A command as Discord has it registered
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCommand {
    pub id: CommandId,
    pub scope: RegistrationScope,
    pub name: String,
    pub kind: CommandType,
    pub description: String,
    pub options: Vec<OptionSpec>,
    pub permissions: PermissionBits,
}

impl RemoteCommand {
    pub fn data(&self) -> CommandData {
        CommandData {
            name: self.name.clone(),
            kind: self.kind,
            description: self.description.clone(),
            options: self.options.clone(),
            permissions: self.permissions,
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Discord request failed: {0}")]
    Discord(#[from] serenity::Error),

    #[error("Could not encode command payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Unsupported remote command '{name}': {reason}")]
    Unsupported { name: String, reason: String },

    #[error("{0}")]
    Other(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Remote application command operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandApi: Send + Sync {
    /// All commands registered in `scope`
    async fn fetch(&self, scope: &RegistrationScope) -> ApiResult<Vec<RemoteCommand>>;

    async fn create(&self, data: &CommandData, scope: &RegistrationScope)
    -> ApiResult<RemoteCommand>;

    /// Overwrite `record` (in its own scope) with `data`
    async fn edit(&self, record: &RemoteCommand, data: &CommandData) -> ApiResult<RemoteCommand>;

    /// Remove `record` from its scope, returning what was removed
    async fn delete(&self, record: &RemoteCommand) -> ApiResult<RemoteCommand>;
}
