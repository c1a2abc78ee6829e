//! Ferod - Discord bot framework
//!
//! Commands and event listeners are declared as small manifest files (or in
//! code), loaded at startup, and kept in sync with Discord's registered
//! application commands before the gateway connection opens.

pub mod api;
pub mod builtin;
pub mod client;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod listener;
pub mod loader;
pub mod reconcile;
pub mod registry;
pub mod util;

mod test_utils;

pub use api::{CommandApi, RegistrationScope, RemoteCommand, SerenityCommandApi};
pub use client::{ClientState, FerodClient};
pub use command::{CommandBuilder, CommandDescriptor, CommandKind, CommandType, OptionSpec, OptionType};
pub use config::FerodConfig;
pub use error::{FerodError, Result};
pub use handlers::{BotContext, CommandHandler, HandlerRegistry, ListenerHandler};
pub use listener::{BotEvent, EventKind, EventListener, ListenerBuilder};
pub use reconcile::{ReconcileOptions, ReconcileReport, Reconciler};
pub use registry::{CommandRegistry, ListenerSet};

// Re-export serenity for convenience
pub use serenity;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        BotContext, BotEvent, CommandBuilder, CommandHandler, CommandType, EventKind,
        FerodClient, FerodConfig, FerodError, HandlerRegistry, ListenerBuilder, ListenerHandler,
        OptionSpec, OptionType, Result,
        builtin::help_command,
        command::{ChoiceValue, PermissionBits},
        config::{load_config, load_config_from_standard_locations, token_from_env},
    };
    pub use async_trait::async_trait;
}
