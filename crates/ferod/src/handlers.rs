//! Handler traits and the name → handler table manifests resolve against

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serenity::{client::Context, model::application::CommandInteraction};

use crate::{listener::BotEvent, registry::CommandRegistry};

/// What every handler gets to see besides its own payload
#[derive(Clone)]
pub struct BotContext {
    pub serenity: Context,
    pub commands: Arc<CommandRegistry>,
}

/// Runs when a command interaction for the owning descriptor arrives
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn run(&self, bot: &BotContext, command: &CommandInteraction) -> anyhow::Result<()>;
}

/// Runs whenever the listener's event fires
#[async_trait]
pub trait ListenerHandler: Send + Sync {
    async fn handle(&self, bot: &BotContext, event: &BotEvent) -> anyhow::Result<()>;
}

/// Handlers available to file-defined commands and listeners, by name
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    commands: HashMap<String, Arc<dyn CommandHandler>>,
    listeners: HashMap<String, Arc<dyn ListenerHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        self.register_command(name, handler);
        self
    }

    pub fn with_listener(
        mut self,
        name: impl Into<String>,
        handler: Arc<dyn ListenerHandler>,
    ) -> Self {
        self.register_listener(name, handler);
        self
    }

    /// Adds the built-in `help` command handler under the name `help`
    pub fn with_builtin_help(self) -> Self {
        self.with_command(
            crate::builtin::HELP_HANDLER,
            Arc::new(crate::builtin::HelpCommand),
        )
    }

    pub fn register_command(&mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        let name = name.into();
        if self.commands.insert(name.clone(), handler).is_some() {
            tracing::warn!("Command handler '{}' registered twice, keeping the last one", name);
        }
    }

    pub fn register_listener(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn ListenerHandler>,
    ) {
        let name = name.into();
        if self.listeners.insert(name.clone(), handler).is_some() {
            tracing::warn!("Listener handler '{}' registered twice, keeping the last one", name);
        }
    }

    pub fn command(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.commands.get(name).cloned()
    }

    pub fn listener(&self, name: &str) -> Option<Arc<dyn ListenerHandler>> {
        self.listeners.get(name).cloned()
    }

    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn listener_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.listeners.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test::{NoopHandler, NoopListener};

    #[test]
    fn test_lookup_by_name() {
        let handlers = HandlerRegistry::new()
            .with_command("ping", Arc::new(NoopHandler))
            .with_listener("on_ready", Arc::new(NoopListener));

        assert!(handlers.command("ping").is_some());
        assert!(handlers.command("pong").is_none());
        assert!(handlers.listener("on_ready").is_some());
        assert_eq!(handlers.listener_names(), vec!["on_ready".to_string()]);
    }

    #[test]
    fn test_builtin_help_registered() {
        let handlers = HandlerRegistry::new().with_builtin_help();
        assert_eq!(handlers.command_names(), vec!["help".to_string()]);
    }
}
