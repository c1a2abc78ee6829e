//! Gateway event handling
//!
//! Every handler future is run behind [`guarded`], so an `Err` or a panic in
//! user code is logged and never reaches serenity.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::join_all;
use serenity::{
    all::{Context, EventHandler},
    builder::{
        CreateInteractionResponse, CreateInteractionResponseFollowup,
        CreateInteractionResponseMessage,
    },
    model::{
        application::{CommandInteraction, Interaction},
        channel::{Message, Reaction},
        gateway::Ready,
        guild::Member,
    },
};
use tracing::{debug, error, info, warn};

use crate::{
    FerodError, Result,
    command::CommandDescriptor,
    handlers::BotContext,
    listener::BotEvent,
    registry::{CommandRegistry, ListenerSet},
};

/// Sent, ephemerally, when a command handler fails
pub const COMMAND_FAILURE_MESSAGE: &str = "There was an error while executing this command.";

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

/// Await a handler, turning both its error and any panic into [`FerodError::Handler`]
pub async fn guarded<F>(handler: impl Into<String>, future: F) -> Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(FerodError::Handler {
            handler: handler.into(),
            reason: format!("{:#}", e),
        }),
        Err(payload) => Err(FerodError::Handler {
            handler: handler.into(),
            reason: panic_message(payload.as_ref()),
        }),
    }
}

/// Where a command interaction goes
#[derive(Debug)]
pub enum CommandRoute<'a> {
    /// Run this command's handler
    Run(&'a CommandDescriptor),
    /// No loaded command has the name
    Unknown,
    /// Command dispatch is turned off; listeners still see the interaction
    Disabled,
}

/// Decide how to handle an interaction for the command `name`
pub fn route_command<'a>(commands: &'a CommandRegistry, name: &str, dispatch: bool) -> CommandRoute<'a> {
    if !dispatch {
        return CommandRoute::Disabled;
    }
    match commands.get(name) {
        Some(command) => CommandRoute::Run(command),
        None => CommandRoute::Unknown,
    }
}

/// Routes gateway events to bound listeners and command interactions to their handlers
pub struct FerodEventHandler {
    commands: Arc<CommandRegistry>,
    listeners: Arc<ListenerSet>,
    dispatch_commands: bool,
}

impl FerodEventHandler {
    pub fn new(
        commands: Arc<CommandRegistry>,
        listeners: Arc<ListenerSet>,
        dispatch_commands: bool,
    ) -> Self {
        Self {
            commands,
            listeners,
            dispatch_commands,
        }
    }

    fn bot(&self, ctx: Context) -> BotContext {
        BotContext {
            serenity: ctx,
            commands: self.commands.clone(),
        }
    }

    /// Run every listener bound to the event concurrently
    async fn emit(&self, bot: &BotContext, event: &BotEvent) {
        let kind = event.kind();
        let listeners = self.listeners.for_event(kind);
        if listeners.is_empty() {
            return;
        }

        debug!("Dispatching {} to {} listener(s)", kind, listeners.len());

        let results = join_all(listeners.iter().map(|listener| {
            guarded(
                format!("{} listener", kind),
                listener.handler().handle(bot, event),
            )
        }))
        .await;

        for e in results.into_iter().filter_map(|r| r.err()) {
            log_handler_error(&e);
        }
    }

    async fn run_command(&self, bot: &BotContext, interaction: &CommandInteraction) {
        let name = &interaction.data.name;
        let command = match route_command(&self.commands, name, self.dispatch_commands) {
            CommandRoute::Run(command) => command,
            CommandRoute::Unknown => {
                warn!("Received interaction for unknown command '{}'", name);
                return;
            }
            CommandRoute::Disabled => return,
        };

        let result = guarded(
            format!("command '{}'", name),
            command.handler().run(bot, interaction),
        )
        .await;

        if let Err(e) = result {
            log_handler_error(&e);
            report_failure(bot, interaction).await;
        }
    }
}

fn log_handler_error(error: &FerodError) {
    match error {
        FerodError::Handler { handler, reason } => error!("Handler for {} failed: {}", handler, reason),
        other => error!("{}", other),
    }
}

fn failure_response() -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(COMMAND_FAILURE_MESSAGE)
            .ephemeral(true),
    )
}

fn failure_followup() -> CreateInteractionResponseFollowup {
    CreateInteractionResponseFollowup::new()
        .content(COMMAND_FAILURE_MESSAGE)
        .ephemeral(true)
}

/// Tell the user their command failed, replying or following up as needed
async fn report_failure(bot: &BotContext, interaction: &CommandInteraction) {
    // Fails when the handler already replied or deferred
    if interaction
        .create_response(&bot.serenity, failure_response())
        .await
        .is_ok()
    {
        return;
    }

    if let Err(e) = interaction.create_followup(&bot.serenity, failure_followup()).await {
        warn!("Could not report command failure to user: {}", e);
    }
}

#[async_trait]
impl EventHandler for FerodEventHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);
        let bot = self.bot(ctx);
        self.emit(&bot, &BotEvent::Ready(ready)).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let bot = self.bot(ctx);
        let event = BotEvent::InteractionCreate(interaction);

        let command = match &event {
            BotEvent::InteractionCreate(Interaction::Command(command)) => Some(command),
            _ => None,
        };

        let run_command = async {
            if let Some(command) = command {
                self.run_command(&bot, command).await;
            }
        };

        futures::join!(self.emit(&bot, &event), run_command);
    }

    async fn message(&self, ctx: Context, message: Message) {
        let bot = self.bot(ctx);
        self.emit(&bot, &BotEvent::MessageCreate(message)).await;
    }

    async fn guild_member_addition(&self, ctx: Context, member: Member) {
        let bot = self.bot(ctx);
        self.emit(&bot, &BotEvent::GuildMemberAdd(member)).await;
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        let bot = self.bot(ctx);
        self.emit(&bot, &BotEvent::MessageReactionAdd(reaction)).await;
    }
}
