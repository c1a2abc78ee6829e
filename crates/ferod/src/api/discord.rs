use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    http::Http,
    model::{
        application::{
            Command, CommandOption, CommandOptionType, CommandType as DiscordCommandType,
        },
        permissions::Permissions,
    },
};
use tracing::{debug, warn};

use super::{ApiError, ApiResult, CommandApi, RegistrationScope, RemoteCommand};
use crate::command::{
    ChoiceValue, CommandData, CommandType, OptionChoice, OptionSpec, OptionType, PermissionBits,
};

/// [`CommandApi`] backed by Discord's HTTP API
#[derive(Clone)]
pub struct SerenityCommandApi {
    http: Arc<Http>,
}

impl SerenityCommandApi {
    /// `http` must already know the application id (see `Http::set_application_id`)
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    fn http(&self) -> &Http {
        &self.http
    }
}

#[async_trait]
impl CommandApi for SerenityCommandApi {
    async fn fetch(&self, scope: &RegistrationScope) -> ApiResult<Vec<RemoteCommand>> {
        let commands = match scope {
            RegistrationScope::Global => Command::get_global_commands(self.http()).await?,
            RegistrationScope::Guild(guild_id) => guild_id.get_commands(self.http()).await?,
        };

        debug!("Fetched {} {} application commands", commands.len(), scope);

        Ok(commands
            .iter()
            .filter_map(|command| match remote_from_discord(command, *scope) {
                Ok(remote) => Some(remote),
                Err(e) => {
                    warn!("Ignoring remote command: {}", e);
                    None
                }
            })
            .collect())
    }

    async fn create(
        &self,
        data: &CommandData,
        scope: &RegistrationScope,
    ) -> ApiResult<RemoteCommand> {
        let builder = create_command(data);
        let command = match scope {
            RegistrationScope::Global => Command::create_global_command(self.http(), builder).await?,
            RegistrationScope::Guild(guild_id) => {
                guild_id.create_command(self.http(), builder).await?
            }
        };

        remote_from_discord(&command, *scope)
    }

    async fn edit(&self, record: &RemoteCommand, data: &CommandData) -> ApiResult<RemoteCommand> {
        let payload = edit_payload(data)?;
        let command = match record.scope {
            RegistrationScope::Global => {
                self.http()
                    .edit_global_command(record.id, &payload)
                    .await?
            }
            RegistrationScope::Guild(guild_id) => {
                self.http()
                    .edit_guild_command(guild_id, record.id, &payload)
                    .await?
            }
        };

        remote_from_discord(&command, record.scope)
    }

    async fn delete(&self, record: &RemoteCommand) -> ApiResult<RemoteCommand> {
        match record.scope {
            RegistrationScope::Global => {
                Command::delete_global_command(self.http(), record.id).await?
            }
            RegistrationScope::Guild(guild_id) => {
                guild_id.delete_command(self.http(), record.id).await?
            }
        }

        Ok(record.clone())
    }
}

/// Convert a serenity command into the projection the reconciler compares
pub fn remote_from_discord(command: &Command, scope: RegistrationScope) -> ApiResult<RemoteCommand> {
    let unsupported = |reason: String| ApiError::Unsupported {
        name: command.name.clone(),
        reason,
    };

    let kind = match command.kind {
        DiscordCommandType::ChatInput => CommandType::Interactive,
        DiscordCommandType::Message => CommandType::MessageContextAction,
        DiscordCommandType::User => CommandType::UserContextAction,
        other => return Err(unsupported(format!("command type {:?}", other))),
    };

    let options = command
        .options
        .iter()
        .map(option_from_discord)
        .collect::<Result<Vec<_>, String>>()
        .map_err(unsupported)?;

    Ok(RemoteCommand {
        id: command.id,
        scope,
        name: command.name.clone(),
        kind,
        description: command.description.clone(),
        options,
        permissions: PermissionBits::from_bits(
            command
                .default_member_permissions
                .map(|p| p.bits())
                .unwrap_or_default(),
        ),
    })
}

fn option_from_discord(option: &CommandOption) -> Result<OptionSpec, String> {
    let kind = option_type_from_discord(option.kind)
        .ok_or_else(|| format!("option '{}' has type {:?}", option.name, option.kind))?;

    let choices = option
        .choices
        .iter()
        .filter_map(|choice| {
            let value = match &choice.value {
                Value::String(s) => ChoiceValue::String(s.clone()),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => ChoiceValue::Integer(i),
                    None => ChoiceValue::Number(n.as_f64()?),
                },
                _ => return None,
            };
            Some(OptionChoice {
                name: choice.name.clone(),
                value,
            })
        })
        .collect();

    Ok(OptionSpec {
        name: option.name.clone(),
        kind,
        description: option.description.clone(),
        required: option.required,
        choices,
        options: option
            .options
            .iter()
            .map(option_from_discord)
            .collect::<Result<_, _>>()?,
    })
}

fn option_type_from_discord(kind: CommandOptionType) -> Option<OptionType> {
    Some(match kind {
        CommandOptionType::SubCommand => OptionType::SubCommand,
        CommandOptionType::SubCommandGroup => OptionType::SubCommandGroup,
        CommandOptionType::String => OptionType::String,
        CommandOptionType::Integer => OptionType::Integer,
        CommandOptionType::Boolean => OptionType::Boolean,
        CommandOptionType::User => OptionType::User,
        CommandOptionType::Channel => OptionType::Channel,
        CommandOptionType::Role => OptionType::Role,
        CommandOptionType::Mentionable => OptionType::Mentionable,
        CommandOptionType::Number => OptionType::Number,
        CommandOptionType::Attachment => OptionType::Attachment,
        _ => return None,
    })
}

fn option_type_to_discord(kind: OptionType) -> CommandOptionType {
    match kind {
        OptionType::SubCommand => CommandOptionType::SubCommand,
        OptionType::SubCommandGroup => CommandOptionType::SubCommandGroup,
        OptionType::String => CommandOptionType::String,
        OptionType::Integer => CommandOptionType::Integer,
        OptionType::Boolean => CommandOptionType::Boolean,
        OptionType::User => CommandOptionType::User,
        OptionType::Channel => CommandOptionType::Channel,
        OptionType::Role => CommandOptionType::Role,
        OptionType::Mentionable => CommandOptionType::Mentionable,
        OptionType::Number => CommandOptionType::Number,
        OptionType::Attachment => CommandOptionType::Attachment,
    }
}

/// Build the create/edit payload for `data`
pub fn create_command(data: &CommandData) -> CreateCommand {
    let kind = match data.kind {
        CommandType::Interactive => DiscordCommandType::ChatInput,
        CommandType::MessageContextAction => DiscordCommandType::Message,
        CommandType::UserContextAction => DiscordCommandType::User,
    };

    let mut builder = CreateCommand::new(data.name.clone())
        .kind(kind)
        .set_options(data.options.iter().map(create_option).collect());

    if data.kind == CommandType::Interactive {
        builder = builder.description(data.description.clone());
    }

    if !data.permissions.is_empty() {
        builder = builder
            .default_member_permissions(Permissions::from_bits_truncate(data.permissions.bits()));
    }

    builder
}

/// Build the edit body for `data`.
///
/// Edits are partial updates, so an unrestricted command has to send an
/// explicit `null` to clear permissions set by an earlier registration.
pub fn edit_payload(data: &CommandData) -> ApiResult<Value> {
    let mut payload = serde_json::to_value(create_command(data))?;
    if data.permissions.is_empty() {
        if let Value::Object(fields) = &mut payload {
            fields.insert("default_member_permissions".to_string(), Value::Null);
        }
    }
    Ok(payload)
}

fn create_option(spec: &OptionSpec) -> CreateCommandOption {
    let mut option = CreateCommandOption::new(
        option_type_to_discord(spec.kind),
        spec.name.clone(),
        spec.description.clone(),
    )
    .required(spec.required);

    for choice in &spec.choices {
        option = match &choice.value {
            ChoiceValue::String(value) => option.add_string_choice(choice.name.clone(), value.clone()),
            ChoiceValue::Integer(value) => match i32::try_from(*value) {
                Ok(value) => option.add_int_choice(choice.name.clone(), value),
                Err(_) => option.add_number_choice(choice.name.clone(), *value as f64),
            },
            ChoiceValue::Number(value) => option.add_number_choice(choice.name.clone(), *value),
        };
    }

    for sub in &spec.options {
        option = option.add_sub_option(create_option(sub));
    }

    option
}
