//! Ready-made commands

use std::sync::Arc;

use async_trait::async_trait;
use serenity::{
    builder::{CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateInteractionResponseFollowup},
    model::{Timestamp, application::CommandInteraction, permissions::Permissions},
};

use crate::{
    command::{CommandBuilder, OptionSpec, OptionType, PermissionBits},
    handlers::{BotContext, CommandHandler},
    registry::CommandRegistry,
    util::to_pascal_case,
};

/// Handler name manifests use to refer to [`HelpCommand`]
pub const HELP_HANDLER: &str = "help";

/// Lists every command by category, or details one command
pub struct HelpCommand;

/// Descriptor for the built-in help command
pub fn help_command() -> CommandBuilder {
    CommandBuilder::new()
        .name("help")
        .description("Shows a help embed")
        .category("utility")
        .permissions(PermissionBits::from_bits(Permissions::SEND_MESSAGES.bits()))
        .option(OptionSpec::new(
            OptionType::String,
            "command",
            "The command to receive help for",
        ))
        .handler(Arc::new(HelpCommand))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl HelpField {
    fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }
}

/// Embed body, independent of who asked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpPage {
    pub description: String,
    pub fields: Vec<HelpField>,
}

/// Build the help page for `requested`, or the overview when it is absent or unknown
pub fn help_page(commands: &CommandRegistry, requested: Option<&str>) -> HelpPage {
    if let Some(command) = requested.and_then(|name| commands.get(name)) {
        let mut fields = vec![
            HelpField::new("Command Name", command.name(), true),
            HelpField::new("Command Description", command.description(), true),
            HelpField::new("Command Category", to_pascal_case(command.category(), " "), true),
        ];

        let arguments = command.arguments();
        if !arguments.is_empty() {
            fields.push(HelpField::new("Command Usage", command.usage(), false));
            fields.push(HelpField::new("Command Arguments", arguments, false));
        }

        return HelpPage {
            description: format!("Here are all the properties for the {} command!", command.name()),
            fields,
        };
    }

    let fields = commands
        .categories()
        .iter()
        .map(|category| {
            let title = to_pascal_case(category, " ");
            let name = if title.ends_with("Commands") {
                title
            } else {
                format!("{} Commands", title)
            };
            let value = commands
                .by_category(category)
                .map(|c| c.name())
                .collect::<Vec<_>>()
                .join("\n");
            HelpField::new(name, value, true)
        })
        .collect();

    let description = match requested {
        Some(name) => format!("I don't have a `{}` command. The following are all the commands I have!", name),
        None => "The following are all the commands I have!".to_string(),
    };

    HelpPage {
        description,
        fields,
    }
}

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn run(&self, bot: &BotContext, command: &CommandInteraction) -> anyhow::Result<()> {
        command.defer_ephemeral(&bot.serenity).await?;

        let requested = command
            .data
            .options
            .iter()
            .find(|option| option.name == "command")
            .and_then(|option| option.value.as_str());
        let page = help_page(&bot.commands, requested);

        let mut author = CreateEmbedAuthor::new(command.user.name.clone());
        if let Some(avatar) = command.user.avatar_url() {
            author = author.icon_url(avatar);
        }

        let embed = CreateEmbed::new()
            .title("Help")
            .description(page.description)
            .author(author)
            .fields(page.fields.into_iter().map(|f| (f.name, f.value, f.inline)))
            .footer(CreateEmbedFooter::new("Ferod"))
            .timestamp(Timestamp::now());

        command
            .create_followup(
                &bot.serenity,
                CreateInteractionResponseFollowup::new().embed(embed),
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandType;
    use crate::test_utils::test::command;
    use pretty_assertions::assert_eq;

    fn registry() -> CommandRegistry {
        [
            command("ban", "moderation"),
            command("kick", "moderation"),
            command("ping", "utility"),
            command("tags", "fun commands"),
            help_command().build().unwrap(),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_help_descriptor() {
        let help = help_command().build().unwrap();
        assert_eq!(help.kind().command_type(), CommandType::Interactive);
        assert_eq!(help.permissions().bits(), 1 << 11);
        assert!(!help.options()[0].required);
    }

    #[test]
    fn test_overview_groups_by_category() {
        let page = help_page(&registry(), None);

        assert_eq!(
            page.fields,
            vec![
                HelpField::new("Fun Commands", "tags", true),
                HelpField::new("Moderation Commands", "ban\nkick", true),
                HelpField::new("Utility Commands", "help\nping", true),
            ]
        );
    }

    #[test]
    fn test_single_command_page() {
        let page = help_page(&registry(), Some("help"));

        let names: Vec<&str> = page.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Command Name",
                "Command Description",
                "Command Category",
                "Command Usage",
                "Command Arguments",
            ]
        );
        assert_eq!(page.fields[2].value, "Utility");
        assert_eq!(page.fields[3].value, "`/help [command]`");
    }

    #[test]
    fn test_command_without_options_has_no_usage() {
        let page = help_page(&registry(), Some("ping"));
        assert_eq!(page.fields.len(), 3);
    }

    #[test]
    fn test_unknown_command_falls_back_to_overview() {
        let page = help_page(&registry(), Some("nope"));
        assert!(page.description.contains("`nope`"));
        assert_eq!(page.fields.len(), 3);
    }
}
