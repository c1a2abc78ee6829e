//! Command descriptors
//!
//! A [`CommandDescriptor`] is the local, immutable definition of one
//! application command. Descriptors are assembled with a [`CommandBuilder`],
//! whose setters can be called in any order; all validation happens once in
//! [`CommandBuilder::build`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{FerodError, Result, handlers::CommandHandler};

/// The shape of a command, which decides what the platform requires of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// A slash command; the only kind that carries a description
    Interactive { description: String },
    /// An entry in a message's context menu
    MessageContextAction,
    /// An entry in a user's context menu
    UserContextAction,
}

impl CommandKind {
    pub fn command_type(&self) -> CommandType {
        match self {
            Self::Interactive { .. } => CommandType::Interactive,
            Self::MessageContextAction => CommandType::MessageContextAction,
            Self::UserContextAction => CommandType::UserContextAction,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Interactive { description } => description,
            _ => "",
        }
    }
}

/// Data-less tag for [`CommandKind`], used by builders and manifests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    #[default]
    #[serde(alias = "chat_input", alias = "slash")]
    Interactive,
    #[serde(alias = "message")]
    MessageContextAction,
    #[serde(alias = "user")]
    UserContextAction,
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interactive => write!(f, "interactive"),
            Self::MessageContextAction => write!(f, "message"),
            Self::UserContextAction => write!(f, "user"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
}

impl OptionType {
    pub fn is_sub_command(self) -> bool {
        matches!(self, Self::SubCommand | Self::SubCommandGroup)
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SubCommand => "Subcommand",
            Self::SubCommandGroup => "SubcommandGroup",
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Boolean => "Boolean",
            Self::User => "User",
            Self::Channel => "Channel",
            Self::Role => "Role",
            Self::Mentionable => "Mentionable",
            Self::Number => "Number",
            Self::Attachment => "Attachment",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    Integer(i64),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChoice {
    pub name: String,
    pub value: ChoiceValue,
}

/// One entry of a command's option schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OptionType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
    /// Nested options of a sub-command or sub-command group
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSpec>,
}

impl OptionSpec {
    pub fn new(kind: OptionType, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
            choices: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn choice(mut self, name: impl Into<String>, value: ChoiceValue) -> Self {
        self.choices.push(OptionChoice {
            name: name.into(),
            value,
        });
        self
    }

    pub fn sub_option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    fn normalized(&self) -> Self {
        let mut choices = self.choices.clone();
        choices.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            name: self.name.clone(),
            kind: self.kind,
            description: self.description.clone(),
            required: self.required,
            choices,
            options: normalize_options(&self.options),
        }
    }
}

fn normalize_options(options: &[OptionSpec]) -> Vec<OptionSpec> {
    let mut normalized: Vec<OptionSpec> = options.iter().map(OptionSpec::normalized).collect();
    normalized.sort_by(|a, b| a.name.cmp(&b.name));
    normalized
}

/// Default member permission bits. Zero means no restriction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PermissionBits(u64);

impl PermissionBits {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Parse the canonical decimal form Discord uses on the wire
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<u64>().ok().map(Self)
    }
}

impl<'de> Deserialize<'de> for PermissionBits {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bits(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bits(bits) => Ok(Self(bits)),
            Raw::Text(text) => Self::parse(&text).ok_or_else(|| {
                serde::de::Error::custom(format!("invalid permission bitmask '{text}'"))
            }),
        }
    }
}

/// The platform-facing projection of a command.
///
/// This is what gets sent on create/edit and what remote records are
/// compared against; category and handler never leave the process.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandData {
    pub name: String,
    pub kind: CommandType,
    pub description: String,
    pub options: Vec<OptionSpec>,
    pub permissions: PermissionBits,
}

impl CommandData {
    /// Canonical form used for comparison: options and choices sorted by
    /// name at every level, no description on context actions.
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            description: match self.kind {
                CommandType::Interactive => self.description.clone(),
                _ => String::new(),
            },
            options: normalize_options(&self.options),
            permissions: self.permissions,
        }
    }

    /// Structural equality after normalization
    pub fn matches(&self, other: &CommandData) -> bool {
        self.normalized() == other.normalized()
    }
}

/// A fully validated command
#[derive(Clone)]
pub struct CommandDescriptor {
    name: String,
    kind: CommandKind,
    category: String,
    options: Vec<OptionSpec>,
    permissions: PermissionBits,
    handler: Arc<dyn CommandHandler>,
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("category", &self.category)
            .field("options", &self.options)
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

impl CommandDescriptor {
    pub fn builder() -> CommandBuilder {
        CommandBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    pub fn description(&self) -> &str {
        self.kind.description()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }

    pub fn permissions(&self) -> PermissionBits {
        self.permissions
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }

    pub fn to_data(&self) -> CommandData {
        CommandData {
            name: self.name.clone(),
            kind: self.kind.command_type(),
            description: self.kind.description().to_string(),
            options: self.options.clone(),
            permissions: self.permissions,
        }
    }

    /// Flatten the option schema into one row per invocable path.
    ///
    /// Rows look like `[group, sub, args..]`, `[sub, args..]`, or a single
    /// row holding the top-level arguments.
    pub fn options_tree(&self) -> Vec<Vec<TreeNode>> {
        let mut tree = Vec::new();

        if self
            .options
            .iter()
            .any(|o| o.kind == OptionType::SubCommandGroup)
        {
            for group in self
                .options
                .iter()
                .filter(|o| o.kind == OptionType::SubCommandGroup)
            {
                for sub in group.options.iter().filter(|o| o.kind == OptionType::SubCommand) {
                    let mut row = vec![TreeNode::path(group), TreeNode::path(sub)];
                    row.extend(sub.options.iter().map(TreeNode::argument));
                    tree.push(row);
                }
            }
        } else if self.options.iter().any(|o| o.kind == OptionType::SubCommand) {
            for sub in self
                .options
                .iter()
                .filter(|o| o.kind == OptionType::SubCommand)
            {
                let mut row = vec![TreeNode::path(sub)];
                row.extend(sub.options.iter().map(TreeNode::argument));
                tree.push(row);
            }
        } else {
            tree.push(self.options.iter().map(TreeNode::argument).collect());
        }

        tree
    }

    /// One line per invocable path, e.g. `` `/ban <user> [reason]` ``
    pub fn usage(&self) -> String {
        self.options_tree()
            .iter()
            .map(|row| {
                let mut line = format!("/{}", self.name);
                for node in row {
                    line.push(' ');
                    line.push_str(&node.usage_token());
                }
                format!("`{line}`")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// One line per group, sub-command and argument with its description
    pub fn arguments(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        for row in self.options_tree() {
            let mut prefix: Vec<&str> = Vec::new();

            for node in &row {
                let line = match node.kind {
                    OptionType::SubCommandGroup | OptionType::SubCommand => {
                        prefix.push(&node.name);
                        format!("`{}`: {}", prefix.join(" "), node.description)
                    }
                    kind => {
                        let mut label = prefix.join(" ");
                        if !label.is_empty() {
                            label.push(' ');
                        }
                        label.push_str(&node.display_name());
                        format!("`{label} ({kind})`: {}", node.description)
                    }
                };

                if !lines.contains(&line) {
                    lines.push(line);
                }
            }
        }

        lines.join("\n")
    }
}

impl From<&CommandDescriptor> for CommandData {
    fn from(command: &CommandDescriptor) -> Self {
        command.to_data()
    }
}

impl From<CommandDescriptor> for CommandData {
    fn from(command: CommandDescriptor) -> Self {
        command.to_data()
    }
}

/// A node of [`CommandDescriptor::options_tree`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub description: String,
    pub kind: OptionType,
    pub optional: bool,
}

impl TreeNode {
    fn path(option: &OptionSpec) -> Self {
        Self {
            name: option.name.clone(),
            description: option.description.clone(),
            kind: option.kind,
            optional: false,
        }
    }

    fn argument(option: &OptionSpec) -> Self {
        Self {
            name: option.name.clone(),
            description: option.description.clone(),
            kind: option.kind,
            optional: !option.required,
        }
    }

    fn display_name(&self) -> String {
        if self.optional {
            format!("[{}]", self.name)
        } else {
            self.name.clone()
        }
    }

    fn usage_token(&self) -> String {
        if self.kind.is_sub_command() {
            self.name.clone()
        } else if self.optional {
            format!("[{}]", self.name)
        } else {
            format!("<{}>", self.name)
        }
    }
}

/// Staged construction for [`CommandDescriptor`]
#[derive(Clone, Default)]
pub struct CommandBuilder {
    name: Option<String>,
    description: Option<String>,
    category: Option<String>,
    kind: Option<CommandType>,
    options: Vec<OptionSpec>,
    permissions: PermissionBits,
    handler: Option<Arc<dyn CommandHandler>>,
}

impl fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("category", &self.category)
            .field("kind", &self.kind)
            .field("options", &self.options)
            .field("permissions", &self.permissions)
            .field("handler", &self.handler.as_ref().map(|_| "<handler>"))
            .finish()
    }
}

impl CommandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn kind(mut self, kind: CommandType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    /// Replace the whole option list
    pub fn options(mut self, options: impl IntoIterator<Item = OptionSpec>) -> Self {
        self.options = options.into_iter().collect();
        self
    }

    pub fn permissions(mut self, permissions: PermissionBits) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Name set so far, if any. Used for log and error messages.
    pub fn pending_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn build(self) -> Result<CommandDescriptor> {
        let label = match &self.name {
            Some(name) if !name.is_empty() => format!("command '{name}'"),
            _ => "command".to_string(),
        };

        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| FerodError::missing_field("name", &label))?;

        let category = self
            .category
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| FerodError::missing_field("category", &label))?;

        let kind = match self.kind.unwrap_or_default() {
            CommandType::Interactive => CommandKind::Interactive {
                description: self
                    .description
                    .filter(|d| !d.trim().is_empty())
                    .ok_or_else(|| FerodError::missing_field("description", &label))?,
            },
            other => {
                if self.description.is_some_and(|d| !d.is_empty()) {
                    return Err(FerodError::UnexpectedField {
                        field: "description",
                        descriptor: label,
                        reason: format!("{other} context actions have no description"),
                    });
                }
                match other {
                    CommandType::MessageContextAction => CommandKind::MessageContextAction,
                    _ => CommandKind::UserContextAction,
                }
            }
        };

        let handler = self
            .handler
            .ok_or_else(|| FerodError::missing_field("handler", &label))?;

        Ok(CommandDescriptor {
            name,
            kind,
            category,
            options: self.options,
            permissions: self.permissions,
            handler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test::NoopHandler;
    use pretty_assertions::assert_eq;

    fn ping() -> CommandBuilder {
        CommandBuilder::new()
            .name("ping")
            .description("Replies with pong")
            .category("utility")
            .handler(Arc::new(NoopHandler))
    }

    #[test]
    fn test_build_defaults() {
        let command = ping().build().unwrap();
        assert_eq!(command.name(), "ping");
        assert_eq!(command.kind().command_type(), CommandType::Interactive);
        assert!(command.options().is_empty());
        assert!(command.permissions().is_empty());
    }

    #[test]
    fn test_setter_order_does_not_matter() {
        let command = CommandBuilder::new()
            .handler(Arc::new(NoopHandler))
            .category("utility")
            .description("Replies with pong")
            .name("ping")
            .build()
            .unwrap();
        assert_eq!(command.to_data(), ping().build().unwrap().to_data());
    }

    #[test]
    fn test_missing_name() {
        let err = CommandBuilder::new()
            .description("x")
            .category("misc")
            .handler(Arc::new(NoopHandler))
            .build()
            .unwrap_err();
        assert!(matches!(err, FerodError::MissingField { field: "name", .. }));
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        let err = CommandBuilder::new().name("ping").build().unwrap_err();
        assert!(matches!(err, FerodError::MissingField { field: "category", .. }));

        let err = CommandBuilder::new()
            .name("ping")
            .category("utility")
            .build()
            .unwrap_err();
        assert!(matches!(err, FerodError::MissingField { field: "description", .. }));

        let err = CommandBuilder::new()
            .name("ping")
            .category("utility")
            .description("pong")
            .build()
            .unwrap_err();
        assert!(matches!(err, FerodError::MissingField { field: "handler", .. }));
    }

    #[test]
    fn test_blank_description_is_missing() {
        let err = ping().description("   ").build().unwrap_err();
        assert!(matches!(err, FerodError::MissingField { field: "description", .. }));
    }

    #[test]
    fn test_context_action_without_description() {
        let command = CommandBuilder::new()
            .name("Report message")
            .category("moderation")
            .kind(CommandType::MessageContextAction)
            .handler(Arc::new(NoopHandler))
            .build()
            .unwrap();
        assert_eq!(command.kind(), &CommandKind::MessageContextAction);
        assert_eq!(command.to_data().description, "");
    }

    #[test]
    fn test_context_action_rejects_description() {
        let err = CommandBuilder::new()
            .name("Avatar")
            .category("fun")
            .description("Shows the avatar")
            .kind(CommandType::UserContextAction)
            .handler(Arc::new(NoopHandler))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            FerodError::UnexpectedField {
                field: "description",
                ..
            }
        ));
    }

    #[test]
    fn test_normalization_ignores_option_order() {
        let a = ping()
            .option(OptionSpec::new(OptionType::String, "b", "second"))
            .option(OptionSpec::new(OptionType::Integer, "a", "first").required(true))
            .build()
            .unwrap()
            .to_data();
        let b = ping()
            .option(OptionSpec::new(OptionType::Integer, "a", "first").required(true))
            .option(OptionSpec::new(OptionType::String, "b", "second"))
            .build()
            .unwrap()
            .to_data();

        assert!(a.matches(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_normalization_detects_changed_option() {
        let a = ping()
            .option(OptionSpec::new(OptionType::String, "target", "who"))
            .build()
            .unwrap()
            .to_data();
        let b = ping()
            .option(OptionSpec::new(OptionType::String, "target", "who").required(true))
            .build()
            .unwrap()
            .to_data();

        assert!(!a.matches(&b));
    }

    #[test]
    fn test_permission_bits_deserialize() {
        #[derive(Deserialize)]
        struct Holder {
            permissions: PermissionBits,
        }

        let from_int: Holder = toml::from_str("permissions = 8").unwrap();
        let from_str: Holder = toml::from_str("permissions = \"8\"").unwrap();
        assert_eq!(from_int.permissions, PermissionBits::from_bits(8));
        assert_eq!(from_int.permissions, from_str.permissions);
        assert!(toml::from_str::<Holder>("permissions = \"admin\"").is_err());
    }

    #[test]
    fn test_usage_plain_arguments() {
        let command = CommandBuilder::new()
            .name("ban")
            .description("Ban a member")
            .category("moderation")
            .option(OptionSpec::new(OptionType::User, "user", "Who to ban").required(true))
            .option(OptionSpec::new(OptionType::String, "reason", "Why"))
            .handler(Arc::new(NoopHandler))
            .build()
            .unwrap();

        assert_eq!(command.usage(), "`/ban <user> [reason]`");
        assert_eq!(
            command.arguments(),
            "`user (User)`: Who to ban\n`[reason] (String)`: Why"
        );
    }

    #[test]
    fn test_usage_without_options() {
        assert_eq!(ping().build().unwrap().usage(), "`/ping`");
    }

    #[test]
    fn test_usage_sub_command_groups() {
        let command = CommandBuilder::new()
            .name("config")
            .description("Configure the bot")
            .category("admin")
            .option(
                OptionSpec::new(OptionType::SubCommandGroup, "role", "Role settings")
                    .sub_option(
                        OptionSpec::new(OptionType::SubCommand, "add", "Add a role")
                            .sub_option(
                                OptionSpec::new(OptionType::Role, "role", "The role")
                                    .required(true),
                            ),
                    )
                    .sub_option(OptionSpec::new(OptionType::SubCommand, "list", "List roles")),
            )
            .handler(Arc::new(NoopHandler))
            .build()
            .unwrap();

        assert_eq!(
            command.usage(),
            "`/config role add <role>`\n`/config role list`"
        );
        assert_eq!(
            command.arguments(),
            "`role`: Role settings\n`role add`: Add a role\n`role add role (Role)`: The role\n`role list`: List roles"
        );
    }
}
