//! Module discovery
//!
//! A [`ModuleSource`] yields raw exports; callers check each export is the
//! descriptor kind they expect with [`expect_command`] / [`expect_listener`].
//!
//! On disk a module is a TOML manifest with either a `[command]` or a
//! `[listener]` table:
//!
//! ```toml
//! [command]
//! name = "ban"
//! description = "Ban a member"
//! category = "moderation"
//! handler = "ban"
//! permissions = 4
//!
//! [[command.options]]
//! name = "user"
//! type = "user"
//! description = "Who to ban"
//! required = true
//! ```
//!
//! The `handler` key names a handler registered in the [`HandlerRegistry`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    FerodError, Result,
    command::{CommandBuilder, CommandDescriptor, CommandType, OptionSpec, PermissionBits},
    handlers::HandlerRegistry,
    listener::{EventKind, EventListener, ListenerBuilder},
};

pub const DEFAULT_PATTERN: &str = "**/*.toml";

/// What a module file turned out to contain
#[derive(Debug, Clone)]
pub enum ModuleExport {
    Command(CommandBuilder),
    Listener(ListenerBuilder),
    /// Unreadable, unparsable, or not a recognised module
    Invalid { reason: String },
}

impl ModuleExport {
    fn describe(&self) -> &'static str {
        match self {
            Self::Command(_) => "a command",
            Self::Listener(_) => "an event listener",
            Self::Invalid { .. } => "an invalid module",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedModule {
    pub path: PathBuf,
    pub export: ModuleExport,
}

/// Produces every module of one kind of directory, eagerly
#[async_trait]
pub trait ModuleSource: Send + Sync {
    async fn load_all(&self) -> Result<Vec<LoadedModule>>;
}

/// Reads manifests matching a glob under a directory
#[derive(Clone)]
pub struct FsModuleSource {
    directory: PathBuf,
    pattern: String,
    handlers: Arc<HandlerRegistry>,
}

impl FsModuleSource {
    pub fn new(directory: impl Into<PathBuf>, handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            directory: directory.into(),
            pattern: DEFAULT_PATTERN.to_string(),
            handlers,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn matching_files(&self) -> Result<Vec<PathBuf>> {
        let directory = glob::Pattern::escape(&self.directory.to_string_lossy());
        let pattern = format!("{}/{}", directory.trim_end_matches('/'), self.pattern);

        let entries = glob::glob(&pattern).map_err(|e| {
            FerodError::invalid_module(&self.directory, format!("invalid glob pattern '{}': {}", pattern, e))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(path) if path.is_file() => Some(path),
                Ok(_) => None,
                Err(e) => {
                    warn!("Skipping unreadable path while scanning {}: {}", self.directory.display(), e);
                    None
                }
            })
            .collect();
        files.sort();

        Ok(files)
    }
}

#[async_trait]
impl ModuleSource for FsModuleSource {
    async fn load_all(&self) -> Result<Vec<LoadedModule>> {
        let mut modules = Vec::new();

        for path in self.matching_files()? {
            let export = match tokio::fs::read_to_string(&path).await {
                Ok(content) => parse_manifest(&content, &self.handlers),
                Err(e) => ModuleExport::Invalid {
                    reason: format!("could not read file: {}", e),
                },
            };
            debug!("Loaded {} from {}", export.describe(), path.display());
            modules.push(LoadedModule { path, export });
        }

        Ok(modules)
    }
}

/// Fixed, in-memory list of modules. Useful for commands defined in code.
#[derive(Debug, Clone, Default)]
pub struct StaticModuleSource {
    modules: Vec<LoadedModule>,
}

impl StaticModuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, label: impl Into<PathBuf>, builder: CommandBuilder) -> Self {
        self.modules.push(LoadedModule {
            path: label.into(),
            export: ModuleExport::Command(builder),
        });
        self
    }

    pub fn listener(mut self, label: impl Into<PathBuf>, builder: ListenerBuilder) -> Self {
        self.modules.push(LoadedModule {
            path: label.into(),
            export: ModuleExport::Listener(builder),
        });
        self
    }

    pub fn module(mut self, module: LoadedModule) -> Self {
        self.modules.push(module);
        self
    }
}

#[async_trait]
impl ModuleSource for StaticModuleSource {
    async fn load_all(&self) -> Result<Vec<LoadedModule>> {
        Ok(self.modules.clone())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModuleManifest {
    command: Option<CommandManifest>,
    listener: Option<ListenerManifest>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CommandManifest {
    name: Option<String>,
    description: Option<String>,
    category: Option<String>,
    #[serde(rename = "type", alias = "kind")]
    kind: Option<CommandType>,
    #[serde(default)]
    options: Vec<OptionSpec>,
    permissions: Option<PermissionBits>,
    handler: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListenerManifest {
    event: Option<EventKind>,
    handler: Option<String>,
}

/// Turn manifest text into an export, resolving the handler by name.
///
/// Missing fields are left for the builder to report; only shape problems
/// (bad TOML, unknown keys, unknown handler) make the export invalid.
pub fn parse_manifest(content: &str, handlers: &HandlerRegistry) -> ModuleExport {
    let manifest: ModuleManifest = match toml::from_str(content) {
        Ok(manifest) => manifest,
        Err(e) => {
            return ModuleExport::Invalid {
                reason: format!("not a valid module manifest: {}", e),
            };
        }
    };

    match (manifest.command, manifest.listener) {
        (Some(command), None) => {
            let mut builder = CommandBuilder::new().options(command.options);
            if let Some(name) = command.name {
                builder = builder.name(name);
            }
            if let Some(description) = command.description {
                builder = builder.description(description);
            }
            if let Some(category) = command.category {
                builder = builder.category(category);
            }
            if let Some(kind) = command.kind {
                builder = builder.kind(kind);
            }
            if let Some(permissions) = command.permissions {
                builder = builder.permissions(permissions);
            }
            if let Some(handler_name) = command.handler {
                match handlers.command(&handler_name) {
                    Some(handler) => builder = builder.handler(handler),
                    None => {
                        return ModuleExport::Invalid {
                            reason: format!(
                                "unknown command handler '{}' (registered: {})",
                                handler_name,
                                handlers.command_names().join(", ")
                            ),
                        };
                    }
                }
            }
            ModuleExport::Command(builder)
        }
        (None, Some(listener)) => {
            let mut builder = ListenerBuilder::new();
            if let Some(event) = listener.event {
                builder = builder.event(event);
            }
            if let Some(handler_name) = listener.handler {
                match handlers.listener(&handler_name) {
                    Some(handler) => builder = builder.handler(handler),
                    None => {
                        return ModuleExport::Invalid {
                            reason: format!(
                                "unknown listener handler '{}' (registered: {})",
                                handler_name,
                                handlers.listener_names().join(", ")
                            ),
                        };
                    }
                }
            }
            ModuleExport::Listener(builder)
        }
        (Some(_), Some(_)) => ModuleExport::Invalid {
            reason: "defines both a [command] and a [listener] table".to_string(),
        },
        (None, None) => ModuleExport::Invalid {
            reason: "has neither a [command] nor a [listener] table".to_string(),
        },
    }
}

fn attach_path(error: FerodError, path: &Path) -> FerodError {
    match error {
        FerodError::MissingField { field, descriptor } => FerodError::MissingField {
            field,
            descriptor: format!("{} in {}", descriptor, path.display()),
        },
        FerodError::UnexpectedField {
            field,
            descriptor,
            reason,
        } => FerodError::UnexpectedField {
            field,
            descriptor: format!("{} in {}", descriptor, path.display()),
            reason,
        },
        other => other,
    }
}

/// Check `module` exports a command and finish building it
pub fn expect_command(module: LoadedModule) -> Result<CommandDescriptor> {
    match module.export {
        ModuleExport::Command(builder) => builder.build().map_err(|e| attach_path(e, &module.path)),
        ModuleExport::Invalid { reason } => Err(FerodError::invalid_module(module.path, reason)),
        other => Err(FerodError::invalid_module(
            module.path,
            format!("expected a command, found {}", other.describe()),
        )),
    }
}

/// Check `module` exports an event listener and finish building it
pub fn expect_listener(module: LoadedModule) -> Result<EventListener> {
    match module.export {
        ModuleExport::Listener(builder) => builder.build().map_err(|e| attach_path(e, &module.path)),
        ModuleExport::Invalid { reason } => Err(FerodError::invalid_module(module.path, reason)),
        other => Err(FerodError::invalid_module(
            module.path,
            format!("expected an event listener, found {}", other.describe()),
        )),
    }
}

/// Validated modules plus the files that were skipped
#[derive(Debug)]
pub struct Loaded<T> {
    pub items: Vec<T>,
    /// [`FerodError::InvalidModule`] for every skipped file
    pub skipped: Vec<FerodError>,
}

async fn collect<T>(
    source: &dyn ModuleSource,
    expect: fn(LoadedModule) -> Result<T>,
) -> Result<Loaded<T>> {
    let mut loaded = Loaded {
        items: Vec::new(),
        skipped: Vec::new(),
    };

    for module in source.load_all().await? {
        match expect(module) {
            Ok(item) => loaded.items.push(item),
            Err(e @ FerodError::InvalidModule { .. }) => {
                warn!("Skipping module: {}", diagnostic_line(&e));
                loaded.skipped.push(e);
            }
            // Incomplete descriptors are programming errors; stop before any network I/O
            Err(e) => return Err(e),
        }
    }

    Ok(loaded)
}

/// Load every command from `source`, skipping files of the wrong shape
pub async fn load_commands(source: &dyn ModuleSource) -> Result<Loaded<CommandDescriptor>> {
    collect(source, expect_command).await
}

/// Load every event listener from `source`, skipping files of the wrong shape
pub async fn load_listeners(source: &dyn ModuleSource) -> Result<Loaded<EventListener>> {
    collect(source, expect_listener).await
}

fn diagnostic_line(error: &FerodError) -> String {
    match error {
        FerodError::InvalidModule { path, reason } => format!("{}: {}", path.display(), reason),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test::{NoopHandler, NoopListener};
    use crate::command::OptionType;
    use pretty_assertions::assert_eq;

    fn handlers() -> HandlerRegistry {
        HandlerRegistry::new()
            .with_command("ban", Arc::new(NoopHandler))
            .with_listener("greet", Arc::new(NoopListener))
    }

    #[test]
    fn test_parse_command_manifest() {
        let export = parse_manifest(
            r#"
            [command]
            name = "ban"
            description = "Ban a member"
            category = "moderation"
            handler = "ban"
            permissions = "4"

            [[command.options]]
            name = "user"
            type = "user"
            description = "Who to ban"
            required = true
            "#,
            &handlers(),
        );

        let ModuleExport::Command(builder) = export else {
            panic!("expected a command export, got {:?}", export);
        };
        let command = builder.build().unwrap();
        assert_eq!(command.name(), "ban");
        assert_eq!(command.permissions(), PermissionBits::from_bits(4));
        assert_eq!(command.options()[0].kind, OptionType::User);
        assert!(command.options()[0].required);
    }

    #[test]
    fn test_parse_context_menu_manifest() {
        let export = parse_manifest(
            "[command]\nname = \"Report\"\ncategory = \"moderation\"\ntype = \"message\"\nhandler = \"ban\"\n",
            &handlers(),
        );
        let ModuleExport::Command(builder) = export else {
            panic!("expected a command export");
        };
        assert_eq!(
            builder.build().unwrap().kind().command_type(),
            CommandType::MessageContextAction
        );
    }

    #[test]
    fn test_unknown_handler_is_invalid() {
        let export = parse_manifest(
            "[command]\nname = \"kick\"\ndescription = \"Kick\"\ncategory = \"mod\"\nhandler = \"kick\"\n",
            &handlers(),
        );
        assert!(
            matches!(export, ModuleExport::Invalid { ref reason } if reason.contains("unknown command handler 'kick'"))
        );
    }

    #[test]
    fn test_shape_errors_are_invalid() {
        for content in [
            "not toml at all = = =",
            "[something]\nkey = 1\n",
            "[command]\nname = \"a\"\n[listener]\nevent = \"ready\"\n",
            "[listener]\nevent = \"typingStart\"\n",
            "[command]\nname = \"a\"\ncolour = \"red\"\n",
        ] {
            assert!(
                matches!(parse_manifest(content, &handlers()), ModuleExport::Invalid { .. }),
                "expected invalid for {content:?}"
            );
        }
    }

    #[test]
    fn test_missing_handler_key_surfaces_at_build() {
        let module = LoadedModule {
            path: PathBuf::from("commands/ping.toml"),
            export: parse_manifest(
                "[command]\nname = \"ping\"\ndescription = \"Pong\"\ncategory = \"utility\"\n",
                &handlers(),
            ),
        };

        let err = expect_command(module).unwrap_err();
        match err {
            FerodError::MissingField { field, descriptor } => {
                assert_eq!(field, "handler");
                assert!(descriptor.contains("commands/ping.toml"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_wrong_kind_is_invalid_module() {
        let module = LoadedModule {
            path: PathBuf::from("commands/greet.toml"),
            export: parse_manifest("[listener]\nevent = \"ready\"\nhandler = \"greet\"\n", &handlers()),
        };

        let err = expect_command(module).unwrap_err();
        assert!(
            matches!(err, FerodError::InvalidModule { ref path, .. } if path == Path::new("commands/greet.toml"))
        );
    }

    #[tokio::test]
    async fn test_invalid_files_do_not_stop_loading() {
        let source = StaticModuleSource::new()
            .command(
                "a",
                CommandBuilder::new()
                    .name("a")
                    .description("A")
                    .category("misc")
                    .handler(Arc::new(NoopHandler)),
            )
            .module(LoadedModule {
                path: PathBuf::from("broken"),
                export: ModuleExport::Invalid {
                    reason: "bad".to_string(),
                },
            })
            .listener(
                "wrong-kind",
                ListenerBuilder::new()
                    .event(EventKind::Ready)
                    .handler(Arc::new(NoopListener)),
            )
            .command(
                "b",
                CommandBuilder::new()
                    .name("b")
                    .description("B")
                    .category("misc")
                    .handler(Arc::new(NoopHandler)),
            );

        let loaded = load_commands(&source).await.unwrap();
        let names: Vec<&str> = loaded.items.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(loaded.skipped.len(), 2);
    }

    #[tokio::test]
    async fn test_incomplete_descriptor_aborts_loading() {
        let source = StaticModuleSource::new().command(
            "nameless",
            CommandBuilder::new()
                .description("x")
                .category("misc")
                .handler(Arc::new(NoopHandler)),
        );

        let err = load_commands(&source).await.unwrap_err();
        assert!(matches!(err, FerodError::MissingField { field: "name", .. }));
    }
}
