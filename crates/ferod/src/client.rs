//! Client startup
//!
//! [`FerodClient::start`] walks a fixed sequence of states, one step at a
//! time, and ends connected to the gateway:
//!
//! `Unstarted → PathsChecked → LoggedIn → CommandsLoaded → ListenersBound → Reconciled`
//!
//! Command and listener modules are read and validated before login, so an
//! incomplete definition fails without any network traffic; they are
//! installed once the client is logged in.
//!
//! Any failure moves the client to [`ClientState::Failed`] and is returned.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serenity::{
    Client,
    http::Http,
    model::id::ApplicationId,
    prelude::GatewayIntents,
};
use tracing::{error, info, warn};

use crate::{
    FerodError, Result,
    api::{CommandApi, SerenityCommandApi},
    command::CommandBuilder,
    config::FerodConfig,
    dispatch::FerodEventHandler,
    handlers::HandlerRegistry,
    listener::{EventKind, ListenerBuilder},
    loader::{self, FsModuleSource, ModuleSource, StaticModuleSource},
    reconcile::{ReconcileReport, Reconciler},
    registry::{CommandRegistry, ListenerSet},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    Unstarted,
    PathsChecked,
    LoggedIn,
    CommandsLoaded,
    ListenersBound,
    Reconciled,
    Failed(String),
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unstarted => write!(f, "unstarted"),
            Self::PathsChecked => write!(f, "paths checked"),
            Self::LoggedIn => write!(f, "logged in"),
            Self::CommandsLoaded => write!(f, "commands loaded"),
            Self::ListenersBound => write!(f, "listeners bound"),
            Self::Reconciled => write!(f, "reconciled"),
            Self::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

pub struct FerodClient {
    config: FerodConfig,
    handlers: Arc<HandlerRegistry>,
    command_source: Box<dyn ModuleSource>,
    listener_source: Box<dyn ModuleSource>,
    static_commands: StaticModuleSource,
    static_listeners: StaticModuleSource,
    state: ClientState,
    commands: Arc<CommandRegistry>,
    categories: Vec<String>,
    listeners: Arc<ListenerSet>,
    application_id: Option<ApplicationId>,
    report: Option<ReconcileReport>,
}

impl FerodClient {
    /// Validate `config` and set up file-backed module sources
    pub fn new(config: FerodConfig, handlers: HandlerRegistry) -> Result<Self> {
        config.validate()?;

        let handlers = Arc::new(handlers);
        let command_source = FsModuleSource::new(&config.commands_path, handlers.clone())
            .with_pattern(&config.module_pattern);
        let listener_source = FsModuleSource::new(&config.event_listeners_path, handlers.clone())
            .with_pattern(&config.module_pattern);

        Ok(Self {
            config,
            handlers,
            command_source: Box::new(command_source),
            listener_source: Box::new(listener_source),
            static_commands: StaticModuleSource::new(),
            static_listeners: StaticModuleSource::new(),
            state: ClientState::Unstarted,
            commands: Arc::new(CommandRegistry::new()),
            categories: Vec::new(),
            listeners: Arc::new(ListenerSet::new()),
            application_id: None,
            report: None,
        })
    }

    /// Replace where command modules are read from
    pub fn with_command_source(mut self, source: impl ModuleSource + 'static) -> Self {
        self.command_source = Box::new(source);
        self
    }

    /// Replace where listener modules are read from
    pub fn with_listener_source(mut self, source: impl ModuleSource + 'static) -> Self {
        self.listener_source = Box::new(source);
        self
    }

    /// Add a command defined in code, loaded after the command directory
    pub fn command(mut self, builder: CommandBuilder) -> Self {
        let label = format!("<code>/{}", builder.pending_name().unwrap_or("unnamed"));
        self.static_commands = self.static_commands.command(label, builder);
        self
    }

    /// Add a listener defined in code, bound after the listener directory
    pub fn listener(mut self, builder: ListenerBuilder) -> Self {
        self.static_listeners = self.static_listeners.listener("<code>/listener", builder);
        self
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn config(&self) -> &FerodConfig {
        &self.config
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn commands(&self) -> &Arc<CommandRegistry> {
        &self.commands
    }

    /// Distinct command categories, sorted
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn listeners(&self) -> &Arc<ListenerSet> {
        &self.listeners
    }

    pub fn application_id(&self) -> Option<ApplicationId> {
        self.application_id
    }

    /// Outcome of the reconciliation pass, once it ran
    pub fn last_report(&self) -> Option<&ReconcileReport> {
        self.report.as_ref()
    }

    /// Gateway intents for the bound listeners
    pub fn intents(&self) -> GatewayIntents {
        let mut intents = self.config.intents();
        if !self.listeners.for_event(EventKind::GuildMemberAdd).is_empty() {
            intents |= GatewayIntents::GUILD_MEMBERS;
        }
        intents
    }

    /// Run startup and then the gateway until it shuts down. Only callable once.
    pub async fn start(&mut self, token: &str) -> Result<()> {
        self.start_with(&SerenityConnection::new(token)).await
    }

    async fn start_with<C: Connection>(&mut self, connection: &C) -> Result<()> {
        if self.state != ClientState::Unstarted {
            return Err(FerodError::AlreadyStarted {
                state: self.state.to_string(),
            });
        }

        let result = self.run(connection).await;
        if let Err(e) = &result {
            error!("Client startup failed: {}", e);
            self.state = ClientState::Failed(e.to_string());
        }
        result
    }

    async fn run<C: Connection>(&mut self, connection: &C) -> Result<()> {
        self.check_paths().await?;

        // Every definition is finalized before the first network call
        let commands = self.load_commands().await?;
        let listeners = self.load_listeners().await?;

        let application_id = connection.login().await?;
        self.application_id = Some(application_id);
        self.state = ClientState::LoggedIn;

        self.install_commands(commands);
        self.install_listeners(listeners);
        self.reconcile(connection.api()).await?;

        let handler = FerodEventHandler::new(
            self.commands.clone(),
            self.listeners.clone(),
            self.config.dispatch_commands,
        );
        connection
            .connect(handler, self.intents(), application_id)
            .await
    }

    async fn check_paths(&mut self) -> Result<()> {
        for directory in [&self.config.commands_path, &self.config.event_listeners_path] {
            ensure_directory(directory).await?;
        }

        self.state = ClientState::PathsChecked;
        Ok(())
    }

    async fn load_commands(&self) -> Result<CommandRegistry> {
        let mut registry = CommandRegistry::new();

        for source in [self.command_source.as_ref(), &self.static_commands as &dyn ModuleSource] {
            let loaded = loader::load_commands(source).await?;
            for command in loaded.items {
                if self.config.log_loaded_commands {
                    info!(
                        "Loaded command '{}' ({}) in category {}",
                        command.name(),
                        command.kind().command_type(),
                        command.category()
                    );
                }
                registry.insert(command);
            }
        }

        Ok(registry)
    }

    async fn load_listeners(&self) -> Result<ListenerSet> {
        let mut listeners = ListenerSet::new();

        for source in [self.listener_source.as_ref(), &self.static_listeners as &dyn ModuleSource] {
            for listener in loader::load_listeners(source).await?.items {
                listeners.bind(listener);
            }
        }

        Ok(listeners)
    }

    fn install_commands(&mut self, registry: CommandRegistry) {
        self.categories = registry.categories();
        info!(
            "Loaded {} commands in {} categories",
            registry.len(),
            self.categories.len()
        );

        self.commands = Arc::new(registry);
        self.state = ClientState::CommandsLoaded;
    }

    fn install_listeners(&mut self, listeners: ListenerSet) {
        info!(
            "Bound {} event listeners across {} events",
            listeners.len(),
            listeners.events().len()
        );

        self.listeners = Arc::new(listeners);
        self.state = ClientState::ListenersBound;
    }

    async fn reconcile<A: CommandApi + ?Sized>(&mut self, api: &A) -> Result<()> {
        let scope = self.config.active_scope();
        let report = Reconciler::new(api, scope, self.config.reconcile_options())
            .reconcile(&self.commands)
            .await?;

        if !report.is_clean() {
            warn!(
                "{} command registration(s) failed in {} scope",
                report.failures.len(),
                scope
            );
        }

        self.report = Some(report);
        self.state = ClientState::Reconciled;
        Ok(())
    }
}

/// The network half of startup: login, command endpoints and the gateway
#[async_trait]
trait Connection: Send + Sync {
    type Api: CommandApi;

    fn api(&self) -> &Self::Api;

    async fn login(&self) -> Result<ApplicationId>;

    async fn connect(
        &self,
        handler: FerodEventHandler,
        intents: GatewayIntents,
        application_id: ApplicationId,
    ) -> Result<()>;
}

struct SerenityConnection {
    token: String,
    http: Arc<Http>,
    api: SerenityCommandApi,
}

impl SerenityConnection {
    fn new(token: &str) -> Self {
        let http = Arc::new(Http::new(token));
        Self {
            token: token.to_string(),
            api: SerenityCommandApi::new(http.clone()),
            http,
        }
    }
}

#[async_trait]
impl Connection for SerenityConnection {
    type Api = SerenityCommandApi;

    fn api(&self) -> &Self::Api {
        &self.api
    }

    async fn login(&self) -> Result<ApplicationId> {
        let info = self
            .http
            .get_current_application_info()
            .await
            .map_err(|e| FerodError::login_failed(e, &self.token))?;

        self.http.set_application_id(info.id);
        info!("Logged in as application {} ({})", info.name, info.id);
        Ok(info.id)
    }

    async fn connect(
        &self,
        handler: FerodEventHandler,
        intents: GatewayIntents,
        application_id: ApplicationId,
    ) -> Result<()> {
        let mut client = Client::builder(&self.token, intents)
            .event_handler(handler)
            .application_id(application_id)
            .await
            .map_err(|cause| FerodError::Gateway { cause })?;

        info!("Connecting to the gateway");
        client
            .start()
            .await
            .map_err(|cause| FerodError::Gateway { cause })
    }
}

async fn ensure_directory(path: &Path) -> Result<()> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(());
    }

    warn!("{} does not exist, creating it", path.display());
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|cause| FerodError::Io {
            path: path.to_path_buf(),
            cause,
        })
}
