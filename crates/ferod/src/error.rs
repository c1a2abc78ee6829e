use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::api::{ApiError, RegistrationScope};

#[derive(Error, Diagnostic, Debug)]
pub enum FerodError {
    #[error("Missing required field `{field}`")]
    #[diagnostic(
        code(ferod::missing_field),
        help("Set `{field}` on the {descriptor} before it is built")
    )]
    MissingField {
        field: &'static str,
        descriptor: String, // e.g. "command 'ping'", "event listener"
    },

    #[error("Unexpected field `{field}`")]
    #[diagnostic(
        code(ferod::unexpected_field),
        help("`{field}` is not allowed on {descriptor}: {reason}")
    )]
    UnexpectedField {
        field: &'static str,
        descriptor: String,
        reason: String,
    },

    #[error("Invalid module {}", path.display())]
    #[diagnostic(
        code(ferod::invalid_module),
        help("{reason}")
    )]
    InvalidModule { path: PathBuf, reason: String },

    #[error("Failed to fetch application commands")]
    #[diagnostic(
        code(ferod::fetch_failed),
        help("Could not list {scope} commands; reconciliation was aborted and nothing was changed")
    )]
    Fetch {
        scope: RegistrationScope,
        #[source]
        cause: ApiError,
    },

    #[error("Command registration failed")]
    #[diagnostic(
        code(ferod::registration_failed),
        help("Failed to {operation} application command '{command}'")
    )]
    Registration {
        command: String,
        operation: RegistrationOp,
        #[source]
        cause: ApiError,
    },

    #[error("Handler failed")]
    #[diagnostic(
        code(ferod::handler_failed),
        help("The handler for {handler} failed: {reason}")
    )]
    Handler { handler: String, reason: String },

    #[error("Invalid configuration")]
    #[diagnostic(
        code(ferod::invalid_config),
        help("Configuration error: {issues}")
    )]
    InvalidConfiguration {
        issues: String,
        config_path: Option<PathBuf>,
        missing_fields: Vec<String>,
    },

    #[error("Could not load configuration from {}", config_path.display())]
    #[diagnostic(
        code(ferod::config_io),
        help("Expected {expected}")
    )]
    ConfigIo {
        config_path: PathBuf,
        expected: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Discord authentication failed")]
    #[diagnostic(
        code(ferod::login_failed),
        help("Check that your Discord bot token is valid and has not been regenerated")
    )]
    Login {
        #[source]
        cause: serenity::Error,
        token_preview: String, // First/last few chars of token for debugging
    },

    #[error("Client already started")]
    #[diagnostic(
        code(ferod::already_started),
        help("`start` can only be called once per client; this one is in state {state}")
    )]
    AlreadyStarted { state: String },

    #[error("Gateway connection failed")]
    #[diagnostic(code(ferod::gateway_failed))]
    Gateway {
        #[source]
        cause: serenity::Error,
    },

    #[error("Filesystem operation failed on {}", path.display())]
    #[diagnostic(code(ferod::io))]
    Io {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },
}

/// Which remote mutation a [`FerodError::Registration`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOp {
    Create,
    Edit,
    Delete,
}

impl std::fmt::Display for RegistrationOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Edit => write!(f, "edit"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

pub type Result<T> = std::result::Result<T, FerodError>;

impl FerodError {
    pub fn login_failed(cause: serenity::Error, token: &str) -> Self {
        // Show first 6 and last 4 characters of token for debugging
        let token_preview = if token.len() > 10 {
            format!("{}...{}", &token[..6], &token[token.len() - 4..])
        } else {
            "***".to_string()
        };

        Self::Login {
            cause,
            token_preview,
        }
    }

    pub fn missing_field(field: &'static str, descriptor: impl Into<String>) -> Self {
        Self::MissingField {
            field,
            descriptor: descriptor.into(),
        }
    }

    pub fn invalid_module(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidModule {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Errors that only affect a single file or command and must not stop the rest
    pub fn is_isolated(&self) -> bool {
        matches!(
            self,
            Self::InvalidModule { .. } | Self::Registration { .. } | Self::Handler { .. }
        )
    }
}
