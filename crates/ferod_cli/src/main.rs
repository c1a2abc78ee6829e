mod commands;
mod output;
mod prompt;
mod scaffold;

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use tracing::debug;

use crate::commands::app::AppOptions;
use crate::prompt::{AcceptDefaults, Interactive, Prompter};

#[derive(Parser, Debug)]
#[command(name = "ferod")]
#[command(about = "Create a new Ferod app, command or event listener")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scaffold a new app, command or event listener
    Create {
        /// What to create
        #[arg(value_enum, default_value_t = Target::App)]
        target: Target,

        /// Name of the app, or file name of the command/listener
        name: Option<String>,

        /// Do not fetch dependencies
        #[arg(long)]
        no_install: bool,

        /// Do not initialize a git repository
        #[arg(long)]
        no_git: bool,

        /// Answer yes to all questions
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Target {
    App,
    Command,
    #[value(alias = "event-listener", alias = "listener")]
    Event,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();
    miette::set_panic_hook();
    let cli = Cli::parse();

    // Initialize tracing
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if cli.debug {
        EnvFilter::new("ferod=debug,ferod_cli=debug")
    } else {
        // Show info level for ferod crates, warn for everything else
        EnvFilter::new("ferod=info,ferod_cli=info,warn")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339())
        .compact()
        .init();

    let cwd = std::env::current_dir().into_diagnostic()?;
    debug!("Working directory: {}", cwd.display());

    match cli.command {
        Commands::Create {
            target,
            name,
            no_install,
            no_git,
            yes,
        } => {
            let prompter: &dyn Prompter = if yes { &AcceptDefaults } else { &Interactive };
            match target {
                Target::App => {
                    let options = AppOptions {
                        name,
                        install: !no_install,
                        git: !no_git,
                    };
                    commands::app::create(prompter, options, &cwd).await?
                }
                Target::Command => commands::command::create(prompter, name.as_deref(), &cwd).await?,
                Target::Event => commands::listener::create(prompter, name.as_deref(), &cwd).await?,
            }
        }
    }

    Ok(())
}
