use std::path::{Path, PathBuf};

use miette::Result;
use owo_colors::OwoColorize;
use tokio::process::Command;

use crate::output::Output;
use crate::prompt::Prompter;
use crate::scaffold::{self, ensure_empty_dir, merge_manifests, render, write_new};

const CARGO_TOML: &str = include_str!("../../templates/app/Cargo.toml.tmpl");
const HELP_CARGO_TOML: &str = include_str!("../../templates/help/Cargo.toml.tmpl");
const HELP_COMMAND: &str = include_str!("../../templates/help/help.toml");
const MAIN_RS: &str = include_str!("../../templates/app/main.rs.tmpl");
const FEROD_TOML: &str = include_str!("../../templates/app/ferod.toml");
const ENV_EXAMPLE: &str = include_str!("../../templates/app/env.example");
const GITIGNORE: &str = include_str!("../../templates/app/gitignore");
const PING_COMMAND: &str = include_str!("../../templates/app/commands/ping.toml");
const READY_LISTENER: &str = include_str!("../../templates/app/listeners/ready.toml");

pub const DEFAULT_APP_NAME: &str = "ferod-app";

#[derive(Debug, Clone)]
pub struct AppOptions {
    pub name: Option<String>,
    pub install: bool,
    pub git: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppAnswers {
    pub name: String,
    pub help_command: bool,
    pub git: bool,
}

pub fn ask(prompter: &dyn Prompter, options: &AppOptions) -> scaffold::Result<AppAnswers> {
    let name = match &options.name {
        Some(name) => name.clone(),
        None => prompter.input("What is the name of your app?", Some(DEFAULT_APP_NAME))?,
    };
    let help_command = prompter.confirm("Add a help command?", true)?;
    let git = options.git && prompter.confirm("Initialize a git repository?", true)?;

    Ok(AppAnswers {
        name,
        help_command,
        git,
    })
}

/// Write the project into `parent/<name>`, returning the project directory
/// and the files written relative to it
pub fn scaffold(parent: &Path, answers: &AppAnswers) -> scaffold::Result<(PathBuf, Vec<PathBuf>)> {
    let project_dir = parent.join(&answers.name);
    ensure_empty_dir(&project_dir)?;

    let crate_name = scaffold::snake_case(&answers.name);
    let vars = [("name", answers.name.as_str()), ("crate_name", crate_name.as_str())];

    let mut manifest = render(CARGO_TOML, &vars);
    if answers.help_command {
        manifest = merge_manifests(&manifest, HELP_CARGO_TOML)?;
    }

    let mut files: Vec<(&str, String)> = vec![
        ("Cargo.toml", manifest),
        ("ferod.toml", FEROD_TOML.to_string()),
        (".env.example", render(ENV_EXAMPLE, &vars)),
        (".gitignore", GITIGNORE.to_string()),
        ("src/main.rs", render(MAIN_RS, &vars)),
        ("commands/ping.toml", PING_COMMAND.to_string()),
        ("listeners/ready.toml", READY_LISTENER.to_string()),
    ];
    if answers.help_command {
        files.push(("commands/help.toml", HELP_COMMAND.to_string()));
    }

    let mut written = Vec::with_capacity(files.len());
    for (relative, contents) in files {
        write_new(&project_dir.join(relative), &contents)?;
        written.push(PathBuf::from(relative));
    }

    Ok((project_dir, written))
}

/// Run an external tool in `dir`, warning instead of failing
async fn run_tool(output: &Output, dir: &Path, program: &str, args: &[&str]) -> bool {
    let label = format!("{} {}", program, args.join(" "));
    output.status(&format!("Running {}...", label));

    match Command::new(program).args(args).current_dir(dir).status().await {
        Ok(status) if status.success() => true,
        Ok(status) => {
            output.warning(&format!("{} exited with {}", label, status));
            false
        }
        Err(e) => {
            output.warning(&format!("Could not run {}: {}", label, e));
            false
        }
    }
}

pub async fn create(prompter: &dyn Prompter, options: AppOptions, parent: &Path) -> Result<()> {
    let output = Output::new();
    let answers = ask(prompter, &options)?;

    output.section(&format!("Creating {}", answers.name));
    let (project_dir, written) = scaffold(parent, &answers)?;
    for file in &written {
        output.list_item(&file.display().to_string());
    }

    if answers.git && run_tool(&output, &project_dir, "git", &["init", "--quiet"]).await {
        output.success("Initialized a git repository");
    }
    if options.install && run_tool(&output, &project_dir, "cargo", &["fetch"]).await {
        output.success("Fetched dependencies");
    }

    output.success(&format!("Created {}", project_dir.display()));
    println!();
    println!("Next steps:");
    println!("  {} {}", "cd".bright_green(), answers.name);
    println!("  {} .env.example .env   # then set DISCORD_TOKEN", "cp".bright_green());
    println!("  {}", "cargo run".bright_green());

    Ok(())
}
