use std::path::{Path, PathBuf};

use ferod::CommandType;
use miette::Result;
use serde::Serialize;

use crate::output::Output;
use crate::prompt::Prompter;
use crate::scaffold::{self, ScaffoldError, file_stem, project_config, snake_case, write_new};

const TYPES: [(&str, CommandType); 3] = [
    ("Slash command", CommandType::Interactive),
    ("Message context menu", CommandType::MessageContextAction),
    ("User context menu", CommandType::UserContextAction),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandAnswers {
    pub file_name: String,
    pub name: String,
    pub kind: CommandType,
    pub description: Option<String>,
    pub category: String,
}

#[derive(Serialize)]
struct Manifest<'a> {
    command: CommandTable<'a>,
}

#[derive(Serialize)]
struct CommandTable<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: CommandType,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    category: &'a str,
    handler: String,
}

pub fn ask(prompter: &dyn Prompter, name: Option<&str>) -> scaffold::Result<CommandAnswers> {
    let file_name = prompter.input("What is the file name?", name)?;
    let file_name = file_stem(&file_name).to_string();
    let name = prompter.input("What is the name of the command?", Some(&file_name))?;

    let labels: Vec<&str> = TYPES.iter().map(|(label, _)| *label).collect();
    let selected = prompter.select("What type of command do you want to create?", &labels, 0)?;
    let kind = TYPES.get(selected).map(|(_, kind)| *kind).unwrap_or_default();

    let description = match kind {
        CommandType::Interactive => Some(prompter.input(
            "What is the description of the command?",
            Some(&format!("The {} command", name)),
        )?),
        _ => None,
    };
    let category = prompter.input("What is the category of the command?", Some("general"))?;

    if file_name.is_empty() || name.trim().is_empty() {
        return Err(ScaffoldError::MissingAnswer {
            prompt: "command name".to_string(),
        });
    }

    Ok(CommandAnswers {
        file_name,
        name,
        kind,
        description,
        category,
    })
}

/// Manifest text for `answers`; the handler is named after the command
pub fn manifest(answers: &CommandAnswers) -> scaffold::Result<String> {
    toml::to_string(&Manifest {
        command: CommandTable {
            name: &answers.name,
            kind: answers.kind,
            description: answers.description.as_deref(),
            category: &answers.category,
            handler: snake_case(&answers.name),
        },
    })
    .map_err(|cause| ScaffoldError::Render { cause })
}

/// Write the manifest into `commands_dir`, returning its path
pub fn scaffold(commands_dir: &Path, answers: &CommandAnswers) -> scaffold::Result<PathBuf> {
    let path = commands_dir.join(format!("{}.toml", answers.file_name));
    write_new(&path, &manifest(answers)?)?;
    Ok(path)
}

pub async fn create(prompter: &dyn Prompter, name: Option<&str>, project_dir: &Path) -> Result<()> {
    let output = Output::new();
    let config = project_config(project_dir).await?;
    let answers = ask(prompter, name)?;

    let path = scaffold(&config.commands_path, &answers)?;

    output.success(&format!("Created {}", path.display()));
    output.kv("handler", &snake_case(&answers.name));
    output.status("Register a command handler with this name in your HandlerRegistry");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{AcceptDefaults, test::Scripted};
    use ferod::HandlerRegistry;
    use ferod::builtin::HelpCommand;
    use ferod::loader::{LoadedModule, expect_command, parse_manifest};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_defaults_need_a_name() {
        assert!(matches!(
            ask(&AcceptDefaults, None),
            Err(ScaffoldError::MissingAnswer { .. })
        ));

        let answers = ask(&AcceptDefaults, Some("roll.toml")).unwrap();
        assert_eq!(
            answers,
            CommandAnswers {
                file_name: "roll".to_string(),
                name: "roll".to_string(),
                kind: CommandType::Interactive,
                description: Some("The roll command".to_string()),
                category: "general".to_string(),
            }
        );
    }

    #[test]
    fn test_context_menu_has_no_description() {
        let prompter = Scripted::new([
            Some("report"),
            Some("Report Message"),
            Some("Message context menu"),
            Some("moderation"),
        ]);

        let answers = ask(&prompter, None).unwrap();
        assert_eq!(answers.kind, CommandType::MessageContextAction);
        assert_eq!(answers.description, None);

        let text = manifest(&answers).unwrap();
        assert!(!text.contains("description"));
        assert!(text.contains("handler = \"report_message\""));
    }

    #[test]
    fn test_written_manifest_loads() {
        let dir = tempfile::tempdir().unwrap();
        let answers = ask(&AcceptDefaults, Some("roll")).unwrap();
        let path = scaffold(dir.path(), &answers).unwrap();

        let handlers = HandlerRegistry::new().with_command("roll", Arc::new(HelpCommand));
        let module = LoadedModule {
            path: path.clone(),
            export: parse_manifest(&std::fs::read_to_string(&path).unwrap(), &handlers),
        };

        let command = expect_command(module).unwrap();
        assert_eq!(command.name(), "roll");
        assert_eq!(command.category(), "general");

        assert!(matches!(
            scaffold(dir.path(), &answers),
            Err(ScaffoldError::FileExists { .. })
        ));
    }
}
