use std::path::{Path, PathBuf};

use ferod::EventKind;
use miette::Result;
use serde::Serialize;

use crate::output::Output;
use crate::prompt::Prompter;
use crate::scaffold::{self, ScaffoldError, file_stem, project_config, snake_case, write_new};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerAnswers {
    pub file_name: String,
    pub event: EventKind,
}

impl ListenerAnswers {
    pub fn handler(&self) -> String {
        snake_case(&self.file_name)
    }
}

#[derive(Serialize)]
struct Manifest {
    listener: ListenerTable,
}

#[derive(Serialize)]
struct ListenerTable {
    event: EventKind,
    handler: String,
}

pub fn ask(prompter: &dyn Prompter, name: Option<&str>) -> scaffold::Result<ListenerAnswers> {
    let file_name = prompter.input("What is the name of the listener?", name)?;
    let file_name = file_stem(&file_name).to_string();
    if file_name.is_empty() {
        return Err(ScaffoldError::MissingAnswer {
            prompt: "listener name".to_string(),
        });
    }

    let events: Vec<&str> = EventKind::ALL.iter().map(|e| e.as_str()).collect();
    let selected = prompter.select("What event do you want to listen to?", &events, 0)?;
    let event = EventKind::ALL.get(selected).copied().unwrap_or(EventKind::Ready);

    Ok(ListenerAnswers { file_name, event })
}

pub fn manifest(answers: &ListenerAnswers) -> scaffold::Result<String> {
    toml::to_string(&Manifest {
        listener: ListenerTable {
            event: answers.event,
            handler: answers.handler(),
        },
    })
    .map_err(|cause| ScaffoldError::Render { cause })
}

/// Write the manifest into `listeners_dir`, returning its path
pub fn scaffold(listeners_dir: &Path, answers: &ListenerAnswers) -> scaffold::Result<PathBuf> {
    let path = listeners_dir.join(format!("{}.toml", answers.file_name));
    write_new(&path, &manifest(answers)?)?;
    Ok(path)
}

pub async fn create(prompter: &dyn Prompter, name: Option<&str>, project_dir: &Path) -> Result<()> {
    let output = Output::new();
    let config = project_config(project_dir).await?;
    let answers = ask(prompter, name)?;

    let path = scaffold(&config.event_listeners_path, &answers)?;

    output.success(&format!("Created {}", path.display()));
    output.kv("event", answers.event.as_str());
    output.kv("handler", &answers.handler());
    output.status("Register a listener handler with this name in your HandlerRegistry");

    Ok(())
}
