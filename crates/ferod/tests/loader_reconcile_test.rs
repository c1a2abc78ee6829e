//! Integration tests for loading manifests from disk and reconciling them
//!
//! Commands are read from a temporary directory tree and synced against an
//! in-memory stand-in for Discord's command endpoints.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ferod::{
    BotContext, CommandHandler, CommandRegistry, FerodError, HandlerRegistry, ReconcileOptions,
    Reconciler, RegistrationScope, RemoteCommand,
    api::{ApiResult, CommandApi},
    command::CommandData,
    loader::{self, FsModuleSource},
    serenity::model::{application::CommandInteraction, id::CommandId},
};
use pretty_assertions::assert_eq;

struct Reply;

#[async_trait]
impl CommandHandler for Reply {
    async fn run(&self, _bot: &BotContext, _command: &CommandInteraction) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct MemoryApi {
    remote: Mutex<BTreeMap<String, RemoteCommand>>,
    mutations: Mutex<Vec<String>>,
}

impl MemoryApi {
    fn mutations(&self) -> Vec<String> {
        self.mutations.lock().unwrap().clone()
    }

    fn record(&self, data: &CommandData, scope: RegistrationScope, id: u64) -> RemoteCommand {
        RemoteCommand {
            id: CommandId::new(id),
            scope,
            name: data.name.clone(),
            kind: data.kind,
            description: data.description.clone(),
            options: data.options.clone(),
            permissions: data.permissions,
        }
    }
}

#[async_trait]
impl CommandApi for MemoryApi {
    async fn fetch(&self, scope: &RegistrationScope) -> ApiResult<Vec<RemoteCommand>> {
        Ok(self
            .remote
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.scope == *scope)
            .cloned()
            .collect())
    }

    async fn create(&self, data: &CommandData, scope: &RegistrationScope) -> ApiResult<RemoteCommand> {
        let mut remote = self.remote.lock().unwrap();
        let record = self.record(data, *scope, remote.len() as u64 + 1);
        remote.insert(data.name.clone(), record.clone());
        self.mutations.lock().unwrap().push(format!("create {}", data.name));
        Ok(record)
    }

    async fn edit(&self, record: &RemoteCommand, data: &CommandData) -> ApiResult<RemoteCommand> {
        let updated = self.record(data, record.scope, record.id.get());
        self.remote
            .lock()
            .unwrap()
            .insert(data.name.clone(), updated.clone());
        self.mutations.lock().unwrap().push(format!("edit {}", data.name));
        Ok(updated)
    }

    async fn delete(&self, record: &RemoteCommand) -> ApiResult<RemoteCommand> {
        self.remote.lock().unwrap().remove(&record.name);
        self.mutations.lock().unwrap().push(format!("delete {}", record.name));
        Ok(record.clone())
    }
}

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn handlers() -> Arc<HandlerRegistry> {
    Arc::new(
        HandlerRegistry::new()
            .with_command("reply", Arc::new(Reply))
            .with_builtin_help(),
    )
}

async fn load(dir: &Path) -> CommandRegistry {
    let source = FsModuleSource::new(dir, handlers());
    let loaded = loader::load_commands(&source).await.unwrap();
    loaded.items.into_iter().collect()
}

const ROLL: &str = r#"
[command]
name = "roll"
description = "Roll some dice"
category = "fun"
handler = "reply"

[[command.options]]
name = "sides"
type = "integer"
description = "Number of sides"
required = true
choices = [
    { name = "d6", value = 6 },
    { name = "d20", value = 20 },
]

[[command.options]]
name = "count"
type = "integer"
description = "How many dice"
"#;

#[tokio::test]
async fn test_disk_commands_sync_and_settle() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "fun/roll.toml", ROLL);
    write(
        dir.path(),
        "utility/help.toml",
        "[command]\nname = \"help\"\ndescription = \"Shows a help embed\"\ncategory = \"utility\"\nhandler = \"help\"\n",
    );
    write(
        dir.path(),
        "report.toml",
        "[command]\nname = \"Report\"\ncategory = \"moderation\"\ntype = \"message\"\nhandler = \"reply\"\n",
    );
    write(dir.path(), "notes.txt", "not a module");

    let commands = load(dir.path()).await;
    assert_eq!(
        commands.iter().map(|c| c.name()).collect::<Vec<_>>(),
        vec!["Report", "help", "roll"]
    );
    assert_eq!(commands.get("roll").unwrap().usage(), "`/roll <sides> [count]`");

    let api = MemoryApi::default();
    let reconciler = Reconciler::new(&api, RegistrationScope::Global, ReconcileOptions::default());

    let first = reconciler.reconcile(&commands).await.unwrap();
    assert_eq!(first.created, vec!["Report", "help", "roll"]);

    let second = reconciler.reconcile(&commands).await.unwrap();
    assert_eq!(second.changes(), 0);
    assert_eq!(api.mutations().len(), 3);
}

#[tokio::test]
async fn test_changed_manifest_is_edited_and_removed_one_deleted() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "roll.toml", ROLL);
    write(
        dir.path(),
        "ping.toml",
        "[command]\nname = \"ping\"\ndescription = \"Pong\"\ncategory = \"utility\"\nhandler = \"reply\"\n",
    );

    let api = MemoryApi::default();
    let options = ReconcileOptions {
        edit: true,
        delete_unused: true,
    };
    let reconciler = Reconciler::new(&api, RegistrationScope::Global, options);
    reconciler.reconcile(&load(dir.path()).await).await.unwrap();

    std::fs::remove_file(dir.path().join("ping.toml")).unwrap();
    write(dir.path(), "roll.toml", &ROLL.replace("Roll some dice", "Roll dice"));

    let report = reconciler.reconcile(&load(dir.path()).await).await.unwrap();

    assert_eq!(report.edited, vec!["roll"]);
    assert_eq!(report.deleted, vec!["ping"]);
    assert_eq!(
        api.mutations(),
        vec!["create ping", "create roll", "edit roll", "delete ping"]
    );
}

#[tokio::test]
async fn test_bad_files_are_skipped_but_incomplete_ones_abort() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.toml", ROLL);
    write(dir.path(), "b.toml", "[listener]\nevent = \"ready\"\n");
    write(dir.path(), "c.toml", "[command]\nname = \"x\"\nhandler = \"missing\"\n");

    let source = FsModuleSource::new(dir.path(), handlers());
    let loaded = loader::load_commands(&source).await.unwrap();
    assert_eq!(loaded.items.len(), 1);
    assert_eq!(loaded.skipped.len(), 2);

    write(
        dir.path(),
        "d.toml",
        "[command]\nname = \"nocat\"\ndescription = \"No category\"\nhandler = \"reply\"\n",
    );
    let err = loader::load_commands(&source).await.unwrap_err();
    assert!(matches!(err, FerodError::MissingField { field: "category", .. }));
}
