//! File-level helpers shared by the `create` commands

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use ferod::config::{CONFIG_FILE, FerodConfig, load_config};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ScaffoldError {
    #[error("Directory {} is not empty", path.display())]
    #[diagnostic(
        code(ferod_cli::directory_not_empty),
        help("Choose another name or remove the existing directory first")
    )]
    DirectoryNotEmpty { path: PathBuf },

    #[error("{} already exists", path.display())]
    #[diagnostic(
        code(ferod_cli::file_exists),
        help("Existing files are never overwritten; pick another file name")
    )]
    FileExists { path: PathBuf },

    #[error("Could not write {}", path.display())]
    #[diagnostic(code(ferod_cli::io))]
    Io {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    #[error("Invalid manifest template")]
    #[diagnostic(code(ferod_cli::template))]
    Template {
        #[source]
        cause: toml::de::Error,
    },

    #[error("Could not render manifest")]
    #[diagnostic(code(ferod_cli::render))]
    Render {
        #[source]
        cause: toml::ser::Error,
    },

    #[error("No answer for \"{prompt}\"")]
    #[diagnostic(
        code(ferod_cli::missing_answer),
        help("Pass the name as an argument or run without -y")
    )]
    MissingAnswer { prompt: String },

    #[error("Prompt failed")]
    #[diagnostic(code(ferod_cli::prompt))]
    Prompt {
        #[source]
        cause: dialoguer::Error,
    },
}

pub type Result<T> = std::result::Result<T, ScaffoldError>;

/// Substitute every `{{key}}` in `template`
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{{{}}}}}", key), value)
    })
}

/// Deep-merge `overlay` into `base`; overlay wins for everything but tables
pub fn merge_manifests(base: &str, overlay: &str) -> Result<String> {
    let mut base: toml::Table = base.parse().map_err(|cause| ScaffoldError::Template { cause })?;
    let overlay: toml::Table = overlay.parse().map_err(|cause| ScaffoldError::Template { cause })?;

    merge_tables(&mut base, overlay);

    toml::to_string(&base).map_err(|cause| ScaffoldError::Render { cause })
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        let incoming = match value {
            toml::Value::Table(incoming) => incoming,
            other => {
                base.insert(key, other);
                continue;
            }
        };

        if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
            merge_tables(existing, incoming);
            continue;
        }
        base.insert(key, toml::Value::Table(incoming));
    }
}

/// Create `path` (and its parents) with `contents`, refusing to replace an existing file
pub fn write_new(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|cause| ScaffoldError::Io {
            path: parent.to_path_buf(),
            cause,
        })?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|cause| match cause.kind() {
            ErrorKind::AlreadyExists => ScaffoldError::FileExists {
                path: path.to_path_buf(),
            },
            _ => ScaffoldError::Io {
                path: path.to_path_buf(),
                cause,
            },
        })?;

    file.write_all(contents.as_bytes())
        .map_err(|cause| ScaffoldError::Io {
            path: path.to_path_buf(),
            cause,
        })
}

/// Create `path` if needed and make sure nothing is in it
pub fn ensure_empty_dir(path: &Path) -> Result<()> {
    let io_error = |cause| ScaffoldError::Io {
        path: path.to_path_buf(),
        cause,
    };

    if path.exists() {
        let mut entries = fs::read_dir(path).map_err(io_error)?;
        if entries.next().is_some() {
            return Err(ScaffoldError::DirectoryNotEmpty {
                path: path.to_path_buf(),
            });
        }
        return Ok(());
    }

    fs::create_dir_all(path).map_err(io_error)
}

/// Drop a trailing extension: `ban.toml` → `ban`
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 && !name[dot..].contains('/') => &name[..dot],
        _ => name,
    }
}

/// Identifier-safe form used for crate and handler names
pub fn snake_case(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// The project's configuration, or the defaults when it has no `ferod.toml`.
/// Module paths come back resolved against `project_dir`.
pub async fn project_config(project_dir: &Path) -> miette::Result<FerodConfig> {
    let path = project_dir.join(CONFIG_FILE);
    if path.exists() {
        return Ok(load_config(&path).await?);
    }

    let mut config = FerodConfig::default();
    config.resolve_paths(project_dir);
    Ok(config)
}
