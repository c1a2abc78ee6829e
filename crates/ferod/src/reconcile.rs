//! Application command reconciliation
//!
//! One pass brings the commands registered in the active scope into line
//! with the local [`CommandRegistry`]:
//!
//! 1. fetch the remote list (failure aborts the pass, nothing is touched)
//! 2. create missing commands, edit changed ones when editing is enabled
//! 3. delete remote commands with no local counterpart when enabled
//!
//! Create, edit and delete failures only affect their own command; they are
//! logged, collected in the [`ReconcileReport`] and the pass carries on.

use std::collections::HashMap;

use tracing::{debug, error, info};

use crate::{
    FerodError, Result,
    api::{CommandApi, RegistrationScope, RemoteCommand},
    error::RegistrationOp,
    registry::CommandRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Overwrite remote commands whose definition drifted from the local one
    pub edit: bool,
    /// Delete remote commands no local descriptor claims
    pub delete_unused: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            edit: true,
            delete_unused: false,
        }
    }
}

/// What one pass did, by command name
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub created: Vec<String>,
    pub edited: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: Vec<String>,
    /// Differ from the remote but were left alone because editing is off
    pub stale: Vec<String>,
    /// Isolated [`FerodError::Registration`] failures
    pub failures: Vec<FerodError>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of remote mutations that succeeded
    pub fn changes(&self) -> usize {
        self.created.len() + self.edited.len() + self.deleted.len()
    }
}

pub struct Reconciler<'a, A: CommandApi + ?Sized> {
    api: &'a A,
    scope: RegistrationScope,
    options: ReconcileOptions,
}

impl<'a, A: CommandApi + ?Sized> Reconciler<'a, A> {
    pub fn new(api: &'a A, scope: RegistrationScope, options: ReconcileOptions) -> Self {
        Self {
            api,
            scope,
            options,
        }
    }

    pub async fn reconcile(&self, commands: &CommandRegistry) -> Result<ReconcileReport> {
        let fetched = self
            .api
            .fetch(&self.scope)
            .await
            .map_err(|cause| FerodError::Fetch {
                scope: self.scope,
                cause,
            })?;

        // Cross-scope records are never compared
        let mut remote: HashMap<String, RemoteCommand> = fetched
            .into_iter()
            .filter(|record| record.scope == self.scope)
            .map(|record| (record.name.clone(), record))
            .collect();

        let mut report = ReconcileReport::default();

        for command in commands.iter() {
            let data = command.to_data();

            let Some(existing) = remote.get(command.name()) else {
                match self.api.create(&data, &self.scope).await {
                    Ok(created) => {
                        info!("Created application command {}", command.name());
                        remote.insert(created.name.clone(), created);
                        report.created.push(command.name().to_string());
                    }
                    Err(cause) => {
                        report.failures.push(self.failure(command.name(), RegistrationOp::Create, cause));
                    }
                }
                continue;
            };

            if existing.data().matches(&data) {
                debug!("Application command {} is up to date", command.name());
                report.unchanged.push(command.name().to_string());
                continue;
            }

            if !self.options.edit {
                debug!(
                    "Application command {} differs from its definition but editing is disabled",
                    command.name()
                );
                report.stale.push(command.name().to_string());
                continue;
            }

            let outcome = self.api.edit(existing, &data).await;
            match outcome {
                Ok(edited) => {
                    info!("Edited application command {}", command.name());
                    remote.insert(command.name().to_string(), edited);
                    report.edited.push(command.name().to_string());
                }
                Err(cause) => {
                    report.failures.push(self.failure(command.name(), RegistrationOp::Edit, cause));
                }
            }
        }

        if self.options.delete_unused {
            let mut unused: Vec<&RemoteCommand> = remote
                .values()
                .filter(|record| !commands.contains(&record.name))
                .collect();
            unused.sort_by(|a, b| a.name.cmp(&b.name));

            for record in unused {
                match self.api.delete(record).await {
                    Ok(deleted) => {
                        info!("Deleted application command {}", deleted.name);
                        report.deleted.push(deleted.name);
                    }
                    Err(cause) => {
                        report.failures.push(self.failure(&record.name, RegistrationOp::Delete, cause));
                    }
                }
            }
        }

        info!(
            "Reconciled {} commands: {} created, {} edited, {} deleted, {} failed",
            self.scope,
            report.created.len(),
            report.edited.len(),
            report.deleted.len(),
            report.failures.len()
        );

        Ok(report)
    }

    fn failure(
        &self,
        command: &str,
        operation: RegistrationOp,
        cause: crate::api::ApiError,
    ) -> FerodError {
        error!(
            "Failed to {} application command {} in {} scope: {}",
            operation, command, self.scope, cause
        );
        FerodError::Registration {
            command: command.to_string(),
            operation,
            cause,
        }
    }
}
