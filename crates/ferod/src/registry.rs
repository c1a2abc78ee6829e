use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::{
    command::CommandDescriptor,
    listener::{EventKind, EventListener},
};

/// Loaded commands keyed by name.
///
/// Filled once while the client loads its modules, then shared read-only
/// behind an `Arc` with every handler.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandDescriptor>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a command, replacing any earlier command of the same name
    pub fn insert(&mut self, command: CommandDescriptor) -> Option<CommandDescriptor> {
        let previous = self.commands.insert(command.name().to_string(), command);
        if let Some(previous) = &previous {
            warn!(
                "Command '{}' defined more than once, the last definition wins",
                previous.name()
            );
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands in name order
    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.values()
    }

    /// Distinct categories, sorted
    pub fn categories(&self) -> Vec<String> {
        self.commands
            .values()
            .map(|c| c.category().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a CommandDescriptor> {
        self.commands
            .values()
            .filter(move |c| c.category() == category)
    }
}

impl FromIterator<CommandDescriptor> for CommandRegistry {
    fn from_iter<T: IntoIterator<Item = CommandDescriptor>>(iter: T) -> Self {
        let mut registry = Self::new();
        for command in iter {
            registry.insert(command);
        }
        registry
    }
}

/// Bound listeners grouped by event
#[derive(Debug, Clone, Default)]
pub struct ListenerSet {
    listeners: BTreeMap<EventKind, Vec<EventListener>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, listener: EventListener) {
        self.listeners
            .entry(listener.event())
            .or_default()
            .push(listener);
    }

    pub fn for_event(&self, event: EventKind) -> &[EventListener] {
        self.listeners
            .get(&event)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events with at least one listener
    pub fn events(&self) -> Vec<EventKind> {
        self.listeners.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test::{NoopListener, command};
    use std::sync::Arc;

    #[test]
    fn test_categories_sorted_and_unique() {
        let registry: CommandRegistry = [
            command("ping", "utility"),
            command("ban", "moderation"),
            command("kick", "moderation"),
        ]
        .into_iter()
        .collect();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.categories(), vec!["moderation", "utility"]);

        let names: Vec<&str> = registry.by_category("moderation").map(|c| c.name()).collect();
        assert_eq!(names, vec!["ban", "kick"]);
    }

    #[test]
    fn test_duplicate_name_replaces() {
        let mut registry = CommandRegistry::new();
        assert!(registry.insert(command("ping", "utility")).is_none());
        let previous = registry.insert(command("ping", "fun"));

        assert_eq!(previous.unwrap().category(), "utility");
        assert_eq!(registry.get("ping").unwrap().category(), "fun");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_listener_set_groups_by_event() {
        let mut listeners = ListenerSet::new();
        for event in [EventKind::Ready, EventKind::MessageCreate, EventKind::Ready] {
            listeners.bind(
                EventListener::builder()
                    .event(event)
                    .handler(Arc::new(NoopListener))
                    .build()
                    .unwrap(),
            );
        }

        assert_eq!(listeners.len(), 3);
        assert_eq!(listeners.for_event(EventKind::Ready).len(), 2);
        assert!(listeners.for_event(EventKind::GuildMemberAdd).is_empty());
        assert_eq!(
            listeners.events(),
            vec![EventKind::Ready, EventKind::MessageCreate]
        );
    }
}
