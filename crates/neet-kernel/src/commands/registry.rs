//! Command registry for looking up and managing commands.

use std::collections::HashMap;
use std::sync::Arc;

use neet_types::CommandSchema;
use thiserror::Error;

use super::traits::Command;

/// Registration failures. The registry is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("command has no names")]
    NoNames,
    #[error("Existing command: {0}")]
    Duplicate(String),
}

/// A registered command with its cached schema.
pub struct RegisteredCommand {
    schema: CommandSchema,
    handler: Arc<dyn Command>,
}

impl RegisteredCommand {
    pub fn schema(&self) -> &CommandSchema {
        &self.schema
    }

    pub fn handler(&self) -> &Arc<dyn Command> {
        &self.handler
    }
}

/// Registry of available commands.
///
/// Names and aliases share one case-insensitive namespace. Registration
/// order is kept for `help`.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<RegisteredCommand>,
    by_name: HashMap<String, usize>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under all its names.
    pub fn register(&mut self, command: impl Command + 'static) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(command))
    }

    /// Register a shared command.
    pub fn register_arc(&mut self, command: Arc<dyn Command>) -> Result<(), RegistryError> {
        let mut schema = command.schema();
        schema.names = schema
            .names
            .iter()
            .map(|n| n.to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        if schema.names.is_empty() {
            return Err(RegistryError::NoNames);
        }

        for (i, name) in schema.names.iter().enumerate() {
            if self.by_name.contains_key(name) || schema.names[..i].contains(name) {
                return Err(RegistryError::Duplicate(name.clone()));
            }
        }

        let index = self.entries.len();
        for name in &schema.names {
            self.by_name.insert(name.clone(), index);
        }
        tracing::trace!(command = schema.name(), "registered");
        self.entries.push(RegisteredCommand {
            schema,
            handler: command,
        });
        Ok(())
    }

    /// Look up a command by any of its names, ignoring case.
    pub fn lookup(&self, name: &str) -> Option<&RegisteredCommand> {
        let index = self.by_name.get(&name.to_lowercase())?;
        self.entries.get(*index)
    }

    /// Schema for a command name.
    pub fn schema(&self, name: &str) -> Option<&CommandSchema> {
        self.lookup(name).map(RegisteredCommand::schema)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// All schemas in registration order.
    pub fn schemas(&self) -> impl Iterator<Item = &CommandSchema> {
        self.entries.iter().map(RegisteredCommand::schema)
    }

    /// Number of commands (not names).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.entries.len())
            .field("names", &self.by_name.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::traits::{CommandResult, LineContext};
    use async_trait::async_trait;

    struct Named(&'static [&'static str]);

    #[async_trait]
    impl Command for Named {
        fn schema(&self) -> CommandSchema {
            let mut schema = CommandSchema::new(self.0[0], "test command");
            for alias in &self.0[1..] {
                schema = schema.alias(*alias);
            }
            schema
        }

        async fn execute(&self, _args: Vec<String>, _ctx: &mut dyn LineContext) -> CommandResult {
            Ok(())
        }
    }

    #[test]
    fn lookup_ignores_case() {
        let mut registry = CommandRegistry::new();
        registry.register(Named(&["Print", "echo"])).unwrap();

        assert!(registry.lookup("PRINT").is_some());
        assert!(registry.lookup("Echo").is_some());
        assert_eq!(registry.schema("echo").map(|s| s.name()), Some("print"));
        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    fn colliding_alias_leaves_registry_unchanged() {
        let mut registry = CommandRegistry::new();
        registry.register(Named(&["print", "echo"])).unwrap();

        let err = registry.register(Named(&["say", "ECHO"])).unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("echo".to_string()));
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains("say"));
    }

    #[test]
    fn repeated_name_within_one_command() {
        let mut registry = CommandRegistry::new();
        let err = registry.register(Named(&["x", "X"])).unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("x".to_string()));
        assert!(registry.is_empty());
    }

    #[test]
    fn empty_names_rejected() {
        let mut registry = CommandRegistry::new();
        assert_eq!(registry.register(Named(&[""])), Err(RegistryError::NoNames));
    }

    #[test]
    fn schemas_in_registration_order() {
        let mut registry = CommandRegistry::new();
        registry.register(Named(&["b"])).unwrap();
        registry.register(Named(&["a"])).unwrap();
        let names: Vec<_> = registry.schemas().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
