//! Ordered record of everything declared on an application, used to build
//! documentation.

use std::sync::Arc;

use crate::definition::ActionDefinition;

#[derive(Clone, Debug)]
pub enum RegistryEntry {
    Action(Arc<ActionDefinition>),
    /// Verbatim Markdown, inserted between action sections.
    Markdown(String),
    /// Placeholder resolved to the current UTC time when docs are rendered.
    Timestamp,
}

pub trait ActionRegistry: Send + Sync + std::fmt::Debug {
    fn append(&mut self, entry: RegistryEntry);

    /// Entries in declaration order.
    fn entries(&self) -> &[RegistryEntry];
}

/// Keeps everything it is given.
#[derive(Debug, Default)]
pub struct RecordingRegistry {
    entries: Vec<RegistryEntry>,
}

impl ActionRegistry for RecordingRegistry {
    fn append(&mut self, entry: RegistryEntry) {
        self.entries.push(entry);
    }

    fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }
}

/// Drops everything. Used when documentation is disabled, so production
/// builds expose nothing beyond the title.
#[derive(Debug, Default)]
pub struct NullRegistry;

impl ActionRegistry for NullRegistry {
    fn append(&mut self, _entry: RegistryEntry) {}

    fn entries(&self) -> &[RegistryEntry] {
        &[]
    }
}

pub fn registry_for(documentation_enabled: bool) -> Box<dyn ActionRegistry> {
    if documentation_enabled {
        Box::<RecordingRegistry>::default()
    } else {
        Box::new(NullRegistry)
    }
}
