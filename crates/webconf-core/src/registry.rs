use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Result, WebConfError};
use crate::visitor::{visit_composite, Visit, Visitor};

/// Shared handle to a live object the host program keeps reading from.
pub type Tunable<T> = Arc<Mutex<T>>;

trait Entry: Send + Sync {
    fn name(&self) -> &str;
    fn visit(&self, visitor: &mut dyn Visitor);
}

struct Registered<T> {
    name: String,
    target: Tunable<T>,
}

impl<T: Visit + Send + 'static> Entry for Registered<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn visit(&self, visitor: &mut dyn Visitor) {
        let mut target = self.target.lock().unwrap_or_else(PoisonError::into_inner);
        visit_composite(visitor, &self.name, &mut *target);
    }
}

/// Ordered, append-only list of named objects exposed for editing.
///
/// Entries are registered before the server starts and are never removed;
/// every traversal visits them in registration order.
#[derive(Default)]
pub struct Registry {
    entries: Vec<Box<dyn Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exposes `target` under `name`. Names must be unique so that every
    /// dotted field path resolves to exactly one field.
    pub fn register<T>(&mut self, name: impl Into<String>, target: Tunable<T>) -> Result<()>
    where
        T: Visit + Send + 'static,
    {
        let name = name.into();
        if self.entries.iter().any(|e| e.name() == name) {
            return Err(WebConfError::DuplicateEntry(name));
        }
        tracing::debug!(entry = %name, "registered");
        self.entries.push(Box::new(Registered { name, target }));
        Ok(())
    }

    /// Wraps `value` in a shared handle, registers it, and hands the handle back.
    pub fn tunable<T>(&mut self, name: impl Into<String>, value: T) -> Result<Tunable<T>>
    where
        T: Visit + Send + 'static,
    {
        let handle = Arc::new(Mutex::new(value));
        self.register(name, handle.clone())?;
        Ok(handle)
    }

    /// Runs `visitor` over every entry, each bracketed as a composite named
    /// after its registration name.
    pub fn visit_all(&self, visitor: &mut dyn Visitor) {
        for entry in &self.entries {
            entry.visit(visitor);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
