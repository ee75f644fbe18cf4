//! The registry together with the file it persists to.
//!
//! Every operation that reads or writes registered objects goes through the
//! store's single lock, so an edit, the save that follows it, and the page
//! rendered from the result are never interleaved with another client's.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tempfile::NamedTempFile;
use webconf_codec::{ApplyOutcome, BinaryReader, BinaryWriter, FormRenderer, NameValueApplier};
use webconf_core::{Registry, Result, WebConfError};

pub struct ConfigStore {
    registry: Mutex<Registry>,
    file: PathBuf,
}

impl ConfigStore {
    pub fn new(registry: Registry, file: impl Into<PathBuf>) -> Self {
        Self {
            registry: Mutex::new(registry),
            file: file.into(),
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Takes the store lock for a sequence of operations.
    pub fn lock(&self) -> Locked<'_> {
        Locked {
            registry: self.registry.lock().unwrap_or_else(PoisonError::into_inner),
            file: &self.file,
        }
    }

    pub fn restore(&self) -> Result<usize> {
        self.lock().restore()
    }

    /// Restores from the file, keeping compiled-in defaults on any failure.
    pub fn restore_or_defaults(&self) -> Option<usize> {
        match self.restore() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(
                    file = %self.file.display(),
                    error = %e,
                    "restore failed; using defaults"
                );
                None
            }
        }
    }

    pub fn save(&self) -> Result<usize> {
        self.lock().save()
    }

    pub fn apply(&self, path: &str, value: &str) -> Result<()> {
        self.lock().apply(path, value)
    }

    pub fn render(&self, form_name: &str) -> String {
        self.lock().render(form_name)
    }
}

/// The registry while the store lock is held.
pub struct Locked<'a> {
    registry: MutexGuard<'a, Registry>,
    file: &'a Path,
}

impl Locked<'_> {
    /// Sets the field at dotted `path` from an already URL-decoded value.
    pub fn apply(&mut self, path: &str, value: &str) -> Result<()> {
        let mut applier = NameValueApplier::new(path, value);
        self.registry.visit_all(&mut applier);
        match applier.outcome() {
            ApplyOutcome::Applied => Ok(()),
            ApplyOutcome::Missing => Err(WebConfError::FieldNotFound(path.to_string())),
            ApplyOutcome::Rejected => Err(WebConfError::InvalidValue {
                field: path.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Writes the whole registry, replacing the file atomically.
    pub fn save(&mut self) -> Result<usize> {
        let mut writer = BinaryWriter::new();
        self.registry.visit_all(&mut writer);
        let bytes = writer.into_bytes();

        let dir = match self.file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let fail = |source| WebConfError::persistence(self.file, source);
        let mut tmp = NamedTempFile::new_in(dir).map_err(fail)?;
        tmp.write_all(&bytes).map_err(fail)?;
        tmp.as_file().sync_all().map_err(fail)?;
        tmp.persist(self.file).map_err(|e| fail(e.error))?;

        tracing::debug!(file = %self.file.display(), bytes = bytes.len(), "saved");
        Ok(bytes.len())
    }

    /// Loads every field from the file.
    ///
    /// The file is decoded once without touching the registry; values are
    /// only written if that pass succeeds, so a truncated file changes nothing.
    pub fn restore(&mut self) -> Result<usize> {
        let data = std::fs::read(self.file).map_err(|e| WebConfError::persistence(self.file, e))?;

        let mut check = BinaryReader::verify(&data);
        self.registry.visit_all(&mut check);
        let trailing = check.trailing();
        check.finish()?;

        let mut reader = BinaryReader::apply(&data);
        self.registry.visit_all(&mut reader);
        let consumed = reader.finish()?;

        if trailing > 0 {
            tracing::warn!(
                file = %self.file.display(),
                trailing,
                "file is longer than the registry; registry shape may have changed"
            );
        }
        tracing::info!(file = %self.file.display(), bytes = consumed, "restored");
        Ok(consumed)
    }

    pub fn render(&mut self, form_name: &str) -> String {
        let mut renderer = FormRenderer::new(form_name);
        self.registry.visit_all(&mut renderer);
        renderer.into_html()
    }
}
