//! # Table Persistence
//!
//! Narrow storage seam between the table subsystem and the filesystem.
//! `FileStore` keeps each table in its own file under a configured
//! directory and replaces it atomically on store: the new bytes are written
//! to a temporary sibling and renamed over the old file, so a crash mid-write
//! leaves the previously persisted table intact and a failed write is never
//! visible to the next reader.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::Result;
use crate::table::TableKind;

/// Storage collaborator for persisted tables.
///
/// `load` distinguishes "not persisted yet" (`Ok(None)`) from I/O failure;
/// `store` must have atomic-replace semantics.
pub trait TableStore: Send + Sync {
    fn load(&self, kind: TableKind) -> Result<Option<Vec<u8>>>;
    fn store(&self, kind: TableKind, bytes: &[u8]) -> Result<()>;
    fn remove(&self, kind: TableKind) -> Result<()>;
}

/// Filesystem-backed store with write-to-temp-then-rename replacement.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(FileStore {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    fn path_for(&self, kind: TableKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }
}

impl TableStore for FileStore {
    fn load(&self, kind: TableKind) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(kind)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, kind: TableKind, bytes: &[u8]) -> Result<()> {
        let target = self.path_for(kind);
        let tmp = self.dir.join(format!("{}.tmp", kind.file_name()));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp, &target) {
            warn!(error = %e, table = %kind, "Atomic replace failed, removing temp file");
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!(table = %kind, bytes = bytes.len(), "Persisted table");
        Ok(())
    }

    fn remove(&self, kind: TableKind) -> Result<()> {
        match fs::remove_file(self.path_for(kind)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and embedded use.
#[derive(Default)]
pub struct MemStore {
    tables: Mutex<HashMap<TableKind, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStore for MemStore {
    fn load(&self, kind: TableKind) -> Result<Option<Vec<u8>>> {
        Ok(self
            .tables
            .lock()
            .map_err(|_| crate::error::BiosError::Custom("store lock poisoned".to_string()))?
            .get(&kind)
            .cloned())
    }

    fn store(&self, kind: TableKind, bytes: &[u8]) -> Result<()> {
        self.tables
            .lock()
            .map_err(|_| crate::error::BiosError::Custom("store lock poisoned".to_string()))?
            .insert(kind, bytes.to_vec());
        Ok(())
    }

    fn remove(&self, kind: TableKind) -> Result<()> {
        self.tables
            .lock()
            .map_err(|_| crate::error::BiosError::Custom("store lock poisoned".to_string()))?
            .remove(&kind);
        Ok(())
    }
}
