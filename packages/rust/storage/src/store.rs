//! File-backed record store: one YAML file per collection.
//!
//! Collections are loaded wholesale and rewritten wholesale. A missing file
//! is an empty collection; a file that exists but cannot be read or parsed is
//! [`StoreError::Unreadable`]. Writes go to a temp file in the same directory
//! and are renamed into place. A [`WriteSet`] stages several collections
//! first and renames them together, undoing earlier renames if a later one
//! fails.
//!
//! There is no locking. Callers must run one writer at a time.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use newsroom_shared::{NewsroomError, now_jst};

use crate::records::{
    BENCHMARKS_FILE, Benchmarks, COMPANIES_FILE, Company, MARKER_FILE, MARKET_SIZES_FILE, Marker,
    PRICING_FILE, TRENDS_FILE,
};

/// Store-level failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot read {path:?}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("cannot write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot serialize {file}: {message}")]
    Serialize { file: String, message: String },

    #[error("knowledge store at {0:?} is read-only")]
    ReadOnly(PathBuf),
}

impl From<StoreError> for NewsroomError {
    fn from(err: StoreError) -> Self {
        NewsroomError::Storage(err.to_string())
    }
}

/// Handle on a knowledge-base directory.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    dir: PathBuf,
    readonly: bool,
}

impl KnowledgeStore {
    /// Read-write handle. The directory is created on first write.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            readonly: false,
        }
    }

    /// Handle that rejects every write (dry runs, context building).
    pub fn open_readonly(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            readonly: true,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    // -- Loads -------------------------------------------------------------

    pub fn companies(&self) -> Result<Vec<Company>, StoreError> {
        self.load(COMPANIES_FILE)
    }

    /// Aggregate figures keyed by bucket name, in file order.
    pub fn market_sizes(&self) -> Result<Mapping, StoreError> {
        self.load(MARKET_SIZES_FILE)
    }

    pub fn benchmarks(&self) -> Result<Benchmarks, StoreError> {
        self.load(BENCHMARKS_FILE)
    }

    /// Read-only collection; `Value::Null` when missing.
    pub fn trends(&self) -> Result<Value, StoreError> {
        self.load(TRENDS_FILE)
    }

    /// Read-only collection; `Value::Null` when missing.
    pub fn pricing(&self) -> Result<Value, StoreError> {
        self.load(PRICING_FILE)
    }

    pub fn marker(&self) -> Result<Marker, StoreError> {
        self.load(MARKER_FILE)
    }

    // -- Saves -------------------------------------------------------------

    pub fn save_companies(&self, companies: &[Company]) -> Result<(), StoreError> {
        self.save(COMPANIES_FILE, &companies)
    }

    pub fn save_market_sizes(&self, market: &Mapping) -> Result<(), StoreError> {
        self.save(MARKET_SIZES_FILE, market)
    }

    pub fn save_benchmarks(&self, benchmarks: &Benchmarks) -> Result<(), StoreError> {
        self.save(BENCHMARKS_FILE, benchmarks)
    }

    pub fn save_marker(&self, marker: &Marker) -> Result<(), StoreError> {
        self.save(MARKER_FILE, marker)
    }

    /// Start a group of writes that land together or not at all.
    pub fn write_set(&self) -> Result<WriteSet<'_>, StoreError> {
        if self.readonly {
            return Err(StoreError::ReadOnly(self.dir.clone()));
        }
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::Write {
            path: self.dir.clone(),
            source: e,
        })?;
        Ok(WriteSet {
            store: self,
            staged: Vec::new(),
        })
    }

    // -- Internals ---------------------------------------------------------

    fn load<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, StoreError> {
        let path = self.dir.join(file);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "collection missing, treating as empty");
                return Ok(T::default());
            }
            Err(e) => {
                return Err(StoreError::Unreadable {
                    path,
                    message: e.to_string(),
                });
            }
        };

        let unreadable = |e: serde_yaml::Error| StoreError::Unreadable {
            path: path.clone(),
            message: e.to_string(),
        };

        // A file holding only comments parses as null.
        let value: Value = serde_yaml::from_str(&text).map_err(unreadable)?;
        if value.is_null() {
            return Ok(T::default());
        }
        serde_yaml::from_value(value).map_err(unreadable)
    }

    fn save<T: Serialize + ?Sized>(&self, file: &str, data: &T) -> Result<(), StoreError> {
        let mut set = self.write_set()?;
        set.stage(file, data)?;
        set.commit()
    }
}

// ---------------------------------------------------------------------------
// Grouped writes
// ---------------------------------------------------------------------------

/// Collections staged for one commit.
///
/// Staging serializes each collection to a temp file and copies the current
/// file aside. [`WriteSet::commit`] renames the temp files into place in
/// staging order; if one rename fails, the ones before it are undone from
/// their copies. Temp files and copies never outlive the set.
#[derive(Debug)]
pub struct WriteSet<'a> {
    store: &'a KnowledgeStore,
    staged: Vec<Staged>,
}

#[derive(Debug)]
struct Staged {
    path: PathBuf,
    tmp: PathBuf,
    /// Copy of the file being replaced; `None` when it did not exist.
    backup: Option<PathBuf>,
}

impl Staged {
    fn discard(&self) {
        std::fs::remove_file(&self.tmp).ok();
        if let Some(backup) = &self.backup {
            std::fs::remove_file(backup).ok();
        }
    }

    /// Put back what was at `path` before the rename.
    fn restore(&self) {
        let restored = match &self.backup {
            Some(backup) => std::fs::rename(backup, &self.path),
            None => std::fs::remove_file(&self.path),
        };
        if let Err(e) = restored {
            warn!(path = %self.path.display(), error = %e, "could not restore collection");
        }
    }
}

impl WriteSet<'_> {
    pub fn stage_companies(&mut self, companies: &[Company]) -> Result<(), StoreError> {
        self.stage(COMPANIES_FILE, &companies)
    }

    pub fn stage_market_sizes(&mut self, market: &Mapping) -> Result<(), StoreError> {
        self.stage(MARKET_SIZES_FILE, market)
    }

    pub fn stage_benchmarks(&mut self, benchmarks: &Benchmarks) -> Result<(), StoreError> {
        self.stage(BENCHMARKS_FILE, benchmarks)
    }

    pub fn stage_marker(&mut self, marker: &Marker) -> Result<(), StoreError> {
        self.stage(MARKER_FILE, marker)
    }

    fn stage<T: Serialize + ?Sized>(&mut self, file: &str, data: &T) -> Result<(), StoreError> {
        let body = serde_yaml::to_string(data).map_err(|e| StoreError::Serialize {
            file: file.to_string(),
            message: e.to_string(),
        })?;
        let text = format!(
            "# Updated: {}\n\n{body}",
            now_jst().format("%Y-%m-%d %H:%M JST")
        );

        let store = self.store;
        let path = store.dir.join(file);
        let id = Uuid::now_v7();
        let mut entry = Staged {
            path: path.clone(),
            tmp: store.dir.join(format!(".{file}.{id}.tmp")),
            backup: None,
        };

        if let Err(e) = std::fs::write(&entry.tmp, text) {
            entry.discard();
            return Err(StoreError::Write { path, source: e });
        }
        if path.exists() {
            let backup = store.dir.join(format!(".{file}.{id}.bak"));
            // Copying refuses anything that is not a regular file.
            if let Err(e) = std::fs::copy(&path, &backup) {
                entry.discard();
                std::fs::remove_file(&backup).ok();
                return Err(StoreError::Write { path, source: e });
            }
            entry.backup = Some(backup);
        }

        self.staged.push(entry);
        Ok(())
    }

    /// Rename every staged file into place.
    pub fn commit(mut self) -> Result<(), StoreError> {
        let staged = std::mem::take(&mut self.staged);
        for (i, entry) in staged.iter().enumerate() {
            if let Err(e) = std::fs::rename(&entry.tmp, &entry.path) {
                for done in staged[..i].iter().rev() {
                    done.restore();
                }
                staged.iter().for_each(Staged::discard);
                return Err(StoreError::Write {
                    path: entry.path.clone(),
                    source: e,
                });
            }
        }

        staged.iter().for_each(Staged::discard);
        for entry in &staged {
            debug!(path = %entry.path.display(), "collection written");
        }
        Ok(())
    }
}

impl Drop for WriteSet<'_> {
    fn drop(&mut self) {
        self.staged.iter().for_each(Staged::discard);
    }
}
