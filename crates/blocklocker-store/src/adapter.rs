//! Persistence adapters: where snapshots live between server runs.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// Boundary to the durable medium holding snapshots.
///
/// This is the only place BlockLocker performs blocking I/O. Failures must
/// be reported, not swallowed: a snapshot that was not written must surface
/// as an error so the caller keeps its dirty state.
pub trait PersistenceAdapter: Send + Sync {
    /// Read the last saved snapshot. `Ok(None)` if nothing was ever saved.
    fn load(&self) -> StoreResult<Option<Vec<u8>>>;

    /// Durably replace the saved snapshot with `bytes`.
    fn save(&self, bytes: &[u8]) -> StoreResult<()>;
}

/// Stores the snapshot in a single file, replaced atomically on save.
///
/// The new snapshot is written to a temporary file in the same directory,
/// synced, and renamed over the old one, so a crash mid-save leaves the
/// previous snapshot intact.
#[derive(Clone, Debug)]
pub struct FileAdapter {
    path: PathBuf,
}

impl FileAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceAdapter for FileAdapter {
    fn load(&self) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                debug!(path = %self.path.display(), bytes = bytes.len(), "read snapshot file");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no existing protection data, starting fresh");
                Ok(None)
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn save(&self, bytes: &[u8]) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        sync_dir(&dir)?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "wrote snapshot file");
        Ok(())
    }
}

/// Make the rename itself durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Keeps the snapshot in memory. For tests and embedding.
///
/// [`MemoryAdapter::set_available`] simulates the medium going away: while
/// unavailable, both `load` and `save` fail with
/// [`StoreError::Unavailable`].
#[derive(Debug)]
pub struct MemoryAdapter {
    bytes: Mutex<Option<Vec<u8>>>,
    available: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self {
            bytes: Mutex::new(None),
            available: AtomicBool::new(true),
            saves: AtomicUsize::new(0),
        }
    }

    /// Start with a previously saved snapshot.
    pub fn with_snapshot(bytes: Vec<u8>) -> Self {
        let adapter = Self::new();
        *adapter.bytes.lock() = Some(bytes);
        adapter
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// The bytes of the last successful save.
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.bytes.lock().clone()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn check(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory adapter offline".into()))
        }
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn load(&self) -> StoreResult<Option<Vec<u8>>> {
        self.check()?;
        Ok(self.bytes.lock().clone())
    }

    fn save(&self, bytes: &[u8]) -> StoreResult<()> {
        self.check()?;
        *self.bytes.lock() = Some(bytes.to_vec());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
