use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::FeedbackEntry;

/// File name of the ledger document inside the data directory.
pub const LEDGER_FILE_NAME: &str = "learning_history.json";

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger at {path} is corrupted: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Durable home of the feedback history.
///
/// The whole history is written on every save; a stored ledger is always a
/// complete snapshot, never a log to append to.
pub trait LedgerStore: Send + Sync {
    /// Loads the full history. A missing ledger is an empty history.
    fn load(&self) -> Result<Vec<FeedbackEntry>, LedgerError>;
    /// Replaces the stored history with `entries`.
    fn save(&self, entries: &[FeedbackEntry]) -> Result<(), LedgerError>;
    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// JsonFileLedger — pretty-printed JSON array on disk
// ---------------------------------------------------------------------------

pub struct JsonFileLedger {
    path: PathBuf,
}

impl JsonFileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ledger file inside `dir`, creating the directory if needed.
    pub fn in_dir(dir: &Path) -> Result<Self, LedgerError> {
        fs::create_dir_all(dir)?;
        Ok(Self::new(dir.join(LEDGER_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| LEDGER_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LedgerStore for JsonFileLedger {
    fn load(&self) -> Result<Vec<FeedbackEntry>, LedgerError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        serde_json::from_str(&raw).map_err(|source| LedgerError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn save(&self, entries: &[FeedbackEntry]) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.temp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// InMemoryLedger — process-local ledger
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryLedger {
    entries: Mutex<Vec<FeedbackEntry>>,
    reject_writes: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<FeedbackEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            reject_writes: AtomicBool::new(false),
        }
    }

    /// Makes subsequent saves fail with [`LedgerError::Unavailable`].
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Vec<FeedbackEntry> {
        self.lock_entries().clone()
    }

    fn lock_entries(&self) -> MutexGuard<'_, Vec<FeedbackEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LedgerStore for InMemoryLedger {
    fn load(&self) -> Result<Vec<FeedbackEntry>, LedgerError> {
        Ok(self.snapshot())
    }

    fn save(&self, entries: &[FeedbackEntry]) -> Result<(), LedgerError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("writes rejected".to_owned()));
        }
        *self.lock_entries() = entries.to_vec();
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_owned()
    }
}

impl<T: LedgerStore + ?Sized> LedgerStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Vec<FeedbackEntry>, LedgerError> {
        (**self).load()
    }

    fn save(&self, entries: &[FeedbackEntry]) -> Result<(), LedgerError> {
        (**self).save(entries)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
