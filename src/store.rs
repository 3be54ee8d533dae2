use crate::error::BurnError;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

pub const DEFAULT_STORAGE_DIR: &str = "storage";
pub const DEFAULT_OUTPUT_SUFFIX: &str = "-signed";
pub const DEFAULT_URL_PREFIX: &str = "/files";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Where base documents come from and burned documents go.
pub trait DocumentStore: Send + Sync {
    fn load(&self, id: &str) -> Result<Vec<u8>, BurnError>;

    /// Stores `bytes` under `id` and returns the public location.
    fn save(&self, id: &str, bytes: &[u8]) -> Result<String, BurnError>;

    /// Identity under which the burned copy of `id` is saved.
    fn derived_identity(&self, id: &str) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub output_suffix: String,
    pub url_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_STORAGE_DIR),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }
}

/// Flat directory of documents keyed by file name.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    config: StoreConfig,
}

impl FsDocumentStore {
    pub fn new(config: StoreConfig) -> Result<Self, BurnError> {
        if config.output_suffix.is_empty() {
            return Err(BurnError::InvalidConfiguration(
                "output suffix cannot be empty".to_string(),
            ));
        }
        if config.output_suffix.contains(['/', '\\']) {
            return Err(BurnError::InvalidConfiguration(format!(
                "output suffix cannot contain path separators: {}",
                config.output_suffix
            )));
        }
        Ok(Self { config })
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, BurnError> {
        validate_id(id)?;
        Ok(self.config.root.join(id))
    }

    fn location(&self, id: &str) -> String {
        format!("{}/{}", self.config.url_prefix.trim_end_matches('/'), id)
    }
}

impl DocumentStore for FsDocumentStore {
    fn load(&self, id: &str) -> Result<Vec<u8>, BurnError> {
        let path = self.path_for(id)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(BurnError::NotFound(id.to_string()))
            }
            Err(err) => Err(BurnError::Storage(err)),
        }
    }

    fn save(&self, id: &str, bytes: &[u8]) -> Result<String, BurnError> {
        let path = self.path_for(id)?;
        std::fs::create_dir_all(&self.config.root)?;
        write_atomic(&path, bytes)?;
        Ok(self.location(id))
    }

    fn derived_identity(&self, id: &str) -> String {
        let stem = id.strip_suffix(".pdf").unwrap_or(id);
        format!("{}{}.pdf", stem, self.config.output_suffix)
    }
}

fn validate_id(id: &str) -> Result<(), BurnError> {
    if id.is_empty() {
        return Err(BurnError::validation("document id cannot be empty"));
    }
    if id.contains(['/', '\\']) || id.contains("..") || id.contains('\0') {
        return Err(BurnError::validation(format!(
            "document id must be a plain file name: {id}"
        )));
    }
    Ok(())
}

/// Temp file in the same directory, then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let result = (|| {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}
