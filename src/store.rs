use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::debug;

use crate::error::StoreError;

/// Kinds of artifacts handed from one stage to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Transcript,
    Analysis,
    Image,
}

impl ArtifactKind {
    /// Directory (relative to the store root) holding this kind
    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactKind::Transcript => "transcripts",
            ArtifactKind::Analysis => "analysis_results",
            ArtifactKind::Image => "image_results",
        }
    }

    /// Timestamped file name; analysis records ignore the id
    pub fn file_name(&self, id: &str, stamp: &str) -> String {
        match self {
            ArtifactKind::Transcript => format!("{}_{}.txt", id, stamp),
            ArtifactKind::Analysis => format!("analysis_results_{}.json", stamp),
            ArtifactKind::Image => format!("{}_{}.png", id, stamp),
        }
    }
}

/// Reference to a stored artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactHandle {
    pub kind: ArtifactKind,
    pub id: String,
    pub path: PathBuf,
}

/// Append-only artifact storage
pub trait ArtifactStore: Send + Sync {
    /// Store a new artifact; never overwrites an existing one
    fn put(&self, kind: ArtifactKind, id: &str, content: &[u8]) -> Result<ArtifactHandle, StoreError>;

    /// Read an artifact back
    fn get(&self, handle: &ArtifactHandle) -> Result<Vec<u8>, StoreError>;
}

/// `YYYYMMDD_HHMMSS` stamp used in artifact names
pub fn timestamp_stamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Filesystem store rooted at the configured output directory
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!(path = ?root, "Initialized artifact store");
        Self { root }
    }

    #[allow(dead_code)]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write to `path`, failing if it exists
    fn create_new(path: &Path, content: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(content)?;
        file.flush()
    }
}

impl ArtifactStore for FsArtifactStore {
    fn put(&self, kind: ArtifactKind, id: &str, content: &[u8]) -> Result<ArtifactHandle, StoreError> {
        let dir = self.root.join(kind.dir_name());
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let stamp = timestamp_stamp(Local::now());
        let base = kind.file_name(id, &stamp);
        let mut path = dir.join(&base);
        let mut attempt = 1;

        // Two runs within the same second get a numeric suffix
        loop {
            match Self::create_new(&path, content) {
                Ok(()) => break,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    let (stem, ext) = base.rsplit_once('.').unwrap_or((base.as_str(), ""));
                    path = dir.join(format!("{}_{}.{}", stem, attempt, ext));
                    attempt += 1;
                }
                Err(source) => return Err(StoreError::Io { path, source }),
            }
        }

        debug!(path = ?path, bytes = content.len(), "Stored artifact");
        Ok(ArtifactHandle {
            kind,
            id: id.to_string(),
            path,
        })
    }

    fn get(&self, handle: &ArtifactHandle) -> Result<Vec<u8>, StoreError> {
        std::fs::read(&handle.path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(handle.path.display().to_string())
            } else {
                StoreError::Io {
                    path: handle.path.clone(),
                    source,
                }
            }
        })
    }
}

/// In-memory store for exercising stages without touching disk
#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    use chrono::Local;
    use parking_lot::RwLock;

    use super::{timestamp_stamp, ArtifactHandle, ArtifactKind, ArtifactStore};
    use crate::error::StoreError;

    #[derive(Default)]
    pub struct MemoryArtifactStore {
        artifacts: RwLock<HashMap<PathBuf, Vec<u8>>>,
    }

    impl MemoryArtifactStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Handles of every stored artifact of a kind
        pub fn list(&self, kind: ArtifactKind) -> Vec<PathBuf> {
            let prefix = Path::new(kind.dir_name());
            let mut paths: Vec<PathBuf> = self
                .artifacts
                .read()
                .keys()
                .filter(|p| p.starts_with(prefix))
                .cloned()
                .collect();
            paths.sort();
            paths
        }
    }

    impl ArtifactStore for MemoryArtifactStore {
        fn put(&self, kind: ArtifactKind, id: &str, content: &[u8]) -> Result<ArtifactHandle, StoreError> {
            let mut artifacts = self.artifacts.write();
            let stamp = timestamp_stamp(Local::now());
            let dir = Path::new(kind.dir_name());
            let mut path = dir.join(kind.file_name(id, &stamp));
            let mut attempt = 1;
            while artifacts.contains_key(&path) {
                path = dir.join(format!("{}_{}", attempt, kind.file_name(id, &stamp)));
                attempt += 1;
            }
            artifacts.insert(path.clone(), content.to_vec());
            Ok(ArtifactHandle {
                kind,
                id: id.to_string(),
                path,
            })
        }

        fn get(&self, handle: &ArtifactHandle) -> Result<Vec<u8>, StoreError> {
            self.artifacts
                .read()
                .get(&handle.path)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(handle.path.display().to_string()))
        }
    }
}
