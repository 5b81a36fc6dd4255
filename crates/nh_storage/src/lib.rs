use nh_core::{ArticleStorage, Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub mod backends;

pub use backends::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    SQLite,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::SQLite),
            other => Err(Error::Config(format!("Unknown storage backend: {}", other))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::SQLite => write!(f, "sqlite"),
        }
    }
}

/// Builds a storage backend by name. `path` is only used by file-backed stores.
pub async fn create_storage(kind: &str, path: Option<&str>) -> Result<Arc<dyn ArticleStorage>> {
    match kind.parse::<StorageKind>()? {
        StorageKind::Memory => Ok(Arc::new(MemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        StorageKind::SQLite => {
            let storage = match path {
                Some(path) => SQLiteStorage::new_with_path(path).await?,
                None => SQLiteStorage::new().await?,
            };
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageKind::SQLite => {
            let _ = path;
            Err(Error::Config("nh_storage was built without the sqlite feature".to_string()))
        }
    }
}
