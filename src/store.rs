use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::{TrackedProduct, Users, Watchlist};
use crate::utils::error::StoreError;

/// The store as shared between the bot handlers and the poll job.
pub type SharedStore = Arc<Mutex<ProductStore>>;

/// Every user's watchlist, backed by one JSON file that is rewritten whole.
#[derive(Debug, Clone)]
pub struct ProductStore {
    path: PathBuf,
    users: Users,
}

impl ProductStore {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            users: Users::new(),
        }
    }

    /// Load the persisted state. A missing file gives an empty store, and so does
    /// a file that cannot be parsed (the corruption is logged, not returned).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::read_snapshot(&path) {
            Ok(Some(users)) => {
                let store = Self { path, users };
                tracing::info!(
                    "Loaded {} tracked products for {} users from {}",
                    store.product_count(),
                    store.users.len(),
                    store.path.display()
                );
                store
            }
            Ok(None) => {
                tracing::info!("No store file at {}, starting empty", path.display());
                Self::empty(path)
            }
            Err(e) => {
                tracing::warn!("Discarding unreadable store, starting empty: {}", e);
                Self::empty(path)
            }
        }
    }

    /// Read the file as-is: `Ok(None)` when absent, `CorruptState` when unparsable.
    pub fn read_snapshot(path: &Path) -> Result<Option<Users>, StoreError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::CorruptState {
                path: path.display().to_string(),
                source,
            })
    }

    /// Overwrite the file with a full snapshot.
    pub fn save(&self) -> Result<(), StoreError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.users.serialize(&mut serializer)?;

        let io_err = |source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&self.path, buf).map_err(io_err)?;

        tracing::debug!("Saved store to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn users(&self) -> &Users {
        &self.users
    }

    pub fn watchlist(&self, user_id: &str) -> Option<&Watchlist> {
        self.users.get(user_id)
    }

    /// Insert or replace a product, creating the user's watchlist on first use.
    /// Returns the entry it replaced.
    pub fn upsert(&mut self, user_id: &str, product: TrackedProduct) -> Option<TrackedProduct> {
        self.users
            .entry(user_id.to_string())
            .or_default()
            .upsert(product)
    }

    /// Undo an `upsert`: put `previous` back, or drop the entry when there was none.
    pub fn restore(&mut self, user_id: &str, url: &str, previous: Option<TrackedProduct>) {
        if let Some(previous) = previous {
            self.upsert(user_id, previous);
            return;
        }

        if let Some(watchlist) = self.users.get_mut(user_id) {
            watchlist.remove(url);
            if watchlist.is_empty() {
                self.users.remove(user_id);
            }
        }
    }

    pub fn product_mut(&mut self, user_id: &str, url: &str) -> Option<&mut TrackedProduct> {
        self.users.get_mut(user_id)?.get_mut(url)
    }

    /// Copy of every (user, product) pair in stored order.
    pub fn snapshot(&self) -> Vec<(String, TrackedProduct)> {
        self.users
            .iter()
            .flat_map(|(user_id, watchlist)| {
                watchlist
                    .iter()
                    .map(move |product| (user_id.clone(), product.clone()))
            })
            .collect()
    }

    pub fn product_count(&self) -> usize {
        self.users.values().map(Watchlist::len).sum()
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }
}
