//! Storage coordinator that routes each operation to the remote API or the local cache.

use color_eyre::Result;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

use super::outcome::{StoreResult, StoreSource};
use crate::cache::{CacheStorage, LocalCache};
use crate::config::StorageConfig;
use crate::model::{ApplicationRecord, Filter, NewApplication};
use crate::remote::{RemoteApi, RemoteError};

const UNREACHABLE_NOTICE: &str =
  "Cannot connect to the database server. Using local storage instead.";
const DISCONNECTED_NOTICE: &str =
  "Database connection issues detected. Using local storage instead.";

/// How the current operation will be served.
enum Route {
  /// Remote disabled by configuration
  Local,
  /// Probe failed; optional one-time notice for the user
  Offline(Option<String>),
  Remote,
}

/// Chooses remote or local storage per call and keeps the local cache as a
/// write-behind backup of the remote.
///
/// The remote and local tiers are never reconciled: records saved locally
/// during an outage stay local-only.
pub struct Coordinator<R: RemoteApi, S: CacheStorage> {
  config: StorageConfig,
  remote: R,
  cache: LocalCache<S>,
  /// Set by a successful probe, cleared by any connectivity failure
  connected: AtomicBool,
  /// Whether the user has been told about the outage this session
  notified: AtomicBool,
}

impl<R: RemoteApi, S: CacheStorage> Coordinator<R, S> {
  pub fn new(config: StorageConfig, remote: R, cache: LocalCache<S>) -> Self {
    if config.remote_enabled {
      info!("Remote storage enabled at {}", config.base_url);
    } else {
      info!("Remote storage disabled, using local cache only");
    }

    Self {
      config,
      remote,
      cache,
      connected: AtomicBool::new(false),
      notified: AtomicBool::new(false),
    }
  }

  pub fn is_connected(&self) -> bool {
    self.connected.load(Ordering::SeqCst)
  }

  /// All records.
  ///
  /// An empty remote list does not hide a non-empty local cache.
  pub async fn list_all(&self) -> StoreResult<Vec<ApplicationRecord>> {
    match self.route().await {
      Route::Local => return StoreResult::local(self.cache.read_records()),
      Route::Offline(notice) => {
        return StoreResult::fallback(self.cache.read_records()).with_warning(notice)
      }
      Route::Remote => {}
    }

    match self.bounded(self.remote.list()).await {
      Ok(records) if records.is_empty() => {
        let local = self.cache.read_records();
        if local.is_empty() {
          StoreResult::remote(records)
        } else {
          debug!(
            "Remote returned no records, serving {} from local cache",
            local.len()
          );
          StoreResult::new(local, StoreSource::CacheRepair)
        }
      }
      Ok(records) => {
        let warning = self.backup(|cache| cache.write_records(&records));
        StoreResult::remote(records).with_warning(warning)
      }
      Err(e) => {
        self.disconnect("list", &e);
        StoreResult::fallback(self.cache.read_records())
      }
    }
  }

  /// A single record, `None` when no store holds it.
  pub async fn get_by_id(&self, id: &str) -> StoreResult<Option<ApplicationRecord>> {
    match self.route().await {
      Route::Local => return StoreResult::local(self.cache.get(id)),
      Route::Offline(notice) => return StoreResult::fallback(self.cache.get(id)).with_warning(notice),
      Route::Remote => {}
    }

    match self.bounded(self.remote.get(id)).await {
      Ok(record) => {
        let warning = self.backup(|cache| cache.upsert(&record));
        StoreResult::remote(Some(record)).with_warning(warning)
      }
      Err(RemoteError::NotFound) => StoreResult::remote(None),
      Err(RemoteError::InvalidRecord { id, reason }) => {
        warn!("Remote record {} is unreadable: {}", id, reason);
        StoreResult::remote(None).with_warning(Some(format!(
          "Application {} has invalid data and was skipped: {}",
          id, reason
        )))
      }
      Err(e) => {
        self.disconnect("get", &e);
        StoreResult::fallback(self.cache.get(id))
      }
    }
  }

  /// Store a new record with a fresh identifier and timestamp.
  pub async fn create(&self, application: NewApplication) -> StoreResult<ApplicationRecord> {
    let record = application.into_record();

    let notice = match self.route().await {
      Route::Local => {
        let warning = self.persist_locally(|cache| cache.insert(&record));
        return StoreResult::local(record).with_warning(warning);
      }
      Route::Offline(notice) => notice,
      Route::Remote => match self.bounded(self.remote.create(&record)).await {
        Ok(stored) => {
          let warning = self.backup(|cache| cache.upsert(&stored));
          return StoreResult::remote(stored).with_warning(warning);
        }
        Err(e) => {
          self.disconnect("create", &e);
          None
        }
      },
    };

    let warning = self.persist_locally(|cache| cache.insert(&record));
    StoreResult::fallback(record)
      .with_warning(notice)
      .with_warning(warning)
  }

  /// Replace a record by identifier. `None` when no record has that identifier.
  ///
  /// The identifier never changes and `last_updated` is refreshed.
  pub async fn update(&self, record: ApplicationRecord) -> StoreResult<Option<ApplicationRecord>> {
    let record = record.touched();

    let notice = match self.route().await {
      Route::Local => return self.replace_locally(record, StoreSource::Local),
      Route::Offline(notice) => notice,
      Route::Remote => match self.bounded(self.remote.update(&record)).await {
        Ok(()) => {
          let warning = self.backup(|cache| cache.upsert(&record));
          return StoreResult::remote(Some(record)).with_warning(warning);
        }
        Err(RemoteError::NotFound) => return StoreResult::remote(None),
        Err(e) => {
          self.disconnect("update", &e);
          None
        }
      },
    };

    self
      .replace_locally(record, StoreSource::Fallback)
      .with_warning(notice)
  }

  /// Delete a record by identifier. Returns whether it existed.
  pub async fn delete(&self, id: &str) -> StoreResult<bool> {
    let notice = match self.route().await {
      Route::Local => return self.remove_locally(id, StoreSource::Local),
      Route::Offline(notice) => notice,
      Route::Remote => match self.bounded(self.remote.delete(id)).await {
        Ok(()) => {
          let warning = self.backup(|cache| cache.remove(id).map(|_| ()));
          return StoreResult::remote(true).with_warning(warning);
        }
        Err(RemoteError::NotFound) => {
          let warning = self.backup(|cache| cache.remove(id).map(|_| ()));
          return StoreResult::remote(false).with_warning(warning);
        }
        Err(e) => {
          self.disconnect("delete", &e);
          None
        }
      },
    };

    self
      .remove_locally(id, StoreSource::Fallback)
      .with_warning(notice)
  }

  /// The persisted list filter.
  pub fn load_filter(&self) -> Filter {
    self.cache.read_filter()
  }

  /// Persist the list filter. Returns a warning if it could not be written.
  pub fn save_filter(&self, filter: &Filter) -> Option<String> {
    self.persist_locally(|cache| cache.write_filter(filter))
  }

  /// Drop the persisted list filter. Returns a warning if it could not be removed.
  pub fn reset_filter(&self) -> Option<String> {
    self.persist_locally(|cache| cache.clear_filter())
  }

  /// Decide how to serve the next operation, probing the remote when not
  /// known to be connected.
  async fn route(&self) -> Route {
    if !self.config.remote_enabled {
      return Route::Local;
    }

    if self.is_connected() {
      return Route::Remote;
    }

    match self.bounded(self.remote.health()).await {
      Ok(health) if health.database_connected() => {
        info!("Connected to remote storage ({})", health.describe());
        self.connected.store(true, Ordering::SeqCst);
        Route::Remote
      }
      Ok(health) => {
        warn!("Remote database not connected ({})", health.describe());
        self.connected.store(false, Ordering::SeqCst);
        Route::Offline(self.notice_once(DISCONNECTED_NOTICE))
      }
      Err(e) => {
        warn!("Cannot reach remote storage: {}", e);
        self.connected.store(false, Ordering::SeqCst);
        Route::Offline(self.notice_once(UNREACHABLE_NOTICE))
      }
    }
  }

  fn notice_once(&self, notice: &str) -> Option<String> {
    if self.notified.swap(true, Ordering::SeqCst) {
      None
    } else {
      Some(notice.to_string())
    }
  }

  fn disconnect(&self, operation: &str, e: &RemoteError) {
    warn!("Remote {} failed, falling back to local cache: {}", operation, e);
    self.connected.store(false, Ordering::SeqCst);
  }

  async fn bounded<T>(
    &self,
    call: impl Future<Output = Result<T, RemoteError>>,
  ) -> Result<T, RemoteError> {
    let timeout = self.config.timeout();
    tokio::time::timeout(timeout, call)
      .await
      .map_err(|_| RemoteError::Timeout(timeout))?
  }

  /// Mirror a successful remote result into the local cache.
  fn backup(&self, write: impl FnOnce(&LocalCache<S>) -> Result<()>) -> Option<String> {
    write(&self.cache).err().map(|e| {
      error!("Failed to update local backup: {}", e);
      format!("Local backup could not be updated: {}", e)
    })
  }

  /// Write to the local cache as the store of record for this operation.
  fn persist_locally(&self, write: impl FnOnce(&LocalCache<S>) -> Result<()>) -> Option<String> {
    write(&self.cache).err().map(|e| {
      error!("Failed to write local storage: {}", e);
      format!("Could not save to local storage: {}", e)
    })
  }

  fn replace_locally(
    &self,
    record: ApplicationRecord,
    source: StoreSource,
  ) -> StoreResult<Option<ApplicationRecord>> {
    match self.cache.replace(&record) {
      Ok(true) => StoreResult::new(Some(record), source),
      Ok(false) => StoreResult::new(None, source),
      Err(e) => {
        error!("Failed to write local storage: {}", e);
        StoreResult::new(Some(record), source)
          .with_warning(Some(format!("Could not save to local storage: {}", e)))
      }
    }
  }

  fn remove_locally(&self, id: &str, source: StoreSource) -> StoreResult<bool> {
    match self.cache.remove(id) {
      Ok(existed) => StoreResult::new(existed, source),
      Err(e) => {
        error!("Failed to write local storage: {}", e);
        StoreResult::new(true, source)
          .with_warning(Some(format!("Could not save to local storage: {}", e)))
      }
    }
  }
}
