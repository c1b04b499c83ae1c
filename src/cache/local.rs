//! Record list and filter persistence under two well-known keys.

use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::{error, warn};

use super::storage::CacheStorage;
use crate::model::{ApplicationRecord, Filter};

/// Key holding the JSON array of records.
pub const RECORDS_KEY: &str = "jobs";
/// Key holding the JSON filter object.
pub const FILTER_KEY: &str = "filter";

/// Local copy of the record set.
///
/// Every mutation is a read-modify-write of the whole list; concurrent writers
/// can lose updates.
pub struct LocalCache<S: CacheStorage> {
  storage: Arc<S>,
}

impl<S: CacheStorage> LocalCache<S> {
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
    }
  }

  /// All cached records. Missing or unreadable data reads as empty.
  pub fn read_records(&self) -> Vec<ApplicationRecord> {
    let raw = match self.storage.get(RECORDS_KEY) {
      Ok(Some(raw)) => raw,
      Ok(None) => return Vec::new(),
      Err(e) => {
        error!("Failed to read local cache: {}", e);
        return Vec::new();
      }
    };

    match serde_json::from_str(&raw) {
      Ok(records) => records,
      Err(e) => {
        warn!("Discarding malformed local cache: {}", e);
        Vec::new()
      }
    }
  }

  /// Overwrite the cached list. Non-blob attachments are dropped first.
  pub fn write_records(&self, records: &[ApplicationRecord]) -> Result<()> {
    let cleaned: Vec<ApplicationRecord> = records
      .iter()
      .cloned()
      .map(ApplicationRecord::without_external_files)
      .collect();

    let json = serde_json::to_string(&cleaned)
      .map_err(|e| eyre!("Failed to serialize records: {}", e))?;

    self.storage.set(RECORDS_KEY, &json)
  }

  pub fn get(&self, id: &str) -> Option<ApplicationRecord> {
    self.read_records().into_iter().find(|r| r.id == id)
  }

  /// Append a record.
  pub fn insert(&self, record: &ApplicationRecord) -> Result<()> {
    let mut records = self.read_records();
    records.push(record.clone());
    self.write_records(&records)
  }

  /// Replace the record with the same id. Returns false (and writes nothing) if absent.
  pub fn replace(&self, record: &ApplicationRecord) -> Result<bool> {
    let mut records = self.read_records();
    match records.iter_mut().find(|r| r.id == record.id) {
      Some(existing) => {
        *existing = record.clone();
        self.write_records(&records)?;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  /// Replace the record with the same id, or append it.
  pub fn upsert(&self, record: &ApplicationRecord) -> Result<()> {
    if !self.replace(record)? {
      self.insert(record)?;
    }
    Ok(())
  }

  /// Remove the record with `id`. Returns whether it was present.
  pub fn remove(&self, id: &str) -> Result<bool> {
    let records = self.read_records();
    let before = records.len();
    let remaining: Vec<ApplicationRecord> = records.into_iter().filter(|r| r.id != id).collect();

    if remaining.len() == before {
      return Ok(false);
    }

    self.write_records(&remaining)?;
    Ok(true)
  }

  /// The persisted filter, or the default one.
  pub fn read_filter(&self) -> Filter {
    match self.storage.get(FILTER_KEY) {
      Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!("Discarding malformed filter: {}", e);
        Filter::default()
      }),
      Ok(None) => Filter::default(),
      Err(e) => {
        error!("Failed to read filter: {}", e);
        Filter::default()
      }
    }
  }

  pub fn write_filter(&self, filter: &Filter) -> Result<()> {
    let json =
      serde_json::to_string(filter).map_err(|e| eyre!("Failed to serialize filter: {}", e))?;
    self.storage.set(FILTER_KEY, &json)
  }

  /// Forget the persisted filter so the default applies again.
  pub fn clear_filter(&self) -> Result<()> {
    self.storage.remove(FILTER_KEY)
  }
}

impl<S: CacheStorage> Clone for LocalCache<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::SqliteStorage;
  use crate::model::{ApplicationStatus, NewApplication, SortKey};

  fn cache() -> LocalCache<SqliteStorage> {
    LocalCache::new(SqliteStorage::open_in_memory().unwrap())
  }

  fn record(company: &str) -> ApplicationRecord {
    NewApplication {
      company_name: Some(company.to_string()),
      status: ApplicationStatus::Applied,
      ..Default::default()
    }
    .into_record()
  }

  #[test]
  fn test_empty_cache_reads_empty() {
    assert!(cache().read_records().is_empty());
  }

  #[test]
  fn test_round_trip_normalizes_attachments() {
    let cache = cache();
    let mut first = record("Acme");
    first.notes = Some("Referral from Sam".to_string());
    first.resume_path = Some("/uploads/resume-1.pdf".to_string());
    first.cover_letter_path = Some("data:text/plain;base64,aGk=".to_string());
    let second = record("Globex");

    cache.write_records(&[first.clone(), second.clone()]).unwrap();
    let read = cache.read_records();

    let mut expected_first = first;
    expected_first.resume_path = None;
    assert_eq!(read, vec![expected_first, second]);
  }

  #[test]
  fn test_malformed_data_reads_empty() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.set(RECORDS_KEY, "{not json").unwrap();
    storage.set(FILTER_KEY, "nope").unwrap();
    let cache = LocalCache::new(storage);

    assert!(cache.read_records().is_empty());
    assert_eq!(cache.read_filter(), Filter::default());
  }

  #[test]
  fn test_insert_replace_remove() {
    let cache = cache();
    let acme = record("Acme");
    cache.insert(&acme).unwrap();
    cache.insert(&record("Globex")).unwrap();

    let mut renamed = acme.clone();
    renamed.company_name = Some("Acme Corp".to_string());
    assert!(cache.replace(&renamed).unwrap());
    assert_eq!(cache.get(&acme.id), Some(renamed));

    assert!(!cache.replace(&record("Unknown")).unwrap());
    assert_eq!(cache.read_records().len(), 2);

    assert!(cache.remove(&acme.id).unwrap());
    assert!(!cache.remove(&acme.id).unwrap());
    assert_eq!(cache.get(&acme.id), None);
    assert_eq!(cache.read_records().len(), 1);
  }

  #[test]
  fn test_upsert() {
    let cache = cache();
    let acme = record("Acme");
    cache.upsert(&acme).unwrap();
    cache.upsert(&acme).unwrap();
    assert_eq!(cache.read_records().len(), 1);
  }

  #[test]
  fn test_filter_is_independent_of_records() {
    let cache = cache();
    let filter = Filter {
      search: "rust".to_string(),
      sort_by: SortKey::Company,
      ..Default::default()
    };
    cache.write_filter(&filter).unwrap();
    cache.write_records(&[]).unwrap();

    assert_eq!(cache.read_filter(), filter);

    cache.clear_filter().unwrap();
    assert_eq!(cache.read_filter(), Filter::default());
  }
}
