/// Where the data of a storage operation came from, or where a write landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSource {
  /// Remote API answered
  Remote,
  /// Remote storage is disabled, local cache is the only store
  Local,
  /// Remote unreachable, the operation ran against the local cache instead
  Fallback,
  /// Remote answered with an empty list, local cache contents served instead
  CacheRepair,
}

/// Result of a coordinator operation. Never an error: failures are downgraded
/// to a local result plus warnings.
#[derive(Debug, Clone)]
pub struct StoreResult<T> {
  pub data: T,
  pub source: StoreSource,
  /// Non-fatal problems worth showing the user
  pub warnings: Vec<String>,
}

impl<T> StoreResult<T> {
  pub fn new(data: T, source: StoreSource) -> Self {
    Self {
      data,
      source,
      warnings: Vec::new(),
    }
  }

  pub fn remote(data: T) -> Self {
    Self::new(data, StoreSource::Remote)
  }

  pub fn local(data: T) -> Self {
    Self::new(data, StoreSource::Local)
  }

  pub fn fallback(data: T) -> Self {
    Self::new(data, StoreSource::Fallback)
  }

  /// Attach a warning if there is one.
  pub fn with_warning(mut self, warning: Option<String>) -> Self {
    self.warnings.extend(warning);
    self
  }
}
