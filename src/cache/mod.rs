//! Local cache store for offline support.
//!
//! This module keeps a durable copy of the record set and the list filter:
//! - A string key-value backend (`CacheStorage`, SQLite by default)
//! - A codec over two well-known keys (`LocalCache`)
//! - Malformed data reads as empty rather than failing

mod local;
mod storage;

pub use local::LocalCache;
pub use storage::{CacheStorage, SqliteStorage};
