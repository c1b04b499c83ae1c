//! Domain types for tracked job applications.

pub mod attachment;
pub mod filter;
pub mod record;

pub use filter::{apply_filters, Filter, SortKey, SortOrder, StatusFilter};
pub use record::{ApplicationRecord, ApplicationStatus, NewApplication, Stats};
