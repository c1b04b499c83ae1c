//! Storage coordination between the remote API and the local cache.

mod coordinator;
mod outcome;

pub use coordinator::Coordinator;
pub use outcome::{StoreResult, StoreSource};
