//! Remote data client for the applications CRUD API.

mod api_types;
mod client;
mod error;

use std::future::Future;

use crate::model::ApplicationRecord;

pub use api_types::HealthResponse;
pub use client::RemoteClient;
pub use error::RemoteError;

/// CRUD operations offered by the remote tier.
///
/// Each call resolves to exactly one of: a body, `NotFound`, a server error,
/// or a network/timeout error. Implementations do not retry.
pub trait RemoteApi: Send + Sync {
  /// `GET /health`
  fn health(&self) -> impl Future<Output = Result<HealthResponse, RemoteError>> + Send;

  /// `GET /applications`
  fn list(&self) -> impl Future<Output = Result<Vec<ApplicationRecord>, RemoteError>> + Send;

  /// `GET /applications/{id}`
  fn get(&self, id: &str) -> impl Future<Output = Result<ApplicationRecord, RemoteError>> + Send;

  /// `POST /applications`, returns the stored record
  fn create(
    &self,
    record: &ApplicationRecord,
  ) -> impl Future<Output = Result<ApplicationRecord, RemoteError>> + Send;

  /// `PUT /applications/{id}`
  fn update(&self, record: &ApplicationRecord)
    -> impl Future<Output = Result<(), RemoteError>> + Send;

  /// `DELETE /applications/{id}`
  fn delete(&self, id: &str) -> impl Future<Output = Result<(), RemoteError>> + Send;
}
