use color_eyre::{eyre::eyre, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::api_types::HealthResponse;
use super::error::RemoteError;
use super::RemoteApi;
use crate::config::StorageConfig;
use crate::model::ApplicationRecord;

/// HTTP binding for the applications API.
///
/// Every call is bounded by `timeout`; the in-flight request is dropped when it
/// expires. No retries happen here.
#[derive(Clone)]
pub struct RemoteClient {
  http: reqwest::Client,
  base_url: String,
  timeout: Duration,
}

impl RemoteClient {
  pub fn new(config: &StorageConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      timeout: config.timeout(),
    })
  }

  /// Base URL with `segments` appended, each percent-encoded as one path segment.
  fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
    let mut url = Url::parse(&self.base_url)
      .map_err(|e| RemoteError::Network(format!("invalid API URL '{}': {}", self.base_url, e)))?;

    url
      .path_segments_mut()
      .map_err(|_| RemoteError::Network(format!("API URL cannot be a base: {}", self.base_url)))?
      .pop_if_empty()
      .extend(segments);

    Ok(url)
  }

  /// Send a request and read a JSON body, all within the timeout.
  async fn fetch_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
    self
      .bounded(async {
        let response = classify(request.send().await?)?;
        Ok::<_, RemoteError>(response.json::<T>().await?)
      })
      .await
  }

  /// Send a request whose body is irrelevant.
  async fn fetch_empty(&self, request: RequestBuilder) -> Result<(), RemoteError> {
    self
      .bounded(async {
        classify(request.send().await?)?;
        Ok::<_, RemoteError>(())
      })
      .await
  }

  async fn bounded<T>(
    &self,
    call: impl Future<Output = Result<T, RemoteError>>,
  ) -> Result<T, RemoteError> {
    tokio::time::timeout(self.timeout, call)
      .await
      .map_err(|_| RemoteError::Timeout(self.timeout))?
  }
}

fn classify(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
  let status = response.status();
  debug!("{} {}", status.as_u16(), response.url());

  if status.is_success() {
    Ok(response)
  } else if status == StatusCode::NOT_FOUND {
    Err(RemoteError::NotFound)
  } else {
    Err(RemoteError::Server {
      status: status.as_u16(),
    })
  }
}

impl RemoteApi for RemoteClient {
  async fn health(&self) -> Result<HealthResponse, RemoteError> {
    // Cache-busting parameter, some proxies cache GETs aggressively
    let request = self
      .http
      .get(self.endpoint(&["health"])?)
      .query(&[("t", chrono::Utc::now().timestamp_millis())])
      .header(reqwest::header::ACCEPT, "application/json");

    self.fetch_json(request).await
  }

  async fn list(&self) -> Result<Vec<ApplicationRecord>, RemoteError> {
    let items: Vec<Value> = self
      .fetch_json(self.http.get(self.endpoint(&["applications"])?))
      .await?;

    // One unreadable record must not hide the rest
    Ok(
      items
        .into_iter()
        .filter_map(|item| match decode_record(item) {
          Ok(record) => Some(record),
          Err(e) => {
            warn!("Skipping remote record: {}", e);
            None
          }
        })
        .collect(),
    )
  }

  async fn get(&self, id: &str) -> Result<ApplicationRecord, RemoteError> {
    let item: Value = self
      .fetch_json(self.http.get(self.endpoint(&["applications", id])?))
      .await?;
    decode_record(item)
  }

  async fn create(&self, record: &ApplicationRecord) -> Result<ApplicationRecord, RemoteError> {
    let request = self
      .http
      .post(self.endpoint(&["applications"])?)
      .json(record);
    self.fetch_json(request).await
  }

  async fn update(&self, record: &ApplicationRecord) -> Result<(), RemoteError> {
    let request = self
      .http
      .put(self.endpoint(&["applications", record.id.as_str()])?)
      .json(record);
    self.fetch_empty(request).await
  }

  async fn delete(&self, id: &str) -> Result<(), RemoteError> {
    let request = self.http.delete(self.endpoint(&["applications", id])?);
    self.fetch_empty(request).await
  }
}

/// Decode one stored record, naming it in the error when it has an id.
fn decode_record(item: Value) -> Result<ApplicationRecord, RemoteError> {
  let id = item
    .get("id")
    .and_then(Value::as_str)
    .unwrap_or("<no id>")
    .to_string();

  serde_json::from_value(item).map_err(|e| RemoteError::InvalidRecord {
    id,
    reason: e.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::extract::Path;
  use axum::http::StatusCode;
  use axum::routing::get;
  use axum::{Json, Router};
  use serde_json::{json, Value};

  async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/api", addr)
  }

  fn client(base_url: &str, timeout_ms: u64) -> RemoteClient {
    RemoteClient::new(&StorageConfig {
      remote_enabled: true,
      base_url: base_url.to_string(),
      timeout_ms,
    })
    .unwrap()
  }

  fn record_json(id: &str) -> Value {
    json!({
      "_id": "65f00000",
      "id": id,
      "companyName": "Acme",
      "status": "applied",
      "lastUpdated": "2024-05-01T10:00:00.000Z",
    })
  }

  fn api() -> Router {
    Router::new()
      .route(
        "/api/health",
        get(|| async { Json(json!({"status": "ok", "mongodb": "Connected"})) }),
      )
      .route(
        "/api/applications",
        get(|| async { Json(json!([record_json("a1"), record_json("a2")])) })
          .post(|Json(body): Json<Value>| async move { (StatusCode::CREATED, Json(body)) }),
      )
      .route(
        "/api/applications/{id}",
        get(|Path(id): Path<String>| async move {
          if id == "missing" {
            (StatusCode::NOT_FOUND, Json(json!({"error": "Application not found"})))
          } else {
            (StatusCode::OK, Json(record_json(&id)))
          }
        })
        .put(|| async { Json(json!({"message": "updated"})) })
        .delete(|| async {
          (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Failed to delete application"})),
          )
        }),
      )
  }

  #[tokio::test]
  async fn test_health() {
    let base = serve(api()).await;
    let health = client(&base, 2000).health().await.unwrap();
    assert!(health.database_connected());
  }

  #[tokio::test]
  async fn test_list_and_get() {
    let base = serve(api()).await;
    let client = client(&base, 2000);

    let records = client.list().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].id, "a2");

    let record = client.get("a1").await.unwrap();
    assert_eq!(record.company_name.as_deref(), Some("Acme"));
  }

  #[tokio::test]
  async fn test_not_found_is_classified() {
    let base = serve(api()).await;
    let result = client(&base, 2000).get("missing").await;
    assert_eq!(result, Err(RemoteError::NotFound));
  }

  #[tokio::test]
  async fn test_create_echoes_record() {
    let base = serve(api()).await;
    let record: ApplicationRecord = serde_json::from_value(record_json("new-1")).unwrap();

    let created = client(&base, 2000).create(&record).await.unwrap();
    assert_eq!(created, record);
  }

  #[tokio::test]
  async fn test_update_ignores_body() {
    let base = serve(api()).await;
    let record: ApplicationRecord = serde_json::from_value(record_json("a1")).unwrap();
    assert_eq!(client(&base, 2000).update(&record).await, Ok(()));
  }

  #[tokio::test]
  async fn test_server_error_is_classified() {
    let base = serve(api()).await;
    let result = client(&base, 2000).delete("a1").await;
    assert_eq!(result, Err(RemoteError::Server { status: 500 }));
  }

  #[tokio::test]
  async fn test_malformed_body_is_decode_error() {
    let router = Router::new().route("/api/applications", get(|| async { "not json" }));
    let base = serve(router).await;

    let result = client(&base, 2000).list().await;
    assert!(matches!(result, Err(RemoteError::Decode(_))));
  }

  #[tokio::test]
  async fn test_timeout_cancels_request() {
    let router = Router::new().route(
      "/api/health",
      get(|| async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Json(json!({"status": "ok"}))
      }),
    );
    let base = serve(router).await;

    let started = std::time::Instant::now();
    let result = client(&base, 100).health().await;

    assert_eq!(result.unwrap_err(), RemoteError::Timeout(Duration::from_millis(100)));
    assert!(started.elapsed() < Duration::from_secs(1));
  }

  fn bad_status_json(id: &str) -> Value {
    let mut record = record_json(id);
    record["status"] = json!("interview");
    record
  }

  fn api_with_bad_record() -> Router {
    Router::new()
      .route(
        "/api/health",
        get(|| async { Json(json!({"status": "ok", "mongodb": "Connected"})) }),
      )
      .route(
        "/api/applications",
        get(|| async {
          Json(json!([record_json("a1"), bad_status_json("b1"), record_json("a2")]))
        }),
      )
      .route(
        "/api/applications/{id}",
        get(|Path(id): Path<String>| async move { Json(bad_status_json(&id)) }),
      )
  }

  #[tokio::test]
  async fn test_list_skips_unreadable_records() {
    let base = serve(api_with_bad_record()).await;

    let records = client(&base, 2000).list().await.unwrap();
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a2"]);
  }

  #[tokio::test]
  async fn test_get_unreadable_record() {
    let base = serve(api_with_bad_record()).await;

    let result = client(&base, 2000).get("b1").await;
    assert!(matches!(result, Err(RemoteError::InvalidRecord { ref id, .. }) if id == "b1"));
  }

  #[tokio::test]
  async fn test_unreadable_record_keeps_session_online() {
    use crate::cache::{LocalCache, SqliteStorage};
    use crate::store::{Coordinator, StoreSource};

    let base = serve(api_with_bad_record()).await;
    let config = StorageConfig {
      remote_enabled: true,
      base_url: base,
      timeout_ms: 2000,
    };
    let remote = RemoteClient::new(&config).unwrap();
    let store = Coordinator::new(
      config,
      remote,
      LocalCache::new(SqliteStorage::open_in_memory().unwrap()),
    );

    let listed = store.list_all().await;
    assert_eq!(listed.source, StoreSource::Remote);
    assert_eq!(listed.data.len(), 2);
    assert!(store.is_connected());

    let fetched = store.get_by_id("b1").await;
    assert_eq!(fetched.source, StoreSource::Remote);
    assert_eq!(fetched.data, None);
    assert_eq!(fetched.warnings.len(), 1);
    assert!(store.is_connected());
  }

  #[test]
  fn test_endpoint_encodes_segments() {
    let client = client("http://localhost:5000/api/", 2000);

    let url = client.endpoint(&["applications", "a/b?c#d"]).unwrap();
    assert_eq!(url.as_str(), "http://localhost:5000/api/applications/a%2Fb%3Fc%23d");

    let bad = RemoteClient {
      base_url: "not a url".to_string(),
      ..client
    }
    .endpoint(&["health"]);
    assert!(matches!(bad, Err(RemoteError::Network(_))));
  }

  #[tokio::test]
  async fn test_id_is_sent_as_one_segment() {
    let base = serve(api()).await;

    let record = client(&base, 2000).get("a/b?c").await.unwrap();
    assert_eq!(record.id, "a/b?c");
  }

  #[tokio::test]
  async fn test_unreachable_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = client(&format!("http://{}", addr), 2000).list().await;
    assert!(matches!(result, Err(RemoteError::Network(_))));
  }
}
