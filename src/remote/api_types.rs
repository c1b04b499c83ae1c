//! Serde types matching the CRUD API's non-record responses.

use serde::Deserialize;

/// Body of `GET /health`.
///
/// Two server variants exist: one reports `{status, mongodb}`, the other only
/// `{status: ok|limited|error, message}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthResponse {
  #[serde(default)]
  pub status: String,
  #[serde(default)]
  pub mongodb: Option<String>,
  #[serde(default)]
  pub message: Option<String>,
}

impl HealthResponse {
  /// Whether the backing database is reachable, not just the HTTP server.
  pub fn database_connected(&self) -> bool {
    match self.mongodb.as_deref() {
      Some(state) => state.eq_ignore_ascii_case("connected"),
      None => self.status.eq_ignore_ascii_case("ok"),
    }
  }

  /// Short description for logs.
  pub fn describe(&self) -> String {
    match (&self.mongodb, &self.message) {
      (Some(db), _) => format!("status={} database={}", self.status, db),
      (None, Some(message)) => format!("status={} ({})", self.status, message),
      (None, None) => format!("status={}", self.status),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(json: &str) -> HealthResponse {
    serde_json::from_str(json).unwrap()
  }

  #[test]
  fn test_mongodb_field_decides() {
    assert!(parse(r#"{"status":"ok","mongodb":"Connected"}"#).database_connected());
    assert!(!parse(r#"{"status":"ok","mongodb":"Disconnected"}"#).database_connected());
  }

  #[test]
  fn test_status_only_variant() {
    assert!(parse(r#"{"status":"ok","message":"running"}"#).database_connected());
    assert!(!parse(r#"{"status":"limited","message":"no db"}"#).database_connected());
    assert!(!parse(r#"{}"#).database_connected());
  }
}
