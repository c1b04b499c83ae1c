use std::time::Duration;

/// Classified outcome of a failed remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
  /// The addressed record does not exist remotely (HTTP 404)
  #[error("not found")]
  NotFound,
  /// Any other non-success status
  #[error("server error: HTTP {status}")]
  Server { status: u16 },
  /// Success status, but the body was not what we expected
  #[error("invalid response body: {0}")]
  Decode(String),
  /// Well-formed body holding a record with unknown field values, such as
  /// a status outside saved/applied
  #[error("record {id} is unreadable: {reason}")]
  InvalidRecord { id: String, reason: String },
  /// Connection refused, DNS failure, reset, ...
  #[error("network error: {0}")]
  Network(String),
  /// No answer within the configured bound
  #[error("timed out after {0:?}")]
  Timeout(Duration),
}

impl From<reqwest::Error> for RemoteError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_decode() {
      Self::Decode(e.to_string())
    } else if let Some(status) = e.status() {
      Self::Server {
        status: status.as_u16(),
      }
    } else {
      Self::Network(e.to_string())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display() {
    assert_eq!(
      RemoteError::Server { status: 503 }.to_string(),
      "server error: HTTP 503"
    );
  }
}
