use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A data-entry error: a value the user typed that does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field} '{value}' (expected one of: {expected})")]
pub struct ParseError {
  pub field: &'static str,
  pub value: String,
  pub expected: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
  Saved,
  #[default]
  Applied,
}

impl ApplicationStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Saved => "saved",
      Self::Applied => "applied",
    }
  }
}

impl fmt::Display for ApplicationStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

impl FromStr for ApplicationStatus {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "saved" => Ok(Self::Saved),
      "applied" => Ok(Self::Applied),
      _ => Err(ParseError {
        field: "status",
        value: s.to_string(),
        expected: "saved, applied",
      }),
    }
  }
}

/// One tracked job application, as stored remotely and in the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub company_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub position: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub job_description: Option<String>,
  /// Date only, `YYYY-MM-DD`
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub application_date: Option<String>,
  #[serde(default)]
  pub status: ApplicationStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub salary: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contact_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contact_email: Option<String>,
  /// Storage path or `data:` blob
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resume_path: Option<String>,
  /// Storage path or `data:` blob
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cover_letter_path: Option<String>,
  /// ISO 8601 UTC, set on every create and update
  pub last_updated: String,
}

/// Form input for a new record. Identity and timestamp are assigned on create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub company_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub position: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub job_description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub application_date: Option<String>,
  #[serde(default)]
  pub status: ApplicationStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub salary: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contact_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contact_email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resume_path: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cover_letter_path: Option<String>,
}

impl NewApplication {
  /// Assign a fresh identifier and timestamp.
  pub fn into_record(self) -> ApplicationRecord {
    ApplicationRecord {
      id: generate_id(),
      company_name: self.company_name,
      position: self.position,
      location: self.location,
      job_description: self.job_description,
      application_date: self.application_date,
      status: self.status,
      notes: self.notes,
      salary: self.salary,
      url: self.url,
      contact_name: self.contact_name,
      contact_email: self.contact_email,
      resume_path: self.resume_path,
      cover_letter_path: self.cover_letter_path,
      last_updated: now_timestamp(),
    }
  }
}

impl ApplicationRecord {
  /// Copy of this record with `last_updated` moved forward to now.
  pub fn touched(&self) -> Self {
    Self {
      last_updated: refreshed_timestamp(&self.last_updated),
      ..self.clone()
    }
  }

  /// Drop attachment references that would not survive outside the remote store.
  ///
  /// Only self-contained `data:` blobs are kept.
  pub fn without_external_files(mut self) -> Self {
    self.resume_path = self.resume_path.filter(|p| is_data_blob(p));
    self.cover_letter_path = self.cover_letter_path.filter(|p| is_data_blob(p));
    self
  }

  /// Display name for list views.
  pub fn title(&self) -> String {
    match (self.position.as_deref(), self.company_name.as_deref()) {
      (Some(p), Some(c)) => format!("{} at {}", p, c),
      (Some(p), None) => p.to_string(),
      (None, Some(c)) => c.to_string(),
      (None, None) => "Untitled application".to_string(),
    }
  }
}

fn is_data_blob(s: &str) -> bool {
  s.starts_with("data:")
}

pub fn generate_id() -> String {
  uuid::Uuid::new_v4().simple().to_string()
}

/// Current time as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn now_timestamp() -> String {
  Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A timestamp for an update, never earlier than `previous`.
pub fn refreshed_timestamp(previous: &str) -> String {
  let now = Utc::now();
  match DateTime::parse_from_rfc3339(previous) {
    Ok(prev) if prev.with_timezone(&Utc) > now => previous.to_string(),
    _ => now.to_rfc3339_opts(SecondsFormat::Millis, true),
  }
}

/// Counts shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
  pub total: usize,
  pub saved: usize,
  pub applied: usize,
}

impl Stats {
  pub fn from_records(records: &[ApplicationRecord]) -> Self {
    records.iter().fold(Self::default(), |mut stats, record| {
      stats.total += 1;
      match record.status {
        ApplicationStatus::Saved => stats.saved += 1,
        ApplicationStatus::Applied => stats.applied += 1,
      }
      stats
    })
  }
}
