//! List filtering and sorting, persisted across sessions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use super::record::{ApplicationRecord, ApplicationStatus, ParseError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
  #[default]
  All,
  Saved,
  Applied,
}

impl StatusFilter {
  pub fn matches(&self, status: ApplicationStatus) -> bool {
    match self {
      Self::All => true,
      Self::Saved => status == ApplicationStatus::Saved,
      Self::Applied => status == ApplicationStatus::Applied,
    }
  }
}

impl FromStr for StatusFilter {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("all") {
      return Ok(Self::All);
    }
    match s.parse::<ApplicationStatus>() {
      Ok(ApplicationStatus::Saved) => Ok(Self::Saved),
      Ok(ApplicationStatus::Applied) => Ok(Self::Applied),
      Err(_) => Err(ParseError {
        field: "status filter",
        value: s.to_string(),
        expected: "all, saved, applied",
      }),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
  #[default]
  Date,
  Company,
  Status,
}

impl FromStr for SortKey {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "date" => Ok(Self::Date),
      "company" => Ok(Self::Company),
      "status" => Ok(Self::Status),
      _ => Err(ParseError {
        field: "sort key",
        value: s.to_string(),
        expected: "date, company, status",
      }),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

impl FromStr for SortOrder {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "asc" => Ok(Self::Asc),
      "desc" => Ok(Self::Desc),
      _ => Err(ParseError {
        field: "sort order",
        value: s.to_string(),
        expected: "asc, desc",
      }),
    }
  }
}

/// Search, status filter and sort settings for the list view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
  #[serde(default)]
  pub search: String,
  #[serde(default)]
  pub status: StatusFilter,
  #[serde(default)]
  pub sort_by: SortKey,
  #[serde(default)]
  pub sort_order: SortOrder,
}

/// Filter and sort records for display.
///
/// Search is a case-insensitive substring match on company, position and location.
pub fn apply_filters(records: &[ApplicationRecord], filter: &Filter) -> Vec<ApplicationRecord> {
  let needle = filter.search.trim().to_lowercase();

  let mut matched: Vec<ApplicationRecord> = records
    .iter()
    .filter(|r| needle.is_empty() || matches_search(r, &needle))
    .filter(|r| filter.status.matches(r.status))
    .cloned()
    .collect();

  matched.sort_by(|a, b| {
    let ordering = match filter.sort_by {
      SortKey::Date => sort_date(a).cmp(&sort_date(b)),
      SortKey::Company => compare_text(
        a.company_name.as_deref().unwrap_or(""),
        b.company_name.as_deref().unwrap_or(""),
      ),
      SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
    };
    match filter.sort_order {
      SortOrder::Asc => ordering,
      SortOrder::Desc => ordering.reverse(),
    }
  });

  matched
}

fn matches_search(record: &ApplicationRecord, needle: &str) -> bool {
  [&record.company_name, &record.position, &record.location]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Application date when set, otherwise last update. Unparsable dates sort first.
fn sort_date(record: &ApplicationRecord) -> Option<DateTime<Utc>> {
  let raw = record
    .application_date
    .as_deref()
    .filter(|d| !d.is_empty())
    .unwrap_or(&record.last_updated);
  parse_date(raw)
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.with_timezone(&Utc));
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
}

fn compare_text(a: &str, b: &str) -> Ordering {
  a.to_lowercase()
    .cmp(&b.to_lowercase())
    .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::record::NewApplication;

  fn record(company: &str, position: &str, status: ApplicationStatus, date: &str) -> ApplicationRecord {
    let mut r = NewApplication {
      company_name: Some(company.to_string()),
      position: Some(position.to_string()),
      status,
      ..Default::default()
    }
    .into_record();
    r.application_date = Some(date.to_string());
    r
  }

  fn companies(records: &[ApplicationRecord]) -> Vec<&str> {
    records
      .iter()
      .map(|r| r.company_name.as_deref().unwrap_or(""))
      .collect()
  }

  fn fixtures() -> Vec<ApplicationRecord> {
    vec![
      record("beta", "Backend Engineer", ApplicationStatus::Applied, "2024-02-01"),
      record("Acme", "Designer", ApplicationStatus::Saved, "2024-03-01"),
      record("Gamma", "Rust Engineer", ApplicationStatus::Applied, "2024-01-01"),
    ]
  }

  #[test]
  fn test_default_filter() {
    let filter = Filter::default();
    assert_eq!(filter.search, "");
    assert_eq!(filter.status, StatusFilter::All);
    assert_eq!(filter.sort_by, SortKey::Date);
    assert_eq!(filter.sort_order, SortOrder::Desc);
  }

  #[test]
  fn test_default_sorts_newest_first() {
    let result = apply_filters(&fixtures(), &Filter::default());
    assert_eq!(companies(&result), vec!["Acme", "beta", "Gamma"]);
  }

  #[test]
  fn test_search_is_case_insensitive() {
    let filter = Filter {
      search: "ENGINEER".to_string(),
      ..Default::default()
    };
    let result = apply_filters(&fixtures(), &filter);
    assert_eq!(companies(&result), vec!["beta", "Gamma"]);
  }

  #[test]
  fn test_status_filter() {
    let filter = Filter {
      status: StatusFilter::Saved,
      ..Default::default()
    };
    let result = apply_filters(&fixtures(), &filter);
    assert_eq!(companies(&result), vec!["Acme"]);
  }

  #[test]
  fn test_sort_by_company_ascending() {
    let filter = Filter {
      sort_by: SortKey::Company,
      sort_order: SortOrder::Asc,
      ..Default::default()
    };
    let result = apply_filters(&fixtures(), &filter);
    assert_eq!(companies(&result), vec!["Acme", "beta", "Gamma"]);
  }

  #[test]
  fn test_sort_by_status() {
    let filter = Filter {
      sort_by: SortKey::Status,
      sort_order: SortOrder::Asc,
      ..Default::default()
    };
    let result = apply_filters(&fixtures(), &filter);
    assert_eq!(result[0].status, ApplicationStatus::Applied);
    assert_eq!(result[2].status, ApplicationStatus::Saved);
  }

  #[test]
  fn test_date_falls_back_to_last_updated() {
    let mut undated = record("Delta", "PM", ApplicationStatus::Applied, "");
    undated.application_date = None;
    undated.last_updated = "2025-01-01T00:00:00.000Z".to_string();

    let mut records = fixtures();
    records.push(undated);

    let result = apply_filters(&records, &Filter::default());
    assert_eq!(result[0].company_name.as_deref(), Some("Delta"));
  }

  #[test]
  fn test_filter_json_shape() {
    let json = r#"{"search":"rust","status":"applied","sortBy":"company","sortOrder":"asc"}"#;
    let filter: Filter = serde_json::from_str(json).unwrap();
    assert_eq!(filter.status, StatusFilter::Applied);
    assert_eq!(filter.sort_by, SortKey::Company);
    assert_eq!(filter.sort_order, SortOrder::Asc);
  }

  #[test]
  fn test_parse_flags() {
    assert_eq!("ALL".parse::<StatusFilter>(), Ok(StatusFilter::All));
    assert_eq!("saved".parse::<StatusFilter>(), Ok(StatusFilter::Saved));
    assert!("archived".parse::<StatusFilter>().is_err());
    assert!("salary".parse::<SortKey>().is_err());
    assert_eq!("asc".parse::<SortOrder>(), Ok(SortOrder::Asc));
  }
}
