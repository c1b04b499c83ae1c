//! Command-line surface: each subcommand maps onto one coordinator operation.

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use color_eyre::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cache::CacheStorage;
use crate::model::attachment::{blob_size, encode_file, format_file_size};
use crate::model::{
  apply_filters, ApplicationRecord, ApplicationStatus, Filter, NewApplication, SortKey, SortOrder,
  Stats, StatusFilter,
};
use crate::remote::RemoteApi;
use crate::store::{Coordinator, StoreResult, StoreSource};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// List applications (filter flags are remembered)
  #[command(visible_alias = "ls")]
  List(ListArgs),
  /// Show one application
  Show { id: String },
  /// Add an application
  Add(RecordArgs),
  /// Edit an application, replacing the given fields
  Edit {
    id: String,
    #[command(flatten)]
    fields: RecordArgs,
  },
  /// Delete an application
  #[command(visible_alias = "rm")]
  Delete { id: String },
  /// Count applications by status
  Stats,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
  /// Search company, position and location
  #[arg(short, long)]
  pub search: Option<String>,
  /// all, saved or applied
  #[arg(long)]
  pub status: Option<StatusFilter>,
  /// date, company or status
  #[arg(long)]
  pub sort: Option<SortKey>,
  /// asc or desc
  #[arg(long)]
  pub order: Option<SortOrder>,
  /// Forget the remembered filter before applying the flags
  #[arg(long)]
  pub reset: bool,
}

impl ListArgs {
  /// Overlay the given flags on a saved filter. Returns None when no flag was given.
  pub fn merge(&self, saved: &Filter) -> Option<Filter> {
    if self.search.is_none() && self.status.is_none() && self.sort.is_none() && self.order.is_none() {
      return None;
    }

    Some(Filter {
      search: self.search.clone().unwrap_or_else(|| saved.search.clone()),
      status: self.status.unwrap_or(saved.status),
      sort_by: self.sort.unwrap_or(saved.sort_by),
      sort_order: self.order.unwrap_or(saved.sort_order),
    })
  }
}

#[derive(Args, Debug, Clone, Default)]
pub struct RecordArgs {
  #[arg(long)]
  pub company: Option<String>,
  #[arg(long)]
  pub position: Option<String>,
  #[arg(long)]
  pub location: Option<String>,
  #[arg(long)]
  pub description: Option<String>,
  /// Application date, YYYY-MM-DD
  #[arg(long, value_parser = parse_date)]
  pub date: Option<String>,
  /// saved or applied
  #[arg(long)]
  pub status: Option<ApplicationStatus>,
  #[arg(long)]
  pub notes: Option<String>,
  #[arg(long)]
  pub salary: Option<String>,
  #[arg(long)]
  pub url: Option<String>,
  #[arg(long)]
  pub contact_name: Option<String>,
  #[arg(long)]
  pub contact_email: Option<String>,
  /// Resume file to attach
  #[arg(long)]
  pub resume: Option<PathBuf>,
  /// Cover letter file to attach
  #[arg(long)]
  pub cover_letter: Option<PathBuf>,
}

fn parse_date(s: &str) -> Result<String, String> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map(|d| d.format("%Y-%m-%d").to_string())
    .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

async fn encode_optional(path: Option<&Path>) -> Result<Option<String>> {
  match path {
    Some(p) => Ok(Some(encode_file(p).await?)),
    None => Ok(None),
  }
}

impl RecordArgs {
  /// Assemble form input for a new record. Status defaults to applied.
  pub async fn into_new_application(self) -> Result<NewApplication> {
    let resume_path = encode_optional(self.resume.as_deref()).await?;
    let cover_letter_path = encode_optional(self.cover_letter.as_deref()).await?;

    Ok(NewApplication {
      company_name: self.company,
      position: self.position,
      location: self.location,
      job_description: self.description,
      application_date: self.date,
      status: self.status.unwrap_or_default(),
      notes: self.notes,
      salary: self.salary,
      url: self.url,
      contact_name: self.contact_name,
      contact_email: self.contact_email,
      resume_path,
      cover_letter_path,
    })
  }

  /// Full replacement record: given fields replace those of `record`.
  pub async fn apply_to(self, record: ApplicationRecord) -> Result<ApplicationRecord> {
    let resume_path = encode_optional(self.resume.as_deref()).await?;
    let cover_letter_path = encode_optional(self.cover_letter.as_deref()).await?;

    Ok(ApplicationRecord {
      company_name: self.company.or(record.company_name),
      position: self.position.or(record.position),
      location: self.location.or(record.location),
      job_description: self.description.or(record.job_description),
      application_date: self.date.or(record.application_date),
      status: self.status.unwrap_or(record.status),
      notes: self.notes.or(record.notes),
      salary: self.salary.or(record.salary),
      url: self.url.or(record.url),
      contact_name: self.contact_name.or(record.contact_name),
      contact_email: self.contact_email.or(record.contact_email),
      resume_path: resume_path.or(record.resume_path),
      cover_letter_path: cover_letter_path.or(record.cover_letter_path),
      ..record
    })
  }
}

/// Run one command against the store, writing human-readable output.
pub async fn execute<R, S>(command: Command, store: &Coordinator<R, S>, out: &mut impl Write) -> Result<()>
where
  R: RemoteApi,
  S: CacheStorage,
{
  match command {
    Command::List(args) => {
      if args.reset {
        if let Some(warning) = store.reset_filter() {
          writeln!(out, "warning: {}", warning)?;
        }
      }

      let filter = match args.merge(&store.load_filter()) {
        Some(filter) => {
          if let Some(warning) = store.save_filter(&filter) {
            writeln!(out, "warning: {}", warning)?;
          }
          filter
        }
        None => store.load_filter(),
      };

      let result = store.list_all().await;
      report(&result, false, out)?;

      let shown = apply_filters(&result.data, &filter);
      if result.data.is_empty() {
        writeln!(out, "No applications yet. Add one with `jobtrack add`.")?;
      } else if shown.is_empty() {
        writeln!(out, "No applications match your current filters.")?;
      } else {
        for record in &shown {
          writeln!(out, "{}", list_line(record))?;
        }
      }
    }
    Command::Show { id } => {
      let result = store.get_by_id(&id).await;
      report(&result, false, out)?;
      match &result.data {
        Some(record) => write!(out, "{}", detail(record))?,
        None => writeln!(out, "Application {} not found", id)?,
      }
    }
    Command::Add(fields) => {
      let application = fields.into_new_application().await?;
      let result = store.create(application).await;
      report(&result, true, out)?;
      writeln!(out, "Added {} ({})", result.data.title(), result.data.id)?;
    }
    Command::Edit { id, fields } => {
      let current = store.get_by_id(&id).await;
      report(&current, false, out)?;
      let Some(record) = current.data else {
        writeln!(out, "Application {} not found", id)?;
        return Ok(());
      };

      let edited = fields.apply_to(record).await?;
      let result = store.update(edited).await;
      report(&result, result.data.is_some(), out)?;
      match &result.data {
        Some(record) => writeln!(out, "Updated {} ({})", record.title(), record.id)?,
        None => writeln!(out, "Application {} not found", id)?,
      }
    }
    Command::Delete { id } => {
      let result = store.delete(&id).await;
      report(&result, result.data, out)?;
      if result.data {
        writeln!(out, "Deleted {}", id)?;
      } else {
        writeln!(out, "Application {} not found", id)?;
      }
    }
    Command::Stats => {
      let result = store.list_all().await;
      report(&result, false, out)?;
      let stats = Stats::from_records(&result.data);
      writeln!(out, "Total:   {}", stats.total)?;
      writeln!(out, "Saved:   {}", stats.saved)?;
      writeln!(out, "Applied: {}", stats.applied)?;
    }
  }

  Ok(())
}

/// Print connection notices and warnings attached to a result.
///
/// `wrote` is whether the operation changed a stored record.
fn report<T>(result: &StoreResult<T>, wrote: bool, out: &mut impl Write) -> Result<()> {
  for warning in &result.warnings {
    writeln!(out, "warning: {}", warning)?;
  }

  match result.source {
    StoreSource::Fallback if wrote => writeln!(out, "Saved locally due to connection issue.")?,
    StoreSource::Fallback => writeln!(out, "Offline: showing locally cached applications.")?,
    StoreSource::CacheRepair => writeln!(out, "Server returned no applications, showing local copies.")?,
    StoreSource::Remote | StoreSource::Local => {}
  }

  Ok(())
}

fn list_line(record: &ApplicationRecord) -> String {
  let short_id: String = record.id.chars().take(8).collect();
  let date = record
    .application_date
    .as_deref()
    .unwrap_or_else(|| record.last_updated.get(..10).unwrap_or(""));
  format!("{:<8}  {:<7}  {:<10}  {}", short_id, record.status, date, record.title())
}

fn detail(record: &ApplicationRecord) -> String {
  let fields: [(&str, Option<String>); 12] = [
    ("Company", record.company_name.clone()),
    ("Position", record.position.clone()),
    ("Location", record.location.clone()),
    ("Date", record.application_date.clone()),
    ("Salary", record.salary.clone()),
    ("URL", record.url.clone()),
    ("Contact", record.contact_name.clone()),
    ("Email", record.contact_email.clone()),
    ("Resume", record.resume_path.as_deref().map(describe_attachment)),
    ("Cover letter", record.cover_letter_path.as_deref().map(describe_attachment)),
    ("Description", record.job_description.clone()),
    ("Notes", record.notes.clone()),
  ];

  let mut text = format!("{}\n", record.title());
  text.push_str(&format!("  {:<13} {}\n", "ID", record.id));
  text.push_str(&format!("  {:<13} {}\n", "Status", record.status));
  for (label, value) in fields {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
      text.push_str(&format!("  {:<13} {}\n", label, value));
    }
  }
  text.push_str(&format!("  {:<13} {}\n", "Last updated", record.last_updated));
  text
}

fn describe_attachment(reference: &str) -> String {
  match blob_size(reference) {
    Some(size) => format!("attached ({})", format_file_size(size as u64)),
    None => reference.to_string(),
  }
}
