//! Resume and cover-letter attachments, kept as self-contained `data:` blobs.

use base64::prelude::*;
use color_eyre::{eyre::eyre, Result};
use std::path::Path;

/// Read a file and encode it as a `data:<mime>;base64,<payload>` string.
pub async fn encode_file(path: &Path) -> Result<String> {
  let bytes = tokio::fs::read(path)
    .await
    .map_err(|e| eyre!("Failed to read attachment {}: {}", path.display(), e))?;

  let name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();

  Ok(format!(
    "data:{};base64,{}",
    mime_type(&name),
    BASE64_STANDARD.encode(bytes)
  ))
}

/// Size in bytes of the payload a `data:` blob carries, if it is one.
pub fn blob_size(blob: &str) -> Option<usize> {
  let (_, payload) = blob.strip_prefix("data:")?.split_once(";base64,")?;
  BASE64_STANDARD.decode(payload).ok().map(|b| b.len())
}

/// Extension after the last dot, or empty when there is none.
pub fn file_extension(filename: &str) -> &str {
  match filename.rfind('.') {
    Some(0) | None => "",
    Some(i) => &filename[i + 1..],
  }
}

pub fn mime_type(filename: &str) -> &'static str {
  match file_extension(filename).to_lowercase().as_str() {
    "pdf" => "application/pdf",
    "doc" => "application/msword",
    "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "txt" => "text/plain",
    _ => "application/octet-stream",
  }
}

/// Human-readable size, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
  const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

  if bytes == 0 {
    return "0 Bytes".to_string();
  }

  let mut value = bytes as f64;
  let mut unit = 0;
  while value >= 1024.0 && unit < UNITS.len() - 1 {
    value /= 1024.0;
    unit += 1;
  }

  // Two decimals at most, trailing zeros trimmed
  let rounded = format!("{:.2}", value);
  let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
  format!("{} {}", trimmed, UNITS[unit])
}
