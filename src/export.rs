//! Plain-text transcript download.

use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};

use crate::catalog::ModelCatalog;
use crate::error::ChatError;
use crate::transcript::Transcript;

pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Render non-empty turns as `#<n> [<model name>]\n<content>` blocks.
pub fn export_transcript(transcript: &Transcript, catalog: &ModelCatalog) -> String {
    transcript
        .visible()
        .enumerate()
        .map(|(i, turn)| {
            let name = catalog.display_name(turn.model.as_deref().unwrap_or(""));
            format!("#{} [{}]\n{}", i + 1, name, turn.content)
        })
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

pub fn file_name_for(date: NaiveDate) -> String {
    format!("chat-{}.txt", date.format("%Y-%m-%d"))
}

/// `chat-YYYY-MM-DD.txt` for today's UTC date.
pub fn default_file_name() -> PathBuf {
    PathBuf::from(file_name_for(Utc::now().date_naive()))
}

pub fn write_transcript(
    path: &Path,
    transcript: &Transcript,
    catalog: &ModelCatalog,
) -> Result<(), ChatError> {
    std::fs::write(path, export_transcript(transcript, catalog))?;
    Ok(())
}
