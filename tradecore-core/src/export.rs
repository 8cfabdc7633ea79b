//! JSON export of sessions and templates.

use crate::error::Result;
use crate::types::{AnalysisSession, SessionTemplate};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Something that can be written to an export file
pub trait Exportable: Serialize {
    /// Human title the file name is derived from
    fn export_title(&self) -> &str;
}

impl Exportable for AnalysisSession {
    fn export_title(&self) -> &str {
        &self.title
    }
}

impl Exportable for SessionTemplate {
    fn export_title(&self) -> &str {
        &self.name
    }
}

/// File name for an export: every non-alphanumeric character becomes `_`,
/// the rest is lower-cased, and `.json` is appended.
pub fn export_file_name(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.json", stem)
}

/// Serialize with two-space indentation. Same input, same bytes.
pub fn export_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write `item` into `dir` and return the file path. Overwrites an existing file.
pub fn write_export<T: Exportable>(dir: &Path, item: &T) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(item.export_title()));
    std::fs::write(&path, export_json(item)?)?;
    tracing::info!(path = %path.display(), "Exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use chrono::{TimeZone, Utc};

    fn session() -> AnalysisSession {
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        AnalysisSession {
            id: "s-1".to_string(),
            title: "BTC Levels: 24h!".to_string(),
            messages: vec![
                Message::user("levels", vec!["data:image/png;base64,AAAA".to_string()], at),
                Message::model("100 / 105", at),
            ],
            created_at: at,
        }
    }

    #[test]
    fn file_name_replaces_each_symbol() {
        assert_eq!(export_file_name("BTC Levels: 24h!"), "btc_levels__24h_.json");
        assert_eq!(export_file_name("Gold"), "gold.json");
        assert_eq!(export_file_name("Ölpreis"), "_lpreis.json");
    }

    #[test]
    fn export_is_deterministic_and_indented() {
        let session = session();
        let first = export_json(&session).unwrap();
        let second = export_json(&session).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("{\n  \"id\": \"s-1\""));
        assert!(first.contains("\"createdAt\": 1700000000000"));
        assert!(first.contains("data:image/png;base64,AAAA"));
    }

    #[test]
    fn write_export_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let session = session();
        let path = write_export(dir.path(), &session).unwrap();
        assert_eq!(path.file_name().unwrap(), "btc_levels__24h_.json");

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: AnalysisSession = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, session);
    }

    #[test]
    fn templates_export_under_their_name() {
        let dir = tempfile::tempdir().unwrap();
        let template = SessionTemplate::snapshot("Morning Brief", &session().messages, Utc::now());
        let path = write_export(dir.path(), &template).unwrap();
        assert_eq!(path.file_name().unwrap(), "morning_brief.json");
    }
}
