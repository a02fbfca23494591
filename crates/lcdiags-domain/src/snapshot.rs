//! Last-run snapshot of the connections table.
//!
//! Each render stores the connections table as JSON. A connector whose
//! status differs from the stored one is appended to a CSV change log as
//! `<local time>,<charger id>,<new status>`.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{DomainError, Result};
use crate::stations::ConnectionRow;

/// A connector status that changed since the previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub at: String,
    pub charger_id: String,
    pub connector_id: u32,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct LastRunSnapshot {
    table_path: PathBuf,
    change_log_path: PathBuf,
}

impl LastRunSnapshot {
    pub fn new(table_path: impl Into<PathBuf>, change_log_path: impl Into<PathBuf>) -> Self {
        Self {
            table_path: table_path.into(),
            change_log_path: change_log_path.into(),
        }
    }

    pub fn table_path(&self) -> &Path {
        &self.table_path
    }

    pub fn change_log_path(&self) -> &Path {
        &self.change_log_path
    }

    /// Rows stored by the previous run. A missing or unreadable file is an
    /// empty snapshot.
    pub fn previous(&self) -> Vec<ConnectionRow> {
        let bytes = match std::fs::read(&self.table_path) {
            Ok(bytes) => bytes,
            Err(_) => return Vec::new(),
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!(path = %self.table_path.display(), error = %e, "discarding unreadable snapshot");
            Vec::new()
        })
    }

    /// Compare `rows` against the previous snapshot, append changes to the
    /// change log and store `rows` as the new snapshot.
    pub fn record(&self, rows: &[ConnectionRow]) -> Result<Vec<StatusChange>> {
        let previous: HashMap<(String, u32), String> = self
            .previous()
            .into_iter()
            .map(|r| ((r.charger_id, r.connector_id), r.status))
            .collect();

        let at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let changes: Vec<StatusChange> = rows
            .iter()
            .filter(|row| {
                previous
                    .get(&(row.charger_id.clone(), row.connector_id))
                    .is_some_and(|old| !old.is_empty() && *old != row.status)
            })
            .map(|row| StatusChange {
                at: at.clone(),
                charger_id: row.charger_id.clone(),
                connector_id: row.connector_id,
                status: row.status.clone(),
            })
            .collect();

        let json = serde_json::to_vec_pretty(rows)?;
        std::fs::write(&self.table_path, json).map_err(|e| DomainError::Write {
            path: self.table_path.clone(),
            source: e,
        })?;

        if !changes.is_empty() {
            self.append_changes(&changes)?;
            tracing::info!(changes = changes.len(), "connector status changed");
        }
        Ok(changes)
    }

    fn append_changes(&self, changes: &[StatusChange]) -> Result<()> {
        let write_err = |e: std::io::Error| DomainError::Write {
            path: self.change_log_path.clone(),
            source: e,
        };
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.change_log_path)
            .map_err(write_err)?;

        let mut out = String::new();
        for change in changes {
            out.push_str(&csv_field(&change.at));
            out.push(',');
            out.push_str(&csv_field(&change.charger_id));
            out.push(',');
            out.push_str(&csv_field(&change.status));
            out.push_str("\r\n");
        }
        file.write_all(out.as_bytes()).map_err(write_err)
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
