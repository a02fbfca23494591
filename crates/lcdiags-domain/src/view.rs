//! Site status view assembled from all status sources.

use std::path::PathBuf;
use std::sync::Arc;

use crate::leases::LeaseTable;
use crate::site::SiteStatus;
use crate::snapshot::LastRunSnapshot;
use crate::stations::ChargingStationsStatus;
use crate::store::StatusStore;

/// Store keys of the two status documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusKeys {
    pub site_status: String,
    pub stations_status: String,
}

impl Default for StatusKeys {
    fn default() -> Self {
        Self {
            site_status: "cgw/SiteStatus".to_string(),
            stations_status: "cgw/ChargingStationsStatus".to_string(),
        }
    }
}

/// Renders the site status text from fresh reads of every source.
///
/// Rendering never fails: unavailable sources render as empty sections and
/// problems are listed under the view.
#[derive(Clone)]
pub struct SiteStatusView {
    store: Arc<dyn StatusStore>,
    keys: StatusKeys,
    leases_path: PathBuf,
    snapshot: LastRunSnapshot,
}

impl SiteStatusView {
    pub fn new(
        store: Arc<dyn StatusStore>,
        keys: StatusKeys,
        leases_path: impl Into<PathBuf>,
        snapshot: LastRunSnapshot,
    ) -> Self {
        Self {
            store,
            keys,
            leases_path: leases_path.into(),
            snapshot,
        }
    }

    pub fn render(&self) -> String {
        let mut problems = Vec::new();

        let site = self
            .fetch(&self.keys.site_status, SiteStatus::from_json, &mut problems)
            .unwrap_or_default();
        let stations = self
            .fetch(
                &self.keys.stations_status,
                ChargingStationsStatus::from_json,
                &mut problems,
            )
            .unwrap_or_default();

        let leases = match LeaseTable::read(&self.leases_path) {
            Ok(leases) => leases,
            Err(e) => {
                problems.push(e.to_string());
                LeaseTable::default()
            }
        };

        let rows = stations.connection_rows();
        if let Err(e) = self.snapshot.record(&rows) {
            problems.push(e.to_string());
        }
        let connections = ChargingStationsStatus::render_connections(&rows);

        let mut text = site.render(&leases, &stations, &connections);
        if !problems.is_empty() {
            tracing::warn!(problems = ?problems, "site status rendered with missing sources");
            text.push_str("\n\nWarnings:");
            for problem in &problems {
                text.push_str("\n  ");
                text.push_str(problem);
            }
        }
        text
    }

    fn fetch<T>(
        &self,
        key: &str,
        parse: impl Fn(Option<&[u8]>) -> crate::Result<T>,
        problems: &mut Vec<String>,
    ) -> Option<T> {
        let bytes = match self.store.get(key) {
            Ok(bytes) => bytes,
            Err(e) => {
                problems.push(e.to_string());
                None
            }
        };
        if bytes.is_none() {
            problems.push(format!("no status published under '{key}'"));
        }
        match parse(bytes.as_deref()) {
            Ok(doc) => Some(doc),
            Err(e) => {
                problems.push(format!("invalid status document '{key}': {e}"));
                None
            }
        }
    }
}

impl std::fmt::Debug for SiteStatusView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteStatusView")
            .field("keys", &self.keys)
            .field("leases_path", &self.leases_path)
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStatusStore;
    use tempfile::TempDir;

    fn view(tmp: &TempDir, store: Arc<MemoryStatusStore>) -> SiteStatusView {
        SiteStatusView::new(
            store,
            StatusKeys::default(),
            tmp.path().join("dnsmasq.leases"),
            LastRunSnapshot::new(
                tmp.path().join("tabledata.json"),
                tmp.path().join("status_changes.csv"),
            ),
        )
    }

    #[test]
    fn test_render_with_all_sources() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("dnsmasq.leases"),
            "1710495731 aa:bb 192.168.5.10 cs-1 *\n",
        )
        .unwrap();
        let store = Arc::new(MemoryStatusStore::new());
        store.set("cgw/SiteStatus", r#"{"datetime": "now", "charging_stations": [{"id": "cs-1"}]}"#);
        store.set(
            "cgw/ChargingStationsStatus",
            r#"{"chargers": [{"id": "cs-1", "ip_address": "192.168.5.10",
                "connectors": [{"id": 1, "status": "Available", "ocpp_error": {}}]}]}"#,
        );

        let text = view(&tmp, store).render();
        assert!(text.starts_with("Site Status:"));
        assert!(text.contains("aa:bb"));
        assert!(text.contains("Available"));
        assert!(!text.contains("Warnings:"));
        assert!(tmp.path().join("tabledata.json").exists());
    }

    #[test]
    fn test_render_reports_missing_sources() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(MemoryStatusStore::new());
        store.set("cgw/ChargingStationsStatus", "{broken");

        let text = view(&tmp, store).render();
        assert!(text.starts_with("Site Status:"));
        assert!(text.contains("Warnings:"));
        assert!(text.contains("no status published under 'cgw/SiteStatus'"));
        assert!(text.contains("invalid status document 'cgw/ChargingStationsStatus'"));
        assert!(text.contains("lease file not found"));
    }

    #[test]
    fn test_store_is_read_every_render() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(MemoryStatusStore::new());
        let view = view(&tmp, store.clone());

        store.set("cgw/SiteStatus", r#"{"datetime": "first"}"#);
        assert!(view.render().contains("DateTime: first"));
        store.set("cgw/SiteStatus", r#"{"datetime": "second"}"#);
        assert!(view.render().contains("DateTime: second"));
    }
}
