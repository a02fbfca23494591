//! Charging stations status document (`cgw/ChargingStationsStatus`).

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::table::render_table;
use crate::time::compact_event_time;

/// Shown when a charger id has no known IP address.
pub const IP_NOT_FOUND: &str = "IP not found";

const CONNECTION_HEADERS: [&str; 6] = ["Chg ID", "Conn ID", "OCPP Err", "OCPP Err Ts", "Info", "Status"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcppError {
    pub error_code: String,
    pub info: String,
    pub timestamp: Option<String>,
    pub vendor_error_code: String,
    pub vendor_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Connector {
    pub id: u32,
    pub ocpp_error: OcppError,
    pub ocpp_error_code: String,
    pub priority: bool,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Charger {
    pub connectors: Vec<Connector>,
    pub firmware_version: String,
    pub id: String,
    pub ip_address: String,
    pub ocpp_error: OcppError,
    pub ocpp_error_code: String,
    pub status: String,
}

/// One line of the connections table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRow {
    pub charger_id: String,
    pub connector_id: u32,
    pub error_code: String,
    pub error_time: String,
    pub info: String,
    pub status: String,
}

impl ConnectionRow {
    fn cells(&self) -> Vec<String> {
        vec![
            self.charger_id.clone(),
            self.connector_id.to_string(),
            self.error_code.clone(),
            self.error_time.clone(),
            self.info.clone(),
            self.status.clone(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargingStationsStatus {
    pub chargers: Vec<Charger>,
}

impl ChargingStationsStatus {
    /// Parse a published document. `None` means nothing was published.
    pub fn from_json(bytes: Option<&[u8]>) -> Result<Self> {
        match bytes {
            Some(bytes) => Ok(serde_json::from_slice(bytes)?),
            None => Ok(Self::default()),
        }
    }

    /// IP address of a charger, or [`IP_NOT_FOUND`].
    pub fn ip_for_charger(&self, charger_id: &str) -> &str {
        self.chargers
            .iter()
            .find(|c| c.id == charger_id)
            .map(|c| c.ip_address.as_str())
            .unwrap_or(IP_NOT_FOUND)
    }

    /// One row per connector, ordered by charger id.
    pub fn connection_rows(&self) -> Vec<ConnectionRow> {
        let mut rows: Vec<ConnectionRow> = self
            .chargers
            .iter()
            .flat_map(|charger| {
                charger.connectors.iter().map(move |conn| ConnectionRow {
                    charger_id: charger.id.clone(),
                    connector_id: conn.id,
                    error_code: conn.ocpp_error.error_code.clone(),
                    error_time: compact_event_time(conn.ocpp_error.timestamp.as_deref()),
                    info: conn.ocpp_error.info.clone(),
                    status: conn.status.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| a.charger_id.cmp(&b.charger_id));
        rows
    }

    /// Render rows as the connections table.
    pub fn render_connections(rows: &[ConnectionRow]) -> String {
        let cells: Vec<Vec<String>> = rows.iter().map(ConnectionRow::cells).collect();
        render_table(&CONNECTION_HEADERS, &cells)
    }
}
