//! Site status document (`cgw/SiteStatus`) and its text view.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::leases::LeaseTable;
use crate::stations::ChargingStationsStatus;
use crate::table::render_table;
use crate::time::compact_event_time;

const CHARGER_HEADERS: [&str; 5] = ["ID", "Status", "IP", "MAC", "Leased until"];
const EV_HEADERS: [&str; 8] = [
    "ID",
    "Chg-ID",
    "Status",
    "Chg-Current",
    "Chg-Offer",
    "Chg-Fw.",
    "Sess.E",
    "Start Chg.",
];

/// A charger mentioned by the site status document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargerRef {
    pub id: String,
}

/// An electric vehicle connected at the site.
///
/// Numeric fields are kept as raw JSON so they print the way the gateway
/// published them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectricVehicle {
    pub id: Value,
    pub charger_id: Value,
    pub status: Value,
    pub charge_current: Value,
    pub charge_offer: Value,
    pub charger_firmware: Value,
    pub session_energy_consumed: Value,
    pub start_charging_time: Option<String>,
}

impl ElectricVehicle {
    fn cells(&self) -> Vec<String> {
        vec![
            value_text(&self.id),
            value_text(&self.charger_id),
            value_text(&self.status),
            value_text(&self.charge_current),
            value_text(&self.charge_offer),
            value_text(&self.charger_firmware),
            value_text(&self.session_energy_consumed),
            compact_event_time(self.start_charging_time.as_deref()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargerState {
    Online,
    Offline,
}

impl fmt::Display for ChargerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargerState::Online => write!(f, "Online"),
            ChargerState::Offline => write!(f, "OFFLINE"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteStatus {
    pub charging_stations: Vec<ChargerRef>,
    pub datetime: String,
    pub evs: Vec<ElectricVehicle>,
    pub offline_chargers: Vec<ChargerRef>,
}

impl SiteStatus {
    /// Parse a published document. `None` means nothing was published.
    pub fn from_json(bytes: Option<&[u8]>) -> Result<Self> {
        match bytes {
            Some(bytes) => Ok(serde_json::from_slice(bytes)?),
            None => Ok(Self::default()),
        }
    }

    /// Every known charger, ordered by id. Offline wins over online.
    pub fn charger_states(&self) -> BTreeMap<String, ChargerState> {
        let mut states: BTreeMap<String, ChargerState> = self
            .charging_stations
            .iter()
            .map(|c| (c.id.clone(), ChargerState::Online))
            .collect();
        for charger in &self.offline_chargers {
            states.insert(charger.id.clone(), ChargerState::Offline);
        }
        states
    }

    /// The full site status view.
    ///
    /// `connections` is the already rendered connections table.
    pub fn render(
        &self,
        leases: &LeaseTable,
        stations: &ChargingStationsStatus,
        connections: &str,
    ) -> String {
        let mut out = vec![
            "Site Status:".to_string(),
            "Action: response".to_string(),
            format!("DateTime: {}", self.datetime),
        ];

        let states = self.charger_states();
        if !states.is_empty() {
            let rows: Vec<Vec<String>> = states
                .iter()
                .map(|(id, state)| {
                    let ip = stations.ip_for_charger(id);
                    vec![
                        id.clone(),
                        state.to_string(),
                        ip.to_string(),
                        leases.mac_for_ip(ip).unwrap_or_default().to_string(),
                        leases.lease_time_for_ip(ip).unwrap_or_default().to_string(),
                    ]
                })
                .collect();
            out.push(String::new());
            out.push("Chargers:".to_string());
            out.push(render_table(&CHARGER_HEADERS, &rows));
        }

        out.push(String::new());
        out.push("Connections:".to_string());
        out.push(connections.to_string());

        if !self.evs.is_empty() {
            let rows: Vec<Vec<String>> = self.evs.iter().map(ElectricVehicle::cells).collect();
            out.push(String::new());
            out.push("Electric Vehicles:".to_string());
            out.push(render_table(&EV_HEADERS, &rows));
        }

        out.join("\n")
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = r#"{
        "datetime": "2024-03-15T09:42:11",
        "charging_stations": [{"id": "cs-2"}, {"id": "cs-1"}],
        "offline_chargers": [{"id": "cs-2"}, {"id": "cs-3"}],
        "evs": [{"id": "ev-1", "charger_id": "cs-1", "status": "Charging",
                 "charge_current": 16, "charge_offer": 32.5, "charger_firmware": "1.2",
                 "session_energy_consumed": 4.2,
                 "start_charging_time": "2024-03-15T08:00:00.000+0000"}]
    }"#;

    const STATIONS: &str = r#"{"chargers": [{"id": "cs-1", "ip_address": "192.168.5.10",
        "connectors": [{"id": 1, "status": "Charging", "ocpp_error": {}}]}]}"#;

    #[test]
    fn test_offline_overrides_online() {
        let site = SiteStatus::from_json(Some(SITE.as_bytes())).unwrap();
        let states: Vec<_> = site.charger_states().into_iter().collect();
        assert_eq!(
            states,
            vec![
                ("cs-1".to_string(), ChargerState::Online),
                ("cs-2".to_string(), ChargerState::Offline),
                ("cs-3".to_string(), ChargerState::Offline),
            ]
        );
    }

    #[test]
    fn test_render_sections() {
        let site = SiteStatus::from_json(Some(SITE.as_bytes())).unwrap();
        let stations = ChargingStationsStatus::from_json(Some(STATIONS.as_bytes())).unwrap();
        let leases = LeaseTable::parse("1710495731 aa:bb 192.168.5.10 cs-1 *\n");

        let text = site.render(&leases, &stations, "<connections>");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Site Status:");
        assert_eq!(lines[1], "Action: response");
        assert_eq!(lines[2], "DateTime: 2024-03-15T09:42:11");
        assert!(text.contains("| cs-1 | Online  | 192.168.5.10 | aa:bb |"));
        assert!(text.contains("IP not found"));
        assert!(text.contains("Connections:\n<connections>"));
        assert!(text.contains("Electric Vehicles:"));
        assert!(text.contains("240315_0800"));
        assert!(text.contains("32.5"));
    }

    #[test]
    fn test_empty_document() {
        let site = SiteStatus::from_json(None).unwrap();
        let text = site.render(&LeaseTable::default(), &ChargingStationsStatus::default(), "");
        assert!(!text.contains("Chargers:"));
        assert!(!text.contains("Electric Vehicles:"));
        assert!(text.contains("Connections:"));
    }
}
