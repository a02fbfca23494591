//! dnsmasq lease file reader.
//!
//! Each line is `<expiry epoch> <mac> <ip> <hostname> <client-id>`.

use std::path::{Path, PathBuf};

use crate::error::{DomainError, Result};
use crate::table::render_table;
use crate::time::compact_epoch;

const HEADERS: [&str; 5] = ["Lease Time", "MAC Address", "IP Address", "Hostname", "Client ID"];

/// One DHCP lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// Expiry in compact local time, or the raw field when it is not an epoch.
    pub lease_time: String,
    pub mac_address: String,
    pub ip_address: String,
    pub hostname: String,
    pub client_id: String,
}

impl Lease {
    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let expiry = fields.next()?;
        let mac_address = fields.next()?.to_string();
        let ip_address = fields.next()?.to_string();
        let hostname = fields.next()?.to_string();
        let client_id = fields.next()?.to_string();

        let lease_time = expiry
            .parse::<i64>()
            .map(compact_epoch)
            .unwrap_or_else(|_| expiry.to_string());

        Some(Self {
            lease_time,
            mac_address,
            ip_address,
            hostname,
            client_id,
        })
    }
}

/// Leases read from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaseTable {
    source: Option<PathBuf>,
    leases: Vec<Lease>,
}

impl LeaseTable {
    /// Parse lease file contents. Lines with fewer than five fields are ignored.
    pub fn parse(contents: &str) -> Self {
        Self {
            source: None,
            leases: contents.lines().filter_map(Lease::parse).collect(),
        }
    }

    /// Read `path`, falling back to a file of the same name in the working
    /// directory.
    pub fn read(path: &Path) -> Result<Self> {
        let fallback = path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf());

        for candidate in [path, fallback.as_path()] {
            match std::fs::read_to_string(candidate) {
                Ok(contents) => {
                    let mut table = Self::parse(&contents);
                    table.source = Some(candidate.to_path_buf());
                    return Ok(table);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(DomainError::Read {
                        path: candidate.to_path_buf(),
                        source: e,
                    });
                }
            }
        }

        Err(DomainError::LeaseFileMissing {
            path: path.to_path_buf(),
            fallback,
        })
    }

    /// Like [`read`](Self::read), but an unreadable file yields an empty table.
    pub fn read_or_empty(path: &Path) -> Self {
        Self::read(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "lease file unavailable");
            Self::default()
        })
    }

    /// File the leases came from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn leases(&self) -> &[Lease] {
        &self.leases
    }

    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }

    fn by_ip(&self, ip: &str) -> Option<&Lease> {
        self.leases.iter().find(|l| l.ip_address == ip)
    }

    pub fn mac_for_ip(&self, ip: &str) -> Option<&str> {
        self.by_ip(ip).map(|l| l.mac_address.as_str())
    }

    pub fn lease_time_for_ip(&self, ip: &str) -> Option<&str> {
        self.by_ip(ip).map(|l| l.lease_time.as_str())
    }

    /// Lease table as text.
    pub fn render(&self) -> String {
        let rows: Vec<Vec<String>> = self
            .leases
            .iter()
            .map(|l| {
                vec![
                    l.lease_time.clone(),
                    l.mac_address.clone(),
                    l.ip_address.clone(),
                    l.hostname.clone(),
                    l.client_id.clone(),
                ]
            })
            .collect();
        render_table(&HEADERS, &rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
1710495731 aa:bb:cc:dd:ee:01 192.168.5.10 charger-1 01:aa:bb:cc:dd:ee:01
broken line
1710495999 aa:bb:cc:dd:ee:02 192.168.5.11 * *
";

    #[test]
    fn test_parse_skips_short_lines() {
        let table = LeaseTable::parse(SAMPLE);
        assert_eq!(table.leases().len(), 2);
        assert_eq!(table.mac_for_ip("192.168.5.11"), Some("aa:bb:cc:dd:ee:02"));
        assert_eq!(table.mac_for_ip("10.0.0.1"), None);
        assert_eq!(
            table.lease_time_for_ip("192.168.5.10").map(str::len),
            Some("240315_0942".len())
        );
    }

    #[test]
    fn test_non_numeric_expiry_kept_raw() {
        let table = LeaseTable::parse("never aa 10.0.0.2 host id\n");
        assert_eq!(table.lease_time_for_ip("10.0.0.2"), Some("never"));
    }

    #[test]
    fn test_read_and_missing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("dnsmasq.leases");
        std::fs::write(&path, SAMPLE).unwrap();

        let table = LeaseTable::read(&path).unwrap();
        assert_eq!(table.source(), Some(path.as_path()));
        assert_eq!(table.leases().len(), 2);

        let missing = tmp.path().join("nope").join("other.leases");
        let err = LeaseTable::read(&missing).unwrap_err();
        assert!(matches!(err, DomainError::LeaseFileMissing { .. }));
        assert!(LeaseTable::read_or_empty(&missing).is_empty());
    }

    #[test]
    fn test_render_headers() {
        let text = LeaseTable::parse(SAMPLE).render();
        assert!(text.contains("Lease Time"));
        assert!(text.contains("charger-1"));
    }
}
