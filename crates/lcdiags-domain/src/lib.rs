//! Status sources and text views used by the lcdiags built-in commands.
//!
//! Everything here is synchronous and cheap enough to run inside a
//! background task producer once per tick.

pub mod error;
pub mod leases;
pub mod site;
pub mod snapshot;
pub mod stations;
pub mod store;
pub mod table;
pub mod time;
pub mod view;

pub use error::{DomainError, Result};
pub use leases::{Lease, LeaseTable};
pub use site::{ChargerRef, ChargerState, ElectricVehicle, SiteStatus};
pub use snapshot::{LastRunSnapshot, StatusChange};
pub use stations::{Charger, ChargingStationsStatus, ConnectionRow, Connector, OcppError};
pub use store::{FileStatusStore, MemoryStatusStore, StatusStore};
pub use table::render_table;
pub use view::{SiteStatusView, StatusKeys};
