//! dhcp-cb: configuration backend for a DHCPv6 server.
//!
//! Subnets, shared networks, options, option definitions and global
//! parameters are stored in SQLite and tagged with the server they apply to.
//! Every change is recorded in an audit trail that servers poll to pick up
//! configuration updates incrementally.
//!
//! ```text
//! ConfigBackendDhcp6 (SqliteConfigBackend)
//!     |
//!     +--> store::{subnets, shared_networks, options, ...}  -- one transaction
//!     +--> store::audit                                     -- same transaction
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod model;
pub mod render;
pub mod selector;
pub mod setting;
pub mod stamp;
pub mod store;

// Re-export commonly used types
pub use backend::SqliteConfigBackend;
pub use config::ConnectionParams;
pub use error::{Error, Result};
pub use render::OptionDefRegistry;
pub use selector::ServerSelector;
pub use setting::Setting;
pub use stamp::{Stamp, Stamped};
pub use store::{
    AuditStore, ConfigBackendDhcp6, GlobalParameterStore, OptionDefStore, OptionStore,
    SharedNetworkStore, SubnetStore,
};
