//! Configuration entities stored by the backend.

pub mod audit;
pub mod global;
pub mod network;
pub mod option;
pub mod option_def;
pub mod shared_network;
pub mod subnet;

pub use audit::{AuditEntry, ModificationType, object_type};
pub use global::{ParameterValue, StampedValue};
pub use network::{HostReservationMode, NetworkParams};
pub use option::{DHCP6_OPTION_SPACE, OptionDescriptor, OptionScope, OptionSet};
pub use option_def::{OptionDataType, OptionDefinition};
pub use shared_network::SharedNetwork6;
pub use subnet::{PdPool, Pool6, Subnet6, SubnetId};
