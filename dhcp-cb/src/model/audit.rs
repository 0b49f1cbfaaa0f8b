//! Audit trail entries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

/// Object type tags recorded in audit entries.
pub mod object_type {
    pub const GLOBAL_PARAMETER: &str = "dhcp6_global_parameter";
    pub const OPTION_DEF: &str = "dhcp6_option_def";
    pub const OPTIONS: &str = "dhcp6_options";
    pub const SUBNET: &str = "dhcp6_subnet";
    pub const SHARED_NETWORK: &str = "dhcp6_shared_network";
}

/// Kind of change recorded by an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum ModificationType {
    Create = 0,
    Update = 1,
    Delete = 2,
}

impl TryFrom<i32> for ModificationType {
    type Error = Error;

    fn try_from(v: i32) -> Result<Self> {
        match v {
            0 => Ok(ModificationType::Create),
            1 => Ok(ModificationType::Update),
            2 => Ok(ModificationType::Delete),
            _ => Err(Error::invalid("audit.modification_type", v)),
        }
    }
}

impl From<ModificationType> for i32 {
    fn from(t: ModificationType) -> i32 {
        t as i32
    }
}

impl ModificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModificationType::Create => "CREATE",
            ModificationType::Update => "UPDATE",
            ModificationType::Delete => "DELETE",
        }
    }

    /// `Create` for a new row, `Update` for an overwritten one.
    pub fn upsert(created: bool) -> Self {
        if created {
            ModificationType::Create
        } else {
            ModificationType::Update
        }
    }
}

/// One recorded configuration change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    /// Position in the trail, increasing with every append.
    pub revision: u64,
    pub object_type: String,
    pub object_id: u64,
    pub modification_type: ModificationType,
    pub modification_time: DateTime<Utc>,
    pub log_message: String,
}
