//! Parameters shared by subnets and shared networks.

use std::net::Ipv6Addr;

use super::option::OptionSet;
use crate::setting::Setting;

/// Which host reservations the server honors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum HostReservationMode {
    Disabled = 0,
    OutOfPool = 1,
    Global = 2,
    #[default]
    All = 3,
}

impl From<i32> for HostReservationMode {
    fn from(v: i32) -> Self {
        match v {
            0 => HostReservationMode::Disabled,
            1 => HostReservationMode::OutOfPool,
            2 => HostReservationMode::Global,
            _ => HostReservationMode::All,
        }
    }
}

impl From<HostReservationMode> for i32 {
    fn from(m: HostReservationMode) -> i32 {
        m as i32
    }
}

impl HostReservationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostReservationMode::Disabled => "disabled",
            HostReservationMode::OutOfPool => "out-of-pool",
            HostReservationMode::Global => "global",
            HostReservationMode::All => "all",
        }
    }
}

/// Lease timers, class guards, relays and options of a subnet or network.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NetworkParams {
    pub interface: Setting<String>,
    pub client_class: Setting<String>,
    pub require_client_classes: Vec<String>,
    pub relay_addresses: Vec<Ipv6Addr>,
    pub valid_lifetime: Setting<u32>,
    pub preferred_lifetime: Setting<u32>,
    /// Renew timer.
    pub t1: Setting<u32>,
    /// Rebind timer.
    pub t2: Setting<u32>,
    pub host_reservation_mode: Setting<HostReservationMode>,
    pub calculate_tee_times: Setting<bool>,
    pub t1_percent: Setting<f64>,
    pub t2_percent: Setting<f64>,
    pub rapid_commit: Setting<bool>,
    pub options: OptionSet,
}
