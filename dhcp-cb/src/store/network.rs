//! Column mapping for parameters shared by subnets and shared networks.

use std::net::Ipv6Addr;

use rusqlite::{Row, ToSql};

use crate::error::Result;
use crate::model::{HostReservationMode, NetworkParams, OptionSet};
use crate::setting::Setting;

/// Column list matching [`NetworkColumns::named_params`].
pub(crate) const NETWORK_COLUMNS: &str = "interface, client_class, require_client_classes, relay_addresses, \
     valid_lifetime, preferred_lifetime, renew_timer, rebind_timer, reservation_mode, \
     calculate_tee_times, t1_percent, t2_percent, rapid_commit";

/// Named placeholders in the order of [`NETWORK_COLUMNS`].
pub(crate) const NETWORK_VALUES: &str = ":interface, :client_class, :require_client_classes, :relay_addresses, \
     :valid_lifetime, :preferred_lifetime, :renew_timer, :rebind_timer, :reservation_mode, \
     :calculate_tee_times, :t1_percent, :t2_percent, :rapid_commit";

/// `SET` clause updating every network column.
pub(crate) const NETWORK_ASSIGNMENTS: &str = "interface = :interface, client_class = :client_class, \
     require_client_classes = :require_client_classes, relay_addresses = :relay_addresses, \
     valid_lifetime = :valid_lifetime, preferred_lifetime = :preferred_lifetime, \
     renew_timer = :renew_timer, rebind_timer = :rebind_timer, reservation_mode = :reservation_mode, \
     calculate_tee_times = :calculate_tee_times, t1_percent = :t1_percent, t2_percent = :t2_percent, \
     rapid_commit = :rapid_commit";

/// Network parameters converted to column values.
pub(crate) struct NetworkColumns {
    interface: Option<String>,
    client_class: Option<String>,
    require_client_classes: String,
    relay_addresses: String,
    valid_lifetime: Option<u32>,
    preferred_lifetime: Option<u32>,
    renew_timer: Option<u32>,
    rebind_timer: Option<u32>,
    reservation_mode: Option<i32>,
    calculate_tee_times: Option<bool>,
    t1_percent: Option<f64>,
    t2_percent: Option<f64>,
    rapid_commit: Option<bool>,
}

impl NetworkColumns {
    pub fn new(params: &NetworkParams) -> Result<Self> {
        Ok(Self {
            interface: params.interface.clone().into_option(),
            client_class: params.client_class.clone().into_option(),
            require_client_classes: serde_json::to_string(&params.require_client_classes)?,
            relay_addresses: serde_json::to_string(&params.relay_addresses)?,
            valid_lifetime: params.valid_lifetime.into_option(),
            preferred_lifetime: params.preferred_lifetime.into_option(),
            renew_timer: params.t1.into_option(),
            rebind_timer: params.t2.into_option(),
            reservation_mode: params.host_reservation_mode.map(i32::from).into_option(),
            calculate_tee_times: params.calculate_tee_times.into_option(),
            t1_percent: params.t1_percent.into_option(),
            t2_percent: params.t2_percent.into_option(),
            rapid_commit: params.rapid_commit.into_option(),
        })
    }

    pub fn named_params(&self) -> Vec<(&'static str, &dyn ToSql)> {
        vec![
            (":interface", &self.interface),
            (":client_class", &self.client_class),
            (":require_client_classes", &self.require_client_classes),
            (":relay_addresses", &self.relay_addresses),
            (":valid_lifetime", &self.valid_lifetime),
            (":preferred_lifetime", &self.preferred_lifetime),
            (":renew_timer", &self.renew_timer),
            (":rebind_timer", &self.rebind_timer),
            (":reservation_mode", &self.reservation_mode),
            (":calculate_tee_times", &self.calculate_tee_times),
            (":t1_percent", &self.t1_percent),
            (":t2_percent", &self.t2_percent),
            (":rapid_commit", &self.rapid_commit),
        ]
    }
}

/// Read network parameters (without options) from a row selecting [`NETWORK_COLUMNS`].
pub(crate) fn row_to_params(row: &Row) -> Result<NetworkParams> {
    let require_client_classes: String = row.get("require_client_classes")?;
    let relay_addresses: String = row.get("relay_addresses")?;
    let reservation_mode: Option<i32> = row.get("reservation_mode")?;

    Ok(NetworkParams {
        interface: row.get::<_, Option<String>>("interface")?.into(),
        client_class: row.get::<_, Option<String>>("client_class")?.into(),
        require_client_classes: serde_json::from_str(&require_client_classes)?,
        relay_addresses: serde_json::from_str::<Vec<Ipv6Addr>>(&relay_addresses)?,
        valid_lifetime: row.get::<_, Option<u32>>("valid_lifetime")?.into(),
        preferred_lifetime: row.get::<_, Option<u32>>("preferred_lifetime")?.into(),
        t1: row.get::<_, Option<u32>>("renew_timer")?.into(),
        t2: row.get::<_, Option<u32>>("rebind_timer")?.into(),
        host_reservation_mode: Setting::from(reservation_mode).map(HostReservationMode::from),
        calculate_tee_times: row.get::<_, Option<bool>>("calculate_tee_times")?.into(),
        t1_percent: row.get::<_, Option<f64>>("t1_percent")?.into(),
        t2_percent: row.get::<_, Option<f64>>("t2_percent")?.into(),
        rapid_commit: row.get::<_, Option<bool>>("rapid_commit")?.into(),
        options: OptionSet::new(),
    })
}
