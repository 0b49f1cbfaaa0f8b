//! Shared fixtures for backend integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use dhcp_cb::model::{
    DHCP6_OPTION_SPACE, HostReservationMode, OptionDataType, OptionDefinition, OptionDescriptor,
    PdPool, Pool6, SharedNetwork6, StampedValue, Subnet6,
};
use dhcp_cb::{ServerSelector, Setting, SqliteConfigBackend, Stamped};

pub fn backend() -> SqliteConfigBackend {
    SqliteConfigBackend::in_memory().unwrap()
}

pub fn all() -> ServerSelector {
    ServerSelector::AllServers
}

pub fn server1() -> ServerSelector {
    ServerSelector::one("server1")
}

/// Reference times relative to "now": [now - 2h, now - 24h, now + 24h].
pub struct Timestamps {
    pub now: DateTime<Utc>,
}

impl Timestamps {
    pub fn new() -> Self {
        Self {
            now: dhcp_cb::stamp::now(),
        }
    }

    pub fn two_hours_ago(&self) -> DateTime<Utc> {
        self.now - Duration::hours(2)
    }

    pub fn yesterday(&self) -> DateTime<Utc> {
        self.now - Duration::hours(24)
    }

    pub fn tomorrow(&self) -> DateTime<Utc> {
        self.now + Duration::hours(24)
    }

    pub fn one_hour_ago(&self) -> DateTime<Utc> {
        self.now - Duration::hours(1)
    }

    pub fn day_and_half_ago(&self) -> DateTime<Utc> {
        self.now - Duration::hours(36)
    }

    pub fn day_and_half_ahead(&self) -> DateTime<Utc> {
        self.now + Duration::hours(36)
    }
}

// =============================================================================
// Options
// =============================================================================

/// Options used across the tests.
///
/// 0: new-posix-timezone, 1: preference, 2: custom vendor option,
/// 3: dns-servers limited to class1, 4: preference (updated),
/// 5: custom option in another space
pub fn options() -> Vec<OptionDescriptor> {
    vec![
        OptionDescriptor::from_string(DHCP6_OPTION_SPACE, 41, "my-timezone").persistent(false),
        OptionDescriptor::from_u8(DHCP6_OPTION_SPACE, 7, 64).persistent(false),
        OptionDescriptor::from_u16("vendor-encapsulated-options-space", 1234, 5555)
            .persistent(true)
            .with_user_context(json!({ "foo": "bar" })),
        OptionDescriptor::from_addresses(
            DHCP6_OPTION_SPACE,
            23,
            &["2001:db8:1::5".parse().unwrap()],
        )
        .persistent(true)
        .with_client_class("class1"),
        OptionDescriptor::from_u8(DHCP6_OPTION_SPACE, 7, 32).persistent(true),
        OptionDescriptor::from_string("isc", 2, "my-string").persistent(false),
    ]
}

// =============================================================================
// Option Definitions
// =============================================================================

/// Definitions foo, bar (same code as foo), fish (record) and whale (array).
pub fn option_defs() -> Vec<OptionDefinition> {
    vec![
        OptionDefinition::new("foo", 1234, "dhcp6", OptionDataType::String)
            .encapsulate("espace"),
        OptionDefinition::new("bar", 1234, "dhcp6", OptionDataType::Uint32).array(),
        OptionDefinition::new("fish", 5235, "dhcp6", OptionDataType::String)
            .record(&[OptionDataType::Uint32, OptionDataType::String]),
        OptionDefinition::new("whale", 20236, "xyz", OptionDataType::String),
    ]
}

// =============================================================================
// Global Parameters
// =============================================================================

pub fn global_parameters() -> Vec<StampedValue> {
    vec![
        StampedValue::string("name1", "value1"),
        StampedValue::integer("name2", 65),
        StampedValue::boolean("name3", true),
        StampedValue::real("name4", 1.5),
    ]
}

// =============================================================================
// Subnets
// =============================================================================

/// Subnets 1024, 2048 and 4096, plus a second version of 1024.
pub fn subnets() -> Vec<Subnet6> {
    let opts = options();

    let mut subnet = Subnet6::new("2001:db8::/64".parse().unwrap(), 1024);
    subnet.params.interface = Setting::Specified("eth0".into());
    subnet.params.client_class = Setting::Specified("class1".into());
    subnet.params.require_client_classes = vec!["required-class1".into(), "required-class2".into()];
    subnet.params.relay_addresses = vec!["2001:db8:1::2".parse().unwrap()];
    subnet.params.valid_lifetime = Setting::Specified(30);
    subnet.params.preferred_lifetime = Setting::Specified(20);
    subnet.params.t1 = Setting::Specified(30);
    subnet.params.t2 = Setting::Specified(40);
    subnet.params.host_reservation_mode = Setting::Specified(HostReservationMode::Disabled);
    subnet.params.calculate_tee_times = Setting::Specified(true);
    subnet.params.t1_percent = Setting::Specified(0.345);
    subnet.params.t2_percent = Setting::Specified(0.444);
    subnet.params.rapid_commit = Setting::Specified(false);
    subnet.params.options.add(opts[0].clone());
    subnet.params.options.add(opts[1].clone());
    subnet.params.options.add(opts[2].clone());
    subnet.set_user_context(json!({ "foo": "bar" }));

    let mut pool1 = Pool6::new("2001:db8::10".parse().unwrap(), "2001:db8::20".parse().unwrap());
    pool1.options.add(opts[3].clone());
    pool1.options.add(opts[4].clone());
    subnet.add_pool(pool1);
    subnet.add_pool(Pool6::new(
        "2001:db8::50".parse().unwrap(),
        "2001:db8::60".parse().unwrap(),
    ));

    let mut pd_pool1 = PdPool::new("2001:db8:a::/48".parse().unwrap(), 64);
    pd_pool1.options.add(opts[3].clone());
    pd_pool1.options.add(opts[4].clone());
    subnet.add_pd_pool(pd_pool1);
    subnet.add_pd_pool(PdPool::new("2001:db8:b::/48".parse().unwrap(), 64));

    // Same prefix as 1024, different id
    let conflicting = Subnet6::new("2001:db8::/64".parse().unwrap(), 2048);

    let mut second = Subnet6::new("2001:db8:1::/48".parse().unwrap(), 2048);
    second.params.t1 = Setting::Specified(0);
    second.params.options.add(opts[5].clone());
    second.add_pool(Pool6::new(
        "2001:db8:1::10".parse().unwrap(),
        "2001:db8:1::20".parse().unwrap(),
    ));

    let third = Subnet6::new("2001:db8:3::/64".parse().unwrap(), 4096);

    // Replacement of 1024 with fewer children
    let mut replaced = Subnet6::new("2001:db8::/64".parse().unwrap(), 1024);
    replaced.params.valid_lifetime = Setting::Specified(60);
    replaced.add_pool(Pool6::new(
        "2001:db8::70".parse().unwrap(),
        "2001:db8::80".parse().unwrap(),
    ));

    vec![subnet, conflicting, second, third, replaced]
}

// =============================================================================
// Shared Networks
// =============================================================================

pub fn shared_networks() -> Vec<SharedNetwork6> {
    let opts = options();

    let mut level1 = SharedNetwork6::new("level1");
    level1.params.interface = Setting::Specified("eth1".into());
    level1.params.valid_lifetime = Setting::Specified(3600);
    level1.params.rapid_commit = Setting::Specified(true);
    level1.params.host_reservation_mode = Setting::Specified(HostReservationMode::OutOfPool);
    level1.params.relay_addresses = vec!["2001:db8:1::2".parse().unwrap()];
    level1.params.options.add(opts[0].clone());
    level1.params.options.add(opts[1].clone());
    level1.set_user_context(json!({ "foo": "bar" }));

    let mut level2 = SharedNetwork6::new("level2");
    level2.params.t1 = Setting::Specified(0);
    level2.params.options.add(opts[5].clone());

    let level3 = SharedNetwork6::new("level3");

    vec![level1, level2, level3]
}

/// Set the three reference timestamps on the first three items.
pub fn stamp_relative<T: Stamped>(items: &mut [T], timestamps: &Timestamps) {
    let times = [
        timestamps.two_hours_ago(),
        timestamps.yesterday(),
        timestamps.tomorrow(),
    ];
    for (item, time) in items.iter_mut().zip(times) {
        item.set_modification_time(time);
    }
}
