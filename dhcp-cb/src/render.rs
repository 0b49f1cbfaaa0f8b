//! JSON rendering of configuration entities.
//!
//! Option payloads are decoded through an [`OptionDefRegistry`]; options
//! without a usable definition render as hex.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};

use dhcproto::{Decoder, Name};
use serde_json::{Map, Value, json};

use crate::model::{
    DHCP6_OPTION_SPACE, NetworkParams, OptionDataType, OptionDefinition, OptionDescriptor,
    OptionSet, PdPool, Pool6, SharedNetwork6, StampedValue, Subnet6,
};
use crate::setting::Setting;
use crate::stamp::Stamped;

/// Option definitions keyed by space and code.
#[derive(Debug, Clone, Default)]
pub struct OptionDefRegistry {
    defs: HashMap<(String, u16), OptionDefinition>,
}

impl OptionDefRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the common standard DHCPv6 options.
    pub fn with_std_dhcp6() -> Self {
        use OptionDataType::*;

        let space = DHCP6_OPTION_SPACE;
        [
            OptionDefinition::new("preference", 7, space, Uint8),
            OptionDefinition::new("unicast", 12, space, Ipv6Address),
            OptionDefinition::new("rapid-commit", 14, space, Empty),
            OptionDefinition::new("sip-server-dns", 21, space, Fqdn).array(),
            OptionDefinition::new("sip-server-addr", 22, space, Ipv6Address).array(),
            OptionDefinition::new("dns-servers", 23, space, Ipv6Address).array(),
            OptionDefinition::new("domain-search", 24, space, Fqdn).array(),
            OptionDefinition::new("nis-servers", 27, space, Ipv6Address).array(),
            OptionDefinition::new("sntp-servers", 31, space, Ipv6Address).array(),
            OptionDefinition::new("information-refresh-time", 32, space, Uint32),
            OptionDefinition::new("new-posix-timezone", 41, space, String),
            OptionDefinition::new("new-tzdb-timezone", 42, space, String),
            OptionDefinition::new("bootfile-url", 59, space, String),
        ]
        .into_iter()
        .collect()
    }

    /// Add a definition, replacing one with the same space and code.
    pub fn add(&mut self, def: OptionDefinition) {
        self.defs.insert((def.space.clone(), def.code), def);
    }

    pub fn get(&self, space: &str, code: u16) -> Option<&OptionDefinition> {
        self.defs.get(&(space.to_string(), code))
    }
}

impl FromIterator<OptionDefinition> for OptionDefRegistry {
    fn from_iter<I: IntoIterator<Item = OptionDefinition>>(iter: I) -> Self {
        let mut registry = Self::new();
        for def in iter {
            registry.add(def);
        }
        registry
    }
}

// =============================================================================
// Entities
// =============================================================================

pub fn render_global_parameter(value: &StampedValue) -> Value {
    let mut obj = Map::new();
    obj.insert("name".into(), json!(value.name));
    obj.insert("value".into(), json!(value.get_value()));
    obj.insert("parameter-type".into(), json!(value.value.type_name()));
    insert_stamp(&mut obj, value);
    Value::Object(obj)
}

pub fn render_option_def(def: &OptionDefinition) -> Value {
    let mut obj = Map::new();
    obj.insert("name".into(), json!(def.name));
    obj.insert("code".into(), json!(def.code));
    obj.insert("space".into(), json!(def.space));
    obj.insert("type".into(), json!(def.option_type.as_str()));
    obj.insert("array".into(), json!(def.array));
    obj.insert(
        "record-types".into(),
        json!(
            def.record_fields
                .iter()
                .map(OptionDataType::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    );
    obj.insert(
        "encapsulate".into(),
        json!(def.encapsulated_space.as_deref().unwrap_or("")),
    );
    insert_stamp(&mut obj, def);
    Value::Object(obj)
}

pub fn render_option(option: &OptionDescriptor, registry: &OptionDefRegistry) -> Value {
    let def = registry.get(&option.space, option.code);

    let mut obj = Map::new();
    if let Some(def) = def {
        obj.insert("name".into(), json!(def.name));
    }
    obj.insert("code".into(), json!(option.code));
    obj.insert("space".into(), json!(option.space));

    let data = match &option.formatted_value {
        Some(formatted) => json!(formatted),
        None => def
            .and_then(|def| decode(def, &option.data))
            .unwrap_or_else(|| json!(to_hex(&option.data))),
    };
    obj.insert("data".into(), data);
    obj.insert("always-send".into(), json!(option.persistent));
    if let Some(class) = &option.client_class {
        obj.insert("client-class".into(), json!(class));
    }
    insert_stamp(&mut obj, option);
    Value::Object(obj)
}

pub fn render_subnet(subnet: &Subnet6, registry: &OptionDefRegistry) -> Value {
    let mut obj = Map::new();
    obj.insert("id".into(), json!(subnet.id));
    obj.insert("subnet".into(), json!(subnet.prefix.to_string()));
    if let Some(name) = &subnet.shared_network_name {
        obj.insert("shared-network-name".into(), json!(name));
    }
    insert_params(&mut obj, &subnet.params, registry);
    obj.insert(
        "pools".into(),
        Value::Array(
            subnet
                .pools
                .iter()
                .map(|pool| render_pool(pool, registry))
                .collect(),
        ),
    );
    obj.insert(
        "pd-pools".into(),
        Value::Array(
            subnet
                .pd_pools
                .iter()
                .map(|pool| render_pd_pool(pool, registry))
                .collect(),
        ),
    );
    insert_stamp(&mut obj, subnet);
    Value::Object(obj)
}

pub fn render_shared_network(network: &SharedNetwork6, registry: &OptionDefRegistry) -> Value {
    let mut obj = Map::new();
    obj.insert("name".into(), json!(network.name));
    insert_params(&mut obj, &network.params, registry);
    insert_stamp(&mut obj, network);
    Value::Object(obj)
}

fn render_pool(pool: &Pool6, registry: &OptionDefRegistry) -> Value {
    json!({
        "pool": format!("{}-{}", pool.first, pool.last),
        "option-data": render_options(&pool.options, registry),
    })
}

fn render_pd_pool(pool: &PdPool, registry: &OptionDefRegistry) -> Value {
    json!({
        "prefix": pool.prefix.addr().to_string(),
        "prefix-len": pool.prefix.prefix_len(),
        "delegated-len": pool.delegated_length,
        "option-data": render_options(&pool.options, registry),
    })
}

fn render_options(options: &OptionSet, registry: &OptionDefRegistry) -> Value {
    Value::Array(
        options
            .iter()
            .map(|option| render_option(option, registry))
            .collect(),
    )
}

fn insert_params(obj: &mut Map<String, Value>, params: &NetworkParams, registry: &OptionDefRegistry) {
    insert_setting(obj, "interface", &params.interface);
    insert_setting(obj, "client-class", &params.client_class);
    if !params.require_client_classes.is_empty() {
        obj.insert(
            "require-client-classes".into(),
            json!(params.require_client_classes),
        );
    }
    if !params.relay_addresses.is_empty() {
        let addresses: Vec<_> = params.relay_addresses.iter().map(Ipv6Addr::to_string).collect();
        obj.insert("relay".into(), json!({ "ip-addresses": addresses }));
    }
    insert_setting(obj, "valid-lifetime", &params.valid_lifetime);
    insert_setting(obj, "preferred-lifetime", &params.preferred_lifetime);
    insert_setting(obj, "renew-timer", &params.t1);
    insert_setting(obj, "rebind-timer", &params.t2);
    insert_setting(
        obj,
        "reservation-mode",
        &params.host_reservation_mode.map(|mode| mode.as_str()),
    );
    insert_setting(obj, "calculate-tee-times", &params.calculate_tee_times);
    insert_setting(obj, "t1-percent", &params.t1_percent);
    insert_setting(obj, "t2-percent", &params.t2_percent);
    insert_setting(obj, "rapid-commit", &params.rapid_commit);
    obj.insert("option-data".into(), render_options(&params.options, registry));
}

/// Unspecified settings are left out.
fn insert_setting<T: serde::Serialize>(obj: &mut Map<String, Value>, key: &str, setting: &Setting<T>) {
    if let Some(value) = setting.as_option() {
        obj.insert(key.into(), json!(value));
    }
}

fn insert_stamp<T: Stamped>(obj: &mut Map<String, Value>, entity: &T) {
    obj.insert(
        "modification-time".into(),
        json!(entity.modification_time().to_rfc3339()),
    );
    if let Some(context) = entity.user_context() {
        obj.insert("user-context".into(), context.clone());
    }
}

// =============================================================================
// Payload Decoding
// =============================================================================

/// Decode a payload according to its definition, `None` if it does not fit.
fn decode(def: &OptionDefinition, data: &[u8]) -> Option<Value> {
    let mut decoder = Decoder::new(data);
    let value = match def.option_type {
        OptionDataType::Empty => json!(""),
        OptionDataType::Record => {
            let mut values = Vec::with_capacity(def.record_fields.len());
            for (i, field) in def.record_fields.iter().enumerate() {
                let last = i + 1 == def.record_fields.len();
                values.push(decode_field(*field, &mut decoder, last)?);
            }
            Value::Array(values)
        }
        data_type if def.array => {
            let mut values = Vec::new();
            while !decoder.buffer().is_empty() {
                values.push(decode_field(data_type, &mut decoder, false)?);
            }
            Value::Array(values)
        }
        data_type => decode_field(data_type, &mut decoder, true)?,
    };
    decoder.buffer().is_empty().then_some(value)
}

/// Read one value from the decoder. Variable-length text only runs to the
/// end of the payload when `last` is set.
fn decode_field(
    data_type: OptionDataType,
    decoder: &mut Decoder<'_>,
    last: bool,
) -> Option<Value> {
    let value = match data_type {
        OptionDataType::Boolean => json!(decoder.read_u8().ok()? != 0),
        OptionDataType::Int8 => json!(decoder.read_u8().ok()? as i8),
        OptionDataType::Uint8 => json!(decoder.read_u8().ok()?),
        OptionDataType::Int16 => json!(decoder.read_u16().ok()? as i16),
        OptionDataType::Uint16 => json!(decoder.read_u16().ok()?),
        OptionDataType::Int32 => json!(decoder.read_u32().ok()? as i32),
        OptionDataType::Uint32 => json!(decoder.read_u32().ok()?),
        OptionDataType::Ipv4Address => {
            json!(Ipv4Addr::from(decoder.read_u32().ok()?).to_string())
        }
        OptionDataType::Ipv6Address => json!(read_ipv6(decoder, 16)?.to_string()),
        OptionDataType::Psid => {
            let len = decoder.read_u8().ok()?;
            let psid = decoder.read_u16().ok()?;
            json!(format!("{}/{}", psid, len))
        }
        OptionDataType::String | OptionDataType::Binary if last => {
            let len = decoder.buffer().len();
            let rest = decoder.read_slice(len).ok()?;
            if data_type == OptionDataType::String {
                json!(std::str::from_utf8(rest).ok()?)
            } else {
                json!(to_hex(rest))
            }
        }
        OptionDataType::Tuple => {
            let len = decoder.read_u16().ok()? as usize;
            json!(std::str::from_utf8(decoder.read_slice(len).ok()?).ok()?)
        }
        OptionDataType::Fqdn => json!(read_name(decoder)?.to_string()),
        OptionDataType::Ipv6Prefix => {
            let prefix_len = decoder.read_u8().ok()?;
            if prefix_len > 128 {
                return None;
            }
            let prefix = read_ipv6(decoder, (prefix_len as usize).div_ceil(8))?;
            json!(format!("{}/{}", prefix, prefix_len))
        }
        _ => return None,
    };
    Some(value)
}

/// Read `len` leading octets of an IPv6 address, zero-filling the rest.
fn read_ipv6(decoder: &mut Decoder<'_>, len: usize) -> Option<Ipv6Addr> {
    let bytes = decoder.read_slice(len).ok()?;
    let mut octets = [0u8; 16];
    octets.get_mut(..bytes.len())?.copy_from_slice(bytes);
    Some(Ipv6Addr::from(octets))
}

/// Read a domain name in DNS wire format.
fn read_name(decoder: &mut Decoder<'_>) -> Option<Name> {
    let mut labels = Vec::new();
    loop {
        let len = decoder.read_u8().ok()? as usize;
        if len == 0 {
            break;
        }
        labels.push(decoder.read_slice(len).ok()?);
    }
    Name::from_labels(labels).ok()
}

fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02X}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HostReservationMode;

    #[test]
    fn test_decode_standard_options() {
        let registry = OptionDefRegistry::with_std_dhcp6();

        let dns = OptionDescriptor::from_addresses(
            "dhcp6",
            23,
            &["2001:db8:1::1".parse().unwrap(), "2001:db8:1::2".parse().unwrap()],
        );
        let rendered = render_option(&dns, &registry);
        assert_eq!(rendered["name"], "dns-servers");
        assert_eq!(rendered["data"], json!(["2001:db8:1::1", "2001:db8:1::2"]));

        let preference = OptionDescriptor::from_u8("dhcp6", 7, 64);
        assert_eq!(render_option(&preference, &registry)["data"], json!(64));

        let search = OptionDescriptor::new(
            "dhcp6",
            24,
            b"\x07example\x03com\x00\x04mydomain\x03org\x00".to_vec(),
        );
        assert_eq!(
            render_option(&search, &registry)["data"],
            json!(["example.com.", "mydomain.org."])
        );
    }

    #[test]
    fn test_unknown_or_malformed_options_render_hex() {
        let registry = OptionDefRegistry::with_std_dhcp6();

        let unknown = OptionDescriptor::new("isc", 3, vec![0xde, 0xad]);
        let rendered = render_option(&unknown, &registry);
        assert_eq!(rendered["data"], "DEAD");
        assert!(rendered.get("name").is_none());

        // Truncated address
        let dns = OptionDescriptor::new("dhcp6", 23, vec![0x20, 0x01, 0x0d]);
        assert_eq!(render_option(&dns, &registry)["data"], "20010D");
    }

    #[test]
    fn test_formatted_value_wins() {
        let registry = OptionDefRegistry::with_std_dhcp6();
        let option = OptionDescriptor::from_u8("dhcp6", 7, 64).with_formatted_value("64");
        assert_eq!(render_option(&option, &registry)["data"], "64");
    }

    #[test]
    fn test_record_definition() {
        let registry: OptionDefRegistry =
            [OptionDefinition::new("fish", 235, "dhcp6", OptionDataType::String)
                .record(&[OptionDataType::Uint16, OptionDataType::String])]
            .into_iter()
            .collect();

        let option = OptionDescriptor::new("dhcp6", 235, b"\x00\x2ablue".to_vec());
        assert_eq!(render_option(&option, &registry)["data"], json!([42, "blue"]));
    }

    #[test]
    fn test_prefix_and_psid_fields() {
        let registry: OptionDefRegistry = [
            OptionDefinition::new("pfx", 240, "dhcp6", OptionDataType::Ipv6Prefix),
            OptionDefinition::new("psid", 241, "dhcp6", OptionDataType::Psid),
        ]
        .into_iter()
        .collect();

        let prefix =
            OptionDescriptor::new("dhcp6", 240, b"\x30\x20\x01\x0d\xb8\x00\x0a".to_vec());
        assert_eq!(render_option(&prefix, &registry)["data"], "2001:db8:a::/48");

        let psid = OptionDescriptor::new("dhcp6", 241, vec![4, 0x00, 0x0c]);
        assert_eq!(render_option(&psid, &registry)["data"], "12/4");

        // Prefix length beyond the payload
        let short = OptionDescriptor::new("dhcp6", 240, vec![64, 0x20, 0x01]);
        assert_eq!(render_option(&short, &registry)["data"], "402001");
    }

    #[test]
    fn test_render_subnet() {
        let registry = OptionDefRegistry::with_std_dhcp6();
        let mut subnet = Subnet6::new("2001:db8::/64".parse().unwrap(), 1024);
        subnet.shared_network_name = Some("level1".into());
        subnet.params.valid_lifetime = Setting::Specified(300);
        subnet.params.host_reservation_mode = Setting::Specified(HostReservationMode::OutOfPool);
        let mut pool = Pool6::new("2001:db8::10".parse().unwrap(), "2001:db8::20".parse().unwrap());
        pool.options.add(OptionDescriptor::from_u8("dhcp6", 7, 1));
        subnet.add_pool(pool);
        subnet.add_pd_pool(PdPool::new("2001:db8:a::/48".parse().unwrap(), 64));

        let rendered = render_subnet(&subnet, &registry);
        assert_eq!(rendered["subnet"], "2001:db8::/64");
        assert_eq!(rendered["shared-network-name"], "level1");
        assert_eq!(rendered["valid-lifetime"], 300);
        assert_eq!(rendered["reservation-mode"], "out-of-pool");
        assert!(rendered.get("renew-timer").is_none());
        assert_eq!(rendered["pools"][0]["pool"], "2001:db8::10-2001:db8::20");
        assert_eq!(rendered["pools"][0]["option-data"][0]["name"], "preference");
        assert_eq!(rendered["pd-pools"][0]["prefix"], "2001:db8:a::");
        assert_eq!(rendered["pd-pools"][0]["delegated-len"], 64);
    }
}
