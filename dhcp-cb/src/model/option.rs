//! Option descriptors and their attachment scopes.

use std::collections::BTreeMap;
use std::net::Ipv6Addr;

use dhcproto::Encoder;
use ipnet::Ipv6Net;
use serde_json::Value;

use super::subnet::SubnetId;
use crate::stamp::{Stamp, Stamped};

/// Option space holding standard DHCPv6 options.
pub const DHCP6_OPTION_SPACE: &str = "dhcp6";

/// Where an option is attached, identified by the owner's natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionScope {
    Global,
    Subnet(SubnetId),
    Pool { first: Ipv6Addr, last: Ipv6Addr },
    PdPool(Ipv6Net),
    SharedNetwork(String),
}

impl OptionScope {
    /// Scope discriminator as stored in the options table.
    pub fn scope_id(&self) -> i32 {
        match self {
            OptionScope::Global => 0,
            OptionScope::Subnet(_) => 1,
            OptionScope::SharedNetwork(_) => 4,
            OptionScope::Pool { .. } => 5,
            OptionScope::PdPool(_) => 6,
        }
    }

    /// Owner key, unique within the scope.
    pub fn key(&self) -> String {
        match self {
            OptionScope::Global => String::new(),
            OptionScope::Subnet(id) => id.to_string(),
            OptionScope::Pool { first, last } => format!("{}-{}", first, last),
            OptionScope::PdPool(prefix) => prefix.to_string(),
            OptionScope::SharedNetwork(name) => name.clone(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionScope::Global => "global",
            OptionScope::Subnet(_) => "subnet",
            OptionScope::Pool { .. } => "address pool",
            OptionScope::PdPool(_) => "prefix delegation pool",
            OptionScope::SharedNetwork(_) => "shared network",
        }
    }
}

/// A protocol option together with its storage attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDescriptor {
    pub code: u16,
    pub space: String,
    /// Option payload in wire format, without code and length.
    pub data: Vec<u8>,
    /// Textual value the option was configured with, if any.
    pub formatted_value: Option<String>,
    /// Send the option even when the client did not request it.
    pub persistent: bool,
    /// Only send the option to clients in this class.
    pub client_class: Option<String>,
    pub stamp: Stamp,
}

impl OptionDescriptor {
    /// Create an option with a raw payload.
    pub fn new(space: &str, code: u16, data: Vec<u8>) -> Self {
        Self {
            code,
            space: space.to_string(),
            data,
            formatted_value: None,
            persistent: false,
            client_class: None,
            stamp: Stamp::new(),
        }
    }

    /// Create an option without payload.
    pub fn empty(space: &str, code: u16) -> Self {
        Self::new(space, code, Vec::new())
    }

    pub fn from_string(space: &str, code: u16, value: &str) -> Self {
        Self::new(space, code, encode(|e| e.write_slice(value.as_bytes())))
    }

    pub fn from_u8(space: &str, code: u16, value: u8) -> Self {
        Self::new(space, code, encode(|e| e.write_u8(value)))
    }

    pub fn from_u16(space: &str, code: u16, value: u16) -> Self {
        Self::new(space, code, encode(|e| e.write_u16(value)))
    }

    pub fn from_u32(space: &str, code: u16, value: u32) -> Self {
        Self::new(space, code, encode(|e| e.write_u32(value)))
    }

    pub fn from_addresses(space: &str, code: u16, addresses: &[Ipv6Addr]) -> Self {
        let data = encode(|e| {
            addresses
                .iter()
                .try_for_each(|address| e.write_slice(&address.octets()))
        });
        Self::new(space, code, data)
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn with_client_class(mut self, class: &str) -> Self {
        self.client_class = Some(class.to_string());
        self
    }

    pub fn with_formatted_value(mut self, value: &str) -> Self {
        self.formatted_value = Some(value.to_string());
        self
    }

    pub fn with_user_context(mut self, context: Value) -> Self {
        self.stamp.set_user_context(Some(context));
        self
    }
}

/// Build a payload in wire order.
fn encode<E>(write: impl FnOnce(&mut Encoder<'_>) -> std::result::Result<(), E>) -> Vec<u8> {
    let mut data = Vec::new();
    let written = write(&mut Encoder::new(&mut data));
    // Writes into a growable buffer do not fail
    if written.is_err() {
        data.clear();
    }
    data
}

impl Stamped for OptionDescriptor {
    fn stamp(&self) -> &Stamp {
        &self.stamp
    }

    fn stamp_mut(&mut self) -> &mut Stamp {
        &mut self.stamp
    }
}

/// Options attached to one owner, unique by (space, code).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptionSet {
    options: BTreeMap<(String, u16), OptionDescriptor>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an option, returning the one it replaces.
    pub fn add(&mut self, option: OptionDescriptor) -> Option<OptionDescriptor> {
        self.options
            .insert((option.space.clone(), option.code), option)
    }

    pub fn get(&self, space: &str, code: u16) -> Option<&OptionDescriptor> {
        self.options.get(&(space.to_string(), code))
    }

    pub fn remove(&mut self, space: &str, code: u16) -> Option<OptionDescriptor> {
        self.options.remove(&(space.to_string(), code))
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionDescriptor> {
        self.options.values()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl FromIterator<OptionDescriptor> for OptionSet {
    fn from_iter<I: IntoIterator<Item = OptionDescriptor>>(iter: I) -> Self {
        let mut set = OptionSet::new();
        for option in iter {
            set.add(option);
        }
        set
    }
}

impl<'a> IntoIterator for &'a OptionSet {
    type Item = &'a OptionDescriptor;
    type IntoIter = std::collections::btree_map::Values<'a, (String, u16), OptionDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.options.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_set_replaces_same_key() {
        let mut set = OptionSet::new();
        assert!(set.add(OptionDescriptor::from_u8("dhcp6", 7, 64)).is_none());
        let replaced = set.add(OptionDescriptor::from_u8("dhcp6", 7, 128));
        assert_eq!(replaced.unwrap().data, vec![64]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("dhcp6", 7).unwrap().data, vec![128]);

        assert!(set.remove("isc", 7).is_none());
        assert_eq!(set.remove("dhcp6", 7).unwrap().data, vec![128]);
        assert!(set.is_empty());
    }

    #[test]
    fn test_option_set_keys_by_space() {
        let set: OptionSet = [
            OptionDescriptor::empty("isc", 1),
            OptionDescriptor::from_u32("vendor-encapsulated-options", 1, 312131),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 2);
        assert!(set.get("isc", 1).unwrap().data.is_empty());
        assert_eq!(
            set.get("vendor-encapsulated-options", 1).unwrap().data,
            312131u32.to_be_bytes().to_vec()
        );
        assert!(set.get("dhcp6", 1).is_none());
    }

    #[test]
    fn test_scope_keys() {
        let pool = OptionScope::Pool {
            first: "2001:db8::10".parse().unwrap(),
            last: "2001:db8::20".parse().unwrap(),
        };
        assert_eq!(pool.scope_id(), 5);
        assert_eq!(pool.key(), "2001:db8::10-2001:db8::20");

        let pd = OptionScope::PdPool("2001:db8:a::/48".parse().unwrap());
        assert_eq!(pd.key(), "2001:db8:a::/48");
        assert_eq!(OptionScope::Subnet(1024).key(), "1024");
        assert_eq!(OptionScope::Global.key(), "");
    }

    #[test]
    fn test_address_list_payload() {
        let option = OptionDescriptor::from_addresses(
            "dhcp6",
            23,
            &["2001:db8::1".parse().unwrap(), "2001:db8::2".parse().unwrap()],
        );
        assert_eq!(option.data.len(), 32);
        assert_eq!(option.data[15], 1);
        assert_eq!(option.data[31], 2);
    }
}
