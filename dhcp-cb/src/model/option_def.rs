//! Option definitions.

use crate::stamp::{Stamp, Stamped};

/// Data type of an option or of one field of a record option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionDataType {
    Empty,
    Binary,
    Boolean,
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    Ipv4Address,
    Ipv6Address,
    Ipv6Prefix,
    Psid,
    Record,
    String,
    Tuple,
    Fqdn,
}

impl OptionDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionDataType::Empty => "empty",
            OptionDataType::Binary => "binary",
            OptionDataType::Boolean => "boolean",
            OptionDataType::Int8 => "int8",
            OptionDataType::Int16 => "int16",
            OptionDataType::Int32 => "int32",
            OptionDataType::Uint8 => "uint8",
            OptionDataType::Uint16 => "uint16",
            OptionDataType::Uint32 => "uint32",
            OptionDataType::Ipv4Address => "ipv4-address",
            OptionDataType::Ipv6Address => "ipv6-address",
            OptionDataType::Ipv6Prefix => "ipv6-prefix",
            OptionDataType::Psid => "psid",
            OptionDataType::Record => "record",
            OptionDataType::String => "string",
            OptionDataType::Tuple => "tuple",
            OptionDataType::Fqdn => "fqdn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let data_type = match s {
            "empty" => OptionDataType::Empty,
            "binary" => OptionDataType::Binary,
            "boolean" => OptionDataType::Boolean,
            "int8" => OptionDataType::Int8,
            "int16" => OptionDataType::Int16,
            "int32" => OptionDataType::Int32,
            "uint8" => OptionDataType::Uint8,
            "uint16" => OptionDataType::Uint16,
            "uint32" => OptionDataType::Uint32,
            "ipv4-address" => OptionDataType::Ipv4Address,
            "ipv6-address" => OptionDataType::Ipv6Address,
            "ipv6-prefix" => OptionDataType::Ipv6Prefix,
            "psid" => OptionDataType::Psid,
            "record" => OptionDataType::Record,
            "string" => OptionDataType::String,
            "tuple" => OptionDataType::Tuple,
            "fqdn" => OptionDataType::Fqdn,
            _ => return None,
        };
        Some(data_type)
    }

}

/// Definition of a custom or standard option format.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDefinition {
    pub name: String,
    pub code: u16,
    pub space: String,
    pub option_type: OptionDataType,
    pub array: bool,
    /// Space of the sub-options carried by this option.
    pub encapsulated_space: Option<String>,
    /// Field layout when `option_type` is `Record`.
    pub record_fields: Vec<OptionDataType>,
    pub stamp: Stamp,
}

impl OptionDefinition {
    pub fn new(name: &str, code: u16, space: &str, option_type: OptionDataType) -> Self {
        Self {
            name: name.to_string(),
            code,
            space: space.to_string(),
            option_type,
            array: false,
            encapsulated_space: None,
            record_fields: Vec::new(),
            stamp: Stamp::new(),
        }
    }

    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    pub fn encapsulate(mut self, space: &str) -> Self {
        self.encapsulated_space = Some(space.to_string());
        self
    }

    /// Turn the definition into a record with the given field layout.
    pub fn record(mut self, fields: &[OptionDataType]) -> Self {
        self.option_type = OptionDataType::Record;
        self.record_fields = fields.to_vec();
        self
    }
}

impl Stamped for OptionDefinition {
    fn stamp(&self) -> &Stamp {
        &self.stamp
    }

    fn stamp_mut(&mut self) -> &mut Stamp {
        &mut self.stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_names() {
        for name in ["empty", "uint32", "ipv6-address", "record", "fqdn"] {
            assert_eq!(OptionDataType::parse(name).unwrap().as_str(), name);
        }
        assert!(OptionDataType::parse("uint64").is_none());
    }

    #[test]
    fn test_record_definition() {
        let def = OptionDefinition::new("fish", 235, "dhcp6", OptionDataType::String)
            .record(&[OptionDataType::Uint32, OptionDataType::String])
            .array();
        assert_eq!(def.option_type, OptionDataType::Record);
        assert_eq!(def.record_fields.len(), 2);
        assert!(def.array);
    }
}
