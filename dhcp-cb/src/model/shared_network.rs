//! Shared networks.

use super::network::NetworkParams;
use super::option::OptionScope;
use crate::stamp::{Stamp, Stamped};

/// A group of subnets served on the same link.
///
/// Member subnets are not owned: a subnet joins by naming the network in
/// `Subnet6::shared_network_name`.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedNetwork6 {
    pub name: String,
    pub params: NetworkParams,
    pub stamp: Stamp,
}

impl SharedNetwork6 {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: NetworkParams::default(),
            stamp: Stamp::new(),
        }
    }

    pub fn scope(&self) -> OptionScope {
        OptionScope::SharedNetwork(self.name.clone())
    }
}

impl Stamped for SharedNetwork6 {
    fn stamp(&self) -> &Stamp {
        &self.stamp
    }

    fn stamp_mut(&mut self) -> &mut Stamp {
        &mut self.stamp
    }
}
