//! Subnets and their address and prefix delegation pools.

use std::net::Ipv6Addr;

use ipnet::Ipv6Net;

use super::network::NetworkParams;
use super::option::{OptionScope, OptionSet};
use crate::stamp::{Stamp, Stamped};

pub type SubnetId = u32;

/// Range of addresses handed out from a subnet.
#[derive(Debug, Clone, PartialEq)]
pub struct Pool6 {
    pub first: Ipv6Addr,
    pub last: Ipv6Addr,
    pub options: OptionSet,
}

impl Pool6 {
    pub fn new(first: Ipv6Addr, last: Ipv6Addr) -> Self {
        Self {
            first,
            last,
            options: OptionSet::new(),
        }
    }

    pub fn contains(&self, addr: &Ipv6Addr) -> bool {
        (self.first..=self.last).contains(addr)
    }

    pub fn scope(&self) -> OptionScope {
        OptionScope::Pool {
            first: self.first,
            last: self.last,
        }
    }
}

/// Prefix carved into delegated prefixes of `delegated_length`.
#[derive(Debug, Clone, PartialEq)]
pub struct PdPool {
    pub prefix: Ipv6Net,
    pub delegated_length: u8,
    pub options: OptionSet,
}

impl PdPool {
    pub fn new(prefix: Ipv6Net, delegated_length: u8) -> Self {
        Self {
            prefix,
            delegated_length,
            options: OptionSet::new(),
        }
    }

    pub fn contains(&self, addr: &Ipv6Addr) -> bool {
        self.prefix.contains(addr)
    }

    pub fn scope(&self) -> OptionScope {
        OptionScope::PdPool(self.prefix)
    }
}

/// An IPv6 subnet.
///
/// Identified both by `id` and by `prefix`; each is unique across stored
/// subnets. Pools and pd-pools belong to the subnet and are replaced with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Subnet6 {
    pub id: SubnetId,
    pub prefix: Ipv6Net,
    /// Name of the shared network this subnet belongs to.
    pub shared_network_name: Option<String>,
    pub pools: Vec<Pool6>,
    pub pd_pools: Vec<PdPool>,
    pub params: NetworkParams,
    pub stamp: Stamp,
}

impl Subnet6 {
    pub fn new(prefix: Ipv6Net, id: SubnetId) -> Self {
        Self {
            id,
            prefix,
            shared_network_name: None,
            pools: Vec::new(),
            pd_pools: Vec::new(),
            params: NetworkParams::default(),
            stamp: Stamp::new(),
        }
    }

    pub fn add_pool(&mut self, pool: Pool6) {
        self.pools.push(pool);
    }

    pub fn add_pd_pool(&mut self, pool: PdPool) {
        self.pd_pools.push(pool);
    }

    /// Address pool containing `addr`.
    pub fn get_pool(&self, addr: &Ipv6Addr) -> Option<&Pool6> {
        self.pools.iter().find(|p| p.contains(addr))
    }

    /// Prefix delegation pool containing `addr`.
    pub fn get_pd_pool(&self, addr: &Ipv6Addr) -> Option<&PdPool> {
        self.pd_pools.iter().find(|p| p.contains(addr))
    }

    pub fn scope(&self) -> OptionScope {
        OptionScope::Subnet(self.id)
    }
}

impl Stamped for Subnet6 {
    fn stamp(&self) -> &Stamp {
        &self.stamp
    }

    fn stamp_mut(&mut self) -> &mut Stamp {
        &mut self.stamp
    }
}
