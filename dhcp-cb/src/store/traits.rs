//! Configuration backend trait definitions.
//!
//! Every method takes the server selector the call applies to. Writes are
//! only accepted for all servers; reads and deletes accept any selector.

use chrono::{DateTime, Utc};
use ipnet::Ipv6Net;

use crate::error::Result;
use crate::model::{
    AuditEntry, OptionDefinition, OptionDescriptor, OptionScope, SharedNetwork6, StampedValue,
    Subnet6, SubnetId,
};
use crate::selector::ServerSelector;

// =============================================================================
// Domain Store Traits
// =============================================================================

/// Store trait for global parameters.
pub trait GlobalParameterStore: Send + Sync {
    /// Create or overwrite a parameter by name.
    fn create_update_global_parameter(
        &self,
        selector: &ServerSelector,
        value: &StampedValue,
    ) -> Result<()>;

    fn get_global_parameter(
        &self,
        selector: &ServerSelector,
        name: &str,
    ) -> Result<Option<StampedValue>>;

    fn get_all_global_parameters(&self, selector: &ServerSelector) -> Result<Vec<StampedValue>>;

    /// Parameters modified strictly after `since`.
    fn get_modified_global_parameters(
        &self,
        selector: &ServerSelector,
        since: &DateTime<Utc>,
    ) -> Result<Vec<StampedValue>>;

    fn delete_global_parameter(&self, selector: &ServerSelector, name: &str) -> Result<u64>;

    fn delete_all_global_parameters(&self, selector: &ServerSelector) -> Result<u64>;
}

/// Store trait for option definitions.
pub trait OptionDefStore: Send + Sync {
    /// Create or overwrite a definition by code and space.
    fn create_update_option_def(
        &self,
        selector: &ServerSelector,
        def: &OptionDefinition,
    ) -> Result<()>;

    fn get_option_def(
        &self,
        selector: &ServerSelector,
        code: u16,
        space: &str,
    ) -> Result<Option<OptionDefinition>>;

    fn get_all_option_defs(&self, selector: &ServerSelector) -> Result<Vec<OptionDefinition>>;

    fn get_modified_option_defs(
        &self,
        selector: &ServerSelector,
        since: &DateTime<Utc>,
    ) -> Result<Vec<OptionDefinition>>;

    fn delete_option_def(&self, selector: &ServerSelector, code: u16, space: &str) -> Result<u64>;

    fn delete_all_option_defs(&self, selector: &ServerSelector) -> Result<u64>;
}

/// Store trait for options attached at any scope.
///
/// Only global options can be fetched on their own; options at other scopes
/// come back with the subnet or shared network owning them.
pub trait OptionStore: Send + Sync {
    /// Create or replace an option by space and code within `scope`.
    fn create_update_option(
        &self,
        selector: &ServerSelector,
        scope: &OptionScope,
        option: &OptionDescriptor,
    ) -> Result<()>;

    fn delete_option(
        &self,
        selector: &ServerSelector,
        scope: &OptionScope,
        code: u16,
        space: &str,
    ) -> Result<u64>;

    fn get_option(
        &self,
        selector: &ServerSelector,
        code: u16,
        space: &str,
    ) -> Result<Option<OptionDescriptor>>;

    fn get_all_options(&self, selector: &ServerSelector) -> Result<Vec<OptionDescriptor>>;

    fn get_modified_options(
        &self,
        selector: &ServerSelector,
        since: &DateTime<Utc>,
    ) -> Result<Vec<OptionDescriptor>>;
}

/// Store trait for subnets.
pub trait SubnetStore: Send + Sync {
    /// Create a subnet or fully replace the one with the same id.
    fn create_update_subnet(&self, selector: &ServerSelector, subnet: &Subnet6) -> Result<()>;

    fn get_subnet(&self, selector: &ServerSelector, id: SubnetId) -> Result<Option<Subnet6>>;

    fn get_subnet_by_prefix(
        &self,
        selector: &ServerSelector,
        prefix: &Ipv6Net,
    ) -> Result<Option<Subnet6>>;

    fn get_all_subnets(&self, selector: &ServerSelector) -> Result<Vec<Subnet6>>;

    fn get_modified_subnets(
        &self,
        selector: &ServerSelector,
        since: &DateTime<Utc>,
    ) -> Result<Vec<Subnet6>>;

    /// Subnets belonging to the named shared network.
    fn get_shared_network_subnets(
        &self,
        selector: &ServerSelector,
        name: &str,
    ) -> Result<Vec<Subnet6>>;

    fn delete_subnet(&self, selector: &ServerSelector, id: SubnetId) -> Result<u64>;

    fn delete_subnet_by_prefix(&self, selector: &ServerSelector, prefix: &Ipv6Net) -> Result<u64>;

    fn delete_all_subnets(&self, selector: &ServerSelector) -> Result<u64>;
}

/// Store trait for shared networks.
pub trait SharedNetworkStore: Send + Sync {
    /// Create a shared network or fully replace the one with the same name.
    fn create_update_shared_network(
        &self,
        selector: &ServerSelector,
        network: &SharedNetwork6,
    ) -> Result<()>;

    fn get_shared_network(
        &self,
        selector: &ServerSelector,
        name: &str,
    ) -> Result<Option<SharedNetwork6>>;

    fn get_all_shared_networks(&self, selector: &ServerSelector) -> Result<Vec<SharedNetwork6>>;

    fn get_modified_shared_networks(
        &self,
        selector: &ServerSelector,
        since: &DateTime<Utc>,
    ) -> Result<Vec<SharedNetwork6>>;

    /// Delete a shared network. Member subnets are detached, not deleted.
    fn delete_shared_network(&self, selector: &ServerSelector, name: &str) -> Result<u64>;

    fn delete_all_shared_networks(&self, selector: &ServerSelector) -> Result<u64>;
}

/// Store trait for the audit trail.
pub trait AuditStore: Send + Sync {
    /// Entries recorded strictly after `since`, oldest first.
    fn get_recent_audit_entries(
        &self,
        selector: &ServerSelector,
        since: &DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>>;
}

// =============================================================================
// Combined Backend Trait
// =============================================================================

/// Complete DHCPv6 configuration backend.
pub trait ConfigBackendDhcp6:
    GlobalParameterStore
    + OptionDefStore
    + OptionStore
    + SubnetStore
    + SharedNetworkStore
    + AuditStore
{
    /// Storage engine name.
    fn backend_type(&self) -> &str;

    fn host(&self) -> &str;

    fn port(&self) -> u16;
}
