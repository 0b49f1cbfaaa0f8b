//! SQLite implementation of the DHCPv6 configuration backend.
//!
//! Each mutating call runs in one transaction together with the audit
//! entries it produces. A call that changes nothing records nothing.

use std::path::Path;

use chrono::{DateTime, Utc};
use ipnet::Ipv6Net;
use tracing::{debug, info};

use crate::config::{BACKEND_TYPE, ConnectionParams, MEMORY_DATABASE};
use crate::error::{Error, Result};
use crate::model::{
    AuditEntry, ModificationType, OptionDefinition, OptionDescriptor, OptionScope,
    SharedNetwork6, StampedValue, Subnet6, SubnetId, object_type,
};
use crate::selector::ServerSelector;
use crate::store::options::Parent;
use crate::store::{
    AuditStore, ConfigBackendDhcp6, GlobalParameterStore, OptionDefStore, OptionStore,
    SharedNetworkStore, Storage, SubnetStore, Tx, audit, global_parameters, option_defs, options,
    shared_networks, subnets,
};

/// DHCPv6 configuration backend on SQLite.
pub struct SqliteConfigBackend {
    storage: Storage,
    host: String,
    port: u16,
}

impl SqliteConfigBackend {
    /// Open the database described by the access parameters.
    pub fn open(params: &ConnectionParams) -> Result<Self> {
        if params.backend_type() != BACKEND_TYPE {
            return Err(Error::Config(format!(
                "unsupported backend type '{}'",
                params.backend_type()
            )));
        }

        let name = params.name()?;
        let storage = if name == MEMORY_DATABASE {
            Storage::in_memory()?
        } else {
            Storage::new(Path::new(name))?
        };
        info!(params = %params, "Configuration backend opened");

        Ok(Self {
            storage,
            host: params.host().to_string(),
            port: params.port()?,
        })
    }

    /// Open a private in-memory backend.
    pub fn in_memory() -> Result<Self> {
        Self::open(&format!("name={}", MEMORY_DATABASE).parse()?)
    }
}

/// Reject writes scoped to a single server.
fn require_all_servers(operation: &'static str, selector: &ServerSelector) -> Result<()> {
    if selector.is_all() {
        Ok(())
    } else {
        Err(Error::InvalidSelector {
            operation,
            selector: selector.clone(),
        })
    }
}

/// Record an option change.
///
/// Options owned by a subnet, pool, pd-pool or shared network are audited as
/// an update of the owner, whose modification time is bumped so pollers
/// re-fetch it.
fn audit_option_change(
    tx: &mut Tx<'_>,
    scope: &OptionScope,
    parent: &Parent,
    option_id: i64,
    modification_type: ModificationType,
    server_tag: &str,
) -> Result<()> {
    let verb = match modification_type {
        ModificationType::Delete => "deleted",
        _ => "set",
    };
    let message = match scope {
        OptionScope::Global => format!("global option {}", verb),
        _ => format!("{} specific option {}", scope.as_str(), verb),
    };
    let now = tx.now();

    if let Some(subnet_id) = parent.subnet_id {
        subnets::touch(tx, subnet_id, &now)?;
        tx.audit(
            object_type::SUBNET,
            subnet_id as u64,
            ModificationType::Update,
            server_tag,
            &message,
        )
    } else if let Some(network_id) = parent.shared_network_id {
        shared_networks::touch(tx, network_id, &now)?;
        tx.audit(
            object_type::SHARED_NETWORK,
            network_id as u64,
            ModificationType::Update,
            server_tag,
            &message,
        )
    } else {
        tx.audit(
            object_type::OPTIONS,
            option_id as u64,
            modification_type,
            server_tag,
            &message,
        )
    }
}

// ========== Global Parameter Operations ==========

impl GlobalParameterStore for SqliteConfigBackend {
    fn create_update_global_parameter(
        &self,
        selector: &ServerSelector,
        value: &StampedValue,
    ) -> Result<()> {
        require_all_servers("setting a global parameter", selector)?;
        let tag = selector.tag();
        self.storage.write(|tx| {
            let (id, created) = global_parameters::upsert(tx, value, tag)?;
            tx.audit(
                object_type::GLOBAL_PARAMETER,
                id as u64,
                ModificationType::upsert(created),
                tag,
                "global parameter set",
            )
        })
    }

    fn get_global_parameter(
        &self,
        selector: &ServerSelector,
        name: &str,
    ) -> Result<Option<StampedValue>> {
        self.storage
            .read(|conn| global_parameters::get(conn, selector, name))
    }

    fn get_all_global_parameters(&self, selector: &ServerSelector) -> Result<Vec<StampedValue>> {
        self.storage
            .read(|conn| global_parameters::list(conn, selector, None))
    }

    fn get_modified_global_parameters(
        &self,
        selector: &ServerSelector,
        since: &DateTime<Utc>,
    ) -> Result<Vec<StampedValue>> {
        self.storage
            .read(|conn| global_parameters::list(conn, selector, Some(since)))
    }

    fn delete_global_parameter(&self, selector: &ServerSelector, name: &str) -> Result<u64> {
        let tag = selector.tag();
        self.storage.write(|tx| {
            let Some(id) = global_parameters::delete(tx, name, tag)? else {
                return Ok(0);
            };
            tx.audit(
                object_type::GLOBAL_PARAMETER,
                id as u64,
                ModificationType::Delete,
                tag,
                "global parameter deleted",
            )?;
            Ok(1)
        })
    }

    fn delete_all_global_parameters(&self, selector: &ServerSelector) -> Result<u64> {
        let tag = selector.tag();
        self.storage.write(|tx| {
            let ids = global_parameters::delete_all(tx, tag)?;
            for id in &ids {
                tx.audit(
                    object_type::GLOBAL_PARAMETER,
                    *id as u64,
                    ModificationType::Delete,
                    tag,
                    "deleted all global parameters",
                )?;
            }
            info!(server_tag = tag, count = ids.len(), "Deleted all global parameters");
            Ok(ids.len() as u64)
        })
    }
}

// ========== Option Definition Operations ==========

impl OptionDefStore for SqliteConfigBackend {
    fn create_update_option_def(
        &self,
        selector: &ServerSelector,
        def: &OptionDefinition,
    ) -> Result<()> {
        require_all_servers("setting an option definition", selector)?;
        let tag = selector.tag();
        self.storage.write(|tx| {
            let (id, created) = option_defs::upsert(tx, def, tag)?;
            tx.audit(
                object_type::OPTION_DEF,
                id as u64,
                ModificationType::upsert(created),
                tag,
                "option definition set",
            )
        })
    }

    fn get_option_def(
        &self,
        selector: &ServerSelector,
        code: u16,
        space: &str,
    ) -> Result<Option<OptionDefinition>> {
        self.storage
            .read(|conn| option_defs::get(conn, selector, code, space))
    }

    fn get_all_option_defs(&self, selector: &ServerSelector) -> Result<Vec<OptionDefinition>> {
        self.storage
            .read(|conn| option_defs::list(conn, selector, None))
    }

    fn get_modified_option_defs(
        &self,
        selector: &ServerSelector,
        since: &DateTime<Utc>,
    ) -> Result<Vec<OptionDefinition>> {
        self.storage
            .read(|conn| option_defs::list(conn, selector, Some(since)))
    }

    fn delete_option_def(&self, selector: &ServerSelector, code: u16, space: &str) -> Result<u64> {
        let tag = selector.tag();
        self.storage.write(|tx| {
            let Some(id) = option_defs::delete(tx, code, space, tag)? else {
                return Ok(0);
            };
            tx.audit(
                object_type::OPTION_DEF,
                id as u64,
                ModificationType::Delete,
                tag,
                "option definition deleted",
            )?;
            Ok(1)
        })
    }

    fn delete_all_option_defs(&self, selector: &ServerSelector) -> Result<u64> {
        let tag = selector.tag();
        self.storage.write(|tx| {
            let ids = option_defs::delete_all(tx, tag)?;
            for id in &ids {
                tx.audit(
                    object_type::OPTION_DEF,
                    *id as u64,
                    ModificationType::Delete,
                    tag,
                    "deleted all option definitions",
                )?;
            }
            info!(server_tag = tag, count = ids.len(), "Deleted all option definitions");
            Ok(ids.len() as u64)
        })
    }
}

// ========== Option Operations ==========

impl OptionStore for SqliteConfigBackend {
    fn create_update_option(
        &self,
        selector: &ServerSelector,
        scope: &OptionScope,
        option: &OptionDescriptor,
    ) -> Result<()> {
        require_all_servers("setting an option", selector)?;
        let tag = selector.tag();
        self.storage.write(|tx| {
            let parent = options::resolve_parent(tx, scope)?.ok_or_else(|| {
                Error::UnknownParent(format!("{} '{}'", scope.as_str(), scope.key()))
            })?;
            let (id, created) = options::upsert(tx, scope, &parent, option, tag)?;
            debug!(
                scope = scope.as_str(),
                key = %scope.key(),
                code = option.code,
                space = %option.space,
                "Option stored"
            );
            audit_option_change(
                tx,
                scope,
                &parent,
                id,
                ModificationType::upsert(created),
                tag,
            )
        })
    }

    fn delete_option(
        &self,
        selector: &ServerSelector,
        scope: &OptionScope,
        code: u16,
        space: &str,
    ) -> Result<u64> {
        let tag = selector.tag();
        self.storage.write(|tx| {
            let Some(parent) = options::resolve_parent(tx, scope)? else {
                return Ok(0);
            };
            let Some(id) = options::delete(tx, scope, code, space, tag)? else {
                return Ok(0);
            };
            audit_option_change(tx, scope, &parent, id, ModificationType::Delete, tag)?;
            Ok(1)
        })
    }

    fn get_option(
        &self,
        selector: &ServerSelector,
        code: u16,
        space: &str,
    ) -> Result<Option<OptionDescriptor>> {
        self.storage
            .read(|conn| options::get_global(conn, selector, code, space))
    }

    fn get_all_options(&self, selector: &ServerSelector) -> Result<Vec<OptionDescriptor>> {
        self.storage
            .read(|conn| options::list_global(conn, selector, None))
    }

    fn get_modified_options(
        &self,
        selector: &ServerSelector,
        since: &DateTime<Utc>,
    ) -> Result<Vec<OptionDescriptor>> {
        self.storage
            .read(|conn| options::list_global(conn, selector, Some(since)))
    }
}

// ========== Subnet Operations ==========

impl SubnetStore for SqliteConfigBackend {
    fn create_update_subnet(&self, selector: &ServerSelector, subnet: &Subnet6) -> Result<()> {
        require_all_servers("setting a subnet", selector)?;
        let tag = selector.tag();
        self.storage.write(|tx| {
            let created = subnets::upsert(tx, subnet, tag)?;
            tx.audit(
                object_type::SUBNET,
                subnet.id as u64,
                ModificationType::upsert(created),
                tag,
                "subnet set",
            )
        })
    }

    fn get_subnet(&self, selector: &ServerSelector, id: SubnetId) -> Result<Option<Subnet6>> {
        self.storage
            .read(|conn| subnets::get_by_id(conn, selector, id))
    }

    fn get_subnet_by_prefix(
        &self,
        selector: &ServerSelector,
        prefix: &Ipv6Net,
    ) -> Result<Option<Subnet6>> {
        self.storage
            .read(|conn| subnets::get_by_prefix(conn, selector, prefix))
    }

    fn get_all_subnets(&self, selector: &ServerSelector) -> Result<Vec<Subnet6>> {
        self.storage
            .read(|conn| subnets::list(conn, selector, None))
    }

    fn get_modified_subnets(
        &self,
        selector: &ServerSelector,
        since: &DateTime<Utc>,
    ) -> Result<Vec<Subnet6>> {
        self.storage
            .read(|conn| subnets::list(conn, selector, Some(since)))
    }

    fn get_shared_network_subnets(
        &self,
        selector: &ServerSelector,
        name: &str,
    ) -> Result<Vec<Subnet6>> {
        self.storage
            .read(|conn| subnets::list_by_network(conn, selector, name))
    }

    fn delete_subnet(&self, selector: &ServerSelector, id: SubnetId) -> Result<u64> {
        let tag = selector.tag();
        self.storage.write(|tx| {
            if subnets::delete_by_id(tx, id, tag)? == 0 {
                return Ok(0);
            }
            tx.audit(
                object_type::SUBNET,
                id as u64,
                ModificationType::Delete,
                tag,
                "subnet deleted",
            )?;
            Ok(1)
        })
    }

    fn delete_subnet_by_prefix(&self, selector: &ServerSelector, prefix: &Ipv6Net) -> Result<u64> {
        let tag = selector.tag();
        self.storage.write(|tx| {
            let Some(id) = subnets::delete_by_prefix(tx, prefix, tag)? else {
                return Ok(0);
            };
            tx.audit(
                object_type::SUBNET,
                id as u64,
                ModificationType::Delete,
                tag,
                "subnet deleted",
            )?;
            Ok(1)
        })
    }

    fn delete_all_subnets(&self, selector: &ServerSelector) -> Result<u64> {
        let tag = selector.tag();
        self.storage.write(|tx| {
            let count = subnets::delete_all(tx, tag)?;
            if count > 0 {
                // One entry for the whole batch
                tx.audit(
                    object_type::SUBNET,
                    0,
                    ModificationType::Delete,
                    tag,
                    "deleted all subnets",
                )?;
            }
            info!(server_tag = tag, count, "Deleted all subnets");
            Ok(count as u64)
        })
    }
}

// ========== Shared Network Operations ==========

impl SharedNetworkStore for SqliteConfigBackend {
    fn create_update_shared_network(
        &self,
        selector: &ServerSelector,
        network: &SharedNetwork6,
    ) -> Result<()> {
        require_all_servers("setting a shared network", selector)?;
        let tag = selector.tag();
        self.storage.write(|tx| {
            let (id, created) = shared_networks::upsert(tx, network, tag)?;
            tx.audit(
                object_type::SHARED_NETWORK,
                id as u64,
                ModificationType::upsert(created),
                tag,
                "shared network set",
            )
        })
    }

    fn get_shared_network(
        &self,
        selector: &ServerSelector,
        name: &str,
    ) -> Result<Option<SharedNetwork6>> {
        self.storage
            .read(|conn| shared_networks::get(conn, selector, name))
    }

    fn get_all_shared_networks(&self, selector: &ServerSelector) -> Result<Vec<SharedNetwork6>> {
        self.storage
            .read(|conn| shared_networks::list(conn, selector, None))
    }

    fn get_modified_shared_networks(
        &self,
        selector: &ServerSelector,
        since: &DateTime<Utc>,
    ) -> Result<Vec<SharedNetwork6>> {
        self.storage
            .read(|conn| shared_networks::list(conn, selector, Some(since)))
    }

    fn delete_shared_network(&self, selector: &ServerSelector, name: &str) -> Result<u64> {
        let tag = selector.tag();
        self.storage.write(|tx| {
            let Some(id) = shared_networks::delete(tx, name, tag)? else {
                return Ok(0);
            };
            let now = tx.now();
            let detached = subnets::detach_from_network(tx, name, &now)?;
            debug!(name, detached, "Detached subnets from deleted shared network");
            tx.audit(
                object_type::SHARED_NETWORK,
                id as u64,
                ModificationType::Delete,
                tag,
                "shared network deleted",
            )?;
            Ok(1)
        })
    }

    fn delete_all_shared_networks(&self, selector: &ServerSelector) -> Result<u64> {
        let tag = selector.tag();
        self.storage.write(|tx| {
            let deleted = shared_networks::delete_all(tx, tag)?;
            let now = tx.now();
            // One entry per network, each deletion detaches its own subnets
            for (id, name) in &deleted {
                subnets::detach_from_network(tx, name, &now)?;
                tx.audit(
                    object_type::SHARED_NETWORK,
                    *id as u64,
                    ModificationType::Delete,
                    tag,
                    "deleted all shared networks",
                )?;
            }
            info!(server_tag = tag, count = deleted.len(), "Deleted all shared networks");
            Ok(deleted.len() as u64)
        })
    }
}

// ========== Audit Operations ==========

impl AuditStore for SqliteConfigBackend {
    fn get_recent_audit_entries(
        &self,
        selector: &ServerSelector,
        since: &DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>> {
        self.storage
            .read(|conn| audit::recent(conn, selector, since))
    }
}

impl ConfigBackendDhcp6 for SqliteConfigBackend {
    fn backend_type(&self) -> &str {
        BACKEND_TYPE
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn port(&self) -> u16 {
        self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory_backend() {
        let params: ConnectionParams = "name=:memory: user=keatest password=keatest"
            .parse()
            .unwrap();
        let backend = SqliteConfigBackend::open(&params).unwrap();
        assert_eq!(backend.backend_type(), "sqlite");
        assert_eq!(backend.host(), "localhost");
        assert_eq!(backend.port(), 0);
    }

    #[test]
    fn test_open_rejects_other_engines() {
        let params: ConnectionParams = "type=mysql name=keatest".parse().unwrap();
        assert!(matches!(
            SqliteConfigBackend::open(&params),
            Err(Error::Config(_))
        ));

        let params: ConnectionParams = "host=localhost".parse().unwrap();
        assert!(matches!(
            SqliteConfigBackend::open(&params),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_writes_require_all_servers() {
        let backend = SqliteConfigBackend::in_memory().unwrap();
        let server1 = ServerSelector::one("server1");

        let err = backend
            .create_update_global_parameter(&server1, &StampedValue::integer("valid-lifetime", 65))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSelector { .. }));

        let err = backend
            .create_update_subnet(&server1, &Subnet6::new("2001:db8::/64".parse().unwrap(), 1))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSelector { .. }));

        let err = backend
            .create_update_option(
                &server1,
                &OptionScope::Global,
                &OptionDescriptor::from_u8("dhcp6", 7, 64),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSelector { .. }));

        let since = crate::stamp::now() - chrono::Duration::hours(1);
        assert!(
            backend
                .get_recent_audit_entries(&ServerSelector::AllServers, &since)
                .unwrap()
                .is_empty()
        );
    }
}
