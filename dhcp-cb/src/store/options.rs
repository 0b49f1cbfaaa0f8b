//! Option attachments at every scope.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{Error, Result};
use crate::model::{OptionDescriptor, OptionScope, OptionSet, SubnetId};
use crate::selector::ServerSelector;
use crate::stamp::{Stamp, to_micros};

const OPTION_COLUMNS: &str =
    "code, space, value, formatted_value, persistent, client_class, user_context, server_tag, modification_ts";

/// Rows an option attachment references through foreign keys.
#[derive(Debug, Clone, Default)]
pub(crate) struct Parent {
    pub subnet_id: Option<SubnetId>,
    pub pool_id: Option<i64>,
    pub pd_pool_id: Option<i64>,
    pub shared_network_id: Option<i64>,
}

/// Look up the owner of a scope, `None` if it does not exist.
pub(crate) fn resolve_parent(conn: &Connection, scope: &OptionScope) -> Result<Option<Parent>> {
    let parent = match scope {
        OptionScope::Global => Some(Parent::default()),
        OptionScope::Subnet(id) => conn
            .query_row(
                "SELECT subnet_id FROM subnets WHERE subnet_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .map(|subnet_id| Parent {
                subnet_id: Some(subnet_id),
                ..Parent::default()
            }),
        OptionScope::Pool { first, last } => conn
            .query_row(
                "SELECT id, subnet_id FROM pools WHERE start_address = ?1 AND end_address = ?2",
                params![first.to_string(), last.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .map(|(pool_id, subnet_id)| Parent {
                subnet_id: Some(subnet_id),
                pool_id: Some(pool_id),
                ..Parent::default()
            }),
        OptionScope::PdPool(prefix) => conn
            .query_row(
                "SELECT id, subnet_id FROM pd_pools WHERE prefix = ?1 AND prefix_length = ?2",
                params![prefix.addr().to_string(), prefix.prefix_len()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .map(|(pd_pool_id, subnet_id)| Parent {
                subnet_id: Some(subnet_id),
                pd_pool_id: Some(pd_pool_id),
                ..Parent::default()
            }),
        OptionScope::SharedNetwork(name) => conn
            .query_row(
                "SELECT id FROM shared_networks WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?
            .map(|id| Parent {
                shared_network_id: Some(id),
                ..Parent::default()
            }),
    };
    Ok(parent)
}

/// Insert or replace an option within its scope.
///
/// Returns the row id and whether the option was newly created.
pub(crate) fn upsert(
    conn: &Connection,
    scope: &OptionScope,
    parent: &Parent,
    option: &OptionDescriptor,
    server_tag: &str,
) -> Result<(i64, bool)> {
    let scope_key = scope.key();
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM options WHERE scope_id = ?1 AND scope_key = ?2 AND space = ?3 AND code = ?4",
            params![scope.scope_id(), scope_key, option.space, option.code],
            |row| row.get(0),
        )
        .optional()?;

    let user_context = option.stamp.user_context_json()?;
    let modification_ts = to_micros(&option.stamp.modification_time());
    let duplicate = || {
        format!(
            "option {}/{} in {} scope '{}'",
            option.space,
            option.code,
            scope.as_str(),
            scope_key
        )
    };

    match existing {
        Some(id) => {
            conn.execute(
                "UPDATE options SET value = ?1, formatted_value = ?2, persistent = ?3, client_class = ?4,
                    subnet_id = ?5, pool_id = ?6, pd_pool_id = ?7, shared_network_id = ?8,
                    user_context = ?9, server_tag = ?10, modification_ts = ?11
                 WHERE id = ?12",
                params![
                    option.data,
                    option.formatted_value,
                    option.persistent,
                    option.client_class,
                    parent.subnet_id,
                    parent.pool_id,
                    parent.pd_pool_id,
                    parent.shared_network_id,
                    user_context,
                    server_tag,
                    modification_ts,
                    id,
                ],
            )
            .map_err(|e| Error::on_write(e, duplicate))?;
            Ok((id, false))
        }
        None => {
            conn.execute(
                "INSERT INTO options (code, space, value, formatted_value, persistent, client_class,
                    scope_id, scope_key, subnet_id, pool_id, pd_pool_id, shared_network_id,
                    user_context, server_tag, modification_ts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    option.code,
                    option.space,
                    option.data,
                    option.formatted_value,
                    option.persistent,
                    option.client_class,
                    scope.scope_id(),
                    scope_key,
                    parent.subnet_id,
                    parent.pool_id,
                    parent.pd_pool_id,
                    parent.shared_network_id,
                    user_context,
                    server_tag,
                    modification_ts,
                ],
            )
            .map_err(|e| Error::on_write(e, duplicate))?;
            Ok((conn.last_insert_rowid(), true))
        }
    }
}

/// Insert every option of a freshly written owner.
pub(crate) fn insert_set(
    conn: &Connection,
    scope: &OptionScope,
    parent: &Parent,
    options: &OptionSet,
    server_tag: &str,
) -> Result<()> {
    for option in options {
        upsert(conn, scope, parent, option, server_tag)?;
    }
    Ok(())
}

/// Options attached to an owner, in (space, code) order.
pub(crate) fn load_set(conn: &Connection, scope: &OptionScope) -> Result<OptionSet> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {OPTION_COLUMNS} FROM options WHERE scope_id = ?1 AND scope_key = ?2"
    ))?;

    let options = stmt
        .query_map(params![scope.scope_id(), scope.key()], |row| {
            Ok(row_to_option(row))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .collect::<Result<OptionSet>>()?;

    Ok(options)
}

/// Global options visible to the selector, optionally modified after `since`.
pub(crate) fn list_global(
    conn: &Connection,
    selector: &ServerSelector,
    since: Option<&DateTime<Utc>>,
) -> Result<Vec<OptionDescriptor>> {
    let (all, own) = selector.visible_tags();
    let mut stmt = conn.prepare(&format!(
        "SELECT {OPTION_COLUMNS} FROM options
         WHERE scope_id = 0 AND server_tag IN (?1, ?2) AND (?3 IS NULL OR modification_ts > ?3)
         ORDER BY id"
    ))?;

    let options = stmt
        .query_map(params![all, own, since.map(to_micros)], |row| {
            Ok(row_to_option(row))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    Ok(options)
}

/// A single global option visible to the selector.
pub(crate) fn get_global(
    conn: &Connection,
    selector: &ServerSelector,
    code: u16,
    space: &str,
) -> Result<Option<OptionDescriptor>> {
    let (all, own) = selector.visible_tags();
    conn.query_row(
        &format!(
            "SELECT {OPTION_COLUMNS} FROM options
             WHERE scope_id = 0 AND code = ?1 AND space = ?2 AND server_tag IN (?3, ?4)"
        ),
        params![code, space, all, own],
        |row| Ok(row_to_option(row)),
    )
    .optional()?
    .transpose()
}

/// Delete an option from a scope, returning the deleted row id.
pub(crate) fn delete(
    conn: &Connection,
    scope: &OptionScope,
    code: u16,
    space: &str,
    server_tag: &str,
) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "DELETE FROM options
             WHERE scope_id = ?1 AND scope_key = ?2 AND code = ?3 AND space = ?4 AND server_tag = ?5
             RETURNING id",
            params![scope.scope_id(), scope.key(), code, space, server_tag],
            |row| row.get(0),
        )
        .optional()?)
}

fn row_to_option(row: &Row) -> Result<OptionDescriptor> {
    let server_tag: String = row.get("server_tag")?;
    Ok(OptionDescriptor {
        code: row.get("code")?,
        space: row.get("space")?,
        data: row.get("value")?,
        formatted_value: row.get("formatted_value")?,
        persistent: row.get("persistent")?,
        client_class: row.get("client_class")?,
        stamp: Stamp::from_row(
            row.get("modification_ts")?,
            &server_tag,
            row.get("user_context")?,
        )?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Storage;

    #[test]
    fn test_global_option_upsert() {
        let storage = Storage::in_memory().unwrap();
        let option = OptionDescriptor::from_u8("dhcp6", 7, 64);

        let (first, created) = storage
            .read(|conn| {
                let parent = resolve_parent(conn, &OptionScope::Global)?.unwrap();
                let first = upsert(conn, &OptionScope::Global, &parent, &option, "all")?;
                let second = upsert(
                    conn,
                    &OptionScope::Global,
                    &parent,
                    &OptionDescriptor::from_u8("dhcp6", 7, 128),
                    "all",
                )?;
                assert_eq!(first.0, second.0);
                assert!(!second.1);

                let stored = get_global(conn, &ServerSelector::AllServers, 7, "dhcp6")?.unwrap();
                assert_eq!(stored.data, vec![128]);
                Ok(first)
            })
            .unwrap();
        assert!(first > 0);
        assert!(created);
    }

    #[test]
    fn test_missing_parent() {
        let storage = Storage::in_memory().unwrap();
        let scopes = [
            OptionScope::Subnet(1024),
            OptionScope::Pool {
                first: "2001:db8::10".parse().unwrap(),
                last: "2001:db8::20".parse().unwrap(),
            },
            OptionScope::PdPool("2001:db8:a::/48".parse().unwrap()),
            OptionScope::SharedNetwork("level1".into()),
        ];

        storage
            .read(|conn| {
                for scope in &scopes {
                    assert!(resolve_parent(conn, scope)?.is_none());
                }
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_delete_matches_server_tag() {
        let storage = Storage::in_memory().unwrap();

        storage
            .read(|conn| {
                let parent = Parent::default();
                let option = OptionDescriptor::from_string("dhcp6", 41, "my-timezone");
                upsert(conn, &OptionScope::Global, &parent, &option, "all")?;

                assert!(delete(conn, &OptionScope::Global, 41, "dhcp6", "server1")?.is_none());
                assert!(delete(conn, &OptionScope::Global, 41, "dhcp6", "all")?.is_some());
                assert!(list_global(conn, &ServerSelector::AllServers, None)?.is_empty());
                Ok(())
            })
            .unwrap();
    }
}
