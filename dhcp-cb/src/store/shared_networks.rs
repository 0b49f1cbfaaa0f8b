//! Shared networks and their options.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Params, Row, ToSql, params};
use tracing::debug;

use super::network::{
    NETWORK_ASSIGNMENTS, NETWORK_COLUMNS, NETWORK_VALUES, NetworkColumns, row_to_params,
};
use super::options::{self, Parent};
use crate::error::{Error, Result};
use crate::model::SharedNetwork6;
use crate::selector::ServerSelector;
use crate::stamp::{Stamp, to_micros};

/// Insert a shared network or fully replace the one with the same name.
///
/// Returns the row id and whether the network was newly created.
pub(crate) fn upsert(
    conn: &Connection,
    network: &SharedNetwork6,
    server_tag: &str,
) -> Result<(i64, bool)> {
    let existing = id_by_name(conn, &network.name)?;

    let columns = NetworkColumns::new(&network.params)?;
    let user_context = network.stamp.user_context_json()?;
    let modification_ts = to_micros(&network.stamp.modification_time());

    let sql = match existing {
        None => format!(
            "INSERT INTO shared_networks (name, {NETWORK_COLUMNS}, user_context, server_tag, modification_ts)
             VALUES (:name, {NETWORK_VALUES}, :user_context, :server_tag, :modification_ts)"
        ),
        Some(_) => format!(
            "UPDATE shared_networks SET {NETWORK_ASSIGNMENTS}, user_context = :user_context,
                server_tag = :server_tag, modification_ts = :modification_ts
             WHERE name = :name"
        ),
    };

    let network_values: [(&str, &dyn ToSql); 4] = [
        (":name", &network.name),
        (":user_context", &user_context),
        (":server_tag", &server_tag),
        (":modification_ts", &modification_ts),
    ];
    let mut values = columns.named_params();
    values.extend(network_values);

    conn.execute(&sql, values.as_slice()).map_err(|e| {
        Error::on_write(e, || format!("shared network '{}'", network.name))
    })?;

    let id = match existing {
        Some(id) => {
            conn.execute(
                "DELETE FROM options WHERE shared_network_id = ?1",
                params![id],
            )?;
            id
        }
        None => conn.last_insert_rowid(),
    };

    let parent = Parent {
        shared_network_id: Some(id),
        ..Parent::default()
    };
    options::insert_set(conn, &network.scope(), &parent, &network.params.options, server_tag)?;

    debug!(name = %network.name, id, created = existing.is_none(), "Shared network stored");
    Ok((id, existing.is_none()))
}

pub(crate) fn id_by_name(conn: &Connection, name: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM shared_networks WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?)
}

/// Get a shared network by name.
pub(crate) fn get(
    conn: &Connection,
    selector: &ServerSelector,
    name: &str,
) -> Result<Option<SharedNetwork6>> {
    let (all, own) = selector.visible_tags();
    let networks = query(
        conn,
        "name = ?1 AND server_tag IN (?2, ?3)",
        params![name, all, own],
    )?;
    Ok(networks.into_iter().next())
}

/// List shared networks in creation order, optionally only those modified after `since`.
pub(crate) fn list(
    conn: &Connection,
    selector: &ServerSelector,
    since: Option<&DateTime<Utc>>,
) -> Result<Vec<SharedNetwork6>> {
    let (all, own) = selector.visible_tags();
    query(
        conn,
        "server_tag IN (?1, ?2) AND (?3 IS NULL OR modification_ts > ?3)",
        params![all, own, since.map(to_micros)],
    )
}

/// Delete a shared network by name, returning its row id.
pub(crate) fn delete(conn: &Connection, name: &str, server_tag: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "DELETE FROM shared_networks WHERE name = ?1 AND server_tag = ?2 RETURNING id",
            params![name, server_tag],
            |row| row.get(0),
        )
        .optional()?)
}

/// Delete every shared network stored under the tag, returning (id, name) of each.
pub(crate) fn delete_all(conn: &Connection, server_tag: &str) -> Result<Vec<(i64, String)>> {
    let mut stmt = conn.prepare(
        "DELETE FROM shared_networks WHERE server_tag = ?1 RETURNING id, name",
    )?;
    let mut deleted = stmt
        .query_map(params![server_tag], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<(i64, String)>, _>>()?;
    deleted.sort_by_key(|(id, _)| *id);
    Ok(deleted)
}

/// Bump a shared network's modification time. A later stored time is kept.
pub(crate) fn touch(conn: &Connection, id: i64, time: &DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE shared_networks SET modification_ts = MAX(modification_ts, ?1) WHERE id = ?2",
        params![to_micros(time), id],
    )?;
    Ok(())
}

fn query<P: Params>(conn: &Connection, filter: &str, params: P) -> Result<Vec<SharedNetwork6>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT name, {NETWORK_COLUMNS}, user_context, server_tag, modification_ts
         FROM shared_networks WHERE {filter} ORDER BY id"
    ))?;

    let mut networks = stmt
        .query_map(params, |row| Ok(row_to_network(row)))?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    for network in &mut networks {
        network.params.options = options::load_set(conn, &network.scope())?;
    }

    Ok(networks)
}

fn row_to_network(row: &Row) -> Result<SharedNetwork6> {
    let server_tag: String = row.get("server_tag")?;
    Ok(SharedNetwork6 {
        name: row.get("name")?,
        params: row_to_params(row)?,
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
    use crate::model::OptionDescriptor;
    use crate::setting::Setting;
    use crate::store::Storage;

    #[test]
    fn test_network_replace_keeps_id() {
        let storage = Storage::in_memory().unwrap();
        let mut network = SharedNetwork6::new("level1");
        network.params.rapid_commit = Setting::Specified(true);
        network
            .params
            .options
            .add(OptionDescriptor::from_u8("dhcp6", 7, 64));
        let replacement = SharedNetwork6::new("level1");

        let (first, second, fetched) = storage
            .read(|conn| {
                let first = upsert(conn, &network, "all")?;
                let second = upsert(conn, &replacement, "all")?;
                Ok((first, second, get(conn, &ServerSelector::AllServers, "level1")?))
            })
            .unwrap();

        assert!(first.1);
        assert!(!second.1);
        assert_eq!(first.0, second.0);
        assert_eq!(fetched.unwrap(), replacement);
    }

    #[test]
    fn test_delete_all_returns_each_network() {
        let storage = Storage::in_memory().unwrap();

        let deleted = storage
            .read(|conn| {
                for name in ["level1", "level2", "level3"] {
                    upsert(conn, &SharedNetwork6::new(name), "all")?;
                }
                assert!(delete_all(conn, "server1")?.is_empty());
                delete_all(conn, "all")
            })
            .unwrap();

        let names: Vec<_> = deleted.iter().map(|(_, name)| name.as_str()).collect();
        assert_eq!(names, ["level1", "level2", "level3"]);
    }
}
