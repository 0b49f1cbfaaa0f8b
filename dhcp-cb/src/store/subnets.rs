//! Subnets with their pools, pd-pools and options.

use std::net::Ipv6Addr;

use chrono::{DateTime, Utc};
use ipnet::Ipv6Net;
use rusqlite::{Connection, OptionalExtension, Params, Row, ToSql, params};
use tracing::debug;

use super::network::{
    NETWORK_ASSIGNMENTS, NETWORK_COLUMNS, NETWORK_VALUES, NetworkColumns, row_to_params,
};
use super::options::{self, Parent};
use crate::error::{Error, Result};
use crate::model::{PdPool, Pool6, Subnet6, SubnetId};
use crate::selector::ServerSelector;
use crate::stamp::{Stamp, to_micros};

/// Insert a subnet or fully replace the one stored under the same id.
///
/// Pools, pd-pools and options of a replaced subnet are dropped and written
/// again from `subnet`. Returns whether the subnet was newly created.
pub(crate) fn upsert(conn: &Connection, subnet: &Subnet6, server_tag: &str) -> Result<bool> {
    let created = !exists(conn, subnet.id)?;

    let columns = NetworkColumns::new(&subnet.params)?;
    let prefix = subnet.prefix.to_string();
    let user_context = subnet.stamp.user_context_json()?;
    let modification_ts = to_micros(&subnet.stamp.modification_time());

    let sql = if created {
        format!(
            "INSERT INTO subnets (subnet_id, subnet_prefix, shared_network_name, {NETWORK_COLUMNS},
                user_context, server_tag, modification_ts)
             VALUES (:subnet_id, :subnet_prefix, :shared_network_name, {NETWORK_VALUES},
                :user_context, :server_tag, :modification_ts)"
        )
    } else {
        format!(
            "UPDATE subnets SET subnet_prefix = :subnet_prefix, shared_network_name = :shared_network_name,
                {NETWORK_ASSIGNMENTS}, user_context = :user_context, server_tag = :server_tag,
                modification_ts = :modification_ts
             WHERE subnet_id = :subnet_id"
        )
    };

    let subnet_values: [(&str, &dyn ToSql); 6] = [
        (":subnet_id", &subnet.id),
        (":subnet_prefix", &prefix),
        (":shared_network_name", &subnet.shared_network_name),
        (":user_context", &user_context),
        (":server_tag", &server_tag),
        (":modification_ts", &modification_ts),
    ];
    let mut values = columns.named_params();
    values.extend(subnet_values);

    conn.execute(&sql, values.as_slice()).map_err(|e| {
        Error::on_write(e, || {
            format!("subnet {} ({}) collides with another subnet", subnet.id, prefix)
        })
    })?;

    if !created {
        // Pool options go with their pools
        conn.execute("DELETE FROM pools WHERE subnet_id = ?1", params![subnet.id])?;
        conn.execute("DELETE FROM pd_pools WHERE subnet_id = ?1", params![subnet.id])?;
        conn.execute("DELETE FROM options WHERE subnet_id = ?1", params![subnet.id])?;
    }

    for pool in &subnet.pools {
        conn.execute(
            "INSERT INTO pools (start_address, end_address, subnet_id, modification_ts)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                pool.first.to_string(),
                pool.last.to_string(),
                subnet.id,
                modification_ts,
            ],
        )
        .map_err(|e| {
            Error::on_write(e, || {
                format!("pool {}-{} already belongs to a subnet", pool.first, pool.last)
            })
        })?;

        let parent = Parent {
            subnet_id: Some(subnet.id),
            pool_id: Some(conn.last_insert_rowid()),
            ..Parent::default()
        };
        options::insert_set(conn, &pool.scope(), &parent, &pool.options, server_tag)?;
    }

    for pool in &subnet.pd_pools {
        conn.execute(
            "INSERT INTO pd_pools (prefix, prefix_length, delegated_prefix_length, subnet_id, modification_ts)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                pool.prefix.addr().to_string(),
                pool.prefix.prefix_len(),
                pool.delegated_length,
                subnet.id,
                modification_ts,
            ],
        )
        .map_err(|e| {
            Error::on_write(e, || {
                format!("pd pool {} already belongs to a subnet", pool.prefix)
            })
        })?;

        let parent = Parent {
            subnet_id: Some(subnet.id),
            pd_pool_id: Some(conn.last_insert_rowid()),
            ..Parent::default()
        };
        options::insert_set(conn, &pool.scope(), &parent, &pool.options, server_tag)?;
    }

    let parent = Parent {
        subnet_id: Some(subnet.id),
        ..Parent::default()
    };
    options::insert_set(conn, &subnet.scope(), &parent, &subnet.params.options, server_tag)?;

    debug!(
        subnet_id = subnet.id,
        prefix = %subnet.prefix,
        pools = subnet.pools.len(),
        pd_pools = subnet.pd_pools.len(),
        created,
        "Subnet stored"
    );
    Ok(created)
}

pub(crate) fn exists(conn: &Connection, id: SubnetId) -> Result<bool> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM subnets WHERE subnet_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Get a subnet by id.
pub(crate) fn get_by_id(
    conn: &Connection,
    selector: &ServerSelector,
    id: SubnetId,
) -> Result<Option<Subnet6>> {
    let (all, own) = selector.visible_tags();
    let subnets = query(
        conn,
        "subnet_id = ?1 AND server_tag IN (?2, ?3)",
        params![id, all, own],
    )?;
    Ok(subnets.into_iter().next())
}

/// Get a subnet by prefix.
pub(crate) fn get_by_prefix(
    conn: &Connection,
    selector: &ServerSelector,
    prefix: &Ipv6Net,
) -> Result<Option<Subnet6>> {
    let (all, own) = selector.visible_tags();
    let subnets = query(
        conn,
        "subnet_prefix = ?1 AND server_tag IN (?2, ?3)",
        params![prefix.to_string(), all, own],
    )?;
    Ok(subnets.into_iter().next())
}

/// List subnets, optionally only those modified after `since`.
pub(crate) fn list(
    conn: &Connection,
    selector: &ServerSelector,
    since: Option<&DateTime<Utc>>,
) -> Result<Vec<Subnet6>> {
    let (all, own) = selector.visible_tags();
    query(
        conn,
        "server_tag IN (?1, ?2) AND (?3 IS NULL OR modification_ts > ?3)",
        params![all, own, since.map(to_micros)],
    )
}

/// List the subnets belonging to a shared network.
pub(crate) fn list_by_network(
    conn: &Connection,
    selector: &ServerSelector,
    name: &str,
) -> Result<Vec<Subnet6>> {
    let (all, own) = selector.visible_tags();
    query(
        conn,
        "shared_network_name = ?1 AND server_tag IN (?2, ?3)",
        params![name, all, own],
    )
}

/// Delete a subnet by id. Returns the number of deleted subnets.
pub(crate) fn delete_by_id(conn: &Connection, id: SubnetId, server_tag: &str) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM subnets WHERE subnet_id = ?1 AND server_tag = ?2",
        params![id, server_tag],
    )?)
}

/// Delete a subnet by prefix, returning the id of the deleted subnet.
pub(crate) fn delete_by_prefix(
    conn: &Connection,
    prefix: &Ipv6Net,
    server_tag: &str,
) -> Result<Option<SubnetId>> {
    Ok(conn
        .query_row(
            "DELETE FROM subnets WHERE subnet_prefix = ?1 AND server_tag = ?2 RETURNING subnet_id",
            params![prefix.to_string(), server_tag],
            |row| row.get(0),
        )
        .optional()?)
}

/// Delete every subnet stored under the tag.
pub(crate) fn delete_all(conn: &Connection, server_tag: &str) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM subnets WHERE server_tag = ?1",
        params![server_tag],
    )?)
}

/// Bump a subnet's modification time. A later stored time is kept.
pub(crate) fn touch(conn: &Connection, id: SubnetId, time: &DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE subnets SET modification_ts = MAX(modification_ts, ?1) WHERE subnet_id = ?2",
        params![to_micros(time), id],
    )?;
    Ok(())
}

/// Remove every subnet from a shared network. Returns the number of detached subnets.
pub(crate) fn detach_from_network(
    conn: &Connection,
    name: &str,
    time: &DateTime<Utc>,
) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE subnets SET shared_network_name = NULL, modification_ts = MAX(modification_ts, ?1)
         WHERE shared_network_name = ?2",
        params![to_micros(time), name],
    )?)
}

fn query<P: Params>(conn: &Connection, filter: &str, params: P) -> Result<Vec<Subnet6>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT subnet_id, subnet_prefix, shared_network_name, {NETWORK_COLUMNS},
            user_context, server_tag, modification_ts
         FROM subnets WHERE {filter} ORDER BY subnet_id"
    ))?;

    let mut subnets = stmt
        .query_map(params, |row| Ok(row_to_subnet(row)))?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    for subnet in &mut subnets {
        load_children(conn, subnet)?;
    }

    Ok(subnets)
}

fn row_to_subnet(row: &Row) -> Result<Subnet6> {
    let prefix: String = row.get("subnet_prefix")?;
    let server_tag: String = row.get("server_tag")?;

    Ok(Subnet6 {
        id: row.get("subnet_id")?,
        prefix: prefix
            .parse()
            .map_err(|_| Error::invalid("subnets.subnet_prefix", &prefix))?,
        shared_network_name: row.get("shared_network_name")?,
        pools: Vec::new(),
        pd_pools: Vec::new(),
        params: row_to_params(row)?,
        stamp: Stamp::from_row(
            row.get("modification_ts")?,
            &server_tag,
            row.get("user_context")?,
        )?,
    })
}

fn load_children(conn: &Connection, subnet: &mut Subnet6) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT start_address, end_address FROM pools WHERE subnet_id = ?1 ORDER BY id",
    )?;
    let ranges = stmt
        .query_map(params![subnet.id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (first, last) in ranges {
        let mut pool = Pool6::new(
            parse_address("pools.start_address", &first)?,
            parse_address("pools.end_address", &last)?,
        );
        pool.options = options::load_set(conn, &pool.scope())?;
        subnet.pools.push(pool);
    }

    let mut stmt = conn.prepare(
        "SELECT prefix, prefix_length, delegated_prefix_length FROM pd_pools
         WHERE subnet_id = ?1 ORDER BY id",
    )?;
    let prefixes = stmt
        .query_map(params![subnet.id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u8>(1)?,
                row.get::<_, u8>(2)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (prefix, prefix_length, delegated_length) in prefixes {
        let addr = parse_address("pd_pools.prefix", &prefix)?;
        let prefix = Ipv6Net::new(addr, prefix_length)
            .map_err(|_| Error::invalid("pd_pools.prefix_length", prefix_length))?;
        let mut pool = PdPool::new(prefix, delegated_length);
        pool.options = options::load_set(conn, &pool.scope())?;
        subnet.pd_pools.push(pool);
    }

    subnet.params.options = options::load_set(conn, &subnet.scope())?;
    Ok(())
}

fn parse_address(column: &'static str, s: &str) -> Result<Ipv6Addr> {
    s.parse().map_err(|_| Error::invalid(column, s))
}
