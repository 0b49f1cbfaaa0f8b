//! Global parameters.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{ParameterValue, StampedValue};
use crate::selector::ServerSelector;
use crate::stamp::{Stamp, to_micros};

const PARAMETER_COLUMNS: &str =
    "name, value, parameter_type, user_context, server_tag, modification_ts";

/// Insert or overwrite a parameter by name.
///
/// Returns the row id and whether the parameter was newly created.
pub(crate) fn upsert(
    conn: &Connection,
    value: &StampedValue,
    server_tag: &str,
) -> Result<(i64, bool)> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM global_parameters WHERE name = ?1",
            params![value.name],
            |row| row.get(0),
        )
        .optional()?;

    let user_context = value.stamp.user_context_json()?;
    let modification_ts = to_micros(&value.stamp.modification_time());
    let duplicate = || format!("global parameter '{}'", value.name);

    let id = match existing {
        Some(id) => {
            conn.execute(
                "UPDATE global_parameters SET value = ?1, parameter_type = ?2, user_context = ?3,
                    server_tag = ?4, modification_ts = ?5
                 WHERE id = ?6",
                params![
                    value.value.to_text(),
                    value.value.type_code(),
                    user_context,
                    server_tag,
                    modification_ts,
                    id,
                ],
            )
            .map_err(|e| Error::on_write(e, duplicate))?;
            id
        }
        None => {
            conn.execute(
                "INSERT INTO global_parameters (name, value, parameter_type, user_context, server_tag, modification_ts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    value.name,
                    value.value.to_text(),
                    value.value.type_code(),
                    user_context,
                    server_tag,
                    modification_ts,
                ],
            )
            .map_err(|e| Error::on_write(e, duplicate))?;
            conn.last_insert_rowid()
        }
    };

    debug!(name = %value.name, value = %value.get_value(), "Global parameter stored");
    Ok((id, existing.is_none()))
}

/// Get a parameter by name.
pub(crate) fn get(
    conn: &Connection,
    selector: &ServerSelector,
    name: &str,
) -> Result<Option<StampedValue>> {
    let (all, own) = selector.visible_tags();
    conn.query_row(
        &format!(
            "SELECT {PARAMETER_COLUMNS} FROM global_parameters
             WHERE name = ?1 AND server_tag IN (?2, ?3)"
        ),
        params![name, all, own],
        |row| Ok(row_to_parameter(row)),
    )
    .optional()?
    .transpose()
}

/// List parameters, optionally only those modified after `since`.
pub(crate) fn list(
    conn: &Connection,
    selector: &ServerSelector,
    since: Option<&DateTime<Utc>>,
) -> Result<Vec<StampedValue>> {
    let (all, own) = selector.visible_tags();
    let mut stmt = conn.prepare(&format!(
        "SELECT {PARAMETER_COLUMNS} FROM global_parameters
         WHERE server_tag IN (?1, ?2) AND (?3 IS NULL OR modification_ts > ?3)
         ORDER BY id"
    ))?;

    let values = stmt
        .query_map(params![all, own, since.map(to_micros)], |row| {
            Ok(row_to_parameter(row))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    Ok(values)
}

/// Delete a parameter by name, returning its row id.
pub(crate) fn delete(conn: &Connection, name: &str, server_tag: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "DELETE FROM global_parameters WHERE name = ?1 AND server_tag = ?2 RETURNING id",
            params![name, server_tag],
            |row| row.get(0),
        )
        .optional()?)
}

/// Delete every parameter stored under the tag, returning their row ids.
pub(crate) fn delete_all(conn: &Connection, server_tag: &str) -> Result<Vec<i64>> {
    let mut stmt =
        conn.prepare("DELETE FROM global_parameters WHERE server_tag = ?1 RETURNING id")?;
    let mut ids = stmt
        .query_map(params![server_tag], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    ids.sort_unstable();
    Ok(ids)
}

fn row_to_parameter(row: &Row) -> Result<StampedValue> {
    let value: String = row.get("value")?;
    let parameter_type: i32 = row.get("parameter_type")?;
    let server_tag: String = row.get("server_tag")?;

    Ok(StampedValue {
        name: row.get("name")?,
        value: ParameterValue::from_text(parameter_type, &value)?,
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
    fn test_parameter_overwrite_changes_type() {
        let storage = Storage::in_memory().unwrap();

        let fetched = storage
            .read(|conn| {
                let (id, created) = upsert(conn, &StampedValue::string("name", "value"), "all")?;
                assert!(created);
                let (same_id, created) = upsert(conn, &StampedValue::integer("name", 65), "all")?;
                assert!(!created);
                assert_eq!(id, same_id);
                get(conn, &ServerSelector::AllServers, "name")
            })
            .unwrap()
            .unwrap();

        assert_eq!(fetched.as_integer().unwrap(), 65);
    }

    #[test]
    fn test_parameter_delete_needs_exact_tag() {
        let storage = Storage::in_memory().unwrap();

        storage
            .read(|conn| {
                upsert(conn, &StampedValue::boolean("enabled", true), "all")?;
                assert!(delete(conn, "enabled", "server1")?.is_none());
                assert!(get(conn, &ServerSelector::one("server1"), "enabled")?.is_some());
                assert!(delete(conn, "enabled", "all")?.is_some());
                assert!(list(conn, &ServerSelector::AllServers, None)?.is_empty());
                Ok(())
            })
            .unwrap();
    }
}
