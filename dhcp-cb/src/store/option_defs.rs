//! Option definitions.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{OptionDataType, OptionDefinition};
use crate::selector::ServerSelector;
use crate::stamp::{Stamp, to_micros};

const OPTION_DEF_COLUMNS: &str = "code, space, name, option_type, is_array, encapsulate, record_types, user_context, server_tag, modification_ts";

/// Insert or overwrite the definition with the same code and space.
///
/// Returns the row id and whether the definition was newly created.
pub(crate) fn upsert(
    conn: &Connection,
    def: &OptionDefinition,
    server_tag: &str,
) -> Result<(i64, bool)> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM option_defs WHERE code = ?1 AND space = ?2",
            params![def.code, def.space],
            |row| row.get(0),
        )
        .optional()?;

    let record_types = serde_json::to_string(
        &def.record_fields
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>(),
    )?;
    let user_context = def.stamp.user_context_json()?;
    let modification_ts = to_micros(&def.stamp.modification_time());
    let duplicate = || format!("option definition {}/{}", def.space, def.code);

    let id = match existing {
        Some(id) => {
            conn.execute(
                "UPDATE option_defs SET name = ?1, option_type = ?2, is_array = ?3, encapsulate = ?4,
                    record_types = ?5, user_context = ?6, server_tag = ?7, modification_ts = ?8
                 WHERE id = ?9",
                params![
                    def.name,
                    def.option_type.as_str(),
                    def.array,
                    def.encapsulated_space,
                    record_types,
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
                "INSERT INTO option_defs (code, space, name, option_type, is_array, encapsulate,
                    record_types, user_context, server_tag, modification_ts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    def.code,
                    def.space,
                    def.name,
                    def.option_type.as_str(),
                    def.array,
                    def.encapsulated_space,
                    record_types,
                    user_context,
                    server_tag,
                    modification_ts,
                ],
            )
            .map_err(|e| Error::on_write(e, duplicate))?;
            conn.last_insert_rowid()
        }
    };

    debug!(name = %def.name, code = def.code, space = %def.space, "Option definition stored");
    Ok((id, existing.is_none()))
}

/// Get an option definition by code and space.
pub(crate) fn get(
    conn: &Connection,
    selector: &ServerSelector,
    code: u16,
    space: &str,
) -> Result<Option<OptionDefinition>> {
    let (all, own) = selector.visible_tags();
    conn.query_row(
        &format!(
            "SELECT {OPTION_DEF_COLUMNS} FROM option_defs
             WHERE code = ?1 AND space = ?2 AND server_tag IN (?3, ?4)"
        ),
        params![code, space, all, own],
        |row| Ok(row_to_option_def(row)),
    )
    .optional()?
    .transpose()
}

/// List option definitions, optionally only those modified after `since`.
pub(crate) fn list(
    conn: &Connection,
    selector: &ServerSelector,
    since: Option<&DateTime<Utc>>,
) -> Result<Vec<OptionDefinition>> {
    let (all, own) = selector.visible_tags();
    let mut stmt = conn.prepare(&format!(
        "SELECT {OPTION_DEF_COLUMNS} FROM option_defs
         WHERE server_tag IN (?1, ?2) AND (?3 IS NULL OR modification_ts > ?3)
         ORDER BY id"
    ))?;

    let defs = stmt
        .query_map(params![all, own, since.map(to_micros)], |row| {
            Ok(row_to_option_def(row))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    Ok(defs)
}

/// Delete an option definition, returning its row id.
pub(crate) fn delete(
    conn: &Connection,
    code: u16,
    space: &str,
    server_tag: &str,
) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "DELETE FROM option_defs WHERE code = ?1 AND space = ?2 AND server_tag = ?3 RETURNING id",
            params![code, space, server_tag],
            |row| row.get(0),
        )
        .optional()?)
}

/// Delete every option definition stored under the tag, returning their row ids.
pub(crate) fn delete_all(conn: &Connection, server_tag: &str) -> Result<Vec<i64>> {
    let mut stmt =
        conn.prepare("DELETE FROM option_defs WHERE server_tag = ?1 RETURNING id")?;
    let mut ids = stmt
        .query_map(params![server_tag], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    ids.sort_unstable();
    Ok(ids)
}

fn row_to_option_def(row: &Row) -> Result<OptionDefinition> {
    let option_type: String = row.get("option_type")?;
    let record_types: String = row.get("record_types")?;
    let server_tag: String = row.get("server_tag")?;

    let record_fields = serde_json::from_str::<Vec<String>>(&record_types)?
        .iter()
        .map(|t| parse_type("option_defs.record_types", t))
        .collect::<Result<Vec<_>>>()?;

    Ok(OptionDefinition {
        name: row.get("name")?,
        code: row.get("code")?,
        space: row.get("space")?,
        option_type: parse_type("option_defs.option_type", &option_type)?,
        array: row.get("is_array")?,
        encapsulated_space: row.get("encapsulate")?,
        record_fields,
        stamp: Stamp::from_row(
            row.get("modification_ts")?,
            &server_tag,
            row.get("user_context")?,
        )?,
    })
}

fn parse_type(column: &'static str, s: &str) -> Result<OptionDataType> {
    OptionDataType::parse(s).ok_or_else(|| Error::invalid(column, s))
}
