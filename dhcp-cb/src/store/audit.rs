//! Append-only audit table.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use tracing::info;

use crate::error::Result;
use crate::model::{AuditEntry, ModificationType};
use crate::selector::ServerSelector;
use crate::stamp::{from_micros, to_micros};

/// Append one entry to the trail.
pub(crate) fn append(
    conn: &Connection,
    object_type: &str,
    object_id: u64,
    modification_type: ModificationType,
    server_tag: &str,
    log_message: &str,
    time: DateTime<Utc>,
) -> Result<AuditEntry> {
    conn.execute(
        "INSERT INTO audit (object_type, object_id, modification_type, log_message, server_tag, modification_ts)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            object_type,
            object_id as i64,
            i32::from(modification_type),
            log_message,
            server_tag,
            to_micros(&time),
        ],
    )?;

    Ok(AuditEntry {
        revision: conn.last_insert_rowid() as u64,
        object_type: object_type.to_string(),
        object_id,
        modification_type,
        modification_time: time,
        log_message: log_message.to_string(),
    })
}

/// Entries recorded strictly after `since`, oldest first.
pub(crate) fn recent(
    conn: &Connection,
    selector: &ServerSelector,
    since: &DateTime<Utc>,
) -> Result<Vec<AuditEntry>> {
    let (all, own) = selector.visible_tags();
    let mut stmt = conn.prepare(
        "SELECT id, object_type, object_id, modification_type, modification_ts, log_message
         FROM audit
         WHERE modification_ts > ?1 AND server_tag IN (?2, ?3)
         ORDER BY modification_ts, id",
    )?;

    let entries = stmt
        .query_map(params![to_micros(since), all, own], |row| Ok(row_to_entry(row)))?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    Ok(entries)
}

/// Log a committed entry locally.
pub(crate) fn emit(entry: &AuditEntry) {
    info!(
        target: "audit",
        component = "dhcp6",
        object_type = %entry.object_type,
        object_id = entry.object_id,
        modification = entry.modification_type.as_str(),
        "{}",
        entry.log_message
    );
}

fn row_to_entry(row: &Row) -> Result<AuditEntry> {
    let object_id: i64 = row.get(2)?;
    let modification_type: i32 = row.get(3)?;
    let modification_ts: i64 = row.get(4)?;

    Ok(AuditEntry {
        revision: row.get::<_, i64>(0)? as u64,
        object_type: row.get(1)?,
        object_id: object_id as u64,
        modification_type: ModificationType::try_from(modification_type)?,
        modification_time: from_micros(modification_ts)?,
        log_message: row.get(5)?,
    })
}
