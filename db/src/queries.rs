use crate::structs::LinkRecord;
use rusqlite::{Connection, OptionalExtension, Result, Row};

pub(crate) const RECORD_COLUMNS: &str = "L.url, L.created_at, L.author, L.author_tag,
    L.origin_channel, L.origin_thread, L.forum_parent,
    L.message, L.message_url, L.server";

#[inline(always)]
pub fn get_version(conn: &Connection) -> Result<u32> {
    conn.query_row("SELECT user_version FROM pragma_user_version;", [], |row| {
        row.get(0)
    })
}

#[inline(always)]
pub fn set_version(conn: &Connection, version: u32) -> Result<()> {
    conn.pragma_update(None, "user_version", version)
}

/// Maps a row selected with [`RECORD_COLUMNS`] starting at `offset`.
#[inline(always)]
pub fn record_from_row(row: &Row<'_>, offset: usize) -> Result<LinkRecord> {
    Ok(LinkRecord {
        url: row.get(offset)?,
        timestamp: row.get(offset + 1)?,
        author_id: row.get(offset + 2)?,
        author_tag: row.get(offset + 3)?,
        origin_channel_id: row.get(offset + 4)?,
        origin_thread_id: row.get(offset + 5)?,
        forum_parent_id: row.get(offset + 6)?,
        message_id: row.get(offset + 7)?,
        message_url: row.get(offset + 8)?,
        guild_id: row.get(offset + 9)?,
    })
}

/// Finds the first record holding `url`, walking channels in the order they
/// were first seen and records within a channel in insertion order. Returns
/// the row id alongside the record so callers can delete exactly that row.
#[inline(always)]
pub fn find_first_by_url(conn: &Connection, url: &str) -> Result<Option<(i64, LinkRecord)>> {
    conn.query_row(
        &format!(
            "SELECT L.id, {RECORD_COLUMNS}
            FROM link_record AS L
            JOIN channel AS C ON L.channel = C.id
            WHERE L.url = (?1)
            ORDER BY C.seq, L.id
            LIMIT 1"
        ),
        [url],
        |row| Ok((row.get(0)?, record_from_row(row, 1)?)),
    )
    .optional()
}
