use crate::connections::GetConnectionMutable;
use crate::queries;
use crate::structs::LinkRecord;
use crate::{Error, ReadOnlyDb, Result};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use rusqlite::Transaction;
use serde_json::Value;
use std::io::Read;

fn insert_records(tx: &Transaction<'_>, channel_id: u64, records: &[LinkRecord]) -> Result<usize> {
    tx.execute(
        "INSERT INTO channel (id) VALUES (?1) ON CONFLICT(id) DO NOTHING;",
        [channel_id],
    )?;

    let mut stmt = tx.prepare(
        "INSERT INTO link_record (
            channel, url, created_at, author, author_tag, origin_channel,
            origin_thread, forum_parent, message, message_url, server)
        VALUES ( ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11 )
        ON CONFLICT(channel, url) DO NOTHING",
    )?;

    let mut inserted = 0;
    for record in records {
        inserted += stmt.execute((
            channel_id,
            &record.url,
            record.timestamp,
            record.author_id,
            &record.author_tag,
            record.origin_channel_id,
            record.origin_thread_id,
            record.forum_parent_id,
            record.message_id,
            &record.message_url,
            record.guild_id,
        ))?;
    }
    Ok(inserted)
}

pub trait WriteableDb: GetConnectionMutable + ReadOnlyDb {
    /// Merges `records` into the channel's index. Urls the channel already
    /// holds are skipped, so are duplicates within `records` after the first.
    /// Returns how many records were actually written.
    #[inline]
    fn save_all(&mut self, channel_id: u64, records: &[LinkRecord]) -> Result<usize> {
        let tx = self.get_mutable_connection().transaction()?;
        let inserted = insert_records(&tx, channel_id, records)?;
        tx.commit()?;

        debug!(
            "saved {inserted} of {} records to channel {channel_id}",
            records.len()
        );
        Ok(inserted)
    }

    /// Removes the first record matching `url`, returning it.
    #[inline]
    fn delete_by_url(&mut self, url: &str) -> Result<Option<LinkRecord>> {
        let tx = self.get_mutable_connection().transaction()?;
        let found = queries::find_first_by_url(&tx, url)?;
        if let Some((row_id, _)) = &found {
            tx.execute("DELETE FROM link_record WHERE id = (?1)", [row_id])?;
        }
        tx.commit()?;

        Ok(found.map(|(_, record)| {
            debug!("deleted record for {url} in channel {}", record.origin_channel_id);
            record
        }))
    }

    /// Drops every record older than `max_age` relative to `now`.
    #[inline]
    fn retention_sweep(&mut self, now: DateTime<Utc>, max_age: Duration) -> Result<usize> {
        let cutoff = now - max_age;
        let removed = self
            .get_connection()
            .execute("DELETE FROM link_record WHERE created_at < (?1)", [cutoff])?;
        if removed > 0 {
            info!("retention sweep removed {removed} records older than {cutoff}");
        }
        Ok(removed)
    }

    /// Merges a snapshot document (channel id to ordered list of records)
    /// into the index with the same skip-if-present rules as [`save_all`].
    ///
    /// [`save_all`]: WriteableDb::save_all
    fn import_snapshot<R: Read>(&mut self, reader: R) -> Result<usize> {
        let doc = match serde_json::from_reader(reader)? {
            Value::Object(doc) => doc,
            other => {
                return Err(Error::Snapshot(format!(
                    "expected an object at the top level, found {other}"
                )))
            }
        };

        let tx = self.get_mutable_connection().transaction()?;
        let mut inserted = 0;
        for (channel, records) in doc {
            let channel_id = channel
                .parse::<u64>()
                .map_err(|_| Error::Snapshot(format!("channel key {channel:?} is not an id")))?;
            let records: Vec<LinkRecord> = serde_json::from_value(records)?;
            inserted += insert_records(&tx, channel_id, &records)?;
        }
        tx.commit()?;

        info!("imported {inserted} records from snapshot");
        Ok(inserted)
    }
}
