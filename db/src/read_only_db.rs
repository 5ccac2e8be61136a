use crate::connections::GetConnectionImmutable;
use crate::queries::{self, RECORD_COLUMNS};
use crate::structs::LinkRecord;
use crate::Result;

use serde_json::{Map, Value};

pub trait ReadOnlyDb: GetConnectionImmutable {
    /// Global search for `url`, first match by channel order.
    #[inline]
    fn find_by_url(&self, url: &str) -> Result<Option<LinkRecord>> {
        Ok(queries::find_first_by_url(self.get_connection(), url)?.map(|(_, record)| record))
    }

    #[inline]
    fn list_channel_ids(&self) -> Result<Vec<u64>> {
        let mut stmt = self
            .get_connection()
            .prepare("SELECT id FROM channel ORDER BY seq")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut channels = Vec::new();
        for row in rows {
            channels.push(row?)
        }
        Ok(channels)
    }

    /// Records for a single channel in the order they were stored.
    #[inline]
    fn get_channel_records(&self, channel_id: u64) -> Result<Vec<LinkRecord>> {
        let mut stmt = self.get_connection().prepare(&format!(
            "SELECT {RECORD_COLUMNS}
            FROM link_record AS L
            WHERE L.channel = (?1)
            ORDER BY L.id"
        ))?;
        let rows = stmt.query_map([channel_id], |row| queries::record_from_row(row, 0))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?)
        }
        Ok(records)
    }

    /// Renders the whole index as a single document mapping channel id to
    /// its ordered list of records, channels in first-seen order.
    fn export_snapshot(&self) -> Result<Value> {
        let mut doc = Map::new();
        for channel_id in self.list_channel_ids()? {
            let records = self.get_channel_records(channel_id)?;
            doc.insert(channel_id.to_string(), serde_json::to_value(records)?);
        }
        Ok(Value::Object(doc))
    }
}
