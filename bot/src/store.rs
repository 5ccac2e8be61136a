use crate::errors::{Error, Result};

use chrono::{DateTime, Duration, Utc};
use log::warn;
use std::sync::Mutex;
use warden_db::{LinkRecord, ReadOnlyDb, WriteableConn, WriteableDb};

const WRITE_ATTEMPTS: u32 = 3;
const WRITE_BACKOFF: std::time::Duration = std::time::Duration::from_secs(1);

/// The link store shared by the whole bot. Every read and write goes through
/// one connection behind a mutex, so writes from different channels are
/// applied one at a time.
pub struct LinkStore {
    conn: Mutex<WriteableConn>,
    backoff: std::time::Duration,
}

impl LinkStore {
    pub fn new(conn: WriteableConn) -> LinkStore {
        LinkStore {
            conn: Mutex::new(conn),
            backoff: WRITE_BACKOFF,
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> LinkStore {
        LinkStore {
            conn: Mutex::new(WriteableConn::open_in_memory().unwrap()),
            backoff: std::time::Duration::ZERO,
        }
    }

    /// Runs a read against the store.
    pub fn read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&WriteableConn) -> warden_db::Result<T>,
    {
        match self.conn.lock() {
            Ok(conn) => Ok(f(&*conn)?),
            Err(_why) => Err(Error::ConstStr("Failed to acquire lock on link store")),
        }
    }

    /// Runs a write, retrying a fixed number of times with a fixed pause in
    /// between. The lock is released while waiting.
    pub async fn write<F, T>(&self, label: &str, mut f: F) -> Result<T>
    where
        F: FnMut(&mut WriteableConn) -> warden_db::Result<T>,
    {
        let mut attempt = 1;
        loop {
            let result = match self.conn.lock() {
                Ok(mut conn) => f(&mut *conn),
                Err(_why) => return Err(Error::ConstStr("Failed to acquire lock on link store")),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(why) if attempt >= WRITE_ATTEMPTS => {
                    return Err(Error::Store {
                        attempts: attempt,
                        source: why,
                    })
                }
                Err(why) => {
                    warn!("{label} failed on attempt {attempt}/{WRITE_ATTEMPTS}: {why}");
                    attempt += 1;
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
    }

    #[inline]
    pub fn find_by_url(&self, url: &str) -> Result<Option<LinkRecord>> {
        self.read(|db| db.find_by_url(url))
    }

    #[inline]
    pub fn get_channel_records(&self, channel_id: u64) -> Result<Vec<LinkRecord>> {
        self.read(|db| db.get_channel_records(channel_id))
    }

    pub async fn save_all(&self, channel_id: u64, records: &[LinkRecord]) -> Result<usize> {
        self.write("save links", |db| db.save_all(channel_id, records))
            .await
    }

    pub async fn delete_by_url(&self, url: &str) -> Result<Option<LinkRecord>> {
        self.write("delete link", |db| db.delete_by_url(url)).await
    }

    pub async fn retention_sweep(&self, now: DateTime<Utc>, max_age: Duration) -> Result<usize> {
        self.write("retention sweep", |db| db.retention_sweep(now, max_age))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_retries_then_succeeds() {
        let store = LinkStore::in_memory();
        let mut calls = 0;
        let result = store
            .write("flaky", |_| {
                calls += 1;
                if calls < 3 {
                    Err(warden_db::Error::Snapshot("flaky".to_string()))
                } else {
                    Ok(calls)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_write_gives_up_after_budget() {
        let store = LinkStore::in_memory();
        let mut calls = 0;
        let result: Result<()> = store
            .write("broken", |_| {
                calls += 1;
                Err(warden_db::Error::Snapshot("broken".to_string()))
            })
            .await;

        assert!(matches!(result, Err(Error::Store { attempts: 3, .. })));
        assert_eq!(calls, 3);
    }
}
