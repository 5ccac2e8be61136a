mod errors;
mod migrations;
mod queries;
mod read_only_db;
pub mod structs;
mod writeable_db;

pub use errors::{Error, Result};
pub use read_only_db::ReadOnlyDb;
pub use structs::LinkRecord;
pub use writeable_db::WriteableDb;

use log::info;
use rusqlite::Connection;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

pub(crate) mod connections {
    use rusqlite::Connection;

    pub trait GetConnectionImmutable {
        fn get_connection(&self) -> &Connection;
    }

    pub trait GetConnectionMutable {
        fn get_mutable_connection(&mut self) -> &mut Connection;
    }
}

/// A migrated connection to the link store. All reads and writes go through
/// a single one of these, callers are expected to serialize access to it.
pub struct WriteableConn {
    conn: Connection,
}

impl connections::GetConnectionImmutable for WriteableConn {
    #[inline]
    fn get_connection(&self) -> &Connection {
        &self.conn
    }
}

impl connections::GetConnectionMutable for WriteableConn {
    #[inline]
    fn get_mutable_connection(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl ReadOnlyDb for WriteableConn {}

impl WriteableDb for WriteableConn {}

impl WriteableConn {
    fn migrated(mut conn: Connection) -> Result<WriteableConn> {
        migrations::migrate(&mut conn)?;
        Ok(WriteableConn { conn })
    }

    /// Opens (creating if needed) the database at `path` and migrates it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<WriteableConn> {
        info!("opening link store at {}", path.as_ref().display());
        WriteableConn::migrated(Connection::open(path)?)
    }

    #[inline]
    pub fn open_in_memory() -> Result<WriteableConn> {
        WriteableConn::migrated(Connection::open_in_memory()?)
    }

    /// Imports the snapshot document at `path` if there is one. A missing
    /// file is the normal first run and imports nothing.
    pub fn import_snapshot_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        match File::open(path.as_ref()) {
            Ok(file) => self.import_snapshot(std::io::BufReader::new(file)),
            Err(why) if why.kind() == ErrorKind::NotFound => {
                info!("no snapshot at {}, nothing to import", path.as_ref().display());
                Ok(0)
            }
            Err(why) => Err(why.into()),
        }
    }
}
