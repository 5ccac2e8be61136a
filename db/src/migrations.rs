use super::queries;
use crate::Result;

use log::{info, trace};
use rusqlite::Connection;

macro_rules! migration {
    ( $n:literal, $( $x:literal ),* ) => {
        paste::item! {
            fn [< migration_$n >] (conn: &Connection) -> Result<()> {
                trace!("running migration {}", $n);

                $(
                    conn.execute($x, [])?;
                )*
                queries::set_version(conn, $n)?;
                trace!("finished migration {}", $n);
                Ok(())
            }
        }
    };
}

migration![
    1,
    // seq records the order in which channels first received a link, global
    // lookups walk channels in this order
    "CREATE TABLE channel (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id INTEGER NOT NULL UNIQUE
    );",
    "CREATE TABLE link_record (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        channel INTEGER NOT NULL,
        url TEXT NOT NULL,
        created_at NUMERIC NOT NULL,
        author INTEGER NOT NULL,
        author_tag TEXT NOT NULL,
        origin_channel INTEGER NOT NULL,
        origin_thread INTEGER DEFAULT NULL,
        forum_parent INTEGER DEFAULT NULL,
        message INTEGER NOT NULL,
        message_url TEXT NOT NULL,
        server INTEGER NOT NULL,
        UNIQUE(channel, url),
        FOREIGN KEY(channel) REFERENCES channel(id) ON DELETE CASCADE
    );",
    "CREATE INDEX idx_link_record_url ON link_record (url);",
    "CREATE INDEX idx_link_record_created_at ON link_record (created_at);"
];

pub fn migrate(conn: &mut Connection) -> Result<()> {
    // be sure to increment this everytime a new migration is added
    const FINAL_VER: u32 = 1;

    let ver = queries::get_version(conn)?;
    info!("database version is currently: {ver} with target ver {FINAL_VER}");
    if ver == FINAL_VER {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        return Ok(());
    }

    trace!("disabling foreign keys pre-migration");
    conn.pragma_update(None, "foreign_keys", "OFF")?;

    let tx = conn.transaction()?;

    trace!("starting migration transaction");

    if ver < 1 {
        migration_1(&tx)?;
    }

    trace!("commiting migration transaction");
    tx.commit()?;
    trace!("successfully commited migration transaction");

    conn.pragma_update(None, "foreign_keys", "ON")?;
    trace!("enabling foreign keys post-migration");
    info!("migration successful");
    Ok(())
}
