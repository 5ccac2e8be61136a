//! Serde helpers for snowflake ids.
//!
//! Snapshot documents store ids as decimal strings so they survive
//! consumers that only have double precision numbers. Plain numbers are
//! accepted on the way in as well.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Str(String),
    Num(u64),
}

impl RawId {
    fn into_id<E: DeError>(self) -> Result<u64, E> {
        match self {
            RawId::Num(id) => Ok(id),
            RawId::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid snowflake {s:?}"))),
        }
    }
}

pub fn serialize<S: Serializer>(id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    RawId::deserialize(deserializer)?.into_id()
}

pub mod option {
    use super::RawId;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => serializer.collect_str(id),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        Option::<RawId>::deserialize(deserializer)?
            .map(RawId::into_id)
            .transpose()
    }
}
