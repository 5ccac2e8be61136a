//! A utils module.
//!
//! Conversions between serenity's types and the ones the rest of the bot
//! works with.

use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use log::trace;
use serenity::model::Timestamp;

/// serenity wraps timestamps in its own type, this gets a plain chrono
/// datetime back out by way of the rfc3339 form.
#[inline(always)]
pub fn convert_serenity_datetime(serenity_dt: Timestamp) -> Result<DateTime<Utc>> {
    let datetime_str = &serenity_dt.to_rfc3339();
    trace!("rfc3339 datetime str is {datetime_str}");

    DateTime::parse_from_rfc3339(datetime_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| Error::Internal(format!("Datetime couldn't be converted with err {err:?}")))
}
