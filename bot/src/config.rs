//! Startup configuration, read from the environment.

use crate::errors::{Error, Result};
use crate::handler::router::{RoleThreadMapping, TIER_COUNT};

use chrono::Duration;
use log::LevelFilter;
use serenity::model::id::{ChannelId, RoleId};
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_COOLDOWN_MS: i64 = 5_000;
const DEFAULT_AUTO_DELETE_SECONDS: i64 = 30;
const DEFAULT_COMMIT_DELAY_MINUTES: i64 = 5;
const DEFAULT_THRESHOLD_DUPE_AGE_MINUTES: i64 = 60;
const DEFAULT_RETENTION_DAYS: i64 = 90;
const DEFAULT_DATABASE_PATH: &str = "./links.db3";
const DEFAULT_SNAPSHOT_PATH: &str = "./links.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub tiers: RoleThreadMapping,
    pub ignored_roles: HashSet<RoleId>,
    pub rate_limit_cooldown: Duration,
    /// None when auto deletion of correction notices is disabled
    pub auto_delete_delay: Option<Duration>,
    pub commit_delay: Duration,
    pub threshold_dupe_age_minutes: i64,
    pub blocklist: Option<String>,
    /// None when records are kept forever
    pub retention: Option<Duration>,
    pub database_path: PathBuf,
    pub snapshot_path: PathBuf,
}

/// Log level for the bot's own crates, `LOG_LEVEL` or debug. Read apart from
/// the rest of the config so logging is up before config errors are reported.
pub fn log_level_from_env() -> LevelFilter {
    env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| LevelFilter::from_str(level.trim()).ok())
        .unwrap_or(LevelFilter::Debug)
}

fn required<F>(get: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("{key} must be set")))
}

fn snowflake<F>(get: &F, key: &str) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match required(get, key)?.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(Error::Config(format!("{key} must be a non-zero snowflake id"))),
    }
}

fn number_or<F>(get: &F, key: &str, default: i64) -> Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_string()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => match v.parse::<i64>() {
            Ok(n) if n >= 0 => Ok(n),
            _ => Err(Error::Config(format!(
                "{key} must be a non-negative whole number, got {v:?}"
            ))),
        },
    }
}

fn parse_ignored_roles(raw: Option<String>) -> Result<HashSet<RoleId>> {
    let mut roles = HashSet::new();
    for part in raw.iter().flat_map(|r| r.split(',')) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id = part
            .parse::<u64>()
            .map_err(|_| Error::Config(format!("IGNORED_ROLE_IDS entry {part:?} is not an id")))?;
        roles.insert(RoleId(id));
    }
    Ok(roles)
}

impl Config {
    pub fn from_env() -> Result<Config> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = required(&get, "DISCORD_TOKEN")?;

        let mut pairs = [(RoleId(0), ChannelId(0)); TIER_COUNT];
        for (tier, pair) in pairs.iter_mut().enumerate() {
            *pair = (
                RoleId(snowflake(&get, &format!("TIER_{tier}_ROLE_ID"))?),
                ChannelId(snowflake(&get, &format!("TIER_{tier}_THREAD_ID"))?),
            );
        }
        let tiers = RoleThreadMapping::new(pairs)?;

        let auto_delete = number_or(&get, "AUTO_DELETE_DELAY_SECONDS", DEFAULT_AUTO_DELETE_SECONDS)?;
        let retention_days = number_or(&get, "LINK_RETENTION_DAYS", DEFAULT_RETENTION_DAYS)?;

        Ok(Config {
            token,
            tiers,
            ignored_roles: parse_ignored_roles(get("IGNORED_ROLE_IDS"))?,
            rate_limit_cooldown: Duration::milliseconds(number_or(
                &get,
                "RATE_LIMIT_COOLDOWN_MS",
                DEFAULT_COOLDOWN_MS,
            )?),
            auto_delete_delay: (auto_delete > 0).then(|| Duration::seconds(auto_delete)),
            commit_delay: Duration::minutes(number_or(
                &get,
                "COMMIT_DELAY_MINUTES",
                DEFAULT_COMMIT_DELAY_MINUTES,
            )?),
            threshold_dupe_age_minutes: number_or(
                &get,
                "THRESHOLD_DUPE_AGE_MINUTES",
                DEFAULT_THRESHOLD_DUPE_AGE_MINUTES,
            )?,
            blocklist: get("LINK_BLOCKLIST")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            retention: (retention_days > 0).then(|| Duration::days(retention_days)),
            database_path: get("DATABASE_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH), PathBuf::from),
            snapshot_path: get("SNAPSHOT_IMPORT_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH), PathBuf::from),
        })
    }
}
