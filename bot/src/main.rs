#![warn(
    clippy::cognitive_complexity,
    clippy::missing_const_for_fn,
    clippy::option_if_let_else
)]

mod config;
mod errors;
mod handler;
mod platform;
mod store;
mod structs;
mod utils;

use log::LevelFilter;
use log::{error, info, warn};
use serenity::http::Http;
use serenity::model::gateway::GatewayIntents;
use serenity::prelude::*;
use simple_logger::SimpleLogger;
use time::UtcOffset;

use std::panic;
use std::process;
use std::sync::Arc;

use config::Config;
use handler::background::spawn_background_tasks;
use handler::{Handler, Moderator};
use platform::SerenityPlatform;
use store::LinkStore;
use warden_db::WriteableConn;

fn open_store(config: &Config) -> LinkStore {
    let mut conn = match WriteableConn::open(&config.database_path) {
        Ok(conn) => conn,
        Err(why) => {
            error!("Failed to open link store, exiting {why:?}");
            process::exit(1);
        }
    };
    match conn.import_snapshot_file(&config.snapshot_path) {
        Ok(0) => info!("sucessfully loaded and migrated db"),
        Ok(imported) => info!("sucessfully loaded db, imported {imported} links"),
        Err(why) => {
            error!("Failed to import snapshot, exiting {why:?}");
            process::exit(1);
        }
    }
    LinkStore::new(conn)
}

/// Resolves on Ctrl-C, or SIGTERM where there is one.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => (),
                    _ = term.recv() => (),
                }
                return;
            }
            Err(why) => warn!("Can't listen for SIGTERM, only Ctrl-C will stop the bot: {why}"),
        }
    }

    if let Err(why) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {why}");
    }
}

#[tokio::main]
async fn main() {
    let level = config::log_level_from_env();
    if let Err(why) = SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .with_module_level("warden", level)
        .with_module_level("warden_db", level)
        .with_utc_offset(UtcOffset::UTC)
        .init()
    {
        eprintln!("Failed to start logger: {why}");
        process::exit(1);
    }

    panic::set_hook(Box::new(|info| {
        error!("panicked: {info}");
        process::exit(1);
    }));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(why) => {
            error!("{why}, exiting");
            process::exit(1);
        }
    };

    let store = open_store(&config);
    let http = Arc::new(Http::new(&config.token));
    let moderator = Arc::new(Moderator::new(
        &config,
        SerenityPlatform::new(http),
        store,
    ));

    let intents = GatewayIntents::GUILDS
        .union(GatewayIntents::GUILD_MEMBERS)
        .union(GatewayIntents::GUILD_MESSAGES)
        .union(GatewayIntents::MESSAGE_CONTENT);

    let mut client = match Client::builder(&config.token, intents)
        .event_handler(Handler::new(Arc::clone(&moderator)))
        .await
    {
        Ok(client) => client,
        Err(why) => {
            error!("Err creating client {why:?}");
            process::exit(1);
        }
    };

    let background = spawn_background_tasks(moderator);

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutting down");
        shard_manager.lock().await.shutdown_all().await;
    });

    // Shards will automatically attempt to reconnect, and will perform
    // exponential backoff until it reconnects.
    let code = match client.start().await {
        Ok(()) => 0,
        Err(why) => {
            error!("Client error: {why:?}");
            1
        }
    };

    for task in background {
        task.abort();
    }
    process::exit(code);
}
