//! Keywarden - master key custody

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroize;

use keywarden::{
    config::{Args, Command},
    masterkey::{MasterKeyManager, MasterKeyService},
    secret::SecretText,
    store::{ConfigStorage, SqliteStorage},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("keywarden={},info", args.log_level).into());
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!(
        data_dir = %args.data_dir.display(),
        mode = if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" },
        command = ?args.command(),
        "Keywarden starting"
    );

    let storage: Arc<dyn ConfigStorage> = Arc::new(
        SqliteStorage::open(&args.data_dir).context("failed to open the config storage")?,
    );

    match args.command() {
        Command::Status => {
            let manager =
                MasterKeyManager::new(storage, args.credentials(), args.master_key_config());

            println!("{}", manager.state().await?);
        }
        Command::Bootstrap => {
            let manager =
                MasterKeyManager::init(storage, args.credentials(), args.master_key_config())
                    .await
                    .context("master key startup failed")?;

            let state = manager.state().await?;
            info!(state = %state, "Master key state");
            println!("{state}");
        }
        Command::Register => {
            let manager =
                MasterKeyManager::new(storage, args.credentials(), args.master_key_config());
            let passphrase = read_passphrase().await?;

            manager
                .generate_master_key(&passphrase)
                .await
                .context("failed to register the master key")?;
            println!("{}", manager.state().await?);
        }
        Command::Unlock => {
            let manager =
                MasterKeyManager::new(storage, args.credentials(), args.master_key_config());
            let passphrase = read_passphrase().await?;

            manager
                .load_master_key_from_password(&passphrase)
                .await
                .context("failed to unlock the master key")?;
            println!("{}", manager.state().await?);
        }
    }

    Ok(())
}

/// Read the passphrase from the first line of stdin.
async fn read_passphrase() -> anyhow::Result<SecretText> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read the passphrase from stdin")?;

    let passphrase = SecretText::new(line.trim_end_matches(['\r', '\n']));
    line.zeroize();

    if passphrase.is_empty() {
        anyhow::bail!("an empty passphrase was provided on stdin");
    }
    Ok(passphrase)
}
