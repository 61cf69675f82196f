//! Murmur notification decryptor binary.
//!
//! # Usage
//!
//! ```bash
//! # Store a session pickle received out of band
//! murmur-notify --db sessions.redb import <session-id> <pickle>
//!
//! # Create a session from an exported session key
//! murmur-notify --db sessions.redb --secrets-dir secrets import-key <session-key>
//!
//! # Decrypt a push payload and print its body
//! murmur-notify --db sessions.redb --secrets-dir secrets decrypt <session-id> <ciphertext>
//! ```

use std::{
    io::Write,
    path::PathBuf,
    process::ExitCode,
    time::{SystemTime, UNIX_EPOCH},
};

use clap::{Parser, Subcommand};
use murmur_crypto::SessionConfig;
use murmur_notify::{
    DEFAULT_PICKLE_KEY_ACCOUNT, FileSecretStore, NotificationDecryptor, NotifyConfig, PickleStore,
    RedbPickleStore,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Murmur notification decryptor
#[derive(Parser, Debug)]
#[command(name = "murmur-notify")]
#[command(about = "Decrypt group-session push notifications")]
#[command(version)]
struct Args {
    /// Redb database holding session pickles
    #[arg(long, default_value = "murmur.redb")]
    db: PathBuf,

    /// Directory holding one file per secret account
    #[arg(long, default_value = "secrets")]
    secrets_dir: PathBuf,

    /// Secret account holding the pickle key
    #[arg(long, default_value = DEFAULT_PICKLE_KEY_ACCOUNT)]
    account: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decrypt a ciphertext and print the message body
    Decrypt {
        /// Session the message belongs to
        session_id: String,
        /// Base64 ciphertext
        ciphertext: String,
        /// Print the full decrypted payload instead of the body
        #[arg(long)]
        raw: bool,
        /// Leave the stored pickle unchanged
        #[arg(long)]
        no_persist: bool,
    },
    /// Store or replace a session pickle
    Import {
        /// Session ID to store the pickle under
        session_id: String,
        /// Encrypted pickle text
        pickle: String,
    },
    /// Create a session from an exported session key and print its ID
    ImportKey {
        /// Base64 exported session key
        session_key: String,
        /// Delete message keys once used instead of caching them
        #[arg(long)]
        purge_after_use: bool,
    },
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let pickles = RedbPickleStore::open(&args.db)?;

    match args.command {
        Command::Import { session_id, pickle } => {
            pickles.store_pickle(&session_id, &pickle)?;
            tracing::info!(session_id = %session_id, "pickle stored");
            Ok(ExitCode::SUCCESS)
        },
        Command::ImportKey { session_key, purge_after_use } => {
            let config = NotifyConfig {
                db_path: args.db,
                secrets_dir: args.secrets_dir,
                pickle_key_account: args.account,
                ..NotifyConfig::default()
            };
            let secrets = FileSecretStore::new(&config.secrets_dir);
            let decryptor = NotificationDecryptor::new(secrets, pickles, &config);

            let session_config = if purge_after_use {
                SessionConfig::purge_after_use()
            } else {
                SessionConfig::default()
            };
            let created_at = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |elapsed| elapsed.as_secs());

            let session_id =
                decryptor.import_session_key(&session_key, session_config, created_at)?;
            writeln!(std::io::stdout().lock(), "{session_id}")?;
            Ok(ExitCode::SUCCESS)
        },
        Command::Decrypt { session_id, ciphertext, raw, no_persist } => {
            let config = NotifyConfig {
                db_path: args.db,
                secrets_dir: args.secrets_dir,
                pickle_key_account: args.account,
                persist_updated_pickle: !no_persist,
            };
            let secrets = FileSecretStore::new(&config.secrets_dir);
            let decryptor = NotificationDecryptor::new(secrets, pickles, &config);

            let output = if raw {
                match decryptor.decrypt(&session_id, &ciphertext) {
                    Ok(notification) => Some(notification.plaintext),
                    Err(e) => {
                        tracing::warn!(
                            session_id = %session_id,
                            kind = e.label(),
                            "decryption failed"
                        );
                        None
                    },
                }
            } else {
                decryptor.decrypt_body(&session_id, &ciphertext)
            };

            let Some(output) = output else {
                return Ok(ExitCode::FAILURE);
            };
            writeln!(std::io::stdout().lock(), "{output}")?;
            Ok(ExitCode::SUCCESS)
        },
    }
}
