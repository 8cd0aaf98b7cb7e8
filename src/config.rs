//! Configuration for Keywarden
//!
//! CLI arguments and environment variable handling using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::masterkey::{CredentialsReader, KdfParams, MasterKeyConfig, CREDENTIALS_ENV};

/// Keywarden - master key custody
///
/// Registers, unlocks and reports on the master key that protects every
/// other secret at rest.
#[derive(Parser, Debug, Clone)]
#[command(name = "keywarden")]
#[command(about = "Master key lifecycle management")]
pub struct Args {
    /// Directory holding the config database
    #[arg(long, env = "KEYWARDEN_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// One-shot credentials directory (systemd LoadCredential=)
    /// The `password` file inside it is consumed and deleted at startup
    #[arg(long, env = CREDENTIALS_ENV)]
    pub credentials_directory: Option<PathBuf>,

    /// Enable development mode (auto-registers a master key with a
    /// well-known passphrase)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print the master key state after startup
    Status,
    /// Register a new master key; passphrase read from stdin
    Register,
    /// Check a passphrase by unlocking the master key; read from stdin
    Unlock,
    /// Run dev-mode registration and the credential bootstrap
    Bootstrap,
}

impl Args {
    /// Subcommand to run, `status` when none was given.
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Status)
    }

    /// Library-side master key settings.
    pub fn master_key_config(&self) -> MasterKeyConfig {
        MasterKeyConfig {
            dev_mode: self.dev_mode,
            kdf: KdfParams::default(),
        }
    }

    pub fn credentials(&self) -> CredentialsReader {
        CredentialsReader::new(self.credentials_directory.clone())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.data_dir.as_os_str().is_empty() {
            return Err("KEYWARDEN_DATA_DIR must not be empty".to_string());
        }

        if let Some(dir) = &self.credentials_directory {
            if dir.as_os_str().is_empty() {
                return Err("CREDENTIALS_DIRECTORY must not be empty when set".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["keywarden"]).unwrap();

        assert_eq!(args.data_dir, PathBuf::from("./data"));
        assert_eq!(args.command(), Command::Status);
        assert!(args.validate().is_ok());
        assert_eq!(args.master_key_config().kdf, KdfParams::default());
    }

    #[test]
    fn test_subcommand_and_flags() {
        let args = Args::try_parse_from([
            "keywarden",
            "--data-dir",
            "/var/lib/keywarden",
            "--credentials-directory",
            "/run/credentials/keywarden.service",
            "--dev-mode",
            "unlock",
        ])
        .unwrap();

        assert_eq!(args.command(), Command::Unlock);
        assert!(args.master_key_config().dev_mode);
        assert!(args.credentials().is_configured());
    }

    #[test]
    fn test_credentials_env_binding() {
        let cmd = <Args as clap::CommandFactory>::command();
        let arg = cmd
            .get_arguments()
            .find(|a| a.get_id() == "credentials_directory")
            .unwrap();

        assert_eq!(arg.get_env(), Some(std::ffi::OsStr::new(CREDENTIALS_ENV)));
    }

    #[test]
    fn test_empty_paths_rejected() {
        let mut args = Args::try_parse_from(["keywarden"]).unwrap();
        args.data_dir = PathBuf::new();
        assert!(args.validate().is_err());

        let mut args = Args::try_parse_from(["keywarden"]).unwrap();
        args.credentials_directory = Some(PathBuf::new());
        assert!(args.validate().is_err());
    }
}
