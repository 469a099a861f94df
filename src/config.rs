//! Configuration: CLI arguments over environment variables over the TOML
//! file over built-in defaults.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::result::Result as StdResult;
use std::{env, fs};

use clap::Parser;
use serde::Deserialize;
use tokio::time::Duration;

use crate::engine::EngineSettings;
use crate::params::{ModeParams, ParamsOverride};
use crate::utils::constants::{
    ENCORE_DEFAULT_GRACE_SECS, ENCORE_DEFAULT_HOUSEKEEPING_DAYS,
    ENCORE_DEFAULT_HOUSEKEEPING_INTERVAL,
};

/// Result type for configuration loading.
pub type Result<T> = StdResult<T, Error>;

#[derive(Debug)]
/// Errors that can occur when loading the configuration.
pub enum Error {
    /// The config file cannot be read.
    Io(std::io::Error),
    /// The config file is not valid TOML.
    Parse(toml::de::Error),
    /// A value is out of range.
    Invalid(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot read the config file: {}", e),
            Self::Parse(e) => write!(f, "cannot parse the config file: {}", e),
            Self::Invalid(detail) => write!(f, "invalid configuration: {}", detail),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Parse(e)
    }
}

#[derive(Debug, Parser)]
#[command(name = "encore", about = "Blind test quiz server", version)]
/// Command-line arguments.
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listening port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Bind address.
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "snake_case")]
/// On-disk shape of the configuration file.
pub struct FileConfig {
    pub port: Option<u16>,
    pub bind: Option<String>,
    /// Consumed by the admin HTTP surface in front of this server.
    pub admin_password: Option<String>,
    pub grace_secs: Option<u64>,
    pub housekeeping_days: Option<i64>,
    pub housekeeping_interval_secs: Option<u64>,
    /// Auto-advance delay between rounds; absent means the master advances.
    pub round_advance_secs: Option<u64>,
    /// JSON library file used to seed the song repositories.
    pub library: Option<PathBuf>,
    /// System-default gameplay parameters.
    pub defaults: Option<ParamsOverride>,
}

#[derive(Debug, Default)]
/// Environment overrides, read once at startup.
pub struct EnvOverrides {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub admin_password: Option<String>,
}

impl EnvOverrides {
    /// Reads the `ENCORE_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            port: env::var("ENCORE_PORT").ok().and_then(|v| v.parse().ok()),
            bind: env::var("ENCORE_BIND").ok(),
            admin_password: env::var("ENCORE_ADMIN_PASSWORD").ok(),
        }
    }
}

#[derive(Debug, Clone)]
/// The resolved server configuration.
pub struct Config {
    pub bind: String,
    pub port: u16,
    /// Passed through to the admin HTTP surface; unused by the core.
    pub admin_password: Option<String>,
    pub grace_secs: u64,
    pub housekeeping_days: i64,
    pub housekeeping_interval_secs: u64,
    pub round_advance_secs: Option<u64>,
    pub library: Option<PathBuf>,
    pub system_params: ModeParams,
}

impl Config {
    /// Loads the configuration for the given CLI arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
            None => FileConfig::default(),
        };

        Self::resolve(cli, file, EnvOverrides::from_env())
    }

    /// Applies the precedence rules: CLI over env over file over defaults.
    pub fn resolve(cli: &Cli, file: FileConfig, env: EnvOverrides) -> Result<Self> {
        let mut system_params = ModeParams::default();

        if let Some(defaults) = &file.defaults {
            defaults.apply(&mut system_params);
        }

        if system_params.song_duration == 0 {
            return Err(Error::Invalid("songDuration must be positive".to_string()));
        }

        if system_params.num_choices < 2 {
            return Err(Error::Invalid(
                "numChoices must offer at least two choices".to_string(),
            ));
        }

        let housekeeping_days = file
            .housekeeping_days
            .unwrap_or(ENCORE_DEFAULT_HOUSEKEEPING_DAYS);

        if housekeeping_days < 1 {
            return Err(Error::Invalid(
                "housekeeping_days must be at least one day".to_string(),
            ));
        }

        Ok(Self {
            bind: cli
                .bind
                .clone()
                .or(env.bind)
                .or(file.bind)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: cli.port.or(env.port).or(file.port).unwrap_or(8080),
            admin_password: env.admin_password.or(file.admin_password),
            grace_secs: file.grace_secs.unwrap_or(ENCORE_DEFAULT_GRACE_SECS),
            housekeeping_days,
            housekeeping_interval_secs: file
                .housekeeping_interval_secs
                .unwrap_or(ENCORE_DEFAULT_HOUSEKEEPING_INTERVAL),
            round_advance_secs: file.round_advance_secs,
            library: file.library,
            system_params,
        })
    }

    /// The socket address to listen on.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// The per-room engine knobs derived from this configuration.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            grace: Duration::from_secs(self.grace_secs),
            round_advance: self.round_advance_secs.map(Duration::from_secs),
            system_params: self.system_params.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_cli() -> Cli {
        Cli {
            config: None,
            port: None,
            bind: None,
        }
    }

    #[test]
    fn defaults_apply_without_any_source() {
        let config =
            Config::resolve(&no_cli(), FileConfig::default(), EnvOverrides::default()).unwrap();

        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.grace_secs, ENCORE_DEFAULT_GRACE_SECS);
        assert_eq!(config.housekeeping_days, ENCORE_DEFAULT_HOUSEKEEPING_DAYS);
        assert_eq!(config.system_params, ModeParams::default());
        assert!(config.round_advance_secs.is_none());
    }

    #[test]
    fn file_values_are_read_and_cli_wins() {
        let file: FileConfig = toml::from_str(
            r#"
            port = 9000
            bind = "127.0.0.1"
            grace_secs = 5
            round_advance_secs = 15

            [defaults]
            songDuration = 20
            penaltyEnabled = true
            penaltyAmount = 1
            "#,
        )
        .unwrap();

        let cli = Cli {
            config: None,
            port: Some(9100),
            bind: None,
        };

        let config = Config::resolve(&cli, file, EnvOverrides::default()).unwrap();

        assert_eq!(config.port, 9100, "CLI beats the file");
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.grace_secs, 5);
        assert_eq!(config.round_advance_secs, Some(15));
        assert_eq!(config.system_params.song_duration, 20);
        assert!(config.system_params.penalty_enabled);
        assert_eq!(config.system_params.penalty_amount, 1);
        // Untouched keys keep their defaults.
        assert_eq!(config.system_params.answer_timer, 5);
    }

    #[test]
    fn env_beats_the_file_but_not_the_cli() {
        let file: FileConfig = toml::from_str("port = 9000").unwrap();
        let env = EnvOverrides {
            port: Some(9500),
            ..Default::default()
        };

        let config = Config::resolve(&no_cli(), file, env).unwrap();
        assert_eq!(config.port, 9500);
    }

    #[test]
    fn nonsense_values_are_rejected() {
        let file: FileConfig = toml::from_str(
            r#"
            [defaults]
            songDuration = 0
            "#,
        )
        .unwrap();
        assert!(Config::resolve(&no_cli(), file, EnvOverrides::default()).is_err());

        let file: FileConfig = toml::from_str("housekeeping_days = 0").unwrap();
        assert!(Config::resolve(&no_cli(), file, EnvOverrides::default()).is_err());
    }

    #[test]
    fn engine_settings_mirror_the_config() {
        let file: FileConfig = toml::from_str(
            r#"
            grace_secs = 7
            round_advance_secs = 12
            "#,
        )
        .unwrap();

        let config = Config::resolve(&no_cli(), file, EnvOverrides::default()).unwrap();
        let settings = config.engine_settings();

        assert_eq!(settings.grace, Duration::from_secs(7));
        assert_eq!(settings.round_advance, Some(Duration::from_secs(12)));
    }
}
