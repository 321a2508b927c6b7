use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::api::EnvironmentMetric;
use crate::channel::ReconnectPolicy;
use crate::session::UserName;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Dashboard API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Durable storage file
    #[arg(long)]
    pub storage: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: Option<bool>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Record a completed Kakao login and mark the user as logged in
    Login {
        /// Display name returned by the provider
        #[arg(long)]
        name: UserName,
        /// Kakao access token
        #[arg(long)]
        token: String,
        /// Token lifetime in seconds
        #[arg(long, default_value_t = 21_599)]
        expires_in: i64,
    },
    /// Revoke the Kakao session and clear persisted identity
    Logout,
    /// Show the current session
    Whoami,
    /// Subscribe to a live channel and log each accepted message
    Watch {
        /// Channel endpoint (defaults to channel.endpoint)
        #[arg(long)]
        endpoint: Option<String>,
        /// Required message field, repeatable (defaults to channel.expected_fields)
        #[arg(long = "field")]
        fields: Vec<String>,
        /// Stop after this many accepted messages
        #[arg(long)]
        count: Option<usize>,
    },
    /// Print an environment sensor series
    Series {
        #[arg(long, value_enum, default_value_t = MetricArg::Growth)]
        metric: MetricArg,
    },
    /// Print one week of machine operation totals in litres
    Operations {
        /// Machine device id (defaults to every machine)
        #[arg(long)]
        device: Option<String>,
        /// Any day of the week to show, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        week: Option<NaiveDate>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricArg {
    Temperature,
    Humidity,
    SoilHumidity,
    Growth,
}

impl From<MetricArg> for EnvironmentMetric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Temperature => Self::Temperature,
            MetricArg::Humidity => Self::Humidity,
            MetricArg::SoilHumidity => Self::SoilHumidity,
            MetricArg::Growth => Self::Growth,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub channel: ChannelConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub kakao_api_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChannelConfig {
    pub endpoint: String,
    pub expected_fields: Vec<String>,
    pub reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
}

impl ChannelConfig {
    #[must_use]
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::fixed(
            self.reconnect_attempts,
            Duration::from_millis(self.reconnect_delay_ms),
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    /// Resolve configuration for already-parsed arguments.
    ///
    /// Priority: CLI flag > `SMARTFARM_` environment > config file > defaults.
    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("api.base_url", "http://localhost:8000")?
            .set_default("api.timeout_secs", 10)?
            .set_default("auth.kakao_api_url", "https://kapi.kakao.com")?
            .set_default("storage.path", ".smartfarm/storage.json")?
            .set_default("channel.endpoint", "ws://localhost:8002/apple")?
            .set_default("channel.expected_fields", vec!["image", "prediction"])?
            .set_default("channel.reconnect_attempts", 0)?
            .set_default("channel.reconnect_delay_ms", 1000)?
            .set_default("logging.json", false)?;

        // An explicit file must exist; the working-directory fallback is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name("smartfarm").required(false)),
        };

        // E.g. SMARTFARM_API__BASE_URL=http://10.0.0.5:8000
        builder = builder.add_source(
            Environment::with_prefix("SMARTFARM")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("channel.expected_fields")
                .try_parsing(true),
        );

        if let Some(url) = &cli.api_url {
            builder = builder.set_override("api.base_url", url.as_str())?;
        }
        if let Some(path) = &cli.storage {
            builder = builder.set_override("storage.path", path.to_string_lossy().as_ref())?;
        }
        if let Some(json) = cli.json_logs {
            builder = builder.set_override("logging.json", json)?;
        }

        builder.build()?.try_deserialize()
    }
}
