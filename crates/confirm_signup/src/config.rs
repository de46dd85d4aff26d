use clap::{Parser, ValueEnum};

/// Name the function is deployed under. Also used as the `handler` log field.
pub const FUNCTION_NAME: &str = "confirm-user-signup";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line, as CloudWatch expects.
    #[default]
    Json,
    Pretty,
}

/// Function configuration loaded from the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = FUNCTION_NAME, about, version)]
pub struct Config {
    /// DynamoDB table holding user and email records.
    #[arg(long, env = "USERS_TABLE")]
    pub users_table: String,

    /// AWS region. Falls back to the SDK's default provider chain.
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Custom DynamoDB endpoint, e.g. `http://localhost:8000` for DynamoDB Local.
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Lambda passes no arguments, so only the `env` sources apply.
    pub fn from_env() -> Result<Self, clap::Error> {
        Self::try_parse_from([FUNCTION_NAME])
    }

    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match (&self.endpoint_url, &self.region) {
            (Some(url), _) => format!("Local DynamoDB ({url})"),
            (None, Some(region)) => format!("AWS DynamoDB (region: {region})"),
            (None, None) => "AWS DynamoDB (default region)".to_string(),
        }
    }
}
