use std::{
    num::NonZeroU64,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Args;
use reqwest::Url;
use serde::Deserialize;

use crate::{
    record::{DEFAULT_CODES, DEFAULT_PREFIXES},
    runner::{OnError, DEFAULT_REPORT_EVERY},
    transport::{StatusPolicy, DEFAULT_URL},
};

pub const DEFAULT_TEMPLATE: &str = "Generator_json.txt";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid url `{url}`: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{0}")]
    Invalid(String),
}

/// On-disk TOML configuration. Every key is optional.
///
/// The iteration count is per run and only comes from the command line, so
/// leaving it out always means an unbounded run.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub url: Option<String>,
    pub template: Option<PathBuf>,
    pub report_every: Option<u64>,
    pub status_policy: Option<StatusPolicy>,
    pub on_error: Option<OnError>,
    pub timeout_ms: Option<u64>,
    pub seed: Option<u64>,
    pub prefixes: Option<Vec<String>>,
    pub codes: Option<Vec<String>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Args, Clone, Debug, Default)]
pub struct GenArgs {
    /// Number of records to send. Runs until interrupted when omitted.
    pub iterations: Option<u64>,

    /// TOML file with defaults for every option below
    #[arg(long, env = "CDR_LOADGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Endpoint receiving the CDR posts
    #[arg(long)]
    pub url: Option<String>,

    /// Payload template with %(name)s placeholders
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Print the running rate after this many requests
    #[arg(long)]
    pub report_every: Option<u64>,

    #[arg(long, value_enum)]
    pub status_policy: Option<StatusPolicy>,

    #[arg(long, value_enum)]
    pub on_error: Option<OnError>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Seed for the record generator
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Settings after merging command line over config file over defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Effective {
    pub url: Url,
    pub template: PathBuf,
    pub iterations: Option<u64>,
    pub report_every: NonZeroU64,
    pub status_policy: StatusPolicy,
    pub on_error: OnError,
    pub timeout: Option<Duration>,
    pub seed: Option<u64>,
    pub prefixes: Vec<String>,
    pub codes: Vec<String>,
}

impl Effective {
    pub fn new(args: &GenArgs) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    pub fn merge(args: &GenArgs, file: FileConfig) -> Result<Self, ConfigError> {
        let url = args
            .url
            .clone()
            .or(file.url)
            .unwrap_or_else(|| DEFAULT_URL.to_owned());
        let url = Url::parse(&url).map_err(|source| ConfigError::Url { url, source })?;

        let report_every = match args.report_every.or(file.report_every) {
            Some(n) => NonZeroU64::new(n)
                .ok_or_else(|| ConfigError::Invalid("report-every must be greater than 0".into()))?,
            None => DEFAULT_REPORT_EVERY,
        };

        let prefixes = file
            .prefixes
            .unwrap_or_else(|| DEFAULT_PREFIXES.iter().map(|s| s.to_string()).collect());
        if prefixes.is_empty() {
            return Err(ConfigError::Invalid("prefixes must not be empty".into()));
        }
        let codes = file
            .codes
            .unwrap_or_else(|| DEFAULT_CODES.iter().map(|s| s.to_string()).collect());
        if codes.is_empty() {
            return Err(ConfigError::Invalid("codes must not be empty".into()));
        }

        Ok(Self {
            url,
            template: args
                .template
                .clone()
                .or(file.template)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE)),
            iterations: args.iterations,
            report_every,
            status_policy: args.status_policy.or(file.status_policy).unwrap_or_default(),
            on_error: args.on_error.or(file.on_error).unwrap_or_default(),
            timeout: args
                .timeout_ms
                .or(file.timeout_ms)
                .map(Duration::from_millis),
            seed: args.seed.or(file.seed),
            prefixes,
            codes,
        })
    }
}
