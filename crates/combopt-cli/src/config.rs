//! Settings loaded from `combopt.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use combopt_problems::TableFormat;
use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).with_context(|| format!("cannot read settings {}", path.display()))?;
        let settings: Self =
            toml::from_str(&content).with_context(|| format!("invalid settings in {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if let Some(secs) = self.solver.time_limit_secs {
            parse_time_limit(secs).context("solver.time_limit_secs")?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).with_writer(std::io::stderr).init();
            }
            _ => {
                fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SolverConfig {
    /// Give up on a single solve after this many seconds
    #[serde(default)]
    pub time_limit_secs: Option<f64>,
}

impl SolverConfig {
    /// `None` when unset or not representable; [`Settings::load`] rejects the latter.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.and_then(|secs| parse_time_limit(secs).ok())
    }
}

/// A positive number of seconds small enough to fit a [`Duration`].
pub fn parse_time_limit(secs: f64) -> Result<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        bail!("time limit must be a positive number of seconds, got {}", secs);
    }
    Duration::try_from_secs_f64(secs).with_context(|| format!("time limit of {} seconds is out of range", secs))
}

#[derive(Debug, Default, Deserialize)]
pub struct InputConfig {
    /// Field separator in graph files; any whitespace when unset
    #[serde(default)]
    pub delimiter: Option<char>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub delimiter: char,
    pub decimal_comma: bool,
    /// Where the dominating-set comparison table is written
    pub output: PathBuf,
}

impl ReportConfig {
    pub fn table_format(&self) -> TableFormat {
        TableFormat {
            delimiter: self.delimiter,
            decimal_comma: self.decimal_comma,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        let format = TableFormat::default();
        Self {
            delimiter: format.delimiter,
            decimal_comma: format.decimal_comma,
            output: PathBuf::from("Output.csv"),
        }
    }
}
