use anyhow::{anyhow, Context, Result};
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_PVGIS_BASE_URL: &str = "https://re.jrc.ec.europa.eu/api/v5_2";

#[derive(Debug, Clone)]
pub struct Config {
    pub pvgis_base_url: String,
    pub use_horizon: bool,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub coerce_year: Option<i32>,
    pub upstream_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pvgis_base_url: DEFAULT_PVGIS_BASE_URL.to_string(),
            use_horizon: true,
            start_year: None,
            end_year: None,
            coerce_year: None,
            upstream_timeout: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let pvgis_base_url = env_string("TMY_PVGIS_BASE_URL", Some(DEFAULT_PVGIS_BASE_URL))?;
        let parsed = Url::parse(&pvgis_base_url).context("invalid TMY_PVGIS_BASE_URL")?;
        if parsed.host_str().is_none() {
            return Err(anyhow!("TMY_PVGIS_BASE_URL missing host"));
        }
        let pvgis_base_url = pvgis_base_url.trim_end_matches('/').to_string();

        let use_horizon = env_bool("TMY_PVGIS_USE_HORIZON", true)?;
        let start_year = env_optional_i32("TMY_PVGIS_START_YEAR")?;
        let end_year = env_optional_i32("TMY_PVGIS_END_YEAR")?;
        if let (Some(start), Some(end)) = (start_year, end_year) {
            if end < start {
                return Err(anyhow!(
                    "TMY_PVGIS_END_YEAR ({end}) must not be before TMY_PVGIS_START_YEAR ({start})"
                ));
            }
        }
        let coerce_year = env_optional_i32("TMY_COERCE_YEAR")?;

        let upstream_timeout = match env_optional("TMY_UPSTREAM_TIMEOUT_SECONDS") {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .context("invalid TMY_UPSTREAM_TIMEOUT_SECONDS")?;
                Some(Duration::from_secs(secs)).filter(|d| !d.is_zero())
            }
            None => None,
        };

        Ok(Self {
            pvgis_base_url,
            use_horizon,
            start_year,
            end_year,
            coerce_year,
            upstream_timeout,
        })
    }
}

fn env_string(key: &str, default: Option<&str>) -> Result<String> {
    match env_optional(key) {
        Some(value) => Ok(value),
        None => default
            .map(str::to_string)
            .ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_bool(key: &str, default: bool) -> Result<bool> {
    let Some(raw) = env_optional(key) else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("invalid {key}: expected a boolean, got {raw:?}")),
    }
}

fn env_optional_i32(key: &str) -> Result<Option<i32>> {
    env_optional(key)
        .map(|raw| raw.parse::<i32>().with_context(|| format!("invalid {key}")))
        .transpose()
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
