use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::pvgis::PvgisClient;
use crate::timezone::TimezoneResolver;

#[derive(Clone)]
pub struct AppState {
    pub pvgis: Arc<PvgisClient>,
    pub timezones: Arc<TimezoneResolver>,
}

impl AppState {
    pub fn new(config: &Config, timezones: Arc<TimezoneResolver>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build upstream HTTP client")?;
        let pvgis = Arc::new(PvgisClient::new(http, config));
        Ok(Self { pvgis, timezones })
    }
}
