use anyhow::Result;
use serde::Deserialize;

use crate::audio::CaptureConfig;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub audio: CaptureConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    /// Interview service endpoint, one POST per turn
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000/interview_loop".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
