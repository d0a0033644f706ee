//! Configuration loaded from environment variables

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;

/// Credentials the upstream families require
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    /// Shared key for data.go.kr and odcloud services
    DataGoKr,
    /// NEIS school information
    Neis,
    /// Korea Real Estate Board R-ONE statistics
    Rone,
}

impl Credential {
    pub fn env_var(&self) -> &'static str {
        match self {
            Credential::DataGoKr => "DATA_GO_KR_API_KEY",
            Credential::Neis => "NEIS_API_KEY",
            Credential::Rone => "RONE_API_KEY",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,

    // Missing keys are reported per request, never at start-up
    pub data_go_kr_api_key: Option<String>,
    pub neis_api_key: Option<String>,
    pub rone_api_key: Option<String>,

    pub data_go_kr_base_url: String,
    pub odcloud_base_url: String,
    pub neis_base_url: String,
    pub rone_base_url: String,

    pub fanout_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            data_go_kr_api_key: None,
            neis_api_key: None,
            rone_api_key: None,
            data_go_kr_base_url: "https://apis.data.go.kr".to_string(),
            odcloud_base_url: "https://api.odcloud.kr/api".to_string(),
            neis_base_url: "https://open.neis.go.kr/hub".to_string(),
            rone_base_url: "https://www.reb.or.kr/r-one/openapi".to_string(),
            fanout_batch_size: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        Ok(Config {
            bind_addr: match env::var("BIND_ADDR") {
                Ok(addr) => addr
                    .parse()
                    .with_context(|| format!("BIND_ADDR must be host:port, got {}", addr))?,
                Err(_) => defaults.bind_addr,
            },

            data_go_kr_api_key: non_empty_var(Credential::DataGoKr.env_var()),
            neis_api_key: non_empty_var(Credential::Neis.env_var()),
            rone_api_key: non_empty_var(Credential::Rone.env_var()),

            data_go_kr_base_url: env::var("DATA_GO_KR_BASE_URL")
                .unwrap_or(defaults.data_go_kr_base_url),
            odcloud_base_url: env::var("ODCLOUD_BASE_URL").unwrap_or(defaults.odcloud_base_url),
            neis_base_url: env::var("NEIS_BASE_URL").unwrap_or(defaults.neis_base_url),
            rone_base_url: env::var("RONE_BASE_URL").unwrap_or(defaults.rone_base_url),

            fanout_batch_size: match env::var("FANOUT_BATCH_SIZE") {
                Ok(size) => size
                    .parse()
                    .context("FANOUT_BATCH_SIZE must be a positive integer")?,
                Err(_) => defaults.fanout_batch_size,
            },
        })
    }

    /// Configured value for `credential`, if set and non-empty
    pub fn credential(&self, credential: Credential) -> Option<&str> {
        let value = match credential {
            Credential::DataGoKr => &self.data_go_kr_api_key,
            Credential::Neis => &self.neis_api_key,
            Credential::Rone => &self.rone_api_key,
        };
        value.as_deref().filter(|key| !key.trim().is_empty())
    }

    /// Same config with every credential set to `key` (handy for tests)
    pub fn with_all_keys(mut self, key: &str) -> Self {
        self.data_go_kr_api_key = Some(key.to_string());
        self.neis_api_key = Some(key.to_string());
        self.rone_api_key = Some(key.to_string());
        self
    }

    /// Same config with every upstream family pointed at `base`
    pub fn with_base_url(mut self, base: &str) -> Self {
        self.data_go_kr_base_url = base.to_string();
        self.odcloud_base_url = base.to_string();
        self.neis_base_url = base.to_string();
        self.rone_base_url = base.to_string();
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
