use log::Level;
use serde::Deserialize;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_VEHICLES_PER_PAGE: usize = 9;

/// Settings passed in by the frontend at startup. Every field is optional.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub api_base_url: String,
    pub log_level: String,
    pub vehicles_per_page: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            log_level: "error".to_string(),
            vehicles_per_page: DEFAULT_VEHICLES_PER_PAGE,
        }
    }
}

impl Config {
    /// Empty input means defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_json::from_str(json)
    }

    /// Falls back to `Error` for unknown level names.
    pub fn level(&self) -> Level {
        self.log_level.parse().unwrap_or_else(|_| {
            log::warn!("Unknown log level {:?}, using error", self.log_level);
            Level::Error
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}
