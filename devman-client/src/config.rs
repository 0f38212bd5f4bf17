pub const DEFAULT_API_URL: &str = "https://api.tailscale.com/api/v2";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Build the runtime config from command line overrides. Nothing is read from or written to disk.
    pub fn load(api_url: Option<&str>, verbose: bool) -> Self {
        let mut config = Self::default();
        if let Some(url) = api_url {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }
        if verbose {
            config.log_level = "debug".to_string();
        }
        config
    }
}
