use std::path::PathBuf;
use std::time::Duration;

pub struct Config {
    pub database_path: PathBuf,
    pub history_directory: PathBuf,
    /// Root of the REST API. `None` means study against the local database.
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub bind_address: String,
    pub text_width: usize,
}

impl Config {
    pub fn new() -> Self {
        Self {
            database_path: PathBuf::from("studyflow.db"),
            history_directory: PathBuf::from("history/txn"),
            api_url: None,
            api_token: None,
            request_timeout: Duration::from_secs(10),
            bind_address: "127.0.0.1:8080".to_string(),
            text_width: 72,
        }
    }

    /// Defaults overridden by any `STUDYFLOW_*` variables present.
    pub fn from_env() -> Self {
        Self::new().with_vars(|key| std::env::var(key).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = var("STUDYFLOW_DB") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(dir) = var("STUDYFLOW_HISTORY_DIR") {
            self.history_directory = PathBuf::from(dir);
        }
        if let Some(url) = var("STUDYFLOW_API_URL") {
            self.api_url = Some(url);
        }
        if let Some(token) = var("STUDYFLOW_TOKEN") {
            self.api_token = Some(token);
        }
        if let Some(addr) = var("STUDYFLOW_BIND") {
            self.bind_address = addr;
        }
        match var("STUDYFLOW_TIMEOUT_SECS").map(|s| s.parse::<u64>()) {
            Some(Ok(secs)) => self.request_timeout = Duration::from_secs(secs),
            Some(Err(e)) => log::warn!("Ignoring STUDYFLOW_TIMEOUT_SECS: {}", e),
            None => {}
        }
        match var("STUDYFLOW_WIDTH").map(|s| s.parse::<usize>()) {
            Some(Ok(width)) => self.text_width = width,
            Some(Err(e)) => log::warn!("Ignoring STUDYFLOW_WIDTH: {}", e),
            None => {}
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
