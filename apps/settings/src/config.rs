use std::{collections::HashMap, fs, path::Path, time::Duration};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    /// Per-request timeout; `None` waits indefinitely.
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            request_timeout_secs: Some(10),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new("settings.toml"), |key| std::env::var(key).ok())
}

/// Defaults, then `path` (if readable), then environment variables.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            if let Some(v) = file_cfg.get("server_url").and_then(toml::Value::as_str) {
                settings.server_url = v.to_string();
            }
            match file_cfg.get("request_timeout_secs") {
                Some(toml::Value::Integer(secs)) => {
                    settings.request_timeout_secs = parse_timeout(&secs.to_string());
                }
                Some(toml::Value::String(secs)) => {
                    settings.request_timeout_secs = parse_timeout(secs);
                }
                _ => {}
            }
        }
    }

    if let Some(v) = env("SERVICES_HUB_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if v.trim().parse::<u64>().is_ok() {
            settings.request_timeout_secs = parse_timeout(&v);
        }
    }

    settings
}

// Zero disables the timeout; unparsable values keep the default.
fn parse_timeout(raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(0) => None,
        Ok(secs) => Some(secs),
        Err(_) => Settings::default().request_timeout_secs,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
