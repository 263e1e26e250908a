use std::env;
use std::path::PathBuf;

use once_cell::sync::Lazy;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub console_log_level: String,
    pub gemini_api_key: String,
    pub gemini_api_base_url: String,
    pub gemini_safety_settings: String,
    pub gemini_connect_timeout_seconds: u64,
    pub download_dir: PathBuf,
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::load);

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn first_non_empty(names: &[&str]) -> String {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

fn normalize_gemini_safety_settings(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "permissive".to_string();
    }

    let lowered = trimmed.to_lowercase();
    match lowered.as_str() {
        "permissive" | "off" | "none" => "permissive".to_string(),
        "standard" | "default" => "standard".to_string(),
        _ => lowered,
    }
}

fn normalize_base_url(value: String) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return "https://generativelanguage.googleapis.com/v1beta".to_string();
    }
    trimmed.to_string()
}

impl Config {
    /// Builds the configuration from the environment. A missing API key is
    /// not an error here; transforms report it when they run.
    pub fn load() -> Self {
        let download_dir = env_string("DOWNLOAD_DIR", ".");
        let download_dir = if download_dir.trim().is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(download_dir.trim())
        };

        Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            console_log_level: env_string("CONSOLE_LOG_LEVEL", "warn").to_lowercase(),
            gemini_api_key: first_non_empty(&["GEMINI_API_KEY", "API_KEY"]),
            gemini_api_base_url: normalize_base_url(env_string(
                "GEMINI_API_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            )),
            gemini_safety_settings: normalize_gemini_safety_settings(env_string(
                "GEMINI_SAFETY_SETTINGS",
                "permissive",
            )),
            gemini_connect_timeout_seconds: env_u64("GEMINI_CONNECT_TIMEOUT_SECONDS", 15),
            download_dir,
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.gemini_api_key.trim().is_empty()
    }
}
