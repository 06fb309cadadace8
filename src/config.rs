use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use crate::error::{AppError, Result};
use crate::llm::{DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};
use crate::youtube::DEFAULT_YOUTUBE_BASE_URL;

const DEFAULT_TRANSCRIPT_LANGUAGES: &str = "en,hi";

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_endpoint: String,
    pub youtube_base_url: String,
    /// Transcript languages, tried in order.
    pub transcript_languages: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value lookup, e.g. the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::ConfigError("GEMINI_API_KEY is not set".to_string()))?;

        let gemini_model = lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let gemini_endpoint = lookup("GEMINI_ENDPOINT").unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string());
        let youtube_base_url = lookup("YOUTUBE_BASE_URL").unwrap_or_else(|| DEFAULT_YOUTUBE_BASE_URL.to_string());

        let transcript_languages: Vec<String> = lookup("TRANSCRIPT_LANGUAGES")
            .unwrap_or_else(|| DEFAULT_TRANSCRIPT_LANGUAGES.to_string())
            .split(',')
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty())
            .collect();
        if transcript_languages.is_empty() {
            return Err(AppError::ConfigError("TRANSCRIPT_LANGUAGES is empty".to_string()));
        }

        // Load server configuration with defaults
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("PORT").unwrap_or_else(|| "3000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let server_addr = SocketAddr::new(ip, port);

        Ok(Config {
            server_addr,
            gemini_api_key,
            gemini_model,
            gemini_endpoint,
            youtube_base_url,
            transcript_languages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn requires_api_key() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        assert!(load(&[("GEMINI_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn fills_in_defaults() {
        let config = load(&[("GEMINI_API_KEY", "key")]).unwrap();

        assert_eq!(config.server_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.gemini_endpoint, DEFAULT_GEMINI_ENDPOINT);
        assert_eq!(config.youtube_base_url, "https://www.youtube.com");
        assert_eq!(config.transcript_languages, vec!["en", "hi"]);
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("GEMINI_API_KEY", "key"),
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("GEMINI_MODEL", "gemini-2.5-flash"),
            ("TRANSCRIPT_LANGUAGES", "de, en ,"),
        ])
        .unwrap();

        assert_eq!(config.server_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.gemini_model, "gemini-2.5-flash");
        assert_eq!(config.transcript_languages, vec!["de", "en"]);
    }

    #[test]
    fn rejects_bad_values() {
        let err = load(&[("GEMINI_API_KEY", "key"), ("PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("Invalid port"));

        let err = load(&[("GEMINI_API_KEY", "key"), ("HOST", "localhost:3000")]).unwrap_err();
        assert!(err.to_string().contains("Invalid host address"));

        assert!(load(&[("GEMINI_API_KEY", "key"), ("TRANSCRIPT_LANGUAGES", " , ")]).is_err());
    }
}
