use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use std::env;

pub const SERVER_URL_VAR: &str = "CSV_UPLOADER_SERVER_URL";
pub const PAGE_SIZE_VAR: &str = "CSV_UPLOADER_PAGE_SIZE";

const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_url: Url,
    pub page_size: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: Url::parse(DEFAULT_SERVER_URL).expect("default server URL is valid"),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_values(env::var(SERVER_URL_VAR).ok(), env::var(PAGE_SIZE_VAR).ok())
    }

    fn from_values(server_url: Option<String>, page_size: Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = server_url {
            config.server_url = Self::parse_base_url(&raw)?;
        }

        if let Some(raw) = page_size {
            let size: u32 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a positive integer", PAGE_SIZE_VAR))?;
            if size == 0 {
                return Err(anyhow!("{} must be at least 1", PAGE_SIZE_VAR));
            }
            config.page_size = size;
        }

        Ok(config)
    }

    fn parse_base_url(raw: &str) -> Result<Url> {
        let mut url = Url::parse(raw.trim())
            .with_context(|| format!("{} is not a valid URL: {}", SERVER_URL_VAR, raw))?;

        // Url::join replaces the last segment unless the path ends with a slash
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.server_url
            .join(path)
            .with_context(|| format!("Invalid endpoint path: {}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_server() {
        let config = AppConfig::from_values(None, None).unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(
            config.endpoint("progress/sse").unwrap().as_str(),
            "http://localhost:8080/progress/sse"
        );
    }

    #[test]
    fn base_path_is_preserved() {
        let config =
            AppConfig::from_values(Some("http://example.com/api".to_string()), None).unwrap();
        assert_eq!(
            config.endpoint("students").unwrap().as_str(),
            "http://example.com/api/students"
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(AppConfig::from_values(Some("not a url".to_string()), None).is_err());
        assert!(AppConfig::from_values(None, Some("0".to_string())).is_err());
        assert!(AppConfig::from_values(None, Some("ten".to_string())).is_err());
    }

    #[test]
    fn custom_page_size() {
        let config = AppConfig::from_values(None, Some(" 25 ".to_string())).unwrap();
        assert_eq!(config.page_size, 25);
    }
}
