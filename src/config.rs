use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_STATS_API_URL: &str = "https://coronavirus-19-api.herokuapp.com/countries";

/// How the aggregator walks the site table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrawlMode {
    /// One site after another, in table order.
    #[default]
    Sequential,
    /// Every site at once, joined before assembly.
    Concurrent,
}

impl FromStr for CrawlMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(CrawlMode::Sequential),
            "concurrent" => Ok(CrawlMode::Concurrent),
            other => Err(AppError::ConfigError(format!("Invalid crawl mode: {}", other))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub stats_api_url: String,
    pub sites_file: Option<PathBuf>,
    pub crawl_mode: CrawlMode,
    pub fetch_timeout: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 8080),
            stats_api_url: DEFAULT_STATS_API_URL.to_string(),
            sites_file: None,
            crawl_mode: CrawlMode::default(),
            fetch_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(90),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let stats_api_url = env::var("STATS_API_URL")
            .unwrap_or_else(|_| DEFAULT_STATS_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let sites_file = env::var("SITES_FILE").ok().map(PathBuf::from);

        let crawl_mode = match env::var("CRAWL_MODE") {
            Ok(mode) => mode.parse()?,
            Err(_) => CrawlMode::default(),
        };

        let fetch_timeout = seconds_var("FETCH_TIMEOUT_SECS", 10)?;
        let connect_timeout = seconds_var("CONNECT_TIMEOUT_SECS", 5)?;
        let request_timeout = seconds_var("REQUEST_TIMEOUT_SECS", 90)?;

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            stats_api_url,
            sites_file,
            crawl_mode,
            fetch_timeout,
            connect_timeout,
            request_timeout,
        })
    }
}

fn seconds_var(name: &str, default: u64) -> Result<Duration> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_var_parsing() {
        // SAFETY: the variable name is unique to this test.
        unsafe { env::set_var("HEADLINE_HUB_TEST_CONNECT_SECS", "3") };
        assert_eq!(
            seconds_var("HEADLINE_HUB_TEST_CONNECT_SECS", 5).unwrap(),
            Duration::from_secs(3)
        );
        unsafe { env::set_var("HEADLINE_HUB_TEST_CONNECT_SECS", "soon") };
        assert!(seconds_var("HEADLINE_HUB_TEST_CONNECT_SECS", 5).is_err());
        unsafe { env::remove_var("HEADLINE_HUB_TEST_CONNECT_SECS") };
        assert_eq!(
            seconds_var("HEADLINE_HUB_TEST_CONNECT_SECS", 5).unwrap(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_crawl_mode_parsing() {
        assert_eq!("sequential".parse::<CrawlMode>().unwrap(), CrawlMode::Sequential);
        assert_eq!(" Concurrent ".parse::<CrawlMode>().unwrap(), CrawlMode::Concurrent);
        assert!("parallel-ish".parse::<CrawlMode>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server_addr.port(), 8080);
        assert_eq!(config.crawl_mode, CrawlMode::Sequential);
        assert!(config.sites_file.is_none());
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(config.connect_timeout < config.fetch_timeout);
    }
}
