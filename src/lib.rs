pub mod aggregate;
pub mod api;
pub mod config;
pub mod dedup;
pub mod error;
pub mod scraper;
pub mod sites;
pub mod stats;

use std::sync::Arc;
use crate::config::Config;
use crate::error::Result;
use crate::scraper::{HttpFetcher, PageFetcher};
use crate::sites::CompiledSite;
use crate::stats::StatsClient;

/// Application state that will be shared across handlers.
///
/// Everything here is read-only; crawl sessions are created per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sites: Arc<Vec<CompiledSite>>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub stats: Arc<StatsClient>,
}

impl AppState {
    /// Loads and compiles the site table and builds the HTTP fetcher from `config`.
    pub fn new(config: Config) -> Result<Self> {
        let sites = sites::load_sites(config.sites_file.as_deref())?;
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(config.fetch_timeout, config.connect_timeout)?);
        Ok(Self::with_fetcher(config, sites, fetcher))
    }

    pub fn with_fetcher(config: Config, sites: Vec<CompiledSite>, fetcher: Arc<dyn PageFetcher>) -> Self {
        let stats = StatsClient::new(&config.stats_api_url, fetcher.clone());
        AppState {
            config: Arc::new(config),
            sites: Arc::new(sites),
            fetcher,
            stats: Arc::new(stats),
        }
    }
}
