use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

use crate::error::{AppError, Result};
use crate::sites::CompiledSite;

fn build_client(timeout: Duration, connect_timeout: Duration) -> Result<Client> {
    let client = ClientBuilder::new()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .pool_max_idle_per_host(10)
        .user_agent(concat!("headline-hub/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// A fetched document.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl Page {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Page>;
}

/// Fetches over HTTP. One client is built at startup and its connection pool
/// is shared by every request.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        Ok(HttpFetcher {
            client: build_client(timeout, connect_timeout)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Page> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().await?;
        Ok(Page { url, status, body })
    }
}

/// Request-scoped fetching context. Every page visit goes through here so it
/// is logged once with its status.
pub struct CrawlSession {
    fetcher: Arc<dyn PageFetcher>,
    visits: AtomicUsize,
}

impl CrawlSession {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        CrawlSession {
            fetcher,
            visits: AtomicUsize::new(0),
        }
    }

    pub async fn visit(&self, url: &str) -> Result<Page> {
        self.visits.fetch_add(1, Ordering::Relaxed);
        match self.fetcher.fetch(url).await {
            Ok(page) => {
                info!(url = %page.url, status = page.status, "Visited");
                Ok(page)
            }
            Err(e) => {
                warn!(%url, error = %e, "Visit failed");
                Err(e)
            }
        }
    }

    /// Number of fetches issued through this session so far.
    pub fn visits(&self) -> usize {
        self.visits.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadlineRecord {
    pub heading: String,
    pub link: String,
    pub published_at: String,
}

/// Fetches the site's `base_url` once and extracts one record per container element.
#[instrument(level = "debug", skip_all, fields(site = %site.name()))]
pub async fn extract(site: &CompiledSite, session: &CrawlSession) -> Result<Vec<HeadlineRecord>> {
    let page = session.visit(&site.spec.base_url).await?;
    if !page.is_success() {
        return Err(AppError::FetchFailure(format!(
            "{} responded with status {}",
            page.url, page.status
        )));
    }
    Ok(extract_from_html(site, &page.body))
}

/// Runs the site's selectors over an already fetched document.
///
/// Selectors that match nothing inside a container leave that field empty;
/// a document without any container yields an empty list.
pub fn extract_from_html(site: &CompiledSite, html: &str) -> Vec<HeadlineRecord> {
    let selectors = &site.selectors;
    let base = if site.spec.absolute_links {
        Url::parse(&site.spec.base_url).ok()
    } else {
        None
    };

    let document = Html::parse_document(html);
    document
        .select(&selectors.container)
        .map(|container| {
            let link = child_attr(container, &selectors.link, "href");
            HeadlineRecord {
                heading: child_text(container, &selectors.heading),
                link: match &base {
                    Some(base) => resolve_link(base, &link),
                    None => link,
                },
                published_at: child_text(container, &selectors.published),
            }
        })
        .collect()
}

/// Text of every match inside `element`, concatenated and trimmed.
fn child_text(element: ElementRef<'_>, selector: &Selector) -> String {
    element
        .select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Attribute of the first match inside `element`.
fn child_attr(element: ElementRef<'_>, selector: &Selector, attr: &str) -> String {
    element
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

fn resolve_link(base: &Url, link: &str) -> String {
    if link.is_empty() {
        return String::new();
    }
    base.join(link)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| link.to_string())
}
