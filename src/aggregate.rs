//! Multi-site crawl and assembly.
//!
//! Every configured site gets exactly one entry in the [`AggregateResult`],
//! in table order. A site that fails to fetch is reported as unavailable with
//! no headlines; it never takes the other sites down with it.

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::CrawlMode;
use crate::dedup::dedup;
use crate::error::AppError;
use crate::scraper::{extract, CrawlSession, HeadlineRecord};
use crate::sites::{CompiledSite, SiteSpec};
use crate::stats::PandemicStats;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SiteStatus {
    Ok,
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteHeadlines {
    pub name: String,
    pub status: SiteStatus,
    pub headlines: Vec<HeadlineRecord>,
    /// Leading records dropped by `skip_leading`.
    pub skipped: usize,
    /// Records dropped as duplicate headings.
    pub duplicates_removed: usize,
}

impl SiteHeadlines {
    fn unavailable(name: &str, err: &AppError) -> Self {
        SiteHeadlines {
            name: name.to_string(),
            status: SiteStatus::Unavailable {
                reason: err.to_string(),
            },
            headlines: Vec::new(),
            skipped: 0,
            duplicates_removed: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == SiteStatus::Ok
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateResult {
    pub sites: Vec<SiteHeadlines>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub covid_case: Option<PandemicStats>,
}

impl AggregateResult {
    pub fn get(&self, name: &str) -> Option<&SiteHeadlines> {
        self.sites.iter().find(|site| site.name == name)
    }

    pub fn headlines(&self, name: &str) -> Option<&[HeadlineRecord]> {
        self.get(name).map(|site| site.headlines.as_slice())
    }

    pub fn attach_stats(&mut self, stats: PandemicStats) {
        self.covid_case = Some(stats);
    }

    pub fn unavailable_count(&self) -> usize {
        self.sites.iter().filter(|site| !site.is_available()).count()
    }
}

/// Crawls every site one after another in table order.
pub async fn aggregate(sites: &[CompiledSite], session: &CrawlSession) -> AggregateResult {
    let mut entries = Vec::with_capacity(sites.len());
    for site in sites {
        entries.push(crawl_site(site, session).await);
    }
    finish(entries)
}

/// Crawls every site at once. Entries still come back in table order.
pub async fn aggregate_concurrent(sites: &[CompiledSite], session: &CrawlSession) -> AggregateResult {
    let entries = join_all(sites.iter().map(|site| crawl_site(site, session))).await;
    finish(entries)
}

pub async fn crawl(sites: &[CompiledSite], session: &CrawlSession, mode: CrawlMode) -> AggregateResult {
    match mode {
        CrawlMode::Sequential => aggregate(sites, session).await,
        CrawlMode::Concurrent => aggregate_concurrent(sites, session).await,
    }
}

fn finish(sites: Vec<SiteHeadlines>) -> AggregateResult {
    let result = AggregateResult {
        sites,
        covid_case: None,
    };
    info!(
        sites = result.sites.len(),
        unavailable = result.unavailable_count(),
        "Aggregate assembled"
    );
    result
}

async fn crawl_site(site: &CompiledSite, session: &CrawlSession) -> SiteHeadlines {
    match extract(site, session).await {
        Ok(records) => post_process(&site.spec, records),
        Err(e) => {
            warn!(site = %site.name(), error = %e, "Site unavailable");
            SiteHeadlines::unavailable(site.name(), &e)
        }
    }
}

/// Applies the site's quirks: leading trim, then dedup.
pub fn post_process(spec: &SiteSpec, records: Vec<HeadlineRecord>) -> SiteHeadlines {
    let found = records.len();

    let (records, skipped) = match trim_leading(records, spec.skip_leading) {
        Ok(trimmed) => trimmed,
        Err((records, e)) => {
            warn!(site = %spec.name, error = %e, "Leading trim skipped");
            (records, 0)
        }
    };

    let (headlines, duplicates_removed) = if spec.dedup_required {
        let (unique, removed) = dedup(records);
        info!(site = %spec.name, recurring = removed, "Deduplicated headlines");
        (unique, removed)
    } else {
        (records, 0)
    };

    info!(site = %spec.name, found, kept = headlines.len(), "Site crawled");

    SiteHeadlines {
        name: spec.name.clone(),
        status: SiteStatus::Ok,
        headlines,
        skipped,
        duplicates_removed,
    }
}

/// Drops `count` records from the front. When the page produced fewer than
/// `count` records the input is handed back untouched with the error.
pub fn trim_leading(
    mut records: Vec<HeadlineRecord>,
    count: usize,
) -> std::result::Result<(Vec<HeadlineRecord>, usize), (Vec<HeadlineRecord>, AppError)> {
    if count == 0 {
        return Ok((records, 0));
    }
    if records.len() < count {
        let err = AppError::ConfigurationMismatch(format!(
            "expected at least {} records to skip, found {}",
            count,
            records.len()
        ));
        return Err((records, err));
    }
    records.drain(..count);
    Ok((records, count))
}
