//! The news source table.
//!
//! Each [`SiteSpec`] is a small contract with one external website: where to
//! fetch, and which CSS selectors locate a headline's container, heading, link
//! and publish date. Markup changes upstream break these silently, so the table
//! lives in data (built in, or a JSON file) rather than in per-site code.

use std::collections::HashSet;
use std::path::Path;

use scraper::Selector;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSpec {
    pub name: String,
    pub container_selector: String,
    pub heading_selector: String,
    pub link_selector: String,
    pub published_selector: String,
    pub base_url: String,
    /// Records to drop from the front of the page, e.g. navigation teasers.
    #[serde(default)]
    pub skip_leading: usize,
    #[serde(default)]
    pub dedup_required: bool,
    /// Resolve relative hrefs against `base_url`.
    #[serde(default)]
    pub absolute_links: bool,
}

impl SiteSpec {
    pub fn new(
        name: &str,
        container_selector: &str,
        heading_selector: &str,
        link_selector: &str,
        published_selector: &str,
        base_url: &str,
    ) -> Self {
        SiteSpec {
            name: name.to_string(),
            container_selector: container_selector.to_string(),
            heading_selector: heading_selector.to_string(),
            link_selector: link_selector.to_string(),
            published_selector: published_selector.to_string(),
            base_url: base_url.to_string(),
            skip_leading: 0,
            dedup_required: false,
            absolute_links: false,
        }
    }

    pub fn with_dedup(mut self) -> Self {
        self.dedup_required = true;
        self
    }

    pub fn skipping(mut self, count: usize) -> Self {
        self.skip_leading = count;
        self
    }

    pub fn with_absolute_links(mut self) -> Self {
        self.absolute_links = true;
        self
    }

    /// Parsed selectors in (container, heading, link, published) order.
    pub fn selectors(&self) -> Result<SiteSelectors> {
        Ok(SiteSelectors {
            container: parse_selector(&self.name, &self.container_selector)?,
            heading: parse_selector(&self.name, &self.heading_selector)?,
            link: parse_selector(&self.name, &self.link_selector)?,
            published: parse_selector(&self.name, &self.published_selector)?,
        })
    }

    /// Parses the selectors once so requests can reuse them.
    pub fn compile(self) -> Result<CompiledSite> {
        let selectors = self.selectors()?;
        Ok(CompiledSite {
            spec: self,
            selectors,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SiteSelectors {
    pub container: Selector,
    pub heading: Selector,
    pub link: Selector,
    pub published: Selector,
}

/// A table entry with its selectors already parsed.
#[derive(Debug, Clone)]
pub struct CompiledSite {
    pub spec: SiteSpec,
    pub selectors: SiteSelectors,
}

impl CompiledSite {
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

fn parse_selector(site: &str, raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|e| {
        AppError::ConfigurationMismatch(format!("{}: invalid selector {:?}: {:?}", site, raw, e))
    })
}

/// The built-in source table.
pub fn default_sites() -> Vec<SiteSpec> {
    vec![
        SiteSpec::new(
            "punch",
            ".list-item article",
            ".entry-title a",
            ".entry-title a",
            ".entry-meta .meta-time span",
            "https://www.punchng.com",
        )
        .with_dedup(),
        SiteSpec::new(
            "guardian",
            ".row-3 .cell",
            "a .headline span",
            "a",
            "a .meta span",
            "https://www.guardian.ng",
        )
        .with_dedup(),
        SiteSpec::new(
            "sun",
            "article .jeg_postblock_content",
            "h3 a",
            "h3 a",
            ".jeg_post_meta .jeg_meta_date a",
            "https://www.sunnewsonline.com/",
        )
        .with_dedup(),
        SiteSpec::new(
            "premium_times",
            "article .jeg_postblock_content",
            "h3 a",
            "h3 a",
            ".jeg_post_meta .jeg_meta_date a",
            "https://www.premiumtimesng.com/",
        )
        .with_dedup(),
        SiteSpec::new(
            "aljazeera",
            "article .gc__content",
            ".gc__header-wrap .gc__title a span",
            ".gc__header-wrap .gc__title a",
            ".gc__footer .gc__meta .gc__date .gc__date__date .date-simple",
            "https://www.aljazeera.com/where/nigeria/",
        )
        .with_absolute_links(),
        SiteSpec::new(
            "sahara_reporters",
            ".block-module-content",
            ".block-module-content-header span a",
            ".block-module-content-header span a",
            ".block-module-content-footer .block-module-content-footer-item-date",
            "https://www.saharareporters.com/",
        )
        .with_dedup(),
        SiteSpec::new(
            "daily_trust",
            ".list_body__19fyx",
            "a",
            "a",
            ".list_category__1sVu4 span.list_time__1UhFn",
            "https://dailytrust.com",
        )
        .skipping(9)
        .with_absolute_links(),
        SiteSpec::new(
            "daily_post",
            ".mvp-blog-story-wrap",
            "a .mvp-blog-story-in .mvp-blog-story-text h2",
            "a",
            "a .mvp-blog-story-in .mvp-blog-story-text .mvp-cat-date-wrap .mvp-cd-date",
            "https://dailypost.ng/headlines/",
        ),
        SiteSpec::new(
            "sky_sports",
            ".sdc-site-tile__body-main",
            ".sdc-site-tile__headline a span",
            ".sdc-site-tile__headline a",
            ".sdc-site-tile__info .sdc-site-tile__tag a",
            "https://www.skysports.com/",
        )
        .with_absolute_links(),
        SiteSpec::new(
            "complete_sports_featured",
            ".td",
            ".item-title a span",
            ".item-title a",
            ".meta-item-date a span",
            "https://www.completesports.com/",
        ),
        SiteSpec::new(
            "complete_sports_latest",
            ".item-sub",
            ".item-title a",
            ".item-title a",
            ".meta-items .meta-item-date span",
            "https://www.completesports.com/",
        )
        .with_dedup(),
    ]
}

/// Loads the site table from `path` when given, otherwise the built-in one.
/// The table is validated and compiled before it is handed out.
pub fn load_sites(path: Option<&Path>) -> Result<Vec<CompiledSite>> {
    let sites = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                AppError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
            })?;
            let sites: Vec<SiteSpec> = serde_json::from_str(&raw).map_err(|e| {
                AppError::ConfigError(format!("Invalid site table {}: {}", path.display(), e))
            })?;
            info!(path = %path.display(), count = sites.len(), "Loaded site table from file");
            sites
        }
        None => default_sites(),
    };

    compile_sites(sites)
}

/// Names must be unique (they key the aggregate) and every selector must parse.
pub fn compile_sites(sites: Vec<SiteSpec>) -> Result<Vec<CompiledSite>> {
    let mut seen = HashSet::new();
    let mut compiled = Vec::with_capacity(sites.len());
    for site in sites {
        if site.name.is_empty() {
            return Err(AppError::ConfigError("Site with empty name".to_string()));
        }
        if !seen.insert(site.name.clone()) {
            return Err(AppError::ConfigError(format!("Duplicate site name: {}", site.name)));
        }
        url::Url::parse(&site.base_url).map_err(|e| {
            AppError::ConfigError(format!("{}: invalid base url {}: {}", site.name, site.base_url, e))
        })?;
        compiled.push(site.compile()?);
    }
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sites_are_valid() {
        let sites = compile_sites(default_sites()).unwrap();
        assert_eq!(sites.len(), 11);

        let daily_trust = sites.iter().find(|s| s.name() == "daily_trust").unwrap();
        assert_eq!(daily_trust.spec.skip_leading, 9);
        assert!(!daily_trust.spec.dedup_required);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let site = SiteSpec::new("a", "div", "h2", "a", "time", "https://a.example");
        let err = compile_sites(vec![site.clone(), site]).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_bad_selector_rejected() {
        let site = SiteSpec::new("a", "div[", "h2", "a", "time", "https://a.example");
        let err = compile_sites(vec![site]).unwrap_err();
        assert!(matches!(err, AppError::ConfigurationMismatch(_)));
    }

    #[test]
    fn test_site_table_json_defaults() {
        let raw = r#"[{
            "name": "local",
            "container_selector": "article",
            "heading_selector": "h2",
            "link_selector": "a",
            "published_selector": "time",
            "base_url": "https://local.example/"
        }]"#;
        let sites: Vec<SiteSpec> = serde_json::from_str(raw).unwrap();
        assert_eq!(sites[0].skip_leading, 0);
        assert!(!sites[0].dedup_required);
        assert!(!sites[0].absolute_links);
    }

    #[test]
    fn test_load_sites_from_file() {
        let path = std::env::temp_dir().join(format!("headline-hub-sites-{}.json", std::process::id()));
        let sites = vec![SiteSpec::new("local", "article", "h2", "a", "time", "https://local.example/").skipping(2)];
        std::fs::write(&path, serde_json::to_string(&sites).unwrap()).unwrap();

        let loaded = load_sites(Some(path.as_path())).unwrap();
        std::fs::remove_file(&path).ok();
        let specs: Vec<SiteSpec> = loaded.into_iter().map(|site| site.spec).collect();
        assert_eq!(specs, sites);
    }

    #[test]
    fn test_load_sites_missing_file() {
        let err = load_sites(Some(Path::new("/definitely/not/here.json"))).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
