use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::{AppError, Result};
use crate::scraper::{CrawlSession, PageFetcher};

/// Body the upstream API returns instead of JSON for an unknown country.
pub const COUNTRY_NOT_FOUND: &str = "Country not found";

/// Reported counts for one country. Values are passed through as received;
/// fields the upstream leaves out or sends as `null` read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PandemicStats {
    #[serde(deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(rename = "cases", deserialize_with = "null_as_default")]
    pub total_cases: i64,
    #[serde(rename = "todayCases", deserialize_with = "null_as_default")]
    pub todays_cases: i64,
    #[serde(rename = "deaths", deserialize_with = "null_as_default")]
    pub total_deaths: i64,
    #[serde(rename = "todayDeaths", deserialize_with = "null_as_default")]
    pub todays_deaths: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub recovered: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub active: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub critical: i64,
    #[serde(rename = "casesPerOneMillion", deserialize_with = "null_as_default")]
    pub cases_per_million: i64,
    #[serde(rename = "deathsPerOneMillion", deserialize_with = "null_as_default")]
    pub deaths_per_million: i64,
    #[serde(rename = "totalTests", deserialize_with = "null_as_default")]
    pub total_tests: i64,
    #[serde(rename = "testsPerOneMillion", deserialize_with = "null_as_default")]
    pub tests_per_million: i64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub struct StatsClient {
    base_url: String,
    fetcher: Arc<dyn PageFetcher>,
}

impl StatsClient {
    pub fn new(base_url: &str, fetcher: Arc<dyn PageFetcher>) -> Self {
        StatsClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            fetcher,
        }
    }

    /// Endpoint for `country`. The name goes into the path as given.
    pub fn endpoint(&self, country: &str) -> String {
        format!("{}/{}", self.base_url, country)
    }

    #[instrument(level = "info", skip(self))]
    pub async fn lookup(&self, country: &str) -> Result<PandemicStats> {
        let session = CrawlSession::new(self.fetcher.clone());
        let page = session.visit(&self.endpoint(country)).await?;
        let stats = parse_stats(&page.body)?;
        info!(country = %stats.country, cases = stats.total_cases, "Stats lookup succeeded");
        Ok(stats)
    }
}

/// Classifies a raw response body: the not-found sentinel first, then JSON.
pub fn parse_stats(body: &str) -> Result<PandemicStats> {
    if body == COUNTRY_NOT_FOUND {
        warn!("Stats lookup: country not found");
        return Err(AppError::CountryNotFound);
    }
    let stats = serde_json::from_str::<PandemicStats>(body)?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::tests::StaticFetcher;

    const NIGERIA: &str = r#"{"country":"Nigeria","cases":266675,"todayCases":0,"deaths":3155,"todayDeaths":0,"recovered":259144,"active":4376,"critical":11,"casesPerOneMillion":1239,"deathsPerOneMillion":15,"totalTests":5708974,"testsPerOneMillion":26540}"#;

    #[test]
    fn test_sentinel_is_not_found() {
        let err = parse_stats("Country not found").unwrap_err();
        assert!(matches!(err, AppError::CountryNotFound));
    }

    #[test]
    fn test_sentinel_is_exact_match() {
        let err = parse_stats("Country not found\n").unwrap_err();
        assert!(matches!(err, AppError::DecodeFailure(_)));
    }

    #[test]
    fn test_decodes_fields_verbatim() {
        let stats = parse_stats(NIGERIA).unwrap();
        assert_eq!(
            stats,
            PandemicStats {
                country: "Nigeria".to_string(),
                total_cases: 266675,
                todays_cases: 0,
                total_deaths: 3155,
                todays_deaths: 0,
                recovered: 259144,
                active: 4376,
                critical: 11,
                cases_per_million: 1239,
                deaths_per_million: 15,
                total_tests: 5708974,
                tests_per_million: 26540,
            }
        );
    }

    #[test]
    fn test_negative_values_pass_through() {
        let stats = parse_stats(r#"{"country":"X","active":-4}"#).unwrap();
        assert_eq!(stats.active, -4);
        assert_eq!(stats.total_cases, 0);
    }

    #[test]
    fn test_null_counts_read_as_zero() {
        let stats = parse_stats(
            r#"{"country":"Diamond Princess","cases":712,"todayCases":0,"deaths":13,"todayDeaths":0,"recovered":699,"active":0,"critical":0,"casesPerOneMillion":null,"deathsPerOneMillion":null,"totalTests":null,"testsPerOneMillion":null}"#,
        )
        .unwrap();
        assert_eq!(stats.country, "Diamond Princess");
        assert_eq!(stats.total_cases, 712);
        assert_eq!(stats.recovered, 699);
        assert_eq!(stats.cases_per_million, 0);
        assert_eq!(stats.total_tests, 0);
        assert_eq!(stats.tests_per_million, 0);
    }

    #[test]
    fn test_wrong_type_is_still_decode_failure() {
        let err = parse_stats(r#"{"country":"X","cases":"many"}"#).unwrap_err();
        assert!(matches!(err, AppError::DecodeFailure(_)));
    }

    #[test]
    fn test_garbage_is_decode_failure() {
        let err = parse_stats("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, AppError::DecodeFailure(_)));
    }

    #[tokio::test]
    async fn test_lookup_uses_country_in_path() {
        let fetcher = StaticFetcher::default()
            .with_page("https://stats.example/countries/Nigeria", 200, NIGERIA)
            .with_page("https://stats.example/countries/Atlantis", 404, COUNTRY_NOT_FOUND);
        let client = StatsClient::new("https://stats.example/countries/", Arc::new(fetcher));

        let stats = client.lookup("Nigeria").await.unwrap();
        assert_eq!(stats.total_deaths, 3155);

        let err = client.lookup("Atlantis").await.unwrap_err();
        assert!(matches!(err, AppError::CountryNotFound));
    }

    #[tokio::test]
    async fn test_lookup_transport_failure() {
        let client = StatsClient::new("https://stats.example/countries", Arc::new(StaticFetcher::default()));
        let err = client.lookup("Nigeria").await.unwrap_err();
        assert!(matches!(err, AppError::FetchFailure(_)));
    }
}
