use axum::{
    routing::get,
    Router,
    extract::State,
    response::IntoResponse,
    http::StatusCode,
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use std::future::Future;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::aggregate::crawl;
use crate::api::models::{CountryInput, HeadlinesResponse};
use crate::api::response;
use crate::error::Result;
use crate::scraper::CrawlSession;
use crate::sites::SiteSpec;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/headlines", get(headlines_handler).post(headlines_with_stats_handler))
        .route("/api/sites", get(sites_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn headlines_handler(State(state): State<AppState>) -> impl IntoResponse {
    respond(&state, build_view(&state, None)).await
}

async fn headlines_with_stats_handler(
    State(state): State<AppState>,
    CountryInput(req): CountryInput,
) -> impl IntoResponse {
    info!(country = %req.country, "Processing stats-augmented request");
    respond(&state, build_view(&state, Some(&req.country))).await
}

async fn sites_handler(State(state): State<AppState>) -> impl IntoResponse {
    let sites: Vec<SiteSpec> = state.sites.iter().map(|site| site.spec.clone()).collect();
    response::success(sites)
}

/// Runs `work` under the overall request deadline and wraps the outcome.
async fn respond<F>(state: &AppState, work: F) -> response::Reply<HeadlinesResponse>
where
    F: Future<Output = Result<HeadlinesResponse>>,
{
    let start_time = Instant::now();
    let result = tokio::time::timeout(state.config.request_timeout, work).await;
    let elapsed = start_time.elapsed();

    match result {
        Ok(Ok(view)) => {
            info!(?elapsed, "Request completed");
            response::success(view)
        }
        Ok(Err(err)) => {
            error!(?elapsed, error = %err, "Request failed");
            response::failure(&err)
        }
        Err(_) => {
            warn!(?elapsed, "Request timed out");
            response::error(
                StatusCode::REQUEST_TIMEOUT,
                "Request processing timed out".to_string(),
            )
        }
    }
}

/// Crawls every configured site; with a country, looks up its stats alongside.
async fn build_view(state: &AppState, country: Option<&str>) -> Result<HeadlinesResponse> {
    let session = CrawlSession::new(state.fetcher.clone());
    let mode = state.config.crawl_mode;

    let result = match country {
        None => crawl(&state.sites, &session, mode).await,
        Some(country) => {
            let (mut result, stats) = tokio::join!(
                crawl(&state.sites, &session, mode),
                state.stats.lookup(country),
            );
            result.attach_stats(stats?);
            result
        }
    };

    Ok(HeadlinesResponse::new(result))
}
