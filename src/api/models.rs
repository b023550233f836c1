use async_trait::async_trait;
use axum::extract::{Form, FromRequest, Json, Request};
use axum::http::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::aggregate::AggregateResult;
use crate::api::response::{self, Reply};

#[derive(Deserialize)]
pub struct StatsRequest {
    pub country: String,
}

/// The country for a stats-augmented request, read from a JSON body or an
/// url-encoded form. Bad bodies are rejected inside the usual envelope.
pub struct CountryInput(pub StatsRequest);

#[async_trait]
impl<S> FromRequest<S> for CountryInput
where
    S: Send + Sync,
{
    type Rejection = Reply<()>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            Form::<StatsRequest>::from_request(req, state)
                .await
                .map(|Form(body)| CountryInput(body))
                .map_err(|rejection| response::error(rejection.status(), rejection.body_text()))
        } else {
            Json::<StatsRequest>::from_request(req, state)
                .await
                .map(|Json(body)| CountryInput(body))
                .map_err(|rejection| response::error(rejection.status(), rejection.body_text()))
        }
    }
}

#[derive(Serialize)]
pub struct HeadlinesResponse {
    #[serde(flatten)]
    pub result: AggregateResult,
    pub crawled_at: DateTime<Utc>,
}

impl HeadlinesResponse {
    pub fn new(result: AggregateResult) -> Self {
        HeadlinesResponse {
            result,
            crawled_at: Utc::now(),
        }
    }
}
