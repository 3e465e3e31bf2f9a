use crate::error::AppError;
use crate::models::{BillingRecord, CostTrend, Page, UsageRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

pub mod analytics;
pub mod billing;

/// Paginated billing records, served by the billing service.
#[async_trait]
pub trait BillingApi: Send + Sync {
    fn name(&self) -> &'static str {
        "billing"
    }

    async fn query_billing(
        &self,
        customer_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<BillingRecord>, AppError>;

    async fn health(&self) -> Result<u16, AppError>;
}

/// Usage summaries and cost trends, served by the analytics service.
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    fn name(&self) -> &'static str {
        "analytics"
    }

    async fn query_usage(
        &self,
        customer_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<UsageRecord>, AppError>;

    async fn query_cost_trend(&self, days: u32) -> Result<CostTrend, AppError>;

    async fn health(&self) -> Result<u16, AppError>;
}

/// Appends `segments` to the base URL, keeping any path the base already has
/// (`http://host/api` + `["billing", "health"]` -> `http://host/api/billing/health`).
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, AppError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| AppError::Config(format!("'{base}' cannot be used as a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    service: &'static str,
    url: Url,
) -> Result<T, AppError> {
    tracing::debug!(service, %url, "querying");
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::unavailable(service, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::unavailable(service, describe_status(status)));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AppError::unavailable(service, format!("unreadable response: {e}")))
}

pub(crate) async fn get_status(
    client: &Client,
    service: &'static str,
    url: Url,
) -> Result<u16, AppError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::unavailable(service, e))?;
    let status = response.status();
    if status.is_success() {
        return Ok(status.as_u16());
    }
    Err(AppError::unavailable(service, describe_status(status)))
}

fn describe_status(status: StatusCode) -> String {
    match status.as_u16() {
        401 | 403 => format!("request rejected (HTTP {status})"),
        404 => format!("endpoint not found (HTTP {status})"),
        _ => format!("HTTP status {status}"),
    }
}
