use crate::api::{endpoint, get_json, get_status, AnalyticsApi};
use crate::error::AppError;
use crate::models::{CostTrend, UsageRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use url::Url;

pub struct AnalyticsClient {
    client: Client,
    base: Url,
}

impl AnalyticsClient {
    pub fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    fn usage_url(&self, customer_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Url, AppError> {
        let mut url = endpoint(&self.base, &["analytics", "usage", "daily"])?;
        url.query_pairs_mut()
            .append_pair("customerId", customer_id)
            .append_pair("startDate", &start.format("%Y-%m-%d").to_string())
            .append_pair("endDate", &end.format("%Y-%m-%d").to_string());
        Ok(url)
    }

    fn trend_url(&self, days: u32) -> Result<Url, AppError> {
        let mut url = endpoint(&self.base, &["analytics", "cost", "trend"])?;
        url.query_pairs_mut().append_pair("days", &days.to_string());
        Ok(url)
    }
}

#[async_trait]
impl AnalyticsApi for AnalyticsClient {
    async fn query_usage(
        &self,
        customer_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<UsageRecord>, AppError> {
        let url = self.usage_url(customer_id, start, end)?;
        get_json(&self.client, self.name(), url).await
    }

    async fn query_cost_trend(&self, days: u32) -> Result<CostTrend, AppError> {
        let url = self.trend_url(days)?;
        get_json(&self.client, self.name(), url).await
    }

    async fn health(&self) -> Result<u16, AppError> {
        let url = endpoint(&self.base, &["analytics", "health"])?;
        get_status(&self.client, self.name(), url).await
    }
}
