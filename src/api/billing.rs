use crate::api::{endpoint, get_json, get_status, BillingApi};
use crate::error::AppError;
use crate::models::{BillingRecord, Page};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

pub struct BillingClient {
    client: Client,
    base: Url,
}

impl BillingClient {
    pub fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    fn records_url(&self, customer_id: &str, page: u32, page_size: u32) -> Result<Url, AppError> {
        let mut url = endpoint(&self.base, &["billing", "customer", customer_id])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("size", &page_size.to_string());
        Ok(url)
    }
}

#[async_trait]
impl BillingApi for BillingClient {
    async fn query_billing(
        &self,
        customer_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<BillingRecord>, AppError> {
        let url = self.records_url(customer_id, page, page_size)?;
        get_json(&self.client, self.name(), url).await
    }

    async fn health(&self) -> Result<u16, AppError> {
        let url = endpoint(&self.base, &["billing", "health"])?;
        get_status(&self.client, self.name(), url).await
    }
}
