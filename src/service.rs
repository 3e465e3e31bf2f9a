use crate::api::analytics::AnalyticsClient;
use crate::api::billing::BillingClient;
use crate::api::{AnalyticsApi, BillingApi};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::{BillingRecord, Page};
use crate::pivot::{pivot_with, PivotOptions, PivotReport};
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use std::time::Instant;

pub struct HealthReport {
    pub service: &'static str,
    pub status: Result<u16, AppError>,
    pub duration_ms: u128,
}

/// Runs the backend queries the dashboard needs and shapes their results.
///
/// Query failures are returned as [`AppError::Unavailable`]; nothing is
/// pivoted from a failed or partial response.
pub struct DashboardService {
    billing: Box<dyn BillingApi>,
    analytics: Box<dyn AnalyticsApi>,
}

impl DashboardService {
    pub fn new(billing: Box<dyn BillingApi>, analytics: Box<dyn AnalyticsApi>) -> Self {
        Self { billing, analytics }
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10).min(cfg.request_timeout()))
            .timeout(cfg.request_timeout())
            .build()?;
        Ok(Self::new(
            Box::new(BillingClient::new(client.clone(), cfg.billing_base()?)),
            Box::new(AnalyticsClient::new(client, cfg.analytics_base()?)),
        ))
    }

    pub async fn usage_series(
        &self,
        customer_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        options: PivotOptions,
    ) -> Result<PivotReport, AppError> {
        let customer_id = require_customer(customer_id)?;
        if start > end {
            return Err(AppError::InvalidArgument(format!(
                "start date {start} is after end date {end}"
            )));
        }

        let records = self.analytics.query_usage(customer_id, start, end).await?;
        let report = pivot_with(&records, options);
        if !report.malformed.is_empty() {
            tracing::warn!(
                customer_id,
                malformed = report.malformed.len(),
                "some usage costs could not be parsed"
            );
        }
        Ok(report)
    }

    pub async fn billing_page(
        &self,
        customer_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<BillingRecord>, AppError> {
        let customer_id = require_customer(customer_id)?;
        if page_size == 0 {
            return Err(AppError::InvalidArgument(
                "page size must be at least 1".into(),
            ));
        }
        self.billing
            .query_billing(customer_id, page, page_size)
            .await
    }

    pub async fn cost_trend(&self, days: u32) -> Result<Vec<(NaiveDate, Decimal)>, AppError> {
        if days == 0 {
            return Err(AppError::InvalidArgument(
                "trend days must be at least 1".into(),
            ));
        }
        self.analytics.query_cost_trend(days).await?.points()
    }

    pub async fn health(&self) -> Vec<HealthReport> {
        let started = Instant::now();
        let billing = self.billing.health().await;
        let billing_ms = started.elapsed().as_millis();

        let started = Instant::now();
        let analytics = self.analytics.health().await;
        let analytics_ms = started.elapsed().as_millis();

        vec![
            HealthReport {
                service: self.billing.name(),
                status: billing,
                duration_ms: billing_ms,
            },
            HealthReport {
                service: self.analytics.name(),
                status: analytics,
                duration_ms: analytics_ms,
            },
        ]
    }
}

fn require_customer(customer_id: &str) -> Result<&str, AppError> {
    let trimmed = customer_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidArgument(
            "a customer id is required (pass --customer or set customer_id)".into(),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BillingStatus, CostTrend, RawAmount, UsageRecord};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date")
    }

    struct FakeAnalytics {
        usage: Option<Vec<UsageRecord>>,
        trend: CostTrend,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AnalyticsApi for FakeAnalytics {
        async fn query_usage(
            &self,
            _customer_id: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<UsageRecord>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.usage
                .clone()
                .ok_or_else(|| AppError::unavailable("analytics", "HTTP status 503"))
        }

        async fn query_cost_trend(&self, _days: u32) -> Result<CostTrend, AppError> {
            Ok(self.trend.clone())
        }

        async fn health(&self) -> Result<u16, AppError> {
            Ok(200)
        }
    }

    struct FakeBilling {
        up: bool,
    }

    #[async_trait]
    impl BillingApi for FakeBilling {
        async fn query_billing(
            &self,
            customer_id: &str,
            _page: u32,
            _page_size: u32,
        ) -> Result<Page<BillingRecord>, AppError> {
            if !self.up {
                return Err(AppError::unavailable("billing", "connection refused"));
            }
            Ok(Page {
                content: vec![BillingRecord {
                    id: "1".into(),
                    customer_id: Some(customer_id.to_string()),
                    invoice_number: "INV-1".into(),
                    customer_name: "Acme".into(),
                    billing_period_start: day(1),
                    billing_period_end: day(31),
                    total_amount: Decimal::new(9999, 2),
                    status: BillingStatus::Paid,
                    due_date: None,
                    paid_date: Some(day(20)),
                }],
                total_elements: 1,
                total_pages: Some(1),
                number: Some(0),
            })
        }

        async fn health(&self) -> Result<u16, AppError> {
            if self.up {
                Ok(200)
            } else {
                Err(AppError::unavailable("billing", "connection refused"))
            }
        }
    }

    fn usage(d: u32, category: &str, cost: &str) -> UsageRecord {
        UsageRecord {
            usage_date: day(d),
            resource_type: category.into(),
            total_cost: Some(RawAmount::from(cost)),
            quantity: None,
        }
    }

    fn service(usage_rows: Option<Vec<UsageRecord>>, billing_up: bool) -> (DashboardService, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let analytics = FakeAnalytics {
            usage: usage_rows,
            trend: CostTrend {
                labels: vec![day(1), day(2)],
                values: vec![Decimal::new(15, 1), Decimal::new(25, 1)],
            },
            calls: calls.clone(),
        };
        (
            DashboardService::new(Box::new(FakeBilling { up: billing_up }), Box::new(analytics)),
            calls,
        )
    }

    #[tokio::test]
    async fn usage_series_pivots_query_result() {
        let (svc, _) = service(
            Some(vec![
                usage(1, "compute", "10.50"),
                usage(1, "storage", "oops"),
                usage(2, "compute", "11.00"),
            ]),
            true,
        );
        let report = svc
            .usage_series("c-1", day(1), day(2), PivotOptions::default())
            .await
            .expect("series");
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.malformed.len(), 1);
        assert_eq!(report.rows[0].get("compute"), Some(Decimal::new(1050, 2)));
    }

    #[tokio::test]
    async fn usage_series_surfaces_query_failure() {
        let (svc, calls) = service(None, true);
        let err = svc
            .usage_series("c-1", day(1), day(2), PivotOptions::default())
            .await
            .expect_err("unavailable");
        assert!(matches!(err, AppError::Unavailable { service: "analytics", .. }));
        assert!(err.to_string().contains("data unavailable"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn usage_series_validates_before_querying() {
        let (svc, calls) = service(Some(vec![]), true);
        assert!(svc
            .usage_series("c-1", day(5), day(2), PivotOptions::default())
            .await
            .is_err());
        assert!(svc
            .usage_series("  ", day(1), day(2), PivotOptions::default())
            .await
            .is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn billing_page_passes_records_through() {
        let (svc, _) = service(Some(vec![]), true);
        let page = svc.billing_page("c-9", 0, 10).await.expect("page");
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].customer_id.as_deref(), Some("c-9"));
        assert!(svc.billing_page("c-9", 0, 0).await.is_err());
    }

    #[tokio::test]
    async fn cost_trend_zips_labels_and_values() {
        let (svc, _) = service(Some(vec![]), true);
        let points = svc.cost_trend(30).await.expect("trend");
        assert_eq!(points, vec![(day(1), Decimal::new(15, 1)), (day(2), Decimal::new(25, 1))]);
    }

    #[tokio::test]
    async fn health_reports_each_service() {
        let (svc, _) = service(Some(vec![]), false);
        let reports = svc.health().await;
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].service, "billing");
        assert!(reports[0].status.is_err());
        assert_eq!(reports[1].service, "analytics");
        assert_eq!(reports[1].status.as_ref().ok(), Some(&200));
    }
}
