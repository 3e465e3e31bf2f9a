use crate::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A cost or quantity exactly as the analytics service sent it. The service
/// emits JSON numbers, but older exports carry them as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(serde_json::Number),
    Text(String),
}

impl RawAmount {
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            RawAmount::Number(n) => parse_decimal(&n.to_string()),
            RawAmount::Text(s) => parse_decimal(s),
        }
    }
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawAmount::Number(n) => write!(f, "{n}"),
            RawAmount::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for RawAmount {
    fn from(raw: &str) -> Self {
        RawAmount::Text(raw.to_string())
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// One row of the daily usage summary: cost of one resource type on one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub usage_date: NaiveDate,
    pub resource_type: String,
    #[serde(default)]
    pub total_cost: Option<RawAmount>,
    #[serde(default, alias = "total_quantity")]
    pub quantity: Option<RawAmount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BillingStatus {
    Paid,
    Pending,
    Overdue,
    Other(String),
}

impl BillingStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BillingStatus::Paid => "PAID",
            BillingStatus::Pending => "PENDING",
            BillingStatus::Overdue => "OVERDUE",
            BillingStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for BillingStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "PAID" => BillingStatus::Paid,
            "PENDING" => BillingStatus::Pending,
            "OVERDUE" => BillingStatus::Overdue,
            _ => BillingStatus::Other(raw),
        }
    }
}

impl From<BillingStatus> for String {
    fn from(status: BillingStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRecord {
    pub id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    pub invoice_number: String,
    pub customer_name: String,
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    pub total_amount: Decimal,
    pub status: BillingStatus,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub paid_date: Option<NaiveDate>,
}

/// A page of results as returned by the billing service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: Option<u64>,
    #[serde(default)]
    pub number: Option<u64>,
}

impl<T> Page<T> {
    pub fn page_count(&self, page_size: u32) -> u64 {
        self.total_pages.unwrap_or_else(|| {
            let size = u64::from(page_size.max(1));
            self.total_elements.div_ceil(size)
        })
    }
}

/// Pre-pivoted daily cost series from the analytics service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostTrend {
    pub labels: Vec<NaiveDate>,
    pub values: Vec<Decimal>,
}

impl CostTrend {
    pub fn points(&self) -> Result<Vec<(NaiveDate, Decimal)>, AppError> {
        if self.labels.len() != self.values.len() {
            return Err(AppError::unavailable(
                "analytics",
                format!(
                    "trend labels/values length mismatch ({} vs {})",
                    self.labels.len(),
                    self.values.len()
                ),
            ));
        }
        Ok(self
            .labels
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .collect())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    #[serde(rename = "throughput")]
    Throughput,
    #[serde(rename = "latency")]
    Latency,
    #[serde(rename = "errorRate")]
    ErrorRate,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [
        MetricKind::Throughput,
        MetricKind::Latency,
        MetricKind::ErrorRate,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MetricKind::Throughput => "throughput",
            MetricKind::Latency => "latency",
            MetricKind::ErrorRate => "errorRate",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MetricKind::Throughput => "events/min",
            MetricKind::Latency => "ms",
            MetricKind::ErrorRate => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSample {
    timestamp: DateTime<Utc>,
    value: f64,
}

impl MetricSample {
    /// Validates a sample at the producer boundary. Windows accept only
    /// samples built here.
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Result<Self, AppError> {
        if !value.is_finite() {
            return Err(AppError::InvalidArgument(format!(
                "metric sample value must be finite, got {value}"
            )));
        }
        Ok(Self { timestamp, value })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}
