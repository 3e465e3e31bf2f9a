use crate::models::UsageRecord;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// How two records for the same date and category are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// The record later in input order replaces the earlier value.
    #[default]
    LastWriteWins,
    Sum,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowOrder {
    /// Rows follow the first occurrence of each date in the input.
    #[default]
    FirstSeen,
    Chronological,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PivotOptions {
    pub merge: MergePolicy,
    pub order: RowOrder,
}

/// One date of the wide table. Categories with no input for this date are
/// absent, never zero.
///
/// Serializes flat, `{"date": "2024-01-01", "compute": 10.5, ...}`, with
/// plain JSON numbers so the rows can go straight to a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotedRow {
    pub date: NaiveDate,
    pub values: BTreeMap<String, Decimal>,
}

impl Serialize for PivotedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("date", &self.date)?;
        for (category, value) in &self.values {
            map.serialize_entry(category, &plot_number(*value))?;
        }
        map.end()
    }
}

/// Chart-facing value of an amount. Display and CSV output keep the exact
/// decimal.
pub fn plot_number(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

impl PivotedRow {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, category: &str) -> Option<Decimal> {
        self.values.get(category).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedRecord {
    pub date: NaiveDate,
    pub category: String,
    pub raw: Option<String>,
}

/// A value left out of a running [`MergePolicy::Sum`] total because adding it
/// would overflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverflowedSum {
    pub date: NaiveDate,
    pub category: String,
    pub kept: Decimal,
    pub dropped: Decimal,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PivotReport {
    pub rows: Vec<PivotedRow>,
    /// Every category that received a value, in first-seen order.
    pub categories: Vec<String>,
    pub malformed: Vec<MalformedRecord>,
    pub overflowed: Vec<OverflowedSum>,
}

pub fn pivot(records: &[UsageRecord]) -> Vec<PivotedRow> {
    pivot_with(records, PivotOptions::default()).rows
}

pub fn pivot_with(records: &[UsageRecord], options: PivotOptions) -> PivotReport {
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();
    let mut report = PivotReport::default();

    for record in records {
        let rows = &mut report.rows;
        let slot = *index.entry(record.usage_date).or_insert_with(|| {
            rows.push(PivotedRow::new(record.usage_date));
            rows.len() - 1
        });

        let Some(value) = record.total_cost.as_ref().and_then(|c| c.to_decimal()) else {
            tracing::warn!(
                date = %record.usage_date,
                category = %record.resource_type,
                raw = ?record.total_cost.as_ref().map(ToString::to_string),
                "skipping malformed cost field"
            );
            report.malformed.push(MalformedRecord {
                date: record.usage_date,
                category: record.resource_type.clone(),
                raw: record.total_cost.as_ref().map(ToString::to_string),
            });
            continue;
        };

        let row = &mut report.rows[slot];
        if let Some(existing) = row.values.get_mut(&record.resource_type) {
            match options.merge {
                MergePolicy::LastWriteWins => *existing = value,
                MergePolicy::Sum => match existing.checked_add(value) {
                    Some(total) => *existing = total,
                    None => {
                        tracing::warn!(
                            date = %record.usage_date,
                            category = %record.resource_type,
                            "cost sum overflowed, keeping previous total"
                        );
                        report.overflowed.push(OverflowedSum {
                            date: record.usage_date,
                            category: record.resource_type.clone(),
                            kept: *existing,
                            dropped: value,
                        });
                    }
                },
            }
        } else {
            row.values.insert(record.resource_type.clone(), value);
        }

        if !report.categories.contains(&record.resource_type) {
            report.categories.push(record.resource_type.clone());
        }
    }

    if options.order == RowOrder::Chronological {
        report.rows.sort_by_key(|row| row.date);
    }

    tracing::debug!(
        records = records.len(),
        rows = report.rows.len(),
        malformed = report.malformed.len(),
        overflowed = report.overflowed.len(),
        "pivoted usage records"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawAmount;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date")
    }

    fn rec(d: u32, category: &str, cost: &str) -> UsageRecord {
        UsageRecord {
            usage_date: day(d),
            resource_type: category.to_string(),
            total_cost: Some(RawAmount::from(cost)),
            quantity: None,
        }
    }

    #[test]
    fn pivot_builds_one_column_per_category() {
        let rows = pivot(&[
            rec(1, "compute", "10.50"),
            rec(1, "storage", "2.00"),
            rec(2, "compute", "11.00"),
        ]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, day(1));
        assert_eq!(rows[0].get("compute"), Some(Decimal::new(1050, 2)));
        assert_eq!(rows[0].get("storage"), Some(Decimal::new(200, 2)));
        assert_eq!(rows[1].date, day(2));
        assert_eq!(rows[1].get("compute"), Some(Decimal::new(1100, 2)));
        assert_eq!(rows[1].get("storage"), None);
    }

    #[test]
    fn pivot_serializes_as_flat_rows() {
        let rows = pivot(&[rec(1, "compute", "10.50"), rec(1, "storage", "2.00")]);
        let value = serde_json::to_value(&rows).expect("serialize");
        assert_eq!(value[0]["date"], "2024-01-01");
        assert!(value[0]["compute"].is_number());
        assert_eq!(value[0]["compute"], 10.5);
        assert_eq!(value[0]["storage"], 2.0);
        assert_eq!(value[0].as_object().map(|o| o.len()), Some(3));
    }

    #[test]
    fn pivot_keeps_first_seen_date_order() {
        let rows = pivot(&[
            rec(3, "compute", "1"),
            rec(1, "compute", "2"),
            rec(3, "storage", "3"),
            rec(2, "compute", "4"),
        ]);
        let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(3), day(1), day(2)]);
    }

    #[test]
    fn chronological_order_sorts_by_date() {
        let report = pivot_with(
            &[rec(3, "compute", "1"), rec(1, "compute", "2"), rec(2, "compute", "4")],
            PivotOptions {
                order: RowOrder::Chronological,
                ..PivotOptions::default()
            },
        );
        let dates: Vec<_> = report.rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3)]);
    }

    #[test]
    fn duplicate_category_is_last_write_wins_by_default() {
        let rows = pivot(&[
            rec(1, "compute", "5.00"),
            rec(1, "compute", "7.25"),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("compute"), Some(Decimal::new(725, 2)));
    }

    #[test]
    fn sum_policy_adds_duplicates() {
        let report = pivot_with(
            &[rec(1, "compute", "5.00"), rec(1, "compute", "7.25")],
            PivotOptions {
                merge: MergePolicy::Sum,
                ..PivotOptions::default()
            },
        );
        assert_eq!(report.rows[0].get("compute"), Some(Decimal::new(1225, 2)));
        assert!(report.overflowed.is_empty());
    }

    #[test]
    fn sum_overflow_keeps_previous_total() {
        let max = Decimal::MAX.to_string();
        let report = pivot_with(
            &[rec(1, "compute", &max), rec(1, "compute", "1")],
            PivotOptions {
                merge: MergePolicy::Sum,
                ..PivotOptions::default()
            },
        );

        assert_eq!(report.rows[0].get("compute"), Some(Decimal::MAX));
        assert!(report.malformed.is_empty());
        assert_eq!(
            report.overflowed,
            vec![OverflowedSum {
                date: day(1),
                category: "compute".into(),
                kept: Decimal::MAX,
                dropped: Decimal::ONE,
            }]
        );
    }

    #[test]
    fn every_date_appears_exactly_once() {
        let records: Vec<_> = (0..30)
            .map(|i| rec(i % 7 + 1, if i % 2 == 0 { "compute" } else { "network" }, "1"))
            .collect();
        let rows = pivot(&records);
        let distinct: std::collections::HashSet<_> = rows.iter().map(|r| r.date).collect();
        assert_eq!(rows.len(), 7);
        assert_eq!(distinct.len(), 7);
    }

    #[test]
    fn pivot_is_deterministic() {
        let records = vec![
            rec(2, "network", "0.10"),
            rec(1, "compute", "3"),
            rec(2, "compute", "1"),
            rec(1, "storage", "9.99"),
        ];
        assert_eq!(pivot(&records), pivot(&records));
    }

    #[test]
    fn malformed_cost_is_skipped_and_reported() {
        let mut missing = rec(2, "storage", "0");
        missing.total_cost = None;

        let report = pivot_with(
            &[rec(1, "compute", "abc"), rec(1, "storage", "2.00"), missing],
            PivotOptions::default(),
        );

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].get("compute"), None);
        assert_eq!(report.rows[0].get("storage"), Some(Decimal::new(2, 0)));
        assert!(report.rows[1].values.is_empty());
        assert_eq!(report.malformed.len(), 2);
        assert_eq!(report.malformed[0].category, "compute");
        assert_eq!(report.malformed[0].raw.as_deref(), Some("\"abc\""));
        assert_eq!(report.malformed[1].raw, None);
        assert_eq!(report.categories, vec!["storage".to_string()]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let report = pivot_with(&[], PivotOptions::default());
        assert!(report.rows.is_empty());
        assert!(report.categories.is_empty());
        assert!(report.malformed.is_empty());
    }

    #[test]
    fn categories_follow_first_seen_order() {
        let report = pivot_with(
            &[
                rec(1, "storage", "1"),
                rec(1, "compute", "1"),
                rec(2, "network", "1"),
                rec(2, "storage", "1"),
            ],
            PivotOptions::default(),
        );
        assert_eq!(report.categories, vec!["storage", "compute", "network"]);
    }
}
