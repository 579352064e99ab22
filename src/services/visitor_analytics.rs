//! Time-bucketed visitor statistics.
//!
//! `aggregate` folds raw visit rows into a dense series (empty buckets are
//! present with a zero count) plus device/region breakdowns and the share of
//! returning visitors. All bucketing is done in UTC.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::models::visitor::{self, DeviceClass};

/// Symbolic lookback accepted by the visitor report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
pub enum RangeToken {
    #[strum(serialize = "7days")]
    SevenDays,
    #[strum(serialize = "30days")]
    ThirtyDays,
    #[strum(serialize = "3month")]
    ThreeMonths,
    #[strum(serialize = "1year")]
    OneYear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Monthly,
}

impl Granularity {
    fn key(self, day: NaiveDate) -> String {
        match self {
            Granularity::Daily => day.format("%Y-%m-%d").to_string(),
            Granularity::Monthly => day.format("%Y-%m").to_string(),
        }
    }
}

impl RangeToken {
    /// Parses a range token. Anything unrecognised means a one year lookback.
    pub fn parse(token: &str) -> Self {
        token.parse().unwrap_or(RangeToken::OneYear)
    }

    /// Range for an optional query parameter; a missing value means 7 days.
    pub fn from_query(token: Option<&str>) -> Self {
        token.map_or(RangeToken::SevenDays, Self::parse)
    }

    pub fn granularity(self) -> Granularity {
        match self {
            RangeToken::OneYear => Granularity::Monthly,
            _ => Granularity::Daily,
        }
    }

    /// First day of every bucket in the window ending at `today`, ascending.
    pub fn bucket_starts(self, today: NaiveDate) -> Vec<NaiveDate> {
        match self {
            RangeToken::SevenDays => trailing_days(today, 7),
            RangeToken::ThirtyDays => trailing_days(today, 30),
            RangeToken::ThreeMonths => {
                let start = today
                    .checked_sub_months(Months::new(3))
                    .map(|d| d + Duration::days(1))
                    .unwrap_or(today);
                let count = (today - start).num_days() + 1;
                trailing_days(today, count)
            }
            RangeToken::OneYear => {
                let current_month = today.with_day(1).unwrap_or(today);
                (0..12)
                    .rev()
                    .filter_map(|back| current_month.checked_sub_months(Months::new(back)))
                    .collect()
            }
        }
    }

    /// Start of the earliest bucket, i.e. the lower bound for fetching rows.
    pub fn window_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let first = self
            .bucket_starts(today)
            .into_iter()
            .next()
            .unwrap_or(today);
        first.and_time(NaiveTime::MIN).and_utc()
    }
}

fn trailing_days(today: NaiveDate, count: i64) -> Vec<NaiveDate> {
    (0..count.max(1))
        .rev()
        .map(|back| today - Duration::days(back))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GraphPoint {
    pub date: String,
    pub visitors: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeviceCount {
    pub device: DeviceClass,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RegionCount {
    pub region: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitorSummary {
    pub total: u64,
    pub device: Vec<DeviceCount>,
    pub region: Vec<RegionCount>,
    pub returning_visitor_percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VisitorReport {
    pub graph: Vec<GraphPoint>,
    pub summary: VisitorSummary,
}

/// Aggregates `records` for `range` as seen at `now`.
///
/// Rows created before the window start are ignored.
pub fn aggregate(records: &[visitor::Model], range: RangeToken, now: DateTime<Utc>) -> VisitorReport {
    let granularity = range.granularity();
    let window_start = range.window_start(now);

    let mut series: BTreeMap<String, u64> = range
        .bucket_starts(now.date_naive())
        .into_iter()
        .map(|day| (granularity.key(day), 0))
        .collect();
    let mut devices: IndexMap<DeviceClass, u64> = IndexMap::new();
    let mut regions: IndexMap<String, u64> = IndexMap::new();
    let mut visits_per_uuid: HashMap<&str, u64> = HashMap::new();
    let mut total = 0u64;

    for record in records.iter().filter(|r| r.created_at >= window_start) {
        total += 1;

        if let Some(count) = series.get_mut(&granularity.key(record.created_at.date_naive())) {
            *count += 1;
        }
        *devices.entry(record.device).or_insert(0) += 1;
        *regions
            .entry(format!("{} {}", record.region, record.country))
            .or_insert(0) += 1;
        *visits_per_uuid.entry(record.uuid.as_str()).or_insert(0) += 1;
    }

    let unique = visits_per_uuid.len() as u64;
    let returning = visits_per_uuid.values().filter(|&&n| n > 1).count() as u64;

    VisitorReport {
        graph: series
            .into_iter()
            .map(|(date, visitors)| GraphPoint { date, visitors })
            .collect(),
        summary: VisitorSummary {
            total,
            device: devices
                .into_iter()
                .map(|(device, value)| DeviceCount { device, value })
                .collect(),
            region: regions
                .into_iter()
                .map(|(region, value)| RegionCount { region, value })
                .collect(),
            returning_visitor_percentage: returning_percentage(returning, unique),
        },
    }
}

/// `round(100 * returning / unique)`, or 0 with no visitors.
pub fn returning_percentage(returning: u64, unique: u64) -> u32 {
    if unique == 0 {
        return 0;
    }
    ((200 * returning + unique) / (2 * unique)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn visit(uuid: &str, device: DeviceClass, created_at: DateTime<Utc>) -> visitor::Model {
        visitor::Model {
            id: 0,
            uuid: uuid.to_string(),
            user_agent: String::new(),
            device,
            ip_address: "203.0.113.7".to_string(),
            city: "Cebu City".to_string(),
            region: "Central Visayas".to_string(),
            country: "Philippines".to_string(),
            created_at,
        }
    }

    #[test]
    fn parses_tokens_with_fallbacks() {
        assert_eq!(RangeToken::parse("7days"), RangeToken::SevenDays);
        assert_eq!(RangeToken::parse("30days"), RangeToken::ThirtyDays);
        assert_eq!(RangeToken::parse("3month"), RangeToken::ThreeMonths);
        assert_eq!(RangeToken::parse("1year"), RangeToken::OneYear);
        assert_eq!(RangeToken::parse("fortnight"), RangeToken::OneYear);
        assert_eq!(RangeToken::from_query(None), RangeToken::SevenDays);
        assert_eq!(RangeToken::from_query(Some("")), RangeToken::OneYear);
    }

    #[test]
    fn empty_input_yields_zeroed_week() {
        let report = aggregate(&[], RangeToken::SevenDays, at(2026, 3, 10, 12));

        assert_eq!(report.graph.len(), 7);
        assert!(report.graph.iter().all(|p| p.visitors == 0));
        assert_eq!(report.graph.first().unwrap().date, "2026-03-04");
        assert_eq!(report.graph.last().unwrap().date, "2026-03-10");
        assert!(report.summary.device.is_empty());
        assert!(report.summary.region.is_empty());
        assert_eq!(report.summary.total, 0);
        assert_eq!(report.summary.returning_visitor_percentage, 0);
    }

    #[test]
    fn thirty_day_window_has_thirty_buckets() {
        let report = aggregate(&[], RangeToken::ThirtyDays, at(2026, 3, 10, 0));
        assert_eq!(report.graph.len(), 30);
        assert_eq!(report.graph[0].date, "2026-02-09");
    }

    #[test]
    fn three_month_window_spans_back_three_calendar_months() {
        let report = aggregate(&[], RangeToken::ThreeMonths, at(2026, 3, 10, 0));
        // 2025-12-11 ..= 2026-03-10
        assert_eq!(report.graph.len(), 90);
        assert_eq!(report.graph[0].date, "2025-12-11");
    }

    #[test]
    fn one_year_has_twelve_sorted_months() {
        let report = aggregate(&[], RangeToken::OneYear, at(2026, 3, 10, 0));
        let keys: Vec<_> = report.graph.iter().map(|p| p.date.as_str()).collect();

        assert_eq!(keys.len(), 12);
        assert_eq!(keys[0], "2025-04");
        assert_eq!(keys[11], "2026-03");
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn same_uuid_twice_is_fully_returning() {
        let now = at(2026, 3, 10, 18);
        let records = vec![
            visit("a", DeviceClass::Mobile, at(2026, 3, 9, 8)),
            visit("a", DeviceClass::Mobile, at(2026, 3, 10, 9)),
        ];

        let report = aggregate(&records, RangeToken::SevenDays, now);
        assert_eq!(report.summary.returning_visitor_percentage, 100);
        assert_eq!(report.summary.total, 2);
    }

    #[test]
    fn folds_records_into_buckets_and_summaries() {
        let now = at(2026, 3, 10, 18);
        let mut records = vec![
            visit("a", DeviceClass::Desktop, at(2026, 3, 10, 1)),
            visit("b", DeviceClass::Mobile, at(2026, 3, 10, 2)),
            visit("a", DeviceClass::Desktop, at(2026, 3, 8, 3)),
            visit("c", DeviceClass::Tablet, at(2026, 3, 4, 0)),
            // before the window, ignored everywhere
            visit("z", DeviceClass::Tablet, at(2026, 3, 3, 23)),
        ];
        records[1].region = "Metro Manila".to_string();

        let report = aggregate(&records, RangeToken::SevenDays, now);
        let count = |date: &str| {
            report
                .graph
                .iter()
                .find(|p| p.date == date)
                .map(|p| p.visitors)
        };

        assert_eq!(count("2026-03-10"), Some(2));
        assert_eq!(count("2026-03-08"), Some(1));
        assert_eq!(count("2026-03-04"), Some(1));
        assert_eq!(count("2026-03-03"), None);
        assert_eq!(report.summary.total, 4);

        assert_eq!(
            report.summary.device,
            vec![
                DeviceCount { device: DeviceClass::Desktop, value: 2 },
                DeviceCount { device: DeviceClass::Mobile, value: 1 },
                DeviceCount { device: DeviceClass::Tablet, value: 1 },
            ]
        );
        assert_eq!(
            report.summary.region,
            vec![
                RegionCount { region: "Central Visayas Philippines".to_string(), value: 3 },
                RegionCount { region: "Metro Manila Philippines".to_string(), value: 1 },
            ]
        );
        // a returned, b and c did not: 1 of 3
        assert_eq!(report.summary.returning_visitor_percentage, 33);
    }

    #[test]
    fn monthly_buckets_use_month_keys() {
        let now = at(2026, 3, 10, 0);
        let records = vec![
            visit("a", DeviceClass::Desktop, at(2025, 4, 1, 0)),
            visit("b", DeviceClass::Desktop, at(2026, 3, 1, 0)),
            visit("c", DeviceClass::Desktop, at(2025, 3, 31, 23)),
        ];

        let report = aggregate(&records, RangeToken::OneYear, now);
        assert_eq!(report.graph[0].visitors, 1);
        assert_eq!(report.graph[11].visitors, 1);
        assert_eq!(report.summary.total, 2);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(returning_percentage(0, 0), 0);
        assert_eq!(returning_percentage(1, 2), 50);
        assert_eq!(returning_percentage(2, 3), 67);
        assert_eq!(returning_percentage(1, 8), 13);
    }

    #[test]
    fn summary_serializes_camel_case() {
        let report = aggregate(&[], RangeToken::SevenDays, at(2026, 3, 10, 0));
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["summary"]["returningVisitorPercentage"].is_number());
        assert!(json["graph"][0]["visitors"].is_number());
    }
}
