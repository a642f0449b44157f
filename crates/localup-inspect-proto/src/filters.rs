//! Record filters
//!
//! All filters present in a [`RequestFilters`] are combined with AND; absent
//! filters impose no constraint. The limit is applied to the filtered
//! result, not to the raw record set.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::ParseError;
use crate::path_pattern::PathPattern;
use crate::records::CapturedRecord;

/// Unit of a [`TimeWindow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    fn seconds(self) -> i64 {
        match self {
            TimeUnit::Seconds => 1,
            TimeUnit::Minutes => 60,
            TimeUnit::Hours => 3600,
        }
    }

    fn code(self) -> char {
        match self {
            TimeUnit::Seconds => 's',
            TimeUnit::Minutes => 'm',
            TimeUnit::Hours => 'h',
        }
    }
}

/// Relative time window such as `5s`, `2m` or `1h`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    value: u64,
    unit: TimeUnit,
}

impl TimeWindow {
    /// Create a window; the value must be positive
    pub fn new(value: u64, unit: TimeUnit) -> Result<Self, ParseError> {
        if value == 0 {
            return Err(ParseError::TimeWindow(format!("0{}", unit.code())));
        }
        Ok(Self { value, unit })
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Window length, saturating at the largest representable duration
    pub fn to_duration(&self) -> Duration {
        i64::try_from(self.value)
            .ok()
            .and_then(|value| value.checked_mul(self.unit.seconds()))
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    /// Oldest start time still inside the window, relative to `now`
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.to_duration())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl FromStr for TimeWindow {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let invalid = || ParseError::TimeWindow(s.to_string());

        let unit = match normalized.chars().last() {
            Some('s') => TimeUnit::Seconds,
            Some('m') => TimeUnit::Minutes,
            Some('h') => TimeUnit::Hours,
            _ => return Err(invalid()),
        };

        let digits = &normalized[..normalized.len() - 1];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        // All digits, so the only parse failure is overflow
        let value: u64 = digits.parse().unwrap_or(u64::MAX);
        TimeWindow::new(value, unit).map_err(|_| invalid())
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.code())
    }
}

/// Predicate over response status codes
///
/// Exact codes, status classes (`4xx`) and `errors_only` are OR-combined.
/// An empty filter matches every code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCodeFilter {
    exact: Vec<u16>,
    ranges: Vec<u8>,
    errors_only: bool,
}

impl StatusCodeFilter {
    /// Create an empty filter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Match status codes >= 400
    pub fn errors_only() -> Self {
        Self::new().with_errors_only(true)
    }

    pub fn with_errors_only(mut self, errors_only: bool) -> Self {
        self.errors_only = errors_only;
        self
    }

    pub fn with_exact(mut self, code: u16) -> Self {
        if !self.exact.contains(&code) {
            self.exact.push(code);
        }
        self
    }

    /// Add a status class by its leading digit (`4` for `4xx`)
    pub fn with_range(mut self, class: u8) -> Self {
        if !self.ranges.contains(&class) {
            self.ranges.push(class);
        }
        self
    }

    /// Build a filter from user tokens such as `404` or `5xx`
    pub fn from_tokens<I, S>(tokens: I, errors_only: bool) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::new().with_errors_only(errors_only);

        for token in tokens {
            let raw = token.as_ref();
            let value = raw.trim().to_ascii_lowercase();
            let invalid = |reason: &str| ParseError::StatusFilter {
                input: raw.to_string(),
                reason: reason.to_string(),
            };

            if let Some(class) = value.strip_suffix("xx") {
                match class.parse::<u8>() {
                    Ok(digit @ 1..=5) if class.len() == 1 => filter = filter.with_range(digit),
                    _ => return Err(invalid("use 1xx, 2xx, 3xx, 4xx or 5xx")),
                }
                continue;
            }

            match value.parse::<u16>() {
                Ok(code @ 100..=599) => filter = filter.with_exact(code),
                Ok(_) => return Err(invalid("status code must be between 100 and 599")),
                Err(_) => return Err(invalid("use a number (404) or a range (4xx)")),
            }
        }

        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.ranges.is_empty() && !self.errors_only
    }

    pub fn exact(&self) -> &[u16] {
        &self.exact
    }

    pub fn ranges(&self) -> &[u8] {
        &self.ranges
    }

    pub fn is_errors_only(&self) -> bool {
        self.errors_only
    }

    /// Check if a status code matches the filter
    pub fn matches(&self, code: u16) -> bool {
        if self.is_empty() {
            return true;
        }

        if self.errors_only && code >= 400 {
            return true;
        }

        if self.exact.contains(&code) {
            return true;
        }

        self.ranges
            .iter()
            .any(|&class| code / 100 == u16::from(class))
    }
}

/// Filter stage that rejected a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStage {
    Status,
    Path,
    Domain,
    Tunnel,
    TimeWindow,
}

impl FilterStage {
    const ALL: [FilterStage; 5] = [
        FilterStage::Status,
        FilterStage::Path,
        FilterStage::Domain,
        FilterStage::Tunnel,
        FilterStage::TimeWindow,
    ];

    fn name(self) -> &'static str {
        match self {
            FilterStage::Status => "status",
            FilterStage::Path => "path",
            FilterStage::Domain => "domain",
            FilterStage::Tunnel => "tunnel",
            FilterStage::TimeWindow => "time_window",
        }
    }
}

/// Combined filters for request queries
#[derive(Debug, Clone, Default)]
pub struct RequestFilters {
    /// Maximum number of matching records to return
    pub limit: Option<usize>,
    pub status: Option<StatusCodeFilter>,
    pub path_pattern: Option<PathPattern>,
    /// Compared case-sensitively with [`CapturedRecord::domain`]
    pub domain: Option<String>,
    pub tunnel_name: Option<String>,
    pub time_window: Option<TimeWindow>,
}

impl RequestFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of these filters without the limit, as used by tail
    pub fn for_tail(&self) -> Self {
        Self {
            limit: None,
            ..self.clone()
        }
    }

    /// True when no predicate is set (the limit is not a predicate)
    pub fn has_predicates(&self) -> bool {
        self.status.is_some()
            || self.path_pattern.is_some()
            || self.domain.is_some()
            || self.tunnel_name.is_some()
            || self.time_window.is_some()
    }

    /// First stage rejecting `record`, evaluated in fixed order
    pub fn rejection(&self, record: &CapturedRecord, now: DateTime<Utc>) -> Option<FilterStage> {
        if let Some(status) = &self.status {
            match record.status_code() {
                Some(code) if status.matches(code) => {}
                _ => return Some(FilterStage::Status),
            }
        }

        if let Some(pattern) = &self.path_pattern {
            if !pattern.matches(&record.path()) {
                return Some(FilterStage::Path);
            }
        }

        if let Some(domain) = &self.domain {
            if record.domain().as_deref() != Some(domain.as_str()) {
                return Some(FilterStage::Domain);
            }
        }

        if let Some(tunnel_name) = &self.tunnel_name {
            if record.tunnel_name != *tunnel_name {
                return Some(FilterStage::Tunnel);
            }
        }

        if let Some(window) = &self.time_window {
            if record.start < window.cutoff(now) {
                return Some(FilterStage::TimeWindow);
            }
        }

        None
    }

    /// Check a single record against every present predicate
    pub fn matches(&self, record: &CapturedRecord, now: DateTime<Utc>) -> bool {
        self.rejection(record, now).is_none()
    }

    /// Filter records against the current time, then apply the limit
    pub fn apply(&self, records: Vec<CapturedRecord>) -> Vec<CapturedRecord> {
        self.apply_at(records, Utc::now())
    }

    /// Filter records relative to `now`, then apply the limit
    pub fn apply_at(&self, records: Vec<CapturedRecord>, now: DateTime<Utc>) -> Vec<CapturedRecord> {
        let total = records.len();
        let mut rejected = [0usize; FilterStage::ALL.len()];

        let mut kept: Vec<CapturedRecord> = records
            .into_iter()
            .filter(|record| match self.rejection(record, now) {
                Some(stage) => {
                    rejected[stage as usize] += 1;
                    false
                }
                None => true,
            })
            .collect();

        for stage in FilterStage::ALL {
            let count = rejected[stage as usize];
            if count > 0 {
                debug!("filter: {} filter rejected {} record(s)", stage.name(), count);
            }
        }

        if let Some(limit) = self.limit {
            kept.truncate(limit);
        }

        debug!("filter: kept {} of {} record(s)", kept.len(), total);
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::tests::{record, record_json};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 35, 0).unwrap()
    }

    fn sample_records() -> Vec<CapturedRecord> {
        vec![
            record("r1", "/api/v1/devices", Some(200)),
            record("r2", "/api/v1/users/456", Some(404)),
            record("r3", "/webhook/events", Some(500)),
            record("r4", "/api/v1/pending", None),
        ]
    }

    fn ids(records: &[CapturedRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_time_window_parse() {
        let window: TimeWindow = "5s".parse().unwrap();
        assert_eq!(window.unit(), TimeUnit::Seconds);
        assert_eq!(window.to_duration(), Duration::seconds(5));

        let window: TimeWindow = "2m".parse().unwrap();
        assert_eq!(window.to_duration(), Duration::minutes(2));

        let window: TimeWindow = " 1H ".parse().unwrap();
        assert_eq!(window.to_duration(), Duration::hours(1));
        assert_eq!(window.to_string(), "1h");
    }

    #[test]
    fn test_time_window_rejects_invalid() {
        for input in ["5", "m5", "0s", "", "s", "5d", "-5s", "5 s", "1.5m"] {
            assert!(
                matches!(input.parse::<TimeWindow>(), Err(ParseError::TimeWindow(_))),
                "expected {:?} to be rejected",
                input
            );
        }
    }

    #[test]
    fn test_time_window_accepts_large_values() {
        let window: TimeWindow = "4294967296s".parse().unwrap();
        assert_eq!(window.value(), 4_294_967_296);
        assert_eq!(window.to_duration(), Duration::seconds(4_294_967_296));

        for input in ["9999999999999999h", "99999999999999999999999999m"] {
            let window: TimeWindow = input.parse().unwrap();
            assert_eq!(window.to_duration(), Duration::MAX);
            assert_eq!(window.cutoff(now()), DateTime::<Utc>::MIN_UTC);
        }
    }

    #[test]
    fn test_time_window_cutoff() {
        let window = TimeWindow::new(10, TimeUnit::Minutes).unwrap();
        assert_eq!(
            window.cutoff(now()),
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 25, 0).unwrap()
        );
    }

    #[test]
    fn test_empty_status_filter_matches_all() {
        let filter = StatusCodeFilter::new();
        assert!(filter.is_empty());
        assert!((0..=999).all(|code| filter.matches(code)));
    }

    #[test]
    fn test_status_range_matches_class() {
        for class in 0..=9u8 {
            let filter = StatusCodeFilter::new().with_range(class);
            for code in 0..=999u16 {
                assert_eq!(filter.matches(code), code / 100 == u16::from(class));
            }
        }
    }

    #[test]
    fn test_status_errors_only() {
        let filter = StatusCodeFilter::errors_only();
        assert!(!filter.matches(200));
        assert!(!filter.matches(399));
        assert!(filter.matches(400));
        assert!(filter.matches(503));
    }

    #[test]
    fn test_status_predicates_are_or_combined() {
        let filter = StatusCodeFilter::errors_only().with_exact(201);
        assert!(filter.matches(201));
        assert!(filter.matches(404));
        assert!(!filter.matches(200));
    }

    #[test]
    fn test_status_from_tokens() {
        let filter = StatusCodeFilter::from_tokens(["404", "5XX"], false).unwrap();
        assert_eq!(filter.exact(), &[404]);
        assert_eq!(filter.ranges(), &[5]);
        assert!(filter.matches(404));
        assert!(filter.matches(502));
        assert!(!filter.matches(403));
    }

    #[test]
    fn test_status_from_tokens_invalid() {
        for token in ["abc", "6xx", "42xx", "99", "600", "xx"] {
            let result = StatusCodeFilter::from_tokens([token], false);
            assert!(
                matches!(result, Err(ParseError::StatusFilter { .. })),
                "expected {:?} to be rejected",
                token
            );
        }
    }

    #[test]
    fn test_absent_filters_keep_everything_in_order() {
        let records = sample_records();
        let result = RequestFilters::new().apply_at(records.clone(), now());
        assert_eq!(result, records);
    }

    #[test]
    fn test_status_filter_excludes_pending() {
        let filters = RequestFilters {
            status: Some(StatusCodeFilter::new()),
            ..Default::default()
        };
        let result = filters.apply_at(sample_records(), now());
        assert_eq!(ids(&result), vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn test_status_range_filter() {
        let filters = RequestFilters {
            status: Some(StatusCodeFilter::new().with_range(4)),
            ..Default::default()
        };
        let result = filters.apply_at(sample_records(), now());
        assert_eq!(ids(&result), vec!["r2"]);
    }

    #[test]
    fn test_path_filter() {
        let filters = RequestFilters {
            path_pattern: Some(PathPattern::parse("/api/*").unwrap()),
            ..Default::default()
        };
        let result = filters.apply_at(sample_records(), now());
        assert_eq!(ids(&result), vec!["r1", "r2", "r4"]);
    }

    #[test]
    fn test_domain_filter_is_case_sensitive() {
        let filters = RequestFilters {
            domain: Some("abc.tunnel.io".to_string()),
            ..Default::default()
        };
        assert_eq!(filters.apply_at(sample_records(), now()).len(), 4);

        let filters = RequestFilters {
            domain: Some("ABC.tunnel.io".to_string()),
            ..Default::default()
        };
        assert!(filters.apply_at(sample_records(), now()).is_empty());
    }

    #[test]
    fn test_tunnel_filter() {
        let mut other = record_json("r5", "/", Some(200));
        other["tunnel_name"] = serde_json::json!("my-api");
        let mut records = sample_records();
        records.push(CapturedRecord::from_value(other).unwrap());

        let filters = RequestFilters {
            tunnel_name: Some("my-api".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filters.apply_at(records, now())), vec!["r5"]);
    }

    #[test]
    fn test_time_window_filter() {
        // Sample records start at 09:30 UTC
        let filters = RequestFilters {
            time_window: Some("10m".parse().unwrap()),
            ..Default::default()
        };
        assert_eq!(filters.apply_at(sample_records(), now()).len(), 4);

        let filters = RequestFilters {
            time_window: Some("2m".parse().unwrap()),
            ..Default::default()
        };
        assert!(filters.apply_at(sample_records(), now()).is_empty());
    }

    #[test]
    fn test_limit_applied_after_filtering() {
        let records: Vec<CapturedRecord> = (0..10)
            .map(|i| {
                let status = if i % 3 == 0 && i > 0 { 500 } else { 200 };
                record(&format!("r{}", i), "/api", Some(status))
            })
            .collect();

        let filters = RequestFilters {
            limit: Some(5),
            status: Some(StatusCodeFilter::errors_only()),
            ..Default::default()
        };
        let result = filters.apply_at(records.clone(), now());
        assert_eq!(ids(&result), vec!["r3", "r6", "r9"]);

        let filters = RequestFilters {
            limit: Some(2),
            ..filters
        };
        assert_eq!(ids(&filters.apply_at(records, now())), vec!["r3", "r6"]);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let filters = RequestFilters {
            status: Some(StatusCodeFilter::new().with_range(2).with_range(4)),
            path_pattern: Some(PathPattern::parse("/api/*").unwrap()),
            ..Default::default()
        };
        let once = filters.apply_at(sample_records(), now());
        let twice = filters.apply_at(once.clone(), now());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_errors_with_path_end_to_end() {
        let records = vec![record("x", "/api/v1/x", Some(500))];

        let filters = RequestFilters {
            status: Some(StatusCodeFilter::errors_only()),
            path_pattern: Some(PathPattern::parse("/api/*").unwrap()),
            ..Default::default()
        };
        assert_eq!(filters.apply_at(records.clone(), now()).len(), 1);

        let filters = RequestFilters {
            path_pattern: Some(PathPattern::parse("/other/*").unwrap()),
            ..Default::default()
        };
        assert!(filters.apply_at(records, now()).is_empty());
    }

    #[test]
    fn test_rejection_reports_first_failing_stage() {
        let filters = RequestFilters {
            status: Some(StatusCodeFilter::errors_only()),
            path_pattern: Some(PathPattern::parse("/nowhere").unwrap()),
            ..Default::default()
        };
        let ok = record("a", "/api", Some(200));
        let err = record("b", "/api", Some(500));

        assert_eq!(filters.rejection(&ok, now()), Some(FilterStage::Status));
        assert_eq!(filters.rejection(&err, now()), Some(FilterStage::Path));
    }

    #[test]
    fn test_for_tail_drops_limit() {
        let filters = RequestFilters {
            limit: Some(20),
            tunnel_name: Some("t".to_string()),
            ..Default::default()
        };
        let tail = filters.for_tail();
        assert_eq!(tail.limit, None);
        assert_eq!(tail.tunnel_name.as_deref(), Some("t"));
        assert!(tail.has_predicates());
    }
}
