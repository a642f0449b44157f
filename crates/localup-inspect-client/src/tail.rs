//! Polling tail of newly captured requests
//!
//! The inspector API only serves full snapshots, so new records are found by
//! diffing each poll against the set of IDs already observed. The first poll
//! only records what is already there.

use chrono::Utc;
use localup_inspect_proto::{CapturedRecord, FormatOptions, RequestFilters};
use localup_inspect_report::ReportFormatter;
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::InspectorError;
use crate::service::list_query;
use crate::source::InspectorSource;

/// Delay between two polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Counters reported when a tail ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailStats {
    pub polls: u64,
    pub emitted: u64,
    /// Distinct record IDs observed
    pub seen: usize,
}

/// Poll loop emitting each matching record once, oldest first
pub struct TailLoop<'a, S: InspectorSource + ?Sized> {
    source: &'a S,
    filters: RequestFilters,
    options: FormatOptions,
    formatter: ReportFormatter,
    poll_interval: Duration,
    seen: HashSet<String>,
    primed: bool,
    stats: TailStats,
}

impl<'a, S: InspectorSource + ?Sized> TailLoop<'a, S> {
    /// The limit in `filters` is ignored
    pub fn new(source: &'a S, filters: &RequestFilters, options: FormatOptions) -> Self {
        Self {
            source,
            filters: filters.for_tail(),
            options,
            formatter: ReportFormatter::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            seen: HashSet::new(),
            primed: false,
            stats: TailStats::default(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn stats(&self) -> TailStats {
        self.stats
    }

    /// Fetch one snapshot and return the new matching records, oldest first
    ///
    /// Every unseen ID is remembered whether or not it matches, so a record
    /// filtered out now is never emitted later.
    pub async fn poll(&mut self) -> Result<Vec<CapturedRecord>, InspectorError> {
        let query = list_query(&self.filters);
        let snapshot = self.source.list_records(&query).await?;
        self.stats.polls += 1;

        let now = Utc::now();
        let mut fresh = Vec::new();
        for record in snapshot {
            if !self.seen.insert(record.id.clone()) {
                continue;
            }
            if self.primed && self.filters.matches(&record, now) {
                fresh.push(record);
            }
        }
        self.stats.seen = self.seen.len();

        if !self.primed {
            self.primed = true;
            debug!("Tail primed with {} existing record(s)", self.seen.len());
            return Ok(Vec::new());
        }

        // Snapshots are newest first
        fresh.reverse();
        Ok(fresh)
    }

    /// Poll until `cancel` fires, passing each formatted entry to `emit`
    ///
    /// A fetch error ends the loop.
    pub async fn run<F>(mut self, cancel: CancellationToken, mut emit: F) -> Result<TailStats, InspectorError>
    where
        F: FnMut(String),
    {
        info!("Tailing captured requests every {:?}", self.poll_interval);

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let fresh = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.poll() => result?,
            };

            for record in &fresh {
                emit(self.formatter.format_tail_entry(record, &self.options));
                self.stats.emitted += 1;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!(
            "Tail stopped after {} poll(s), {} record(s) emitted",
            self.stats.polls, self.stats.emitted
        );
        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::record;
    use async_trait::async_trait;
    use localup_inspect_proto::{ListQuery, StatusCodeFilter};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type Snapshot = Result<Vec<CapturedRecord>, InspectorError>;

    /// Serves queued snapshots, then cancels the tail
    struct ScriptedSource {
        snapshots: Mutex<VecDeque<Snapshot>>,
        cancel: CancellationToken,
    }

    impl ScriptedSource {
        fn new(snapshots: Vec<Snapshot>, cancel: CancellationToken) -> Self {
            Self {
                snapshots: Mutex::new(snapshots.into()),
                cancel,
            }
        }
    }

    #[async_trait]
    impl InspectorSource for ScriptedSource {
        async fn list_records(&self, _query: &ListQuery) -> Result<Vec<CapturedRecord>, InspectorError> {
            let next = self.snapshots.lock().unwrap().pop_front();
            match next {
                Some(snapshot) => snapshot,
                None => {
                    self.cancel.cancel();
                    Ok(Vec::new())
                }
            }
        }

        async fn get_record(&self, id: &str) -> Result<CapturedRecord, InspectorError> {
            Err(InspectorError::NotFound(id.to_string()))
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn ids(entries: &[String]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| {
                entry
                    .lines()
                    .find_map(|line| line.strip_prefix("**ID:** "))
                    .unwrap()
                    .trim_matches('`')
                    .to_string()
            })
            .collect()
    }

    async fn run_script(snapshots: Vec<Snapshot>, filters: RequestFilters) -> (Vec<String>, Result<TailStats, InspectorError>) {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(snapshots, cancel.clone());
        let mut entries = Vec::new();

        let result = TailLoop::new(&source, &filters, FormatOptions::default())
            .run(cancel, |entry| entries.push(entry))
            .await;

        (entries, result)
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_each_new_record_once() {
        let a = record("A", "/a", Some(200));
        let b = record("B", "/b", Some(200));
        let c = record("C", "/c", Some(200));

        let (entries, result) = run_script(
            vec![
                Ok(vec![a.clone()]),
                Ok(vec![b.clone(), a.clone()]),
                Ok(vec![c.clone(), b.clone(), a.clone()]),
                Ok(vec![c, b, a]),
            ],
            RequestFilters::new(),
        )
        .await;

        assert_eq!(ids(&entries), vec!["B", "C"]);

        let stats = result.unwrap();
        assert_eq!(stats.emitted, 2);
        assert_eq!(stats.seen, 3);
        assert_eq!(stats.polls, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_records_emitted_oldest_first() {
        let (entries, _) = run_script(
            vec![
                Ok(vec![record("A", "/a", Some(200))]),
                Ok(vec![
                    record("D", "/d", Some(200)),
                    record("C", "/c", Some(200)),
                    record("B", "/b", Some(200)),
                    record("A", "/a", Some(200)),
                ]),
            ],
            RequestFilters::new(),
        )
        .await;

        assert_eq!(ids(&entries), vec!["B", "C", "D"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filtered_out_record_never_emitted_later() {
        let filters = RequestFilters {
            status: Some(StatusCodeFilter::errors_only()),
            ..Default::default()
        };

        let (entries, result) = run_script(
            vec![
                Ok(vec![]),
                // Still pending, so the status filter rejects it
                Ok(vec![record("P", "/slow", None), record("E", "/boom", Some(500))]),
                // Response arrived in the meantime
                Ok(vec![record("P", "/slow", Some(502)), record("E", "/boom", Some(500))]),
            ],
            filters,
        )
        .await;

        assert_eq!(ids(&entries), vec!["E"]);
        assert_eq!(result.unwrap().seen, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_is_ignored() {
        let filters = RequestFilters {
            limit: Some(1),
            ..Default::default()
        };

        let (entries, _) = run_script(
            vec![
                Ok(vec![]),
                Ok(vec![record("B", "/b", Some(200)), record("A", "/a", Some(200))]),
            ],
            filters,
        )
        .await;

        assert_eq!(entries.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_ends_tail() {
        let (entries, result) = run_script(
            vec![
                Ok(vec![record("A", "/a", Some(200))]),
                Err(InspectorError::Http {
                    status: 500,
                    url: "http://127.0.0.1:4040/api/requests/http".to_string(),
                }),
                Ok(vec![record("B", "/b", Some(200))]),
            ],
            RequestFilters::new(),
        )
        .await;

        assert!(entries.is_empty());
        assert!(matches!(result, Err(InspectorError::Http { status: 500, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_has_separator() {
        let (entries, _) = run_script(
            vec![Ok(vec![]), Ok(vec![record("A", "/api/users", Some(201))])],
            RequestFilters::new(),
        )
        .await;

        assert_eq!(entries.len(), 1);
        assert!(entries[0].starts_with("──── GET /api/users ────\n\n## GET /api/users"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_wait() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![Ok(vec![record("A", "/a", Some(200))])],
            CancellationToken::new(),
        );
        let mut emitted = 0;

        let tail = TailLoop::new(&source, &RequestFilters::new(), FormatOptions::default())
            .with_poll_interval(Duration::from_secs(3600));

        let canceller = cancel.clone();
        let (result, _) = tokio::join!(tail.run(cancel, |_| emitted += 1), async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let stats = result.unwrap();
        assert_eq!(stats.polls, 1);
        assert_eq!(emitted, 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let source = ScriptedSource::new(vec![], CancellationToken::new());

        let stats = TailLoop::new(&source, &RequestFilters::new(), FormatOptions::default())
            .run(cancel, |_| {})
            .await
            .unwrap();

        assert_eq!(stats, TailStats::default());
    }
}
