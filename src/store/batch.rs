use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{error, info};

use crate::error::Result;
use crate::models::{LookbackWindow, PartitionPair, Scheme, SchemeAStats, SchemeBStats};
use crate::store::RateStore;

#[derive(Debug, Clone)]
enum WindowBatch<T> {
    Loaded(HashMap<PartitionPair, T>),
    Failed(String),
}

impl<T> WindowBatch<T> {
    fn from_result(result: Result<HashMap<PartitionPair, T>>) -> Self {
        match result {
            Ok(rows) => WindowBatch::Loaded(rows),
            Err(e) => WindowBatch::Failed(e.to_string()),
        }
    }

    fn lookup(&self, pair: &PartitionPair) -> StatsLookup<'_, T> {
        match self {
            WindowBatch::Loaded(rows) => rows
                .get(pair)
                .map_or(StatsLookup::NoData, StatsLookup::Found),
            WindowBatch::Failed(_) => StatsLookup::QueryFailed,
        }
    }

    fn row_count(&self) -> usize {
        match self {
            WindowBatch::Loaded(rows) => rows.len(),
            WindowBatch::Failed(_) => 0,
        }
    }
}

/// Outcome of looking up one pair in a cached batch result
#[derive(Debug, Clone, PartialEq)]
pub enum StatsLookup<'a, T> {
    Found(&'a T),
    /// The query ran and returned no rows for this pair
    NoData,
    /// The window's query failed; absence says nothing about the market
    QueryFailed,
}

impl<'a, T> StatsLookup<'a, T> {
    pub fn found(&self) -> Option<&'a T> {
        match self {
            StatsLookup::Found(stats) => Some(*stats),
            _ => None,
        }
    }

    pub fn is_query_failed(&self) -> bool {
        matches!(self, StatsLookup::QueryFailed)
    }
}

/// Read-only per-window caches built by the batched queries
#[derive(Debug, Clone, Default)]
pub struct BatchStatistics {
    scheme_a: BTreeMap<LookbackWindow, WindowBatch<SchemeAStats>>,
    scheme_b: BTreeMap<LookbackWindow, WindowBatch<SchemeBStats>>,
}

impl BatchStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_scheme_a(
        &mut self,
        window: LookbackWindow,
        result: Result<HashMap<PartitionPair, SchemeAStats>>,
    ) {
        self.scheme_a.insert(window, WindowBatch::from_result(result));
    }

    pub fn record_scheme_b(
        &mut self,
        window: LookbackWindow,
        result: Result<HashMap<PartitionPair, SchemeBStats>>,
    ) {
        self.scheme_b.insert(window, WindowBatch::from_result(result));
    }

    /// A window that was never queried reads as failed
    pub fn scheme_a(&self, window: LookbackWindow, pair: &PartitionPair) -> StatsLookup<'_, SchemeAStats> {
        self.scheme_a
            .get(&window)
            .map_or(StatsLookup::QueryFailed, |batch| batch.lookup(pair))
    }

    pub fn scheme_b(&self, window: LookbackWindow, pair: &PartitionPair) -> StatsLookup<'_, SchemeBStats> {
        self.scheme_b
            .get(&window)
            .map_or(StatsLookup::QueryFailed, |batch| batch.lookup(pair))
    }

    pub fn failed_queries(&self) -> Vec<(Scheme, LookbackWindow, String)> {
        let a = self.scheme_a.iter().filter_map(|(window, batch)| match batch {
            WindowBatch::Failed(msg) => Some((Scheme::SchemeA, *window, msg.clone())),
            WindowBatch::Loaded(_) => None,
        });
        let b = self.scheme_b.iter().filter_map(|(window, batch)| match batch {
            WindowBatch::Failed(msg) => Some((Scheme::SchemeB, *window, msg.clone())),
            WindowBatch::Loaded(_) => None,
        });
        a.chain(b).collect()
    }

    pub fn row_count(&self, scheme: Scheme) -> usize {
        match scheme {
            Scheme::SchemeA => self.scheme_a.values().map(WindowBatch::row_count).sum(),
            Scheme::SchemeB => self.scheme_b.values().map(WindowBatch::row_count).sum(),
        }
    }
}

/// Run one aggregate query per window per scheme for the collected pairs
///
/// A failed query leaves that window marked failed and the run goes on.
/// An empty pair set is recorded as loaded without touching the store.
pub fn fetch_batch_statistics<S: RateStore + ?Sized>(
    store: &S,
    scheme_a_pairs: &BTreeSet<PartitionPair>,
    scheme_b_pairs: &BTreeSet<PartitionPair>,
    windows: &[LookbackWindow],
) -> BatchStatistics {
    let a_pairs: Vec<PartitionPair> = scheme_a_pairs.iter().copied().collect();
    let b_pairs: Vec<PartitionPair> = scheme_b_pairs.iter().copied().collect();
    let mut stats = BatchStatistics::new();

    for &window in windows {
        let result = if a_pairs.is_empty() {
            Ok(HashMap::new())
        } else {
            store.query_scheme_a(&a_pairs, window)
        };
        log_batch_result(Scheme::SchemeA, window, a_pairs.len(), &result);
        stats.record_scheme_a(window, result);

        let result = if b_pairs.is_empty() {
            Ok(HashMap::new())
        } else {
            store.query_scheme_b(&b_pairs, window)
        };
        log_batch_result(Scheme::SchemeB, window, b_pairs.len(), &result);
        stats.record_scheme_b(window, result);
    }

    stats
}

fn log_batch_result<T>(
    scheme: Scheme,
    window: LookbackWindow,
    pair_count: usize,
    result: &Result<HashMap<PartitionPair, T>>,
) {
    match result {
        Ok(rows) => info!(
            "{} {}: {} of {} pairs have data",
            scheme,
            window,
            rows.len(),
            pair_count
        ),
        Err(e) => error!(
            "{} {} batch query failed, window treated as unavailable: {}",
            scheme, window, e
        ),
    }
}
