use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::clients::DistanceResolver;
use crate::config::{BatchConfig, ResumePolicy};
use crate::error::{ProcessingError, Result};
use crate::models::{
    Coordinate, PartitionMapping, PartitionPair, RouteCode, RouteRegions, RouteResult,
    RouteStage, RouteStatus,
};
use crate::processors::{QuoteAggregator, RegionMapper};
use crate::store::{fetch_batch_statistics, BatchStatistics, RateStore};
use crate::utils::constants::{
    DEFAULT_CHECKPOINT_INTERVAL_SECS, DEFAULT_PROGRESS_EVERY_ROUTES, MIN_DISTANCE_KM,
};
use crate::utils::filename::{
    checkpoint_path_for, default_results_filename_in, find_checkpoints,
    results_path_for_checkpoint,
};
use crate::utils::progress::ProgressReporter;
use crate::writers::{load_results, ResultsWriter};

/// Runtime knobs of a batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub min_distance_km: f64,
    pub checkpoint_interval: Duration,
    pub checkpoint_every_routes: Option<usize>,
    pub progress_every_routes: usize,
    pub resume_policy: ResumePolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            min_distance_km: MIN_DISTANCE_KM,
            checkpoint_interval: Duration::from_secs(DEFAULT_CHECKPOINT_INTERVAL_SECS),
            checkpoint_every_routes: None,
            progress_every_routes: DEFAULT_PROGRESS_EVERY_ROUTES,
            resume_policy: ResumePolicy::default(),
        }
    }
}

impl From<&BatchConfig> for BatchOptions {
    fn from(config: &BatchConfig) -> Self {
        Self {
            min_distance_km: config.min_distance_km,
            checkpoint_interval: config.checkpoint_interval(),
            checkpoint_every_routes: config.checkpoint_every_routes,
            progress_every_routes: config.progress_every_routes.max(1),
            resume_policy: config.resume_policy,
        }
    }
}

/// A route after the mapping pass
enum PreparedRoute {
    /// Reached a terminal state in pass 1
    Finished(RouteResult),
    Pending {
        route: String,
        code: RouteCode,
        regions: RouteRegions,
        mapping: PartitionMapping,
        coordinates: Option<(Coordinate, Coordinate)>,
    },
}

/// Counts and locations reported at the end of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub total_routes: usize,
    pub resumed_routes: usize,
    pub processed_routes: usize,
    pub status_counts: BTreeMap<String, usize>,
    pub routed_distances: usize,
    pub distance_fallbacks: usize,
    pub failed_queries: Vec<String>,
    pub checkpoint_failures: usize,
    pub checkpoint_path: PathBuf,
    pub output_path: PathBuf,
    pub elapsed_secs: f64,
}

impl BatchSummary {
    pub fn count(&self, status: RouteStatus) -> usize {
        self.status_counts
            .get(status_key(status))
            .copied()
            .unwrap_or(0)
    }

    pub fn report(&self) -> String {
        let mut report = String::new();
        report.push_str("Batch Summary\n");
        report.push_str("=============\n");
        report.push_str(&format!(
            "Routes: {} ({} resumed from checkpoint, {} processed now)\n",
            self.total_routes, self.resumed_routes, self.processed_routes
        ));
        for status in [
            RouteStatus::Success,
            RouteStatus::MappingFailed,
            RouteStatus::TooShort,
            RouteStatus::Error,
        ] {
            report.push_str(&format!("  {:<15} {}\n", status_key(status), self.count(status)));
        }
        report.push_str(&format!(
            "Distances: {} routed, {} great-circle fallbacks\n",
            self.routed_distances, self.distance_fallbacks
        ));
        if !self.failed_queries.is_empty() {
            report.push_str(&format!(
                "Failed store queries ({}):\n",
                self.failed_queries.len()
            ));
            for failure in &self.failed_queries {
                report.push_str(&format!("  {}\n", failure));
            }
        }
        if self.checkpoint_failures > 0 {
            report.push_str(&format!(
                "WARNING: {} checkpoint writes failed; resume may repeat work\n",
                self.checkpoint_failures
            ));
        }
        report.push_str(&format!("Checkpoint: {}\n", self.checkpoint_path.display()));
        report.push_str(&format!("Results: {}\n", self.output_path.display()));
        report.push_str(&format!("Elapsed: {:.1}s\n", self.elapsed_secs));
        report
    }
}

pub struct BatchOutcome {
    pub results: Vec<RouteResult>,
    pub summary: BatchSummary,
}

fn status_key(status: RouteStatus) -> &'static str {
    match status {
        RouteStatus::Success => "success",
        RouteStatus::MappingFailed => "mapping_failed",
        RouteStatus::TooShort => "too_short",
        RouteStatus::Error => "error",
    }
}

/// Drives route lists through mapping, batched lookups and aggregation
///
/// Three passes: map every route and drop short ones by great-circle
/// distance, query the store once per window and scheme for the collected
/// pairs, then resolve routed distances and assemble each result.
pub struct BatchRunner<'a> {
    mapper: RegionMapper<'a>,
    store: &'a dyn RateStore,
    resolver: &'a DistanceResolver,
    aggregator: QuoteAggregator,
    writer: ResultsWriter,
    options: BatchOptions,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        mapper: RegionMapper<'a>,
        store: &'a dyn RateStore,
        resolver: &'a DistanceResolver,
    ) -> Self {
        Self {
            mapper,
            store,
            resolver,
            aggregator: QuoteAggregator::new(),
            writer: ResultsWriter::new(),
            options: BatchOptions::default(),
        }
    }

    /// Zero route counts would never fire; they are raised to one
    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = BatchOptions {
            progress_every_routes: options.progress_every_routes.max(1),
            checkpoint_every_routes: options.checkpoint_every_routes.map(|n| n.max(1)),
            ..options
        };
        self
    }

    pub fn with_aggregator(mut self, aggregator: QuoteAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_writer(mut self, writer: ResultsWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Quote a single route through the same three passes as a batch
    pub fn quote(&self, route: &str) -> RouteResult {
        let prepared = self.prepare(route);
        let stats = self.fetch_statistics(std::slice::from_ref(&prepared));
        self.finish(prepared, &stats)
    }

    /// Process a route list, resuming from the checkpoint next to `output`
    ///
    /// Only configuration problems and a mismatching checkpoint abort the
    /// run; per-route failures end up in the results.
    pub fn run(
        &self,
        routes: &[String],
        output: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<BatchOutcome> {
        let started = Instant::now();
        let checkpoint_path = checkpoint_path_for(output);

        let mut results = self.load_checkpoint(&checkpoint_path)?;
        let resumed = resume_offset(&results, routes, self.options.resume_policy)?;
        if resumed > 0 {
            info!(
                "Resuming from {}: {} of {} routes already processed",
                checkpoint_path.display(),
                resumed,
                routes.len()
            );
            if let Some(p) = progress {
                p.update(resumed as u64);
            }
        }

        let remaining = &routes[resumed..];

        info!("Pass 1: mapping {} routes", remaining.len());
        if let Some(p) = progress {
            p.set_message(&format!("Mapping {} routes...", remaining.len()));
        }
        let prepared: Vec<PreparedRoute> = remaining.iter().map(|r| self.prepare(r)).collect();
        let pending = prepared
            .iter()
            .filter(|p| matches!(p, PreparedRoute::Pending { .. }))
            .count();
        info!(
            "Pass 1 complete: {} routes need historical data, {} finished early",
            pending,
            prepared.len() - pending
        );

        info!("Pass 2: querying historical rates");
        if let Some(p) = progress {
            p.set_message("Querying historical rates...");
        }
        let stats = self.fetch_statistics(&prepared);
        let failed_queries: Vec<String> = stats
            .failed_queries()
            .into_iter()
            .map(|(scheme, window, message)| format!("{} {}: {}", scheme, window, message))
            .collect();

        info!("Pass 3: resolving distances and aggregating quotes");
        if let Some(p) = progress {
            p.set_message("Aggregating quotes...");
        }

        let mut checkpoint_failures = 0usize;
        let mut last_flush = Instant::now();
        let mut success = 0usize;
        let mut skipped = 0usize;
        let pass_started = Instant::now();
        let total = prepared.len();

        for (index, route) in prepared.into_iter().enumerate() {
            let result = self.finish(route, &stats);
            if result.status.is_success() {
                success += 1;
            } else {
                skipped += 1;
            }
            results.push(result);

            let processed = index + 1;
            if let Some(p) = progress {
                p.increment(1);
            }
            if processed % self.options.progress_every_routes == 0 {
                log_progress(processed, total, success, skipped, pass_started.elapsed());
            }

            let due_by_count = self
                .options
                .checkpoint_every_routes
                .map_or(false, |n| processed % n == 0);
            let due_by_time = last_flush.elapsed() >= self.options.checkpoint_interval;
            if (due_by_count || due_by_time) && processed < total {
                if !self.flush_checkpoint(&results, &checkpoint_path) {
                    checkpoint_failures += 1;
                }
                last_flush = Instant::now();
            }
        }

        if !self.flush_checkpoint(&results, &checkpoint_path) {
            checkpoint_failures += 1;
        }

        self.writer.write_results(&results, output)?;
        if let Some(p) = progress {
            p.finish_with_message(&format!("Processed {} routes", total));
        }

        let mut status_counts = BTreeMap::new();
        for result in &results {
            *status_counts
                .entry(status_key(result.status).to_string())
                .or_insert(0) += 1;
        }

        let summary = BatchSummary {
            total_routes: results.len(),
            resumed_routes: resumed,
            processed_routes: total,
            status_counts,
            routed_distances: self.resolver.routed_count(),
            distance_fallbacks: self.resolver.fallback_count(),
            failed_queries,
            checkpoint_failures,
            checkpoint_path,
            output_path: output.to_path_buf(),
            elapsed_secs: started.elapsed().as_secs_f64(),
        };

        info!(
            "Batch complete: {} routes, {} success, results in {}",
            summary.total_routes,
            summary.count(RouteStatus::Success),
            output.display()
        );

        Ok(BatchOutcome { results, summary })
    }

    fn load_checkpoint(&self, path: &Path) -> Result<Vec<RouteResult>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        load_results(path).map_err(|e| {
            ProcessingError::InvalidFormat(format!(
                "checkpoint {} is unreadable: {}",
                path.display(),
                e
            ))
        })
    }

    /// Returns false when the write failed; the run continues either way
    fn flush_checkpoint(&self, results: &[RouteResult], path: &Path) -> bool {
        match self.writer.write_results(results, path) {
            Ok(()) => {
                debug!("Checkpoint saved: {} routes", results.len());
                true
            }
            Err(e) => {
                error!("Checkpoint write failed, continuing without it: {}", e);
                false
            }
        }
    }

    fn prepare(&self, raw: &str) -> PreparedRoute {
        let code = match RouteCode::parse(raw) {
            Ok(code) => code,
            Err(e) => {
                warn!("{}", e);
                return PreparedRoute::Finished(RouteResult::error(
                    raw,
                    RouteStage::Mapping,
                    e.to_string(),
                ));
            }
        };

        let regions = self.mapper.map_route(&code);
        let mapping = match regions.require_complete(raw) {
            Ok(mapping) => mapping,
            Err(e) => {
                debug!("{}", e);
                return PreparedRoute::Finished(RouteResult::mapping_failed(
                    raw,
                    code.origin().clone(),
                    code.destination().clone(),
                    regions,
                ));
            }
        };

        let coordinates = self.mapper.endpoint_coordinates(&code);
        match coordinates {
            Some((origin, destination)) => {
                let estimate = self.resolver.great_circle(&origin, &destination);
                if estimate.is_below(self.options.min_distance_km) {
                    return PreparedRoute::Finished(RouteResult::too_short(
                        raw,
                        code.origin().clone(),
                        code.destination().clone(),
                        regions,
                        estimate,
                        self.options.min_distance_km,
                    ));
                }
            }
            None => debug!("{}: endpoint coordinates unknown", raw),
        }

        PreparedRoute::Pending {
            route: raw.to_string(),
            code,
            regions,
            mapping,
            coordinates,
        }
    }

    fn fetch_statistics(&self, prepared: &[PreparedRoute]) -> BatchStatistics {
        let mut scheme_a_pairs: BTreeSet<PartitionPair> = BTreeSet::new();
        let mut scheme_b_pairs: BTreeSet<PartitionPair> = BTreeSet::new();
        for route in prepared {
            if let PreparedRoute::Pending { mapping, .. } = route {
                scheme_a_pairs.insert(mapping.scheme_a);
                scheme_b_pairs.insert(mapping.scheme_b);
            }
        }

        fetch_batch_statistics(
            self.store,
            &scheme_a_pairs,
            &scheme_b_pairs,
            self.aggregator.windows(),
        )
    }

    fn finish(&self, prepared: PreparedRoute, stats: &BatchStatistics) -> RouteResult {
        let (route, code, regions, mapping, coordinates) = match prepared {
            PreparedRoute::Finished(result) => return result,
            PreparedRoute::Pending {
                route,
                code,
                regions,
                mapping,
                coordinates,
            } => (route, code, regions, mapping, coordinates),
        };

        let distance = coordinates.map(|(origin, destination)| {
            self.resolver.resolve(&origin, &destination)
        });

        if let Some(distance) = distance {
            if distance.is_below(self.options.min_distance_km) {
                return RouteResult::too_short(
                    &route,
                    code.origin().clone(),
                    code.destination().clone(),
                    regions,
                    distance,
                    self.options.min_distance_km,
                );
            }
        }

        let quote = self.aggregator.aggregate(&mapping, distance, stats);
        RouteResult::success(
            &route,
            code.origin().clone(),
            code.destination().clone(),
            regions,
            distance,
            quote,
        )
    }
}

/// How many input routes the checkpoint already covers
pub fn resume_offset(
    checkpoint: &[RouteResult],
    routes: &[String],
    policy: ResumePolicy,
) -> Result<usize> {
    if checkpoint.len() > routes.len() {
        return Err(ProcessingError::CheckpointMismatch {
            index: routes.len(),
            expected: "end of route list".to_string(),
            found: checkpoint[routes.len()].route.clone(),
        });
    }

    if policy == ResumePolicy::VerifyPrefix {
        if let Some((index, (done, route))) = checkpoint
            .iter()
            .zip(routes)
            .enumerate()
            .find(|(_, (done, route))| done.route != **route)
        {
            return Err(ProcessingError::CheckpointMismatch {
                index,
                expected: route.clone(),
                found: done.route.clone(),
            });
        }
    }

    Ok(checkpoint.len())
}

/// Results file for a run without an explicit output path
///
/// Picks up the most recent checkpoint under `dir` when it covers a proper,
/// matching prefix of `routes`; otherwise names a fresh timestamped file.
pub fn resumable_output(dir: &Path, routes: &[String], policy: ResumePolicy) -> Result<PathBuf> {
    if let Some(checkpoint) = find_checkpoints(dir)?.into_iter().next() {
        match load_results(&checkpoint).and_then(|done| resume_offset(&done, routes, policy)) {
            Ok(done) if done > 0 && done < routes.len() => {
                if let Some(output) = results_path_for_checkpoint(&checkpoint) {
                    info!(
                        "Found checkpoint {} covering {} of {} routes",
                        checkpoint.display(),
                        done,
                        routes.len()
                    );
                    return Ok(output);
                }
            }
            Ok(done) => debug!(
                "Checkpoint {} holds {} of {} routes, nothing to resume",
                checkpoint.display(),
                done,
                routes.len()
            ),
            Err(e) => warn!(
                "Not resuming from {}: {}",
                checkpoint.display(),
                e
            ),
        }
    }

    Ok(default_results_filename_in(dir))
}

fn log_progress(processed: usize, total: usize, success: usize, skipped: usize, elapsed: Duration) {
    let rate = processed as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    let eta_secs = (total - processed) as f64 / rate.max(f64::EPSILON);
    info!(
        "Progress: {}/{} routes ({} success, {} skipped), elapsed {:.0}s, ETA {:.0}s",
        processed,
        total,
        success,
        skipped,
        elapsed.as_secs_f64(),
        eta_secs
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CrossSchemeIndex, CrossSchemeMatch, DistanceProvenance, LookbackWindow, PostalKey,
        PostalPartitionTable, RateStatistic, ReferenceData, SchemeAStats, SchemeBStats,
    };
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MockStore {
        calls: RefCell<Vec<(char, usize)>>,
        fail_scheme_b: bool,
    }

    impl RateStore for MockStore {
        fn query_scheme_a(
            &self,
            pairs: &[PartitionPair],
            _window: LookbackWindow,
        ) -> Result<HashMap<PartitionPair, SchemeAStats>> {
            self.calls.borrow_mut().push(('a', pairs.len()));
            Ok(pairs
                .iter()
                .map(|p| {
                    let stats = SchemeAStats {
                        days_with_data: 2,
                        total_offers: 10,
                        trailer: Some(RateStatistic::new(1.2, Some(1.1), 10)),
                        ..Default::default()
                    };
                    (*p, stats)
                })
                .collect())
        }

        fn query_scheme_b(
            &self,
            pairs: &[PartitionPair],
            window: LookbackWindow,
        ) -> Result<HashMap<PartitionPair, SchemeBStats>> {
            self.calls.borrow_mut().push(('b', pairs.len()));
            if self.fail_scheme_b {
                return Err(ProcessingError::StoreQuery {
                    scheme: "Scheme B".into(),
                    window: window.to_string(),
                    message: "connection lost".into(),
                });
            }
            Ok(pairs
                .iter()
                .map(|p| {
                    let stats = SchemeBStats {
                        days_with_data: 1,
                        lorry: Some(RateStatistic::new(1.4, None, 3)),
                        ..Default::default()
                    };
                    (*p, stats)
                })
                .collect())
        }
    }

    fn key(s: &str) -> PostalKey {
        s.parse().unwrap()
    }

    fn reference() -> ReferenceData {
        let coordinates: HashMap<PostalKey, Coordinate> = [
            (key("PL00"), Coordinate::new(52.2297, 21.0122)),
            (key("PL30"), Coordinate::new(50.0647, 19.9450)),
            (key("PL05"), Coordinate::new(52.16, 21.07)),
        ]
        .into_iter()
        .collect();

        let scheme_a: PostalPartitionTable =
            serde_json::from_str(r#"{"PL00": 1, "PL30": 2, "PL05": 3, "DE10": 4}"#).unwrap();
        let scheme_b: PostalPartitionTable =
            serde_json::from_str(r#"{"PL00": 10, "PL30": 20}"#).unwrap();
        let mut cross = CrossSchemeIndex::new();
        cross.insert(
            3,
            CrossSchemeMatch {
                partition_id: 10,
                distance_km: 9.0,
                effective_distance_km: 4.5,
                country: "PL".into(),
            },
        );

        ReferenceData::new(coordinates, scheme_a, scheme_b, cross)
    }

    fn routes(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_quote_single_route() {
        let reference = reference();
        let store = MockStore::default();
        let resolver = DistanceResolver::great_circle_only();
        let runner = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver);

        let result = runner.quote("PL00-PL30");
        assert_eq!(result.status, RouteStatus::Success);
        assert_eq!(result.distance_method, DistanceProvenance::GreatCircleFallback);

        let week = result.quote.unwrap().window(LookbackWindow::Week).cloned().unwrap();
        assert_eq!(week.average_rate_per_km, Some(1.3));
        assert_eq!(store.calls.borrow().len(), 6);
    }

    #[test]
    fn test_statuses_and_query_batching() {
        let reference = reference();
        let store = MockStore::default();
        let resolver = DistanceResolver::great_circle_only();
        let runner = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver);
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("results.json");

        let input = routes(&["PL00-PL30", "PL30-PL00", "PL00-PL05", "PL00-DE10", "garbage"]);
        let outcome = runner.run(&input, &output, None).unwrap();

        let statuses: Vec<RouteStatus> = outcome.results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                RouteStatus::Success,
                RouteStatus::Success,
                RouteStatus::TooShort,
                RouteStatus::MappingFailed,
                RouteStatus::Error,
            ]
        );

        // Two distinct pairs per scheme, one query per window per scheme
        let calls = store.calls.borrow();
        assert_eq!(calls.len(), 6);
        assert!(calls.iter().all(|(_, n)| *n == 2));

        assert_eq!(outcome.summary.count(RouteStatus::Success), 2);
        assert_eq!(outcome.summary.count(RouteStatus::TooShort), 1);
        assert!(output.exists());
        assert!(outcome.summary.checkpoint_path.exists());
        assert!(outcome.summary.report().contains("too_short"));
    }

    #[test]
    fn test_failed_window_keeps_routes_successful() {
        let reference = reference();
        let store = MockStore {
            fail_scheme_b: true,
            ..Default::default()
        };
        let resolver = DistanceResolver::great_circle_only();
        let runner = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver);
        let dir = TempDir::new().unwrap();

        let outcome = runner
            .run(&routes(&["PL00-PL30"]), &dir.path().join("r.json"), None)
            .unwrap();

        let result = &outcome.results[0];
        assert_eq!(result.status, RouteStatus::Success);
        let week = result.quote.as_ref().unwrap().window(LookbackWindow::Week).unwrap();
        assert!(week.scheme_a_has_data);
        assert!(!week.scheme_b_has_data);
        assert_eq!(outcome.summary.failed_queries.len(), 3);
    }

    #[test]
    fn test_only_short_routes_skip_the_store() {
        let reference = reference();
        let store = MockStore::default();
        let resolver = DistanceResolver::great_circle_only();
        let runner = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver);
        let dir = TempDir::new().unwrap();

        let outcome = runner
            .run(&routes(&["PL00-PL05"]), &dir.path().join("r.json"), None)
            .unwrap();

        assert_eq!(outcome.results[0].status, RouteStatus::TooShort);
        assert_eq!(
            outcome.results[0].distance_method,
            DistanceProvenance::GreatCircle
        );
        assert!(store.calls.borrow().is_empty());
    }

    #[test]
    fn test_resume_offset_policies() {
        let done = vec![RouteResult::error("A", RouteStage::Mapping, "x".into())];

        assert_eq!(
            resume_offset(&done, &routes(&["A", "B"]), ResumePolicy::VerifyPrefix).unwrap(),
            1
        );
        assert!(matches!(
            resume_offset(&done, &routes(&["B", "A"]), ResumePolicy::VerifyPrefix),
            Err(ProcessingError::CheckpointMismatch { index: 0, .. })
        ));
        assert_eq!(
            resume_offset(&done, &routes(&["B", "A"]), ResumePolicy::TrustPrefix).unwrap(),
            1
        );
        assert!(resume_offset(&done, &[], ResumePolicy::TrustPrefix).is_err());
    }

    #[test]
    fn test_zero_route_counts_are_clamped() {
        let reference = reference();
        let store = MockStore::default();
        let resolver = DistanceResolver::great_circle_only();
        let runner = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver)
            .with_options(BatchOptions {
                progress_every_routes: 0,
                checkpoint_every_routes: Some(0),
                ..Default::default()
            });
        assert_eq!(runner.options().progress_every_routes, 1);
        assert_eq!(runner.options().checkpoint_every_routes, Some(1));

        let dir = TempDir::new().unwrap();
        let outcome = runner
            .run(&routes(&["PL00-PL30", "PL30-PL00"]), &dir.path().join("r.json"), None)
            .unwrap();
        assert_eq!(outcome.summary.count(RouteStatus::Success), 2);
    }

    #[test]
    fn test_resumable_output_skips_unreadable_checkpoint() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("route_analysis_20250101_120000_checkpoint.json");
        std::fs::write(&broken, "{not json").unwrap();

        let output =
            resumable_output(dir.path(), &routes(&["A", "B"]), ResumePolicy::VerifyPrefix).unwrap();
        assert_ne!(output, dir.path().join("route_analysis_20250101_120000.json"));

        let done = vec![RouteResult::error("A", RouteStage::Mapping, "x".into())];
        ResultsWriter::new().write_results(&done, &broken).unwrap();
        let output =
            resumable_output(dir.path(), &routes(&["A", "B"]), ResumePolicy::VerifyPrefix).unwrap();
        assert_eq!(output, dir.path().join("route_analysis_20250101_120000.json"));
    }

    #[test]
    fn test_options_from_config() {
        let config = BatchConfig {
            checkpoint_every_routes: Some(25),
            resume_policy: ResumePolicy::TrustPrefix,
            ..Default::default()
        };
        let options = BatchOptions::from(&config);
        assert_eq!(options.checkpoint_every_routes, Some(25));
        assert_eq!(options.checkpoint_interval, Duration::from_secs(300));
        assert_eq!(options.resume_policy, ResumePolicy::TrustPrefix);
    }
}
