use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rusqlite::params;
use tempfile::TempDir;

use freight_rate_checker::clients::{DistanceResolver, RouteDistanceProvider};
use freight_rate_checker::config::ResumePolicy;
use freight_rate_checker::error::{ProcessingError, Result};
use freight_rate_checker::models::{
    Coordinate, CrossSchemeIndex, CrossSchemeMatch, DataSource, DistanceProvenance,
    LookbackWindow, PostalKey, PostalPartitionTable, ReferenceData, RouteStatus,
};
use freight_rate_checker::processors::{
    resumable_output, BatchOptions, BatchOutcome, BatchRunner, RegionMapper,
};
use freight_rate_checker::store::SqliteRateStore;
use freight_rate_checker::utils::checkpoint_path_for;
use freight_rate_checker::utils::round_to;
use freight_rate_checker::writers::{load_results, CsvExporter};

/// Routed distance is 1.2x great-circle; destinations west of 14°E are unroutable
struct ScriptedProvider {
    calls: Rc<Cell<usize>>,
}

impl RouteDistanceProvider for ScriptedProvider {
    fn route_distance_km(&self, origin: &Coordinate, destination: &Coordinate) -> Result<f64> {
        self.calls.set(self.calls.get() + 1);
        if destination.longitude < 14.0 {
            return Err(ProcessingError::RoutingUnavailable("no route".into()));
        }
        Ok(round_to(origin.distance_to(destination) * 1.2, 2))
    }
}

fn key(s: &str) -> PostalKey {
    s.parse().unwrap()
}

fn reference() -> ReferenceData {
    let coordinates: HashMap<PostalKey, Coordinate> = [
        (key("PL00"), Coordinate::new(52.2297, 21.0122)),
        (key("PL30"), Coordinate::new(50.0647, 19.9450)),
        (key("PL50"), Coordinate::new(51.1079, 17.0385)),
        (key("PL05"), Coordinate::new(52.16, 21.07)),
        (key("DE10"), Coordinate::new(52.5200, 13.4050)),
    ]
    .into_iter()
    .collect();

    let scheme_a: PostalPartitionTable =
        serde_json::from_str(r#"{"PL00": 1, "PL30": 2, "PL50": 3, "DE10": 4, "PL05": 5}"#).unwrap();
    let scheme_b: PostalPartitionTable =
        serde_json::from_str(r#"{"PL00": 10, "PL30": 20, "DE10": 40}"#).unwrap();

    let mut cross = CrossSchemeIndex::new();
    for (a, b) in [(3, 30), (5, 10)] {
        cross.insert(
            a,
            CrossSchemeMatch {
                partition_id: b,
                distance_km: 5.0,
                effective_distance_km: 2.5,
                country: "PL".into(),
            },
        );
    }

    ReferenceData::new(coordinates, scheme_a, scheme_b, cross)
}

fn seeded_store() -> SqliteRateStore {
    let store = SqliteRateStore::in_memory()
        .unwrap()
        .with_reference_date(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
    let conn = store.connection();

    conn.execute(
        "INSERT INTO scheme_a_offers (starting_id, destination_id, enlistment_date, \
         trailer_avg_price_per_km, trailer_median_price_per_km, number_of_offers_total) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![1, 2, "2024-06-28", 1.2, 1.1, 8],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO scheme_b_offers (starting_id, destination_id, enlistment_date, \
         lorry_avg_price_per_km, number_of_records) VALUES (?1, ?2, ?3, ?4, 1)",
        params![10, 20, "2024-06-28", 1.4],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO scheme_b_offers (starting_id, destination_id, enlistment_date, \
         lorry_avg_price_per_km, number_of_records) VALUES (?1, ?2, ?3, ?4, 1)",
        params![30, 10, "2024-04-15", 1.1],
    )
    .unwrap();

    store
}

fn routes(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

fn scripted_resolver() -> (DistanceResolver, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let resolver = DistanceResolver::new(Box::new(ScriptedProvider {
        calls: Rc::clone(&calls),
    }));
    (resolver, calls)
}

const MIXED_ROUTES: [&str; 6] = [
    "PL00-PL30",
    "PL00-DE10",
    "PL00-PL05",
    "PL50-PL00",
    "XX",
    "PL00-FR75",
];

#[test]
fn test_full_pipeline() {
    let reference = reference();
    let store = seeded_store();
    let (resolver, routing_calls) = scripted_resolver();
    let runner = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver);
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("results.json");

    let outcome = runner.run(&routes(&MIXED_ROUTES), &output, None).unwrap();
    let results = &outcome.results;

    let statuses: Vec<RouteStatus> = results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            RouteStatus::Success,
            RouteStatus::Success,
            RouteStatus::TooShort,
            RouteStatus::Success,
            RouteStatus::Error,
            RouteStatus::MappingFailed,
        ]
    );

    // Warsaw -> Krakow: routed, both providers priced within the week
    let warsaw_krakow = &results[0];
    assert_eq!(warsaw_krakow.distance_method, DistanceProvenance::Routed);
    let km = warsaw_krakow.distance_km.unwrap();
    assert!((km - 302.0).abs() < 8.0);
    let quote = warsaw_krakow.quote.as_ref().unwrap();
    let week = quote.window(LookbackWindow::Week).unwrap();
    assert_eq!(week.data_source, DataSource::Both);
    assert_eq!(week.average_rate_per_km, Some(1.3));
    assert_eq!(week.estimated_total_price, Some(round_to(1.3 * km, 2)));
    assert_eq!(week.scheme_a.total_offers, 8);

    // Berlin is unroutable: great-circle fallback, still a success without data
    let warsaw_berlin = &results[1];
    assert_eq!(
        warsaw_berlin.distance_method,
        DistanceProvenance::GreatCircleFallback
    );
    assert!(!warsaw_berlin.quote.as_ref().unwrap().has_any_data());

    // Short route excluded on great-circle distance, never routed
    assert_eq!(results[2].distance_method, DistanceProvenance::GreatCircle);
    assert!(results[2].quote.is_none());

    // Scheme B derived through the cross-scheme index; only the quarter window has data
    let wroclaw = &results[3];
    let regions = wroclaw.regions.as_ref().unwrap();
    assert!(regions.origin.scheme_b_derived);
    assert_eq!(regions.origin.scheme_b, Some(30));
    let wroclaw_quote = wroclaw.quote.as_ref().unwrap();
    assert_eq!(
        wroclaw_quote.window(LookbackWindow::Week).unwrap().data_source,
        DataSource::None
    );
    assert_eq!(
        wroclaw_quote.window(LookbackWindow::Quarter).unwrap().data_source,
        DataSource::SchemeBOnly
    );

    // Six aggregate queries for the whole list; three routing calls
    assert_eq!(store.queries_issued(), 6);
    assert_eq!(routing_calls.get(), 3);
    assert_eq!(outcome.summary.distance_fallbacks, 1);
    assert_eq!(outcome.summary.count(RouteStatus::Success), 3);

    let written = load_results(&output).unwrap();
    assert_eq!(&written, results);
}

#[test]
fn test_query_count_independent_of_route_count() {
    let reference = reference();
    let store = seeded_store();
    let resolver = DistanceResolver::great_circle_only();
    let runner = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver);
    let dir = TempDir::new().unwrap();

    let many: Vec<String> = (0..200)
        .map(|i| if i % 2 == 0 { "PL00-PL30" } else { "PL30-PL50" })
        .map(String::from)
        .collect();
    let outcome = runner
        .run(&many, &dir.path().join("many.json"), None)
        .unwrap();

    assert_eq!(outcome.results.len(), 200);
    assert_eq!(store.queries_issued(), 6);
}

#[test]
fn test_short_routes_never_reach_the_store() {
    let reference = reference();
    let store = seeded_store();
    let (resolver, routing_calls) = scripted_resolver();
    let runner = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver);
    let dir = TempDir::new().unwrap();

    let outcome = runner
        .run(
            &routes(&["PL00-PL05", "PL05-PL00"]),
            &dir.path().join("short.json"),
            None,
        )
        .unwrap();

    assert!(outcome
        .results
        .iter()
        .all(|r| r.status == RouteStatus::TooShort));
    assert_eq!(store.queries_issued(), 0);
    assert_eq!(routing_calls.get(), 0);
}

fn run_prefix_then_full(policy: ResumePolicy, full: &[String], prefix_len: usize, dir: &Path) -> Result<usize> {
    let reference = reference();
    let store = seeded_store();
    let resolver = DistanceResolver::great_circle_only();
    let options = BatchOptions {
        resume_policy: policy,
        ..Default::default()
    };
    let runner = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver)
        .with_options(options);

    let first = dir.join("first.json");
    runner.run(&full[..prefix_len], &first, None)?;
    fs::copy(
        checkpoint_path_for(&first),
        checkpoint_path_for(&dir.join("second.json")),
    )?;

    let outcome = runner.run(full, &dir.join("second.json"), None)?;
    Ok(outcome.summary.resumed_routes)
}

#[test]
fn test_resume_keeps_checkpoint_prefix_identical() {
    let dir = TempDir::new().unwrap();
    let full = routes(&MIXED_ROUTES);

    let resumed = run_prefix_then_full(ResumePolicy::VerifyPrefix, &full, 3, dir.path()).unwrap();
    assert_eq!(resumed, 3);

    let checkpoint = load_results(&checkpoint_path_for(&dir.path().join("first.json"))).unwrap();
    let final_results = load_results(&dir.path().join("second.json")).unwrap();

    assert_eq!(checkpoint.len(), 3);
    assert_eq!(final_results.len(), full.len());
    for (saved, resumed) in checkpoint.iter().zip(&final_results) {
        assert_eq!(
            serde_json::to_string(saved).unwrap(),
            serde_json::to_string(resumed).unwrap()
        );
    }
}

#[test]
fn test_resume_rejects_changed_route_list() {
    let dir = TempDir::new().unwrap();
    let original = routes(&MIXED_ROUTES);

    let reference = reference();
    let store = seeded_store();
    let resolver = DistanceResolver::great_circle_only();
    let runner = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver);

    let output = dir.path().join("results.json");
    runner.run(&original[..2], &output, None).unwrap();

    let mut changed = original.clone();
    changed.swap(0, 1);
    let err = runner.run(&changed, &output, None).err().unwrap();
    assert!(matches!(err, ProcessingError::CheckpointMismatch { index: 0, .. }));

    // Length-only resume accepts the same checkpoint
    let trusting = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver)
        .with_options(BatchOptions {
            resume_policy: ResumePolicy::TrustPrefix,
            ..Default::default()
        });
    let outcome = trusting.run(&changed, &output, None).unwrap();
    assert_eq!(outcome.summary.resumed_routes, 2);
    assert_eq!(outcome.results.len(), changed.len());
}

/// Records how many routes the checkpoint held each time a route was routed
struct CheckpointWatcher {
    checkpoint: PathBuf,
    seen: Rc<RefCell<Vec<usize>>>,
    block_checkpoint: bool,
}

impl RouteDistanceProvider for CheckpointWatcher {
    fn route_distance_km(&self, origin: &Coordinate, destination: &Coordinate) -> Result<f64> {
        if self.block_checkpoint && !self.checkpoint.exists() {
            // A non-empty directory in its place makes every checkpoint rename fail
            fs::create_dir_all(self.checkpoint.join("occupied")).unwrap();
        }
        let saved = load_results(&self.checkpoint).map(|r| r.len()).unwrap_or(0);
        self.seen.borrow_mut().push(saved);
        Ok(origin.distance_to(destination))
    }
}

/// Five routes that all pass the great-circle filter and get routed
const ROUTED_ROUTES: [&str; 5] = [
    "PL00-PL30",
    "PL30-PL00",
    "PL00-PL50",
    "PL50-PL00",
    "PL30-PL50",
];

fn run_watched(options: BatchOptions, block_checkpoint: bool) -> (Vec<usize>, BatchOutcome, TempDir) {
    let reference = reference();
    let store = seeded_store();
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("results.json");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let resolver = DistanceResolver::new(Box::new(CheckpointWatcher {
        checkpoint: checkpoint_path_for(&output),
        seen: Rc::clone(&seen),
        block_checkpoint,
    }));
    let runner = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver)
        .with_options(options);

    let outcome = runner.run(&routes(&ROUTED_ROUTES), &output, None).unwrap();
    let seen = seen.borrow().clone();
    (seen, outcome, dir)
}

#[test]
fn test_checkpoint_every_n_routes() {
    let (seen, outcome, _dir) = run_watched(
        BatchOptions {
            checkpoint_every_routes: Some(2),
            ..Default::default()
        },
        false,
    );

    // Flushed after routes 2 and 4 while the run was still going
    assert_eq!(seen, vec![0, 0, 2, 2, 4]);
    assert_eq!(outcome.summary.checkpoint_failures, 0);
    let checkpoint = load_results(&outcome.summary.checkpoint_path).unwrap();
    assert_eq!(checkpoint.len(), ROUTED_ROUTES.len());
}

#[test]
fn test_checkpoint_on_elapsed_interval() {
    let (seen, outcome, _dir) = run_watched(
        BatchOptions {
            checkpoint_interval: Duration::ZERO,
            checkpoint_every_routes: None,
            ..Default::default()
        },
        false,
    );

    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    assert_eq!(outcome.summary.checkpoint_failures, 0);
}

#[test]
fn test_failed_checkpoint_writes_do_not_stop_the_run() {
    let (seen, outcome, _dir) = run_watched(
        BatchOptions {
            checkpoint_every_routes: Some(1),
            ..Default::default()
        },
        true,
    );

    assert_eq!(seen, vec![0; ROUTED_ROUTES.len()]);
    // Four mid-run flushes plus the final one
    assert_eq!(outcome.summary.checkpoint_failures, 5);
    assert_eq!(outcome.summary.count(RouteStatus::Success), ROUTED_ROUTES.len());
    assert!(outcome.summary.report().contains("5 checkpoint writes failed"));

    let written = load_results(&outcome.summary.output_path).unwrap();
    assert_eq!(written.len(), ROUTED_ROUTES.len());
}

#[test]
fn test_default_output_resumes_latest_checkpoint() {
    let reference = reference();
    let store = seeded_store();
    let resolver = DistanceResolver::great_circle_only();
    let runner = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver);
    let dir = TempDir::new().unwrap();
    let full = routes(&MIXED_ROUTES);

    // Interrupted run: only the first three routes reached the checkpoint
    let interrupted = dir.path().join("route_analysis_20250101_120000.json");
    runner.run(&full[..3], &interrupted, None).unwrap();
    fs::remove_file(&interrupted).unwrap();

    let output = resumable_output(dir.path(), &full, ResumePolicy::VerifyPrefix).unwrap();
    assert_eq!(output, interrupted);

    let outcome = runner.run(&full, &output, None).unwrap();
    assert_eq!(outcome.summary.resumed_routes, 3);
    assert_eq!(load_results(&interrupted).unwrap().len(), full.len());

    // Finished or unrelated checkpoints start a new timestamped file
    let fresh = resumable_output(dir.path(), &full, ResumePolicy::VerifyPrefix).unwrap();
    assert_ne!(fresh, interrupted);
    assert!(fresh.starts_with(dir.path()));

    let other = routes(&["PL30-PL00", "PL00-PL30"]);
    assert_ne!(
        resumable_output(dir.path(), &other, ResumePolicy::VerifyPrefix).unwrap(),
        interrupted
    );

    let empty = TempDir::new().unwrap();
    let named = resumable_output(empty.path(), &full, ResumePolicy::VerifyPrefix).unwrap();
    assert!(named
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("route_analysis_"));
}

#[test]
fn test_export_results_to_csv() {
    let reference = reference();
    let store = seeded_store();
    let resolver = DistanceResolver::great_circle_only();
    let runner = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver);
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("results.json");
    runner.run(&routes(&MIXED_ROUTES), &output, None).unwrap();

    let csv_path = dir.path().join("results.csv");
    let rows = CsvExporter::new()
        .export(&load_results(&output).unwrap(), &csv_path)
        .unwrap();
    assert_eq!(rows, MIXED_ROUTES.len());

    let text = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(text.lines().count(), MIXED_ROUTES.len() + 1);
    assert!(text.lines().nth(1).unwrap().starts_with("PL00-PL30;success;1-2;10-20;"));
    assert!(text.contains("route too short"));
}
