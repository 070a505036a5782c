use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use tracing::{info, warn, Level};

use crate::cli::args::{Cli, Commands};
use crate::clients::{DistanceResolver, RoutesApiClient};
use crate::config::{AppConfig, RoutingConfig};
use crate::models::{RouteCode, RouteResult, RouteStatus};
use crate::processors::{
    build_postal_table, resumable_output, BatchOptions, BatchRunner, CrossSchemeIndexBuilder,
    RegionMapper,
};
use crate::readers::{PartitionReader, ReferenceReader, RouteReader};
use crate::store::SqliteRateStore;
use crate::utils::constants::DEFAULT_OUTPUT_DIR;
use crate::utils::postal::normalize_postal_code;
use crate::utils::progress::ProgressReporter;
use crate::writers::{load_results, CsvExporter, ResultsWriter};

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Check {
            input,
            output_file,
            column,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let routes = RouteReader::new()
                .with_column(&column)
                .read_routes(&input)
                .with_context(|| format!("reading route list {}", input.display()))?;
            let output_file = match output_file {
                Some(path) => path,
                None => resumable_output(
                    Path::new(DEFAULT_OUTPUT_DIR),
                    &routes,
                    config.batch.resume_policy,
                )
                .context("looking for a checkpoint to resume")?,
            };

            println!("Checking {} routes", routes.len());
            println!("Input: {}", input.display());
            println!("Output: {}", output_file.display());

            let reference = ReferenceReader::load(&config.reference)
                .context("loading reference data")?;
            let store = open_store(&config)?;
            let resolver = build_resolver(&config.routing)?;

            let runner = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver)
                .with_options(BatchOptions::from(&config.batch));

            let progress = ProgressReporter::new(routes.len() as u64, "Checking routes...", cli.quiet);
            let outcome = runner
                .run(&routes, &output_file, Some(&progress))
                .with_context(|| format!("processing {}", input.display()))?;

            println!("\n{}", outcome.summary.report());
        }

        Commands::Quote { from, to, json } => {
            let config = load_config(cli.config.as_deref())?;
            let origin = normalize_postal_code(&from)
                .with_context(|| format!("origin postal code '{}'", from))?;
            let destination = normalize_postal_code(&to)
                .with_context(|| format!("destination postal code '{}'", to))?;
            let route = RouteCode::from_postal_keys(&origin, &destination).to_string();

            let reference = ReferenceReader::load(&config.reference)
                .context("loading reference data")?;
            let store = open_store(&config)?;
            let resolver = build_resolver(&config.routing)?;
            let runner = BatchRunner::new(RegionMapper::new(&reference), &store, &resolver)
                .with_options(BatchOptions::from(&config.batch));

            let result = runner.quote(&route);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", format_quote(&result));
            }
        }

        Commands::BuildIndex {
            scheme_a,
            scheme_b,
            output_file,
            max_workers,
        } => {
            println!("Building cross-scheme index");
            println!("Scheme A centers: {}", scheme_a.display());
            println!("Scheme B centers: {}", scheme_b.display());
            println!("Workers: {}", max_workers);

            let reader = PartitionReader::new();
            let a = reader
                .read_centers(&scheme_a)
                .with_context(|| format!("reading {}", scheme_a.display()))?;
            let b = reader
                .read_centers(&scheme_b)
                .with_context(|| format!("reading {}", scheme_b.display()))?;

            let progress = ProgressReporter::new_spinner(
                &format!("Matching {} x {} partitions...", a.len(), b.len()),
                cli.quiet,
            );
            let (index, report) = CrossSchemeIndexBuilder::new(max_workers).build(&a, &b)?;
            progress.finish_with_message(&format!("Matched {} partitions", index.len()));

            ResultsWriter::new()
                .write_json(&index, &output_file)
                .with_context(|| format!("writing {}", output_file.display()))?;

            println!("\n{}", report.summary());
            println!("Index written to {}", output_file.display());
        }

        Commands::BuildPostalTable {
            input,
            output_file,
            strict,
        } => {
            let centers = PartitionReader::new()
                .with_strict(strict)
                .read_centers(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            if centers.is_empty() {
                bail!("no valid partition centers in {}", input.display());
            }

            let table = build_postal_table(&centers);
            ResultsWriter::new()
                .write_json(&table.sorted(), &output_file)
                .with_context(|| format!("writing {}", output_file.display()))?;

            println!(
                "Wrote {} postal keys for {} partitions to {}",
                table.len(),
                centers.len(),
                output_file.display()
            );
        }

        Commands::Export {
            input,
            output_file,
            delimiter,
        } => {
            if !delimiter.is_ascii() {
                bail!("delimiter must be a single ASCII character");
            }

            let results = load_results(&input)
                .with_context(|| format!("reading results {}", input.display()))?;
            let rows = CsvExporter::new()
                .with_delimiter(delimiter as u8)
                .export(&results, &output_file)
                .with_context(|| format!("writing {}", output_file.display()))?;

            println!("Exported {} routes to {}", rows, output_file.display());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt().with_max_level(level).with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = AppConfig::load(path).context("loading configuration")?;
    info!(
        "Configuration loaded (store: {}, routing: {})",
        config.store.database_path.display(),
        if config.routing.is_active() { "enabled" } else { "disabled" }
    );
    Ok(config)
}

fn open_store(config: &AppConfig) -> Result<SqliteRateStore> {
    SqliteRateStore::open(
        &config.store.database_path,
        &config.store.scheme_a_table,
        &config.store.scheme_b_table,
    )
    .with_context(|| {
        format!(
            "opening rate store {}",
            config.store.database_path.display()
        )
    })
}

fn build_resolver(config: &RoutingConfig) -> Result<DistanceResolver> {
    let api_key = match (&config.api_key, config.is_active()) {
        (Some(key), true) => key.clone(),
        _ => {
            warn!("Routing disabled, every distance uses the great-circle fallback");
            return Ok(DistanceResolver::great_circle_only());
        }
    };

    let client = match &config.base_url {
        Some(url) => RoutesApiClient::with_base_url(api_key, url.clone(), config.timeout()),
        None => RoutesApiClient::new(&config.region, api_key, config.timeout()),
    }
    .context("building routing client")?;

    info!("Routing via {}", client.base_url());
    Ok(DistanceResolver::new(Box::new(client)).with_request_delay(config.request_delay()))
}

fn format_quote(result: &RouteResult) -> String {
    let mut out = format!("Route {}: {}\n", result.route, status_label(result.status));

    if let Some(mapping) = result.regions.as_ref().and_then(|r| r.complete()) {
        out.push_str(&format!(
            "Partitions: Scheme A {}, Scheme B {}\n",
            mapping.scheme_a, mapping.scheme_b
        ));
    }
    match result.distance_km {
        Some(km) => out.push_str(&format!(
            "Distance: {:.2} km ({})\n",
            km,
            result.distance_method.label()
        )),
        None => out.push_str("Distance: unknown\n"),
    }
    if let Some(reason) = result.reason.as_deref().or(result.error.as_deref()) {
        out.push_str(&format!("Note: {}\n", reason));
    }

    if let Some(quote) = &result.quote {
        for window in &quote.windows {
            let rate = |value: Option<f64>| {
                value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
            };
            out.push_str(&format!(
                "  {:>3}: Scheme A {} EUR/km, Scheme B {} EUR/km, average {} EUR/km, total {} EUR ({:?})\n",
                window.window,
                rate(window.scheme_a_rate_per_km),
                rate(window.scheme_b_rate_per_km),
                rate(window.average_rate_per_km),
                rate(window.estimated_total_price),
                window.data_source
            ));
        }
    }

    out
}

fn status_label(status: RouteStatus) -> &'static str {
    match status {
        RouteStatus::Success => "success",
        RouteStatus::MappingFailed => "mapping failed",
        RouteStatus::TooShort => "too short",
        RouteStatus::Error => "error",
    }
}
