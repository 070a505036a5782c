use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "freight-rate-checker")]
#[command(about = "Route pricing from historical freight-exchange rate statistics")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "Configuration file [default: freight-rate-checker.toml if present]"
    )]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Hide progress bars")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Price every route of a route list, resuming from an existing checkpoint
    Check {
        #[arg(short, long, help = "Route list: JSON array or CSV with a 'Lane Name' column")]
        input: PathBuf,

        #[arg(
            short,
            long,
            help = "Results file [default: resume the newest output/route_analysis_*_checkpoint.json, else a new timestamped file]"
        )]
        output_file: Option<PathBuf>,

        #[arg(long, help = "Route column of CSV input", default_value = "Lane Name")]
        column: String,
    },

    /// Quote a single route between two postal codes
    Quote {
        #[arg(help = "Origin postal code, e.g. 'PL 50-001'")]
        from: String,

        #[arg(help = "Destination postal code, e.g. 'DE10115'")]
        to: String,

        #[arg(long, help = "Print the full result as JSON")]
        json: bool,
    },

    /// Build the Scheme A to Scheme B nearest-partition index
    BuildIndex {
        #[arg(long, help = "Scheme A partition centers CSV")]
        scheme_a: PathBuf,

        #[arg(long, help = "Scheme B partition centers CSV")]
        scheme_b: PathBuf,

        #[arg(short, long, help = "Output JSON file")]
        output_file: PathBuf,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,
    },

    /// Build a postal-code to partition table from partition centers
    BuildPostalTable {
        #[arg(short, long, help = "Partition centers CSV")]
        input: PathBuf,

        #[arg(short, long, help = "Output JSON file")]
        output_file: PathBuf,

        #[arg(long, help = "Fail on the first invalid center row")]
        strict: bool,
    },

    /// Flatten a results file into CSV
    Export {
        #[arg(short, long, help = "Results or checkpoint JSON file")]
        input: PathBuf,

        #[arg(short, long, help = "Output CSV file")]
        output_file: PathBuf,

        #[arg(long, default_value_t = ';')]
        delimiter: char,
    },
}
