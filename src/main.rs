use clap::Parser;
use freight_rate_checker::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli)
}
