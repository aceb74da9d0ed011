use clap::Parser;

/// TraceabilitySync CLI arguments
#[derive(Debug, Default, Parser)]
#[command(
    name = "traceability-sync",
    version,
    about = "Material traceability ledger with a live production metrics feed"
)]
pub struct Cli {
    /// Address the HTTP API listens on (e.g. 0.0.0.0:8080)
    #[arg(long)]
    pub bind: Option<String>,

    /// Metrics feed period in seconds
    #[arg(long)]
    pub feed_interval: Option<u64>,

    /// Digital twin tick period in seconds
    #[arg(long)]
    pub twin_interval: Option<u64>,

    /// Number of material records seeded into the ledger
    #[arg(long)]
    pub ledger_size: Option<usize>,

    /// Seed for reproducible mock data
    #[arg(long)]
    pub seed: Option<u64>,
}
