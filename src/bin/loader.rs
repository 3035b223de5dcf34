//! loadstone Loader Binary
//!
//! Thin CLI wrapper around the bulk load coordinator, running against a
//! directory-backed local store. Exit code 0 means every file was committed;
//! non-zero means at least one file was left unplaced.

use clap::Parser;
use loadstone::cluster::LocalCluster;
use loadstone::{BulkLoadCoordinator, Config, LoadSource};
use tracing_subscriber::{fmt, EnvFilter};

/// loadstone bulk loader
#[derive(Parser, Debug)]
#[command(name = "loadstone-loader")]
#[command(about = "Bulk-load sorted data files into a range-partitioned store")]
#[command(version)]
struct Args {
    /// Source directory (one subdirectory per column family)
    source: String,

    /// Target table name
    table: String,

    /// Root directory of the local store
    #[arg(short = 'r', long, default_value = "./loadstone_store")]
    store_root: String,

    /// Do not create the table when it is missing
    #[arg(long)]
    no_create_table: bool,

    /// Ignore files from column families missing in the target schema
    #[arg(long)]
    ignore_unmatched_families: bool,

    /// Always physically copy files instead of moving them
    #[arg(long)]
    always_copy_files: bool,

    /// Maximum placement+load passes before bailing out (0 = unlimited)
    #[arg(long, default_value = "10")]
    max_retry_passes: usize,

    /// Worker pool size (defaults to host parallelism)
    #[arg(short, long)]
    workers: Option<usize>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,loadstone=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("loadstone v{}", loadstone::VERSION);
    tracing::info!("Source directory: {}", args.source);
    tracing::info!("Target table: {}", args.table);

    let mut builder = Config::builder()
        .create_table_if_missing(!args.no_create_table)
        .tolerate_unmatched_families(args.ignore_unmatched_families)
        .always_copy_files(args.always_copy_files)
        .max_retry_passes(args.max_retry_passes);
    if let Some(workers) = args.workers {
        builder = builder.worker_pool_size(workers);
    }
    let config = builder.build();

    let cluster = match LocalCluster::new(&args.store_root) {
        Ok(cluster) => cluster,
        Err(e) => {
            tracing::error!("Failed to open local store: {}", e);
            std::process::exit(1);
        }
    };

    let coordinator = BulkLoadCoordinator::new(&cluster, config);
    let source = LoadSource::Directory(args.source.into());

    match coordinator.run(&args.table, source) {
        Ok(report) => {
            tracing::info!(
                "Committed {} file(s); {} missing, {} unmatched-family, {} empty",
                report.committed.len(),
                report.missing.len(),
                report.unmatched_family_files.len(),
                report.skipped_empty.len()
            );
            if report.is_complete() {
                std::process::exit(0);
            }
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("Bulk load failed: {}", e);
            std::process::exit(1);
        }
    }
}
