use anyhow::{Context, Result};
use clap::Parser;
use rpzpack::{pack, DpkgIdentifier, PackRequest, PackageIdentifier, TracingReporter};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Create a pack from the trace of a program execution
#[derive(Parser, Debug)]
#[command(name = "rpzpack", version, about)]
struct Cli {
    /// Destination file
    #[arg(default_value = "experiment.rpz")]
    target: PathBuf,

    /// Where the trace and configuration are stored
    #[arg(short, long, default_value = ".reprozip")]
    dir: PathBuf,

    /// Don't attribute files matched by additional patterns to packages
    #[arg(long)]
    dont_identify_packages: bool,

    /// dpkg database used to identify packages
    #[arg(long, default_value = rpzpack::packages::DEFAULT_ADMIN_DIR)]
    dpkg_admin_dir: PathBuf,

    /// Increase verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let start_time = Instant::now();
    let identifier = DpkgIdentifier::new(&cli.dpkg_admin_dir);
    let request = PackRequest {
        target: &cli.target,
        directory: &cli.dir,
        identifier: if cli.dont_identify_packages {
            None
        } else {
            Some(&identifier as &dyn PackageIdentifier)
        },
    };

    let summary = pack(&request, &TracingReporter)
        .with_context(|| format!("Failed to create pack {}", cli.target.display()))?;

    println!("✓ Created pack {}", cli.target.display());
    println!("  Entries:      {}", summary.entries);
    println!("  Files packed: {}", summary.files_packed);
    if summary.files_missing > 0 {
        println!("  Missing:      {}", summary.files_missing);
    }
    println!("  Directories:  {}", summary.directories);
    println!("  Packages:     {}", summary.manifest.packages.len());
    println!("  In manifest:  {}", summary.manifest.file_count());
    println!(
        "  Elapsed:      {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
