//! PageFile command-line harness
//!
//! Times the page operations against an in-memory or file-backed medium.
//!
//! # Examples
//!
//! ```bash
//! # Time every operation on the default in-memory page
//! pagefile bench
//!
//! # Same run against a file, then in memory
//! pagefile bench --medium file --path page.bin --runs 500
//! pagefile bench --medium memory
//!
//! # Show the resolved configuration
//! pagefile --config page.toml info
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use pagefile::error::Error;
use pagefile::{block, Medium, MediumKind, Page, PageConfig};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// PageFile - fixed-layout block allocator
#[derive(Parser, Debug)]
#[command(name = "pagefile")]
#[command(version = pagefile::VERSION)]
#[command(about = "Fixed-layout block allocator over files and memory", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// TOML file with block_size, block_count, medium and path
    #[arg(long, global = true, env = "PAGEFILE_CONFIG")]
    config: Option<PathBuf>,

    /// Log directory path
    #[arg(long, global = true, default_value = "logs", env = "PAGEFILE_LOG_DIR")]
    log_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Time write, read, remove, put, get and clean on one page
    Bench(BenchArgs),

    /// Show the resolved page configuration
    Info(PageArgs),

    /// Show version
    Version,
}

/// Overrides applied on top of the config file
#[derive(Args, Debug)]
struct PageArgs {
    /// Storage medium
    #[arg(long, value_enum)]
    medium: Option<MediumArg>,

    /// Page file path (file medium)
    #[arg(long)]
    path: Option<PathBuf>,

    /// Block size in bytes
    #[arg(long)]
    block_size: Option<usize>,

    /// Number of blocks
    #[arg(long)]
    block_count: Option<usize>,
}

#[derive(Args, Debug)]
struct BenchArgs {
    #[command(flatten)]
    page: PageArgs,

    /// Iterations for the small-payload phases
    #[arg(long, default_value = "1000")]
    runs: usize,

    /// Iterations for the large-payload phases
    #[arg(long, default_value = "10")]
    large_runs: usize,

    /// Size of each large payload in KiB
    #[arg(long, default_value = "1024")]
    large_kib: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MediumArg {
    Memory,
    File,
}

impl From<MediumArg> for MediumKind {
    fn from(arg: MediumArg) -> Self {
        match arg {
            MediumArg::Memory => MediumKind::Memory,
            MediumArg::File => MediumKind::File,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SampleObject {
    data: Vec<u8>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _log_guard = setup_logging(&cli)?;

    match cli.command {
        Commands::Bench(args) => {
            let config = resolve_config(cli.config.as_ref(), &args.page)?;
            bench_command(config, &args)
        }
        Commands::Info(args) => {
            let config = resolve_config(cli.config.as_ref(), &args)?;
            info_command(&config)
        }
        Commands::Version => {
            println!("PageFile {}", pagefile::VERSION);
            Ok(())
        }
    }
}

/// Console logs go to stderr, file logs are JSON lines in a daily file
///
/// The returned guard flushes the file writer when dropped.
fn setup_logging(cli: &Cli) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(&cli.log_dir)?;

    let (file_writer, guard) = tracing_appender::non_blocking(
        RollingFileAppender::new(Rotation::DAILY, &cli.log_dir, "pagefile.log"),
    );

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .with_target(false)
        .compact();
    let file = fmt::layer().json().with_writer(file_writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(guard)
}

fn resolve_config(path: Option<&PathBuf>, args: &PageArgs) -> anyhow::Result<PageConfig> {
    let mut config = match path {
        Some(path) => PageConfig::load(path)?,
        None => PageConfig::default(),
    };

    if let Some(medium) = args.medium {
        config.medium = medium.into();
    }
    if let Some(path) = &args.path {
        config.path = Some(path.clone());
    }
    if let Some(block_size) = args.block_size {
        config.block_size = block_size;
    }
    if let Some(block_count) = args.block_count {
        config.block_count = block_count;
    }
    if config.medium == MediumKind::File && config.path.is_none() {
        config.path = Some(PathBuf::from("page.bin"));
    }

    config.validate()?;
    Ok(config)
}

fn info_command(config: &PageConfig) -> anyhow::Result<()> {
    let page = Page::from_config(config)?;
    let stats = page.stats();

    println!("Medium:      {:?}", config.medium);
    if let Some(path) = &config.path {
        println!("Path:        {}", path.display());
    }
    println!("Block size:  {} bytes", stats.block_size);
    println!("Block count: {}", stats.block_count);
    println!("Page size:   {} bytes", page.size());
    Ok(())
}

fn start_section(name: &str) {
    println!("\n======= {} =======", name);
}

/// Run `action` up to `runs` times and print the accumulated time
///
/// With `stop_when_full`, an out-of-capacity error ends the phase early
/// instead of failing it. Returns the number of completed runs.
fn timed_run<F>(name: &str, runs: usize, stop_when_full: bool, mut action: F) -> anyhow::Result<usize>
where
    F: FnMut(usize) -> pagefile::error::Result<()>,
{
    let mut elapsed = Duration::ZERO;
    let mut completed = 0;

    for run in 0..runs {
        let start = Instant::now();
        let result = action(run);
        elapsed += start.elapsed();

        match result {
            Ok(()) => completed += 1,
            Err(Error::OutOfCapacity { .. }) if stop_when_full => {
                warn!(phase = name, completed, "Page full, ending phase early");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("{} x {}: {} ms", name, completed, elapsed.as_millis());
    Ok(completed)
}

fn bench_command(config: PageConfig, args: &BenchArgs) -> anyhow::Result<()> {
    start_section(&format!("{:?}", config.medium));
    info!(?config, runs = args.runs, "Starting bench");

    let page = Page::from_config(&config)?;
    run_bench(&page, args)?;

    start_section("Done");
    Ok(())
}

fn run_bench(page: &Page<Box<dyn Medium>>, args: &BenchArgs) -> anyhow::Result<()> {
    let runs = args.runs;
    let small: Vec<u8> = (1..=25u8).take(page.block_size()).collect();

    let mut indexes = Vec::with_capacity(runs);
    timed_run("Write", runs, false, |_| {
        indexes.push(page.write(&small)?);
        Ok(())
    })?;

    timed_run("Read", indexes.len(), false, |run| {
        page.read_block(indexes[run]).map(|_| ())
    })?;

    timed_run("Remove range 2", runs / 2, false, |_| {
        page.remove_range(2, 0).map(|_| ())
    })?;

    let mut strings = Vec::with_capacity(runs);
    timed_run("Put string", runs, false, |_| {
        strings.push(page.put_value(&"Hello World")?);
        Ok(())
    })?;

    timed_run("Get string", strings.len(), false, |run| {
        strings[run].get_value::<String>().map(|_| ())
    })?;

    for address in strings.drain(..) {
        address.release()?;
    }

    let mut binary = vec![0u8; args.large_kib * 1024];
    rand::thread_rng().fill_bytes(&mut binary);
    info!(
        bytes = binary.len(),
        blocks = block::blocks_for(binary.len(), page.block_size()),
        "Large payload prepared"
    );

    let mut large = Vec::with_capacity(args.large_runs);
    timed_run("Put large byte[]", args.large_runs, true, |_| {
        large.push(page.put(&binary)?);
        Ok(())
    })?;

    timed_run("Get large byte[]", large.len(), false, |run| {
        large[run].get().map(|_| ())
    })?;

    // clean frees everything; the handles must not release afterwards
    for address in large.drain(..) {
        address.leak();
    }
    timed_run("Clean", 1, false, |_| page.clean())?;

    let sample = SampleObject { data: binary };
    let mut objects = Vec::with_capacity(args.large_runs);
    timed_run("Put large object", args.large_runs, true, |_| {
        objects.push(page.put_value(&sample)?);
        Ok(())
    })?;

    timed_run("Get large object", objects.len(), false, |run| {
        objects[run].get_value::<SampleObject>().map(|_| ())
    })?;

    for address in objects.drain(..) {
        address.leak();
    }
    timed_run("Clean", 1, false, |_| page.clean())?;

    timed_run("Write and release", runs, false, |_| {
        page.put_value(&"Hello World")?.release()
    })?;

    let stats = page.stats();
    info!(used = stats.used_blocks, free = stats.free_blocks, "Bench finished");
    Ok(())
}
