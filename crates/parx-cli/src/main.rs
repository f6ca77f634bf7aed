//! parx CLI: run partition plans described in YAML files.

use std::error::Error as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use parx_cli::load_plan_file;
use parx_core::config::RunnerConfig;
use parx_core::types::RowBatch;
use parx_exec::{LocalRunner, Runner};
use parx_io::{FileFormat, LocalRunnerIo, RunnerIo};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parx")]
#[command(about = "parx: partitioned plan execution with a bounded results buffer", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a plan file
    Run {
        /// Path to the plan YAML file
        #[arg(short, long)]
        plan: PathBuf,

        /// Results buffer size (overrides config)
        #[arg(long)]
        buffer: Option<usize>,

        /// Worker threads (overrides config)
        #[arg(long)]
        workers: Option<usize>,

        /// Print partitions as they complete instead of registering the set
        #[arg(long)]
        stream: bool,

        /// Write each partition to DIR/part-<index>.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a plan file and check that its inputs exist
    Validate {
        /// Path to the plan YAML file
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// Show the partitions a plan file expands to
    Explain {
        /// Path to the plan YAML file
        #[arg(short, long)]
        plan: PathBuf,
    },
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Commands::Run {
            plan,
            buffer,
            workers,
            stream,
            output,
        } => run_plan(&plan, buffer, workers, stream, output.as_deref()),
        Commands::Validate { plan } => {
            validate_plan(&plan).map(|n| println!("✓ Plan is valid ({n} partitions)"))
        }
        Commands::Explain { plan } => explain_plan(&plan),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("parx=debug,parx_exec=debug,parx_cli=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn run_plan(
    plan_path: &Path,
    buffer: Option<usize>,
    workers: Option<usize>,
    stream: bool,
    output: Option<&Path>,
) -> CliResult<()> {
    let plan_file = load_plan_file(plan_path)?;
    tracing::debug!(
        plan = %plan_path.display(),
        sources = plan_file.partitions.len(),
        "loaded plan file"
    );

    let mut config = RunnerConfig::from_env()?;
    if let Some(n) = workers {
        config = config.with_num_workers(n);
    }
    if let Some(n) = buffer {
        config = config.with_results_buffer_size(n);
    }

    let runner: LocalRunner<RowBatch> = LocalRunner::new(config)?;
    let (plan, _files) = plan_file.build_plan(runner.io_handle())?;

    if let Some(dir) = output {
        fs::create_dir_all(dir)?;
    }

    let started = Instant::now();
    if stream {
        let mut total_rows = 0usize;
        for result in runner.run_iter(&plan, buffer)? {
            let result = result?;
            let meta = result.metadata();
            total_rows += meta.num_rows;
            println!(
                "  partition {}: {} rows, {} attempt(s), {}ms",
                result.index(),
                meta.num_rows,
                result.attempts(),
                result.elapsed().as_millis()
            );
            if let Some(dir) = output {
                write_part(runner.runner_io(), dir, result.index(), result.partition())?;
            }
        }
        println!("✓ Streamed {} partitions", plan.num_partitions());
        println!("  Rows: {}", total_rows);
    } else {
        let entry = runner.run(&plan)?;
        println!("✓ Plan executed successfully");
        println!("  Partition set: {}", entry.id());
        println!("  Partitions: {}", entry.num_partitions());
        println!("  Rows: {}", entry.num_rows());
        if let Some(bytes) = entry.size_bytes() {
            println!("  Size: {} bytes", bytes);
        }
        if let Some(dir) = output {
            let set = entry.partition_set()?;
            for (idx, batch) in set.items() {
                write_part(runner.runner_io(), dir, idx, batch)?;
            }
        }
    }
    println!("  Duration: {}ms", started.elapsed().as_millis());
    println!("  Plan hash: {}", plan.fingerprint());

    Ok(())
}

fn write_part(io: &LocalRunnerIo, dir: &Path, idx: usize, batch: &RowBatch) -> CliResult<()> {
    let path = dir.join(format!("part-{idx}.{}", FileFormat::Csv.extension()));
    io.write_partition(batch, &path, FileFormat::Csv)?;
    Ok(())
}

fn validate_plan(plan_path: &Path) -> CliResult<usize> {
    let plan_file = load_plan_file(plan_path)?;
    let files = plan_file.resolve_files(&LocalRunnerIo::default())?;
    Ok(files.len())
}

fn explain_plan(plan_path: &Path) -> CliResult<()> {
    let plan_file = load_plan_file(plan_path)?;
    let io = std::sync::Arc::new(LocalRunnerIo::default());
    let (plan, files) = plan_file.build_plan(io)?;

    println!("Partition Plan");
    println!("==============");
    println!();
    println!("Plan hash: {}", plan.fingerprint());
    println!("Partitions: {}", plan.num_partitions());
    println!();
    for (i, file) in files.iter().enumerate() {
        println!(
            "  {}. {} [{}] - {} bytes",
            i,
            file.path.display(),
            file.format,
            file.size_bytes
        );
    }

    Ok(())
}
