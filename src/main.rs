use clap::{Parser, Subcommand};
use derivia::config::{self, PipelineConfig};
use derivia::orientation::OrientationFilter;
use derivia::output;
use derivia::process::{BatchProcessor, SourceUpload};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "derivia")]
#[command(about = "Batch image derivation pipeline")]
#[command(long_about = "\
Batch image derivation pipeline

Takes a set of source photos and produces a fixed catalog of product-ready
JPEG derivatives: resized, cover-cropped, color-graded, and watermarked.
Outputs land under {storage_root}/{date}/{stamp}/{WxH}/, one file per
(source, variant) pair, optionally packed into a single zip archive.

Each variant targets one orientation family (horizontal, vertical, square);
--orientation restricts the run to one family's variants. A failed variant
or a corrupt source is reported in the result without stopping the rest of
the batch; the exit code is nonzero unless everything succeeded.

Run 'derivia gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process source images into the variant catalog
    Run(RunArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Source image files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Watermark text; "© " is prepended when missing
    #[arg(long)]
    watermark: String,

    /// Restrict the catalog: horizontal, vertical, square, or both
    #[arg(long, default_value = "both")]
    orientation: OrientationFilter,

    /// Pack the outputs into a zip next to the output tree
    #[arg(long)]
    zip: bool,

    /// Print the batch result as JSON instead of the progress log
    #[arg(long)]
    json: bool,

    /// Pipeline config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured storage root
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args),
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut pipeline_config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(output_root) = args.output {
        pipeline_config.storage_root = output_root;
    }
    init_thread_pool(&pipeline_config);

    let sources: Vec<SourceUpload> = args.files.into_iter().map(SourceUpload::keep).collect();

    let (tx, rx) = std::sync::mpsc::channel();
    let quiet = args.json;
    let printer = std::thread::spawn(move || {
        for event in rx {
            if !quiet {
                output::print_event(&event);
            }
        }
    });

    let processor = BatchProcessor::new(pipeline_config)?.with_events(tx);

    let (batch, archive) = if args.zip {
        let archived = processor.run_archived(&sources, &args.watermark, args.orientation)?;
        (archived.batch, Some(archived.archive))
    } else {
        let batch = processor.run(&sources, &args.watermark, args.orientation)?;
        (batch, None)
    };

    // Dropping the processor closes the event channel so the printer drains.
    drop(processor);
    printer.join().unwrap();

    let archive_failed = matches!(archive, Some(Err(_)));
    if args.json {
        let mut value = serde_json::to_value(&batch)?;
        match &archive {
            Some(Ok(path)) => {
                value["archive"] = serde_json::Value::String(path.display().to_string());
            }
            Some(Err(e)) => {
                value["archive_error"] = serde_json::Value::String(e.to_string());
            }
            None => {}
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        output::print_outcome(&batch);
    }

    if archive_failed || !output::outcome_is_clean(&batch) {
        std::process::exit(1);
    }
    Ok(())
}

/// Initialize the rayon thread pool based on the pipeline config.
///
/// Caps at the number of available CPU cores — users can constrain down,
/// not up.
fn init_thread_pool(pipeline_config: &PipelineConfig) {
    let threads = config::effective_threads(pipeline_config);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
