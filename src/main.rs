use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use featio::load::{load_examples, LoadOptions, Materialization};
use featio::model::{load_model, model_path};
use featio::predict::Predictor;
use std::collections::BTreeMap;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "featio")]
#[command(about = "Load feature files and run predictions with a trained model")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a trained model and print one prediction per input example
    Predict(PredictArgs),
    /// Load example files and print a summary of each
    Inspect(InspectArgs),
}

#[derive(Args)]
struct LoadArgs {
    /// Input files include labels (first non-id column for TSV, "y" for
    /// JSON-lines, first token for MegaM)
    #[arg(short = 'l', long)]
    has_labels: bool,

    /// Build a dense feature matrix instead of a sparse one
    #[arg(long)]
    dense: bool,

    /// Read each file once instead of in three parallel passes
    #[arg(long)]
    sequential: bool,
}

impl LoadArgs {
    fn options(&self) -> LoadOptions {
        LoadOptions {
            has_labels: self.has_labels,
            sparse: !self.dense,
            quiet: false,
            strategy: if self.sequential {
                Materialization::Sequential
            } else {
                Materialization::Parallel
            },
        }
    }
}

#[derive(Args)]
struct PredictArgs {
    /// Prefix used when the model was saved (reads <MODEL_PREFIX>.model)
    model_prefix: String,

    /// TSV, JSON-lines or MegaM files (with or without labels), with the matching suffix
    #[arg(required = true)]
    input_files: Vec<String>,

    #[command(flatten)]
    load: LoadArgs,

    /// Index of the class whose probability is reported (1 = second class;
    /// classes are sorted lexicographically)
    #[arg(short, long, default_value_t = 1)]
    positive_class: usize,

    /// Print 1 when the positive-class probability meets or exceeds this value, else 0
    #[arg(short, long)]
    threshold: Option<f64>,
}

#[derive(Args)]
struct InspectArgs {
    /// TSV, JSON-lines or MegaM files
    #[arg(required = true)]
    input_files: Vec<String>,

    #[command(flatten)]
    load: LoadArgs,

    /// Print the feature name of every column
    #[arg(long)]
    show_vocabulary: bool,
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let model = load_model(&model_path(&args.model_prefix))?;
    let predictor = Predictor::new(model, args.positive_class, args.threshold);
    let options = args.load.options();

    for input in &args.input_files {
        let start = Instant::now();
        let table = load_examples(input, &options)?;
        let predictions = predictor.predict(&table)?;
        for prediction in &predictions {
            println!("{}", prediction);
        }
        info!(
            path = %input,
            predictions = predictions.len(),
            duration_secs = start.elapsed().as_secs_f64(),
            "Predictions written"
        );
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let options = args.load.options();

    for input in &args.input_files {
        let start = Instant::now();
        let table = load_examples(input, &options)?;
        let duration = start.elapsed();

        let mut label_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for label in table.label_values() {
            *label_counts.entry(label).or_default() += 1;
        }

        println!();
        println!("=== {} ===", input);
        println!("Load time:          {:.2}s", duration.as_secs_f64());
        println!("Examples:           {}", table.len());
        println!("Features:           {}", table.vectorizer.len());
        println!(
            "Matrix:             {} ({} x {})",
            if table.features.is_sparse() { "sparse" } else { "dense" },
            table.features.n_rows(),
            table.features.n_cols()
        );
        println!(
            "First ids:          {}",
            table.ids.iter().take(5).cloned().collect::<Vec<_>>().join(", ")
        );
        if table.has_labels() {
            println!("Labels:");
            for (label, count) in &label_counts {
                println!("  {:<18}{}", label, count);
            }
        }
        if args.show_vocabulary {
            println!("Vocabulary:");
            for (col, name) in table.vectorizer.feature_names().iter().enumerate() {
                println!("  {}\t{}", col, name);
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Predict(args) => run_predict(args),
        Commands::Inspect(args) => run_inspect(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
