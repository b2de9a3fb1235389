use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use layered_rst::{
    parse_corpus, Action, CorpusReport, FallbackPolicy, FeatureAtom, FeatureSettings, LinearSvm,
    LinearSvmParams, ParsingModel, RunConfig,
};

/// Shift-reduce RST discourse parser
#[derive(Debug, Parser)]
#[command(name = "rst", version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse every `.edus` document in a directory and write `.brackets` files
    Parse(CorpusArgs),
    /// Parse a directory and score the trees against `.dis` gold trees
    Eval(CorpusArgs),
    /// Train a model from JSON-lines samples
    Train(TrainArgs),
}

#[derive(Debug, Args, Clone)]
struct CorpusArgs {
    /// Directory holding `.edus` documents
    dir: PathBuf,
    /// Model archive (overrides the config file)
    #[arg(long)]
    model: Option<PathBuf>,
    /// TOML run configuration
    #[arg(long, default_value = "rst.toml")]
    config: PathBuf,
    /// What to do when the model predicts an illegal action
    #[arg(long, value_enum)]
    fallback: Option<FallbackArg>,
    /// Do not write `.brackets` files
    #[arg(long)]
    no_brackets: bool,
    /// Print each parsed tree
    #[arg(long)]
    show: bool,
}

#[derive(Debug, Args, Clone)]
struct TrainArgs {
    /// JSON lines of `{"features": [...], "action": ...}`
    samples: PathBuf,
    /// Where to write the model archive (`.gz` is appended if missing)
    #[arg(long, short)]
    output: PathBuf,
    #[arg(long, default_value_t = LinearSvmParams::default().epochs)]
    epochs: usize,
    #[arg(long, default_value_t = LinearSvmParams::default().lambda)]
    lambda: f64,
    /// Samples carry `Distance-To-End` atoms
    #[arg(long)]
    doc_length: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FallbackArg {
    Abort,
    BestLegal,
}

impl From<FallbackArg> for FallbackPolicy {
    fn from(arg: FallbackArg) -> Self {
        match arg {
            FallbackArg::Abort => FallbackPolicy::Abort,
            FallbackArg::BestLegal => FallbackPolicy::BestLegal,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Sample {
    features: Vec<FeatureAtom>,
    action: Action,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<ExitCode> {
        init_tracing(self.verbose);
        match self.command {
            Command::Parse(args) => run_corpus(args, false),
            Command::Eval(args) => run_corpus(args, true),
            Command::Train(args) => run_train(args),
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_corpus(args: CorpusArgs, evaluate: bool) -> anyhow::Result<ExitCode> {
    let mut config = RunConfig::load(&args.config)?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(fallback) = args.fallback {
        config.fallback = fallback.into();
    }
    if args.no_brackets {
        config.write_brackets = false;
    }
    config.report |= evaluate;

    let model: ParsingModel = ParsingModel::load(&config.model)
        .with_context(|| format!("loading model {}", config.model.display()))?
        .with_fallback(config.fallback);

    let report = parse_corpus(&args.dir, &model, &config.corpus_options())
        .with_context(|| format!("parsing corpus {}", args.dir.display()))?;
    print_report(&report, args.show);

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &CorpusReport, show: bool) {
    for document in &report.parsed {
        println!(
            "{}: {} EDUs, {} brackets",
            document.id,
            document.tree.edu_count(),
            document.tree.edu_count() - 1
        );
        if show {
            println!("{}\n", document.tree.display().with_text());
        }
    }
    for failure in &report.failures {
        eprintln!("{}: {}", failure.document, failure.error);
    }
    if let Some(metrics) = &report.metrics {
        println!("\n{}", metrics);
    }
}

fn read_samples(path: &Path) -> anyhow::Result<Vec<(Vec<FeatureAtom>, Action)>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut samples = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let sample: Sample = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid sample", path.display(), idx + 1))?;
        samples.push((sample.features, sample.action));
    }
    Ok(samples)
}

fn run_train(args: TrainArgs) -> anyhow::Result<ExitCode> {
    let samples = read_samples(&args.samples)?;
    tracing::info!(
        samples = samples.len(),
        path = %args.samples.display(),
        "read training samples"
    );

    let classifier = LinearSvm::new(LinearSvmParams {
        lambda: args.lambda,
        epochs: args.epochs,
    });
    let settings = FeatureSettings {
        use_document_length: args.doc_length,
    };
    let model = ParsingModel::train(&samples, classifier, settings)?;
    let path = model.save(&args.output)?;
    println!("model written to {}", path.display());
    Ok(ExitCode::SUCCESS)
}
