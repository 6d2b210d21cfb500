use anyhow::Context;
use clap::Parser;
use repquast::config::EvaluationConfig;
use repquast::pipeline::{evaluate, EvaluationInputs};
use repquast::tools::matcher::ExternalMatcher;
use repquast::RepquastError;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Quality evaluation of a constructed immune repertoire against a
/// reference repertoire and/or its own reads.
#[derive(Parser, Debug)]
#[command(name = "repquast", version, about)]
struct Cli {
    /// Constructed repertoire centroids (FASTA, optionally gzipped)
    #[arg(short = 'c', long)]
    constructed: PathBuf,

    /// Read-to-cluster map of the constructed repertoire
    #[arg(short = 'C', long)]
    constructed_rcm: Option<PathBuf>,

    /// Reference repertoire centroids
    #[arg(short = 'r', long)]
    reference: Option<PathBuf>,

    /// Read-to-cluster map of the reference repertoire
    #[arg(short = 'R', long)]
    reference_rcm: Option<PathBuf>,

    /// Original reads (FASTA/FASTQ, optionally gzipped)
    #[arg(short = 's', long)]
    reads: Option<PathBuf>,

    /// Neighbor-graph builder executable
    #[arg(long, env = "REPQUAST_MATCHER")]
    matcher: PathBuf,

    /// Optional TOML file with evaluation parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Largest edit distance considered a match
    #[arg(long)]
    tau: Option<u32>,

    /// Reference trust cutoff
    #[arg(long)]
    trust_cutoff: Option<u64>,

    /// Reference trash cutoff
    #[arg(long)]
    trash_cutoff: Option<u64>,

    /// Size threshold for reported measures
    #[arg(long)]
    min_size: Option<u64>,

    /// Tie-breaking seed for RCM reconstruction
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads (0 = all cores)
    #[arg(short = 'j', long, default_value_t = 0)]
    threads: usize,

    /// Output directory for reports and derived files
    #[arg(short = 'o', long, default_value = "repquast_results")]
    output: PathBuf,

    /// Also export flagged clusters as FASTA
    #[arg(long)]
    export_bad_clusters: bool,
}

fn main() {
    let log_level = std::env::var("REPQUAST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");

        let exit_code = match e.downcast_ref::<RepquastError>() {
            Some(RepquastError::Config(_) | RepquastError::Precondition(_)) => 2,
            Some(RepquastError::Io(_)) => 3,
            Some(RepquastError::MalformedInput(_)) => 4,
            Some(RepquastError::ExternalTool { .. }) => 5,
            Some(RepquastError::Cancelled) => 130,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => EvaluationConfig::from_toml_file(path)?,
        None => EvaluationConfig::default(),
    };
    if let Some(tau) = cli.tau {
        config.tau_max = tau;
    }
    if let Some(trust) = cli.trust_cutoff {
        config.trust_cutoff = Some(trust);
    }
    if let Some(trash) = cli.trash_cutoff {
        config.trash_cutoff = Some(trash);
    }
    if let Some(min_size) = cli.min_size {
        config.min_size = min_size;
    }
    if let Some(seed) = cli.seed {
        config.rng_seed = seed;
    }
    config.threads = cli.threads;
    config.validate()?;

    let num_threads = if cli.threads == 0 {
        num_cpus::get()
    } else {
        cli.threads
    };
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .context("failed to initialize thread pool")?;

    std::fs::create_dir_all(&cli.output)
        .with_context(|| format!("cannot create output directory {}", cli.output.display()))?;

    let matcher = ExternalMatcher::new(cli.matcher.clone())?.with_threads(num_threads);

    let inputs = EvaluationInputs {
        constructed: cli.constructed.clone(),
        constructed_rcm: cli.constructed_rcm.clone(),
        reference: cli.reference.clone(),
        reference_rcm: cli.reference_rcm.clone(),
        reads: cli.reads.clone(),
        reconstructed_rcm_out: Some(cli.output.join("constructed.rcm")),
    };

    let report = evaluate(&matcher, &inputs, &config)?;

    report.write_json(cli.output.join("report.json"))?;
    report.write_text(cli.output.join("report.txt"))?;
    print!("{}", report.to_text());

    if cli.export_bad_clusters {
        export_bad_clusters(&cli, &config)?;
    }

    Ok(())
}

fn export_bad_clusters(cli: &Cli, config: &EvaluationConfig) -> anyhow::Result<()> {
    let (Some(reads), Some(rcm)) = (&cli.reads, &cli.constructed_rcm) else {
        anyhow::bail!("exporting bad clusters needs --reads and --constructed-rcm");
    };

    let stats = repquast::stats::RepertoireStats::from_files(
        reads,
        rcm,
        &cli.constructed,
        config.min_size as usize,
    )?;
    let exported = stats.export_bad_clusters(
        stats.error_rate(),
        config.pv_threshold,
        &cli.output.join("bad_clusters"),
        false,
    )?;
    tracing::info!("exported {} suspicious clusters", exported.len());
    Ok(())
}
