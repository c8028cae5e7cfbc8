use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use bulkrank::genomics::{write_report, IndexedAssembly};
use bulkrank::{init_tracing, AnalysisConfig, BulkAnalysis, CrossType, Sample, ScoreType};

#[derive(Parser, Debug)]
#[command(
    name = "bulkrank",
    about = "Rank assembly contigs for bulk-segregant mutation mapping"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare bulks, select contigs and write the selected-variant reports.
    Run {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        scoring: ScoringArgs,
        /// Directory receiving `hme_variants.tsv` (and `bfr_variants.tsv` in polyploidy mode).
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Compare bulks and print per-contig counts and scores.
    Scores {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        scoring: ScoringArgs,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Assembly FASTA (indexed with a `.fai` on demand for flanks).
    #[arg(long)]
    assembly: PathBuf,
    /// Pileup of the mutant bulk.
    #[arg(long)]
    mut_bulk: PathBuf,
    /// Pileup of the background bulk.
    #[arg(long)]
    bg_bulk: Option<PathBuf>,
    /// Pileup of the mutant parent (polyploidy mode).
    #[arg(long)]
    mut_parent: Option<PathBuf>,
    /// Pileup of the background parent (polyploidy mode).
    #[arg(long)]
    bg_parent: Option<PathBuf>,
    /// RepeatMasker `.out` file; masked positions are not classified.
    #[arg(long)]
    repeats: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ScoringArgs {
    /// Smoothing constant for the homozygosity enrichment score.
    #[arg(long, default_value_t = 0.5)]
    hmes_adjust: f64,
    /// Smoothing constant for bulk frequency ratios.
    #[arg(long, default_value_t = 0.05)]
    bfr_adjust: f64,
    /// Lowest allele fraction called heterozygous.
    #[arg(long, default_value_t = 0.2)]
    ht_low: f64,
    /// Highest allele fraction called heterozygous.
    #[arg(long, default_value_t = 0.9)]
    ht_high: f64,
    /// Minimum pileup coverage.
    #[arg(long, default_value_t = 6)]
    min_depth: u32,
    /// Maximum pileup coverage (0 disables).
    #[arg(long, default_value_t = 300)]
    max_depth: u32,
    /// Minimum number of non-reference bases.
    #[arg(long, default_value_t = 3)]
    min_non_ref_count: u32,
    /// Minimum reads supporting an indel.
    #[arg(long, default_value_t = 3)]
    min_indel_count_support: u32,
    /// Allele fractions at or below this value are ignored.
    #[arg(long, default_value_t = 0.1)]
    noise: f64,
    /// Keep positions whose reference base is `N`.
    #[arg(long)]
    keep_ambiguous_ref: bool,
    /// Population design: `back` or `out`.
    #[arg(long, default_value_t = CrossType::Back)]
    cross_type: CrossType,
    /// Skip the evidence filter.
    #[arg(long)]
    use_all_contigs: bool,
    /// Skip the score cutoff.
    #[arg(long)]
    include_low_scores: bool,
    /// Resolve homeologous variants with parental hemi-SNPs.
    #[arg(long)]
    polyploidy: bool,
    /// Flank length written around each reported variant.
    #[arg(long, default_value_t = 50)]
    flank_length: usize,
}

impl ScoringArgs {
    fn to_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            hmes_adjust: self.hmes_adjust,
            bfr_adjust: self.bfr_adjust,
            ht_low: self.ht_low,
            ht_high: self.ht_high,
            min_depth: self.min_depth,
            max_depth: self.max_depth,
            min_non_ref_count: self.min_non_ref_count,
            min_indel_count_support: self.min_indel_count_support,
            noise: self.noise,
            ignore_ambiguous_ref: !self.keep_ambiguous_ref,
            cross_type: self.cross_type,
            use_all_contigs: self.use_all_contigs,
            include_low_scores: self.include_low_scores,
            polyploidy: self.polyploidy,
            flank_length: self.flank_length,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            inputs,
            scoring,
            out_dir,
        } => run_pipeline(&inputs, scoring.to_config(), &out_dir)?,
        Commands::Scores { inputs, scoring } => run_scores(&inputs, scoring.to_config())?,
    }

    Ok(())
}

fn load_analysis(inputs: &InputArgs, config: AnalysisConfig) -> Result<BulkAnalysis> {
    let mut analysis = BulkAnalysis::from_fasta(config, &inputs.assembly).with_context(|| {
        format!("failed to load assembly {}", inputs.assembly.display())
    })?;

    if let Some(repeats) = &inputs.repeats {
        analysis
            .load_repeat_mask(repeats)
            .with_context(|| format!("failed to apply repeat mask {}", repeats.display()))?;
    }

    let pileups = [
        (Sample::MutantBulk, Some(&inputs.mut_bulk)),
        (Sample::BackgroundBulk, inputs.bg_bulk.as_ref()),
        (Sample::MutantParent, inputs.mut_parent.as_ref()),
        (Sample::BackgroundParent, inputs.bg_parent.as_ref()),
    ];
    for (sample, path) in pileups {
        let Some(path) = path else { continue };
        analysis
            .ingest_pileup_file(sample, path)
            .with_context(|| format!("failed to ingest {sample} pileup {}", path.display()))?;
    }

    analysis.compare_pileups();
    Ok(analysis)
}

fn run_pipeline(inputs: &InputArgs, config: AnalysisConfig, out_dir: &Path) -> Result<()> {
    let mut analysis = load_analysis(inputs, config)?;
    let verified = analysis.verify_bg_bulk_pileup().len();
    info!(contigs = verified, "HME selection after verification");

    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;
    let flanks = IndexedAssembly::open(&inputs.assembly, analysis.config().flank_length)
        .with_context(|| format!("failed to index assembly {}", inputs.assembly.display()))?;

    let mut reports = vec![(ScoreType::Hme, out_dir.join("hme_variants.tsv"))];
    if analysis.config().polyploidy {
        reports.push((ScoreType::Bfr, out_dir.join("bfr_variants.tsv")));
    }

    for (score_type, path) in reports {
        let file = File::create(&path)
            .with_context(|| format!("failed to create report {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        let rows = write_report(&mut writer, &analysis, score_type, &flanks)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        info!(%score_type, rows, path = %path.display(), "report written");
    }

    Ok(())
}

fn run_scores(inputs: &InputArgs, config: AnalysisConfig) -> Result<()> {
    let analysis = load_analysis(inputs, config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "sequence_id\tlength\thm_num\tht_num\themi_num\thme_score\tbfr_score")?;
    for contig in analysis.contigs() {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{:.4}\t{:.4}",
            contig.id(),
            contig.length(),
            contig.hm_num(),
            contig.ht_num(),
            contig.hemi_num(),
            analysis.score(contig, ScoreType::Hme),
            analysis.score(contig, ScoreType::Bfr),
        )?;
    }

    Ok(())
}
