//! # Bulk-segregant contig ranking
//!
//! This library prioritises candidate mutations on assembly-only genomes.
//! Pileups of a mutant bulk and a background bulk are compared position by
//! position, and every contig of the assembly is scored by two metrics.
//!
//! ## Core Algorithm
//!
//! 1. **Pileup parsing**: read-base strings become allele counts and fractions
//! 2. **Bulk comparison**: mutant zygosity is kept unless both bulks are homozygous
//! 3. **Hemi-SNPs** (polyploid mode): parental hemi-SNPs are scored by bulk frequency ratio
//! 4. **Scoring**: homozygosity enrichment `(hm + a) / (ht + a)` and mean BFR per contig
//! 5. **Selection**: evidence filter plus cutoff, then background re-verification
//!
//! ## Usage Example
//!
//! ```no_run
//! use bulkrank::{AnalysisConfig, BulkAnalysis, Sample};
//!
//! # fn main() -> Result<(), bulkrank::AnalysisError> {
//! let mut analysis = BulkAnalysis::from_fasta(AnalysisConfig::default(), "assembly.fa")?;
//! analysis.ingest_pileup_file(Sample::MutantBulk, "mutant.pileup")?;
//! analysis.ingest_pileup_file(Sample::BackgroundBulk, "background.pileup")?;
//! analysis.compare_pileups();
//! for contig in analysis.verify_bg_bulk_pileup() {
//!     println!("{}\t{}", contig.id(), contig.hm_num());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, missing_debug_implementations)]

use std::sync::Once;

use tracing_subscriber::EnvFilter;

pub mod config; // Run-wide thresholds
pub mod genomics; // Pileup parsing, comparison, scoring and reporting
/// Python bindings for exposing the analysis to external runtimes.
#[cfg(feature = "python-bindings")]
pub mod python_bindings;

// Re-exports for convenience
pub use config::{AnalysisConfig, ConfigError, CrossType};
pub use genomics::{
    AnalysisError, BulkAnalysis, Contig, ContigSelector, PileupRecord, Ratio, Sample, ScoreType,
    Zygosity,
};

static TRACING_INIT: Once = Once::new();

/// Install the global `tracing` subscriber once.
///
/// `RUST_LOG` takes precedence; otherwise the level is `info`, or `debug`
/// when `verbose` is set.
pub fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        let default_level = if verbose { "debug" } else { "info" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing(false);
        init_tracing(true);
    }

    #[test]
    fn default_pipeline_config_validates() {
        let entries: Vec<genomics::AssemblyEntry> = Vec::new();
        let analysis = BulkAnalysis::new(AnalysisConfig::default(), entries).unwrap();
        assert!(analysis.contigs().is_empty());
        assert!(!analysis.is_compared());
    }
}
