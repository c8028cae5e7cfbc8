//! Bulk-segregant analysis over assembly contigs.
//!
//! Pileups from a mutant bulk and a background bulk (optionally with the two
//! parental lines) are parsed into allele counts, compared per position, and
//! summarised per contig. Contigs are then ranked by homozygosity enrichment
//! or by bulk frequency ratio, and the positions of the selected contigs are
//! written out with their flanking sequence.

mod analysis;
mod bfr;
mod contig;
mod contig_pileups;
mod io;
mod masking;
mod pileup;
mod regions;
mod report;
mod selection;
mod zygosity;

pub use analysis::{AnalysisError, BulkAnalysis, IngestSummary};
pub use bfr::{BfrCalculator, Ratio};
pub use contig::Contig;
pub use contig_pileups::{ComparedPositions, ContigPileups, Sample};
pub use io::{open_input, read_assembly_entries, AssemblyEntry};
pub use masking::{read_repeat_intervals, MaskedInterval, RepeatMask};
pub use pileup::{
    AlleleTag, BaseCounts, BaseFractions, IndelKind, PileupError, PileupRecord,
};
pub use regions::{flank_windows, FlankProvider, IndexedAssembly};
pub use report::{render_report, write_report};
pub use selection::{ContigSelector, ScoreType};
pub use zygosity::{classify, zygosity_call, Zygosity};
